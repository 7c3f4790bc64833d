// -------------------------------------------------------------------------
// LAPD Plasma Analysis -- Interferometry Calibration Benchmark
// End-to-end calibration of synthetic density fields at two grid sizes,
// with a fine-clock interferometer trace offset from the probe clock.
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lapd_diagnostics::interferometry::{calibrate_with_trace, InterferometryTrace};
use lapd_types::array::{AxisCoord, LabeledArray};
use lapd_types::config::{CalibrationConfig, PlateauRange};
use ndarray::{Array1, Array2};
use std::hint::black_box;

/// Triangular discharge profile peaking at 5 ms, back to zero at 10 ms.
fn discharge(t: f64) -> f64 {
    if t < 0.0 || t > 10.0 {
        0.0
    } else if t <= 5.0 {
        t / 5.0
    } else {
        1.0 - (t - 5.0) / 5.0
    }
}

fn make_density(nx: usize, nt: usize) -> LabeledArray {
    let x = Array1::linspace(-20.0, 20.0, nx);
    let times = Array1::linspace(0.0, 10.0, nt);
    let values = Array2::from_shape_fn((nx, nt), |(i, j)| {
        let shape = 1.0 - (x[i] / 30.0).powi(2);
        (discharge(times[j]) + 0.05) * shape * 1e6
    })
    .into_dyn();
    let plateaus = Array1::from_iter((1..=nt).map(|p| p as f64));
    LabeledArray::new(
        values,
        vec![
            AxisCoord::new("x", x),
            AxisCoord::new("time", times).with_aux("plateau", plateaus),
        ],
    )
    .unwrap()
}

fn make_trace(n: usize) -> InterferometryTrace {
    let times = Array1::linspace(0.0, 12.0, n);
    InterferometryTrace {
        values: times.mapv(|t| 35.0 * (discharge(t - 2.0) + 0.05)),
        times_ms: times,
    }
}

fn bench_calibration(c: &mut Criterion) {
    let config = CalibrationConfig {
        core_radius_cm: 26.0,
        steady_state: PlateauRange::new(2, 100),
    };
    let mut group = c.benchmark_group("interferometry_calibration");
    for &(nx, nt) in &[(17usize, 64usize), (33, 128)] {
        let density = make_density(nx, nt);
        let trace = make_trace(4096);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{nx}x{nt}")),
            &(density, trace),
            |b, (density, trace)| {
                b.iter(|| {
                    let cal =
                        calibrate_with_trace(black_box(density), black_box(trace), &config)
                            .unwrap();
                    black_box(cal.calibrated_density.values.len())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_calibration);
criterion_main!(benches);
