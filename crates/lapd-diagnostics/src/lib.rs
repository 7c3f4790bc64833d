//! Probe diagnostics derived from LAPD sweep datasets.
//!
//! Interferometry density calibration, Mach-number and flow-velocity
//! derivation, steady-state reduction helpers, and the on-disk dataset store.

pub mod interferometry;
pub mod mach;
pub mod pressure;
pub mod steady_state;
pub mod store;
