// ─────────────────────────────────────────────────────────────────────
// LAPD Plasma Analysis — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Elementary charge (C). Also converts eV to J.
pub const Q_ELECTRON: f64 = 1.602176634e-19;

/// Electron mass (kg).
pub const M_ELECTRON: f64 = 9.1093837015e-31;

/// Atomic mass unit (kg).
pub const ATOMIC_MASS_UNIT: f64 = 1.66053906660e-27;
