//! Physical constants shared by the conversion formulas.
//!
//! The formulas are calibrated against these exact literals; don't swap in
//! higher-precision values without revisiting the reference results in the
//! tests.

/// Specific gas constant for dry air (J/kg/K)
pub const R_AIR: f64 = 287.04;

/// Specific gas constant for water vapor (J/kg/K)
pub const R_VAPOR: f64 = 461.5;

/// Ratio between the molar masses of water and dry air
pub const MW_RATIO: f64 = 0.622;

/// 0 °C in K
pub const T_ZERO_C: f64 = 273.15;
