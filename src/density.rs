//! Moist air density.

use log::debug;

use crate::constants::{R_AIR, R_VAPOR};
use crate::error::MeteoError;
use crate::humidity;

/// Densities below this bound in kg/m^3 are an error; between here and zero
/// they count as numerical noise and clamp to exactly zero.
pub(crate) const MIN_DENSITY: f64 = -1e-3;

/// Moist air density before the negative-density screen.
///
/// `qm_total` is the summed extra mass loading in kg/kg.
pub(crate) fn raw_density(p: f64, t: f64, q: f64, qm_total: f64) -> f64 {
    p / (R_AIR * t * (1. + (R_VAPOR / R_AIR - 1.) * q - qm_total))
}

/// Screen a computed density against [`MIN_DENSITY`].
pub(crate) fn clamp_density(rho: f64) -> Result<f64, MeteoError> {
    if rho < MIN_DENSITY {
        return Err(MeteoError::NegativeDensity);
    }
    if rho < 0. {
        debug!("clamping density {rho} to zero");
        return Ok(0.);
    }
    Ok(rho)
}

/// Sum of the extra mass-loading species.
///
/// Negative entries are masked/missing-data sentinels from upstream and
/// count as zero.
fn total_loading(qm: &[f64]) -> f64 {
    qm.iter().map(|&m| m.max(0.)).sum()
}

/// Moist air density from specific humidity.
///
/// `p` is the total air pressure in Pa, `t` the temperature in K and `q` the
/// specific humidity in kg/kg. `qm` holds zero or more extra mass-loading
/// species (cloud liquid, ice, snow, ...) in kg/kg that add mass to the air
/// without contributing vapor pressure; negative entries clamp to zero.
///
/// A result below -0.001 kg/m^3 means the inputs are physically inconsistent
/// and is an error; results between -0.001 and 0 clamp to exactly zero.
pub fn moist_rho_q(p: f64, t: f64, q: f64, qm: &[f64]) -> Result<f64, MeteoError> {
    clamp_density(raw_density(p, t, q, total_loading(qm)))
}

/// Moist air density from relative humidity.
///
/// Converts `rh` (a fraction) to specific humidity with [`humidity::rh2q`],
/// then delegates to [`moist_rho_q`] with the same species sequence. `rh`
/// values above 5 are rejected as percentages.
pub fn moist_rho_rh(p: f64, t: f64, rh: f64, qm: &[f64]) -> Result<f64, MeteoError> {
    let q = humidity::rh2q(rh, t, p)?;
    moist_rho_q(p, t, q, qm)
}
