//! Vertical profile integrals.

use crate::density;
use crate::error::MeteoError;
use crate::humidity;

/// Pressure-weighted mean pressure of one layer.
///
/// `p0` and `p1` are the pressures in Pa at the layer bottom and top and `dz`
/// is the layer thickness in m. Pressure is assumed to decay exponentially
/// across the layer. Falls back to the arithmetic mean when the two pressures
/// are so close that the exponential fit degenerates to 0/0.
fn layer_mean_pressure(p0: f64, p1: f64, dz: f64) -> f64 {
    let log_ratio = f64::ln(p1 / p0);
    if log_ratio.abs() < 1e-12 {
        return 0.5 * (p0 + p1);
    }
    let xp = -log_ratio / dz;
    -p0 / xp * (f64::exp(-xp * dz) - 1.) / dz
}

/// Integrated water vapor of a single profile.
///
/// The four slices hold per-level values ordered from bottom to top:
/// relative humidity as a fraction, temperature in K, pressure in Pa, and
/// height in m (strictly increasing). All slices must have the same length
/// and at least two levels.
///
/// Every layer between adjacent levels contributes `q * rho * dz` evaluated
/// at the layer-mean conditions, with the layer pressure taken as the
/// pressure-weighted mean of an exponential pressure profile between the two
/// bounding levels. The sum over all layers is the column water vapor mass
/// in kg/m^2.
pub fn rh_to_iwv(
    relhum_lev: &[f64],
    temp_lev: &[f64],
    press_lev: &[f64],
    hgt_lev: &[f64],
) -> Result<f64, MeteoError> {
    let num_levels = relhum_lev.len();
    if num_levels < 2
        || temp_lev.len() != num_levels
        || press_lev.len() != num_levels
        || hgt_lev.len() != num_levels
    {
        return Err(MeteoError::InconsistentInputs);
    }

    let mut iwv = 0.;
    for i in 0..num_levels - 1 {
        let dz = hgt_lev[i + 1] - hgt_lev[i];
        let rh = 0.5 * (relhum_lev[i] + relhum_lev[i + 1]);
        let t = 0.5 * (temp_lev[i] + temp_lev[i + 1]);
        let p = layer_mean_pressure(press_lev[i], press_lev[i + 1], dz);
        let q = humidity::rh2q(rh, t, p)?;
        let rho = density::moist_rho_q(p, t, q, &[])?;
        iwv += q * rho * dz;
    }
    Ok(iwv)
}
