//! Temperature conversions, including virtual temperature.

use crate::constants::{R_AIR, R_VAPOR, T_ZERO_C};
use crate::error::MeteoError;
use crate::humidity;

/// Convert a temperature in K to °C.
pub fn kelvin_to_celsius(t: f64) -> f64 {
    t - T_ZERO_C
}

/// Convert a temperature in °C to K.
pub fn celsius_to_kelvin(c: f64) -> f64 {
    c + T_ZERO_C
}

/// Virtual temperature from specific humidity.
///
/// For a temperature `t` in K and a specific humidity `q` in kg/kg, compute
/// the temperature in K that dry air would need in order to have the same
/// density as the moist air at the same pressure.
pub fn t_virt_q(t: f64, q: f64) -> f64 {
    t * (1. + (R_VAPOR / R_AIR - 1.) * q)
}

/// Virtual temperature from relative humidity.
///
/// `t` is the temperature in K, `rh` the relative humidity as a fraction and
/// `p` the total air pressure in Pa. The humidity conversion rejects `rh`
/// values above 5 since those are almost certainly percentages.
pub fn t_virt_rh(t: f64, rh: f64, p: f64) -> Result<f64, MeteoError> {
    let q = humidity::rh2q(rh, t, p)?;
    Ok(t_virt_q(t, q))
}
