//! Humidity conversions between vapor pressure, specific, relative, and
//! absolute humidity.
//!
//! All temperatures are in K, pressures in Pa, specific humidities in kg/kg,
//! absolute humidities in kg/m^3, and relative humidities are fractions, not
//! percentages. Functions that consume a relative humidity reject values
//! above 5 since those are almost certainly percentages.

use crate::constants::{MW_RATIO, R_VAPOR};
use crate::error::MeteoError;
use crate::temperature::kelvin_to_celsius;

/// Largest relative humidity accepted as a fraction.
///
/// Fractional relative humidities rarely exceed 1 to 2 physically, so
/// anything above this bound is treated as a percentage passed by mistake.
pub(crate) const MAX_RH: f64 = 5.;

/// Reject relative humidities that look like percentages.
pub(crate) fn check_rh(rh: f64) -> Result<(), MeteoError> {
    if rh > MAX_RH {
        return Err(MeteoError::RelativeHumidityInPercent);
    }
    Ok(())
}

/// Saturation vapor pressure over liquid water.
///
/// For a temperature `t` in K, compute the saturation pressure in Pa after
/// the CIMO Guide (WMO 2008). The formula silently extrapolates outside the
/// typical atmospheric temperature range.
pub fn e_sat_gg_water(t: f64) -> f64 {
    let tc = kelvin_to_celsius(t);
    100. * 6.112 * f64::exp(17.62 * tc / (243.12 + tc))
}

/// Saturation vapor pressure over ice.
///
/// For a temperature `t` in K, compute the saturation pressure in Pa after
/// the CIMO Guide (WMO 2008).
pub fn e_sat_gg_ice(t: f64) -> f64 {
    let tc = kelvin_to_celsius(t);
    100. * 6.112 * f64::exp(22.46 * tc / (272.62 + tc))
}

/// Specific humidity from vapor pressure.
///
/// `e` is the water vapor pressure in Pa and `p` the total air pressure in
/// Pa. Exact inverse of [`q2e`] for the same `p`.
pub fn e2q(e: f64, p: f64) -> f64 {
    MW_RATIO * e / (p - (1. - MW_RATIO) * e)
}

/// Vapor pressure from specific humidity.
///
/// `q` is the specific humidity in kg/kg and `p` the total air pressure in
/// Pa. A `q` of zero divides by zero; with IEEE arithmetic the result comes
/// back as 0 through an infinite intermediate, and it is the caller's job to
/// keep degenerate inputs out.
pub fn q2e(q: f64, p: f64) -> f64 {
    p / ((MW_RATIO / q) + 1. - MW_RATIO)
}

/// [`rh2q_with`] without the percentage guard, for callers that have already
/// screened the whole input.
pub(crate) fn rh2q_unchecked(rh: f64, t: f64, p: f64, e_sat: impl Fn(f64) -> f64) -> f64 {
    e2q(rh * e_sat(t), p)
}

/// Specific humidity from relative humidity, with a caller-chosen
/// saturation curve.
///
/// See [`rh2q`]; `e_sat` maps a temperature in K to a saturation pressure in
/// Pa, usually [`e_sat_gg_water`] or [`e_sat_gg_ice`].
pub fn rh2q_with(rh: f64, t: f64, p: f64, e_sat: impl Fn(f64) -> f64) -> Result<f64, MeteoError> {
    check_rh(rh)?;
    Ok(rh2q_unchecked(rh, t, p, e_sat))
}

/// Specific humidity from relative humidity.
///
/// `rh` is the relative humidity as a fraction, `t` the temperature in K and
/// `p` the total air pressure in Pa. Uses the liquid-water saturation curve.
pub fn rh2q(rh: f64, t: f64, p: f64) -> Result<f64, MeteoError> {
    rh2q_with(rh, t, p, e_sat_gg_water)
}

/// [`rh2a_with`] without the percentage guard.
pub(crate) fn rh2a_unchecked(rh: f64, t: f64, e_sat: impl Fn(f64) -> f64) -> f64 {
    rh * e_sat(t) / (R_VAPOR * t)
}

/// Absolute humidity from relative humidity, with a caller-chosen saturation
/// curve.
pub fn rh2a_with(rh: f64, t: f64, e_sat: impl Fn(f64) -> f64) -> Result<f64, MeteoError> {
    check_rh(rh)?;
    Ok(rh2a_unchecked(rh, t, e_sat))
}

/// Absolute humidity from relative humidity.
///
/// `rh` is the relative humidity as a fraction and `t` the temperature in K;
/// the result is the water vapor density in kg/m^3.
pub fn rh2a(rh: f64, t: f64) -> Result<f64, MeteoError> {
    rh2a_with(rh, t, e_sat_gg_water)
}

/// Relative humidity from absolute humidity, with a caller-chosen saturation
/// curve.
pub fn a2rh_with(a: f64, t: f64, e_sat: impl Fn(f64) -> f64) -> f64 {
    a * R_VAPOR * t / e_sat(t)
}

/// Relative humidity from absolute humidity.
///
/// `a` is the water vapor density in kg/m^3 and `t` the temperature in K.
/// Inverse of [`rh2a`]. The relative humidity is an output here, so there is
/// no percentage guard.
pub fn a2rh(a: f64, t: f64) -> f64 {
    a2rh_with(a, t, e_sat_gg_water)
}

/// Relative humidity from specific humidity, with a caller-chosen saturation
/// curve.
pub fn q2rh_with(q: f64, t: f64, p: f64, e_sat: impl Fn(f64) -> f64) -> f64 {
    let e = p / (MW_RATIO * ((1. / q) + (1. / MW_RATIO - 1.)));
    e / e_sat(t)
}

/// Relative humidity from specific humidity.
///
/// `q` is the specific humidity in kg/kg, `t` the temperature in K and `p`
/// the total air pressure in Pa. Like [`q2e`], a `q` of zero is passed
/// through IEEE division rather than trapped.
pub fn q2rh(q: f64, t: f64, p: f64) -> f64 {
    q2rh_with(q, t, p, e_sat_gg_water)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn saturation_pressure_water() {
        // At 0 °C the exponent is zero, so the result is exactly the leading
        // coefficient
        assert_relative_eq!(e_sat_gg_water(273.15), 611.2, max_relative = 1e-12);
        assert_relative_eq!(e_sat_gg_water(293.15), 2332.6, epsilon = 1.);
        assert_relative_eq!(e_sat_gg_water(263.15), 287.0, epsilon = 0.5);
    }

    #[test]
    fn saturation_pressure_ice() {
        assert_relative_eq!(e_sat_gg_ice(273.15), 611.2, max_relative = 1e-12);
        assert_relative_eq!(e_sat_gg_ice(263.15), 259.9, epsilon = 0.5);
    }

    #[test]
    fn ice_saturation_below_water_saturation() {
        // Below freezing the ice curve must lie under the water curve
        for t in [233.15, 253.15, 263.15, 272.15] {
            assert!(e_sat_gg_ice(t) < e_sat_gg_water(t));
        }
    }

    #[test]
    fn vapor_pressure_specific_humidity_round_trip() {
        for q in [1e-6, 1e-3, 0.01, 0.1, 0.5, 0.99] {
            for p in [50_000., 101_325.] {
                assert_relative_eq!(e2q(q2e(q, p), p), q, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn vapor_pressure_from_zero_specific_humidity() {
        // Divides by zero internally; IEEE arithmetic turns the infinite
        // denominator into a zero vapor pressure
        assert_eq!(q2e(0., 101325.), 0.);
    }

    #[test]
    fn specific_humidity_from_vapor_pressure() {
        assert_relative_eq!(e2q(2000., 101325.), 0.0123696, max_relative = 1e-5);
        assert_eq!(e2q(0., 101325.), 0.);
    }

    #[test]
    fn rh2q_rejects_percentages() {
        assert!(matches!(
            rh2q(6., 280., 101325.),
            Err(MeteoError::RelativeHumidityInPercent)
        ));
        assert!(rh2q(0.5, 280., 101325.).is_ok());
    }

    #[test]
    fn rh2q_q2rh_round_trip() {
        for rh in [0.05, 0.5, 0.75, 1., 1.5] {
            let q = rh2q(rh, 300., 101325.).unwrap();
            assert_relative_eq!(q2rh(q, 300., 101325.), rh, max_relative = 1e-12);
        }
    }

    #[test]
    fn rh2q_ice_curve_gives_smaller_q() {
        // The same rh saturates against a lower pressure over ice, so the
        // water-curve q is larger
        let q_water = rh2q_with(0.8, 263.15, 101325., e_sat_gg_water).unwrap();
        let q_ice = rh2q_with(0.8, 263.15, 101325., e_sat_gg_ice).unwrap();
        assert!(q_ice < q_water);
    }

    #[test]
    fn rh2q_typical_surface_conditions() {
        let q = rh2q(0.75, 300., 101325.).unwrap();
        assert!(q > 0.015 && q < 0.018, "q = {q}");
    }

    #[test]
    fn absolute_humidity_round_trip() {
        for rh in [0., 0.3, 1., 2.] {
            let a = rh2a(rh, 290.).unwrap();
            assert_relative_eq!(a2rh(a, 290.), rh, max_relative = 1e-12);
        }
    }

    #[test]
    fn absolute_humidity_guards_like_rh2q() {
        assert!(matches!(
            rh2a(80., 290.),
            Err(MeteoError::RelativeHumidityInPercent)
        ));
        // a2rh takes rh as output, so even unphysical inputs pass
        assert!(a2rh(50., 290.).is_finite());
    }
}
