//! Broadcasting array front-end over the scalar conversions.
//!
//! Operands are dynamic-dimension views and results are owned arrays.
//! Broadcasting follows the usual numpy rules: shapes align along trailing
//! axes and axes of size 1 stretch; anything else is a
//! [`MeteoError::ShapeMismatch`]. Functions that consume relative humidity
//! screen the whole operand before computing, and the density functions
//! screen the whole result, so errors are all-or-nothing.

use log::debug;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Zip};
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::density;
use crate::error::MeteoError;
use crate::humidity;
use crate::profile;
use crate::temperature;

/// Broadcast shape of two operand shapes.
fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, MeteoError> {
    let ndim = lhs.len().max(rhs.len());
    let mut shape = vec![1; ndim];
    for (i, out) in shape.iter_mut().enumerate() {
        let l = if i + lhs.len() >= ndim { lhs[i + lhs.len() - ndim] } else { 1 };
        let r = if i + rhs.len() >= ndim { rhs[i + rhs.len() - ndim] } else { 1 };
        *out = if l == r || r == 1 {
            l
        } else if l == 1 {
            r
        } else {
            return Err(MeteoError::ShapeMismatch(lhs.to_vec(), rhs.to_vec()));
        };
    }
    Ok(shape)
}

/// Broadcast shape common to all the given operand shapes.
fn common_shape(shapes: &[&[usize]]) -> Result<Vec<usize>, MeteoError> {
    let mut shape = Vec::new();
    for s in shapes {
        shape = broadcast_shape(&shape, s)?;
    }
    Ok(shape)
}

/// View an operand broadcast to the common shape.
fn broadcast_to<'v>(view: &'v ArrayViewD<'_, f64>, shape: &[usize]) -> ArrayViewD<'v, f64> {
    // The unwrap() here is okay since `shape` comes from common_shape() over
    // this view's own shape
    view.broadcast(IxDyn(shape)).unwrap()
}

/// Apply a two-argument scalar function elementwise over broadcast operands.
fn map2(
    a: ArrayViewD<'_, f64>,
    b: ArrayViewD<'_, f64>,
    f: impl Fn(f64, f64) -> f64,
) -> Result<ArrayD<f64>, MeteoError> {
    let shape = common_shape(&[a.shape(), b.shape()])?;
    let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
    Zip::from(&mut out)
        .and(&broadcast_to(&a, &shape))
        .and(&broadcast_to(&b, &shape))
        .for_each(|out, &a, &b| *out = f(a, b));
    Ok(out)
}

/// Apply a three-argument scalar function elementwise over broadcast
/// operands.
fn map3(
    a: ArrayViewD<'_, f64>,
    b: ArrayViewD<'_, f64>,
    c: ArrayViewD<'_, f64>,
    f: impl Fn(f64, f64, f64) -> f64,
) -> Result<ArrayD<f64>, MeteoError> {
    let shape = common_shape(&[a.shape(), b.shape(), c.shape()])?;
    let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
    Zip::from(&mut out)
        .and(&broadcast_to(&a, &shape))
        .and(&broadcast_to(&b, &shape))
        .and(&broadcast_to(&c, &shape))
        .for_each(|out, &a, &b, &c| *out = f(a, b, c));
    Ok(out)
}

/// Reject arrays holding relative humidities that look like percentages.
fn check_rh(rh: &ArrayViewD<'_, f64>) -> Result<(), MeteoError> {
    if rh.iter().any(|&r| r > humidity::MAX_RH) {
        return Err(MeteoError::RelativeHumidityInPercent);
    }
    Ok(())
}

/// Screen a computed density array, failing on real negatives and clamping
/// numerical noise around zero.
fn screen_densities(mut rho: ArrayD<f64>) -> Result<ArrayD<f64>, MeteoError> {
    if rho.iter().any(|&r| r < density::MIN_DENSITY) {
        return Err(MeteoError::NegativeDensity);
    }
    let noise = rho.iter().filter(|&&r| r < 0.).count();
    if noise > 0 {
        debug!("clamping {noise} slightly negative densities to zero");
        rho.mapv_inplace(|r| if r < 0. { 0. } else { r });
    }
    Ok(rho)
}

/// Elementwise [`temperature::kelvin_to_celsius`].
pub fn kelvin_to_celsius(t: ArrayViewD<'_, f64>) -> ArrayD<f64> {
    t.mapv(temperature::kelvin_to_celsius)
}

/// Elementwise [`temperature::celsius_to_kelvin`].
pub fn celsius_to_kelvin(c: ArrayViewD<'_, f64>) -> ArrayD<f64> {
    c.mapv(temperature::celsius_to_kelvin)
}

/// Elementwise [`temperature::t_virt_q`] with broadcasting.
pub fn t_virt_q(t: ArrayViewD<'_, f64>, q: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, MeteoError> {
    map2(t, q, temperature::t_virt_q)
}

/// Elementwise [`temperature::t_virt_rh`] with broadcasting.
pub fn t_virt_rh(
    t: ArrayViewD<'_, f64>,
    rh: ArrayViewD<'_, f64>,
    p: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, MeteoError> {
    check_rh(&rh)?;
    map3(t, rh, p, |t, rh, p| {
        temperature::t_virt_q(t, humidity::rh2q_unchecked(rh, t, p, humidity::e_sat_gg_water))
    })
}

/// Elementwise [`humidity::e_sat_gg_water`].
pub fn e_sat_gg_water(t: ArrayViewD<'_, f64>) -> ArrayD<f64> {
    t.mapv(humidity::e_sat_gg_water)
}

/// Elementwise [`humidity::e_sat_gg_ice`].
pub fn e_sat_gg_ice(t: ArrayViewD<'_, f64>) -> ArrayD<f64> {
    t.mapv(humidity::e_sat_gg_ice)
}

/// Elementwise [`humidity::e2q`] with broadcasting.
pub fn e2q(e: ArrayViewD<'_, f64>, p: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, MeteoError> {
    map2(e, p, humidity::e2q)
}

/// Elementwise [`humidity::q2e`] with broadcasting.
pub fn q2e(q: ArrayViewD<'_, f64>, p: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, MeteoError> {
    map2(q, p, humidity::q2e)
}

/// Elementwise [`humidity::rh2q_with`]; fails if any element of `rh` is
/// above 5.
pub fn rh2q_with(
    rh: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    p: ArrayViewD<'_, f64>,
    e_sat: impl Fn(f64) -> f64,
) -> Result<ArrayD<f64>, MeteoError> {
    check_rh(&rh)?;
    map3(rh, t, p, |rh, t, p| humidity::rh2q_unchecked(rh, t, p, &e_sat))
}

/// Elementwise [`humidity::rh2q`] with broadcasting.
pub fn rh2q(
    rh: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    p: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, MeteoError> {
    rh2q_with(rh, t, p, humidity::e_sat_gg_water)
}

/// Elementwise [`humidity::rh2a_with`]; fails if any element of `rh` is
/// above 5.
pub fn rh2a_with(
    rh: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    e_sat: impl Fn(f64) -> f64,
) -> Result<ArrayD<f64>, MeteoError> {
    check_rh(&rh)?;
    map2(rh, t, |rh, t| humidity::rh2a_unchecked(rh, t, &e_sat))
}

/// Elementwise [`humidity::rh2a`] with broadcasting.
pub fn rh2a(rh: ArrayViewD<'_, f64>, t: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, MeteoError> {
    rh2a_with(rh, t, humidity::e_sat_gg_water)
}

/// Elementwise [`humidity::a2rh_with`].
pub fn a2rh_with(
    a: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    e_sat: impl Fn(f64) -> f64,
) -> Result<ArrayD<f64>, MeteoError> {
    map2(a, t, |a, t| humidity::a2rh_with(a, t, &e_sat))
}

/// Elementwise [`humidity::a2rh`] with broadcasting.
pub fn a2rh(a: ArrayViewD<'_, f64>, t: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, MeteoError> {
    a2rh_with(a, t, humidity::e_sat_gg_water)
}

/// Elementwise [`humidity::q2rh_with`].
pub fn q2rh_with(
    q: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    p: ArrayViewD<'_, f64>,
    e_sat: impl Fn(f64) -> f64,
) -> Result<ArrayD<f64>, MeteoError> {
    map3(q, t, p, |q, t, p| humidity::q2rh_with(q, t, p, &e_sat))
}

/// Elementwise [`humidity::q2rh`] with broadcasting.
pub fn q2rh(
    q: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    p: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, MeteoError> {
    q2rh_with(q, t, p, humidity::e_sat_gg_water)
}

/// Moist air density from specific humidity, with broadcasting.
///
/// `qm` holds zero or more extra mass-loading species that co-broadcast with
/// the base operands; negative entries clamp to zero before summation, like
/// in [`density::moist_rho_q`]. Any resulting density below the noise bound
/// fails the whole call; densities inside the noise window clamp to zero.
pub fn moist_rho_q(
    p: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    q: ArrayViewD<'_, f64>,
    qm: &[ArrayViewD<'_, f64>],
) -> Result<ArrayD<f64>, MeteoError> {
    let mut shapes: Vec<&[usize]> = vec![p.shape(), t.shape(), q.shape()];
    shapes.extend(qm.iter().map(|m| m.shape()));
    let shape = common_shape(&shapes)?;

    // Total mass loading, with negative sentinel entries counting as zero
    let mut qm_total = ArrayD::<f64>::zeros(IxDyn(&shape));
    for m in qm {
        Zip::from(&mut qm_total)
            .and(&broadcast_to(m, &shape))
            .for_each(|tot, &m| *tot += m.max(0.));
    }

    let mut rho = ArrayD::<f64>::zeros(IxDyn(&shape));
    Zip::from(&mut rho)
        .and(&broadcast_to(&p, &shape))
        .and(&broadcast_to(&t, &shape))
        .and(&broadcast_to(&q, &shape))
        .and(&qm_total)
        .for_each(|rho, &p, &t, &q, &qm_total| {
            *rho = density::raw_density(p, t, q, qm_total);
        });
    screen_densities(rho)
}

/// Moist air density from relative humidity, with broadcasting.
///
/// Converts through [`rh2q`] (inheriting the percentage guard) and delegates
/// to [`moist_rho_q`] with the same species sequence.
pub fn moist_rho_rh(
    p: ArrayViewD<'_, f64>,
    t: ArrayViewD<'_, f64>,
    rh: ArrayViewD<'_, f64>,
    qm: &[ArrayViewD<'_, f64>],
) -> Result<ArrayD<f64>, MeteoError> {
    let q = rh2q(rh, t.view(), p.view())?;
    moist_rho_q(p, t, q.view(), qm)
}

/// Integrated water vapor over the last axis.
///
/// The four operands co-broadcast, the last axis of the broadcast shape is
/// the vertical level axis (at least two levels), and every lane along it is
/// one profile integrated with [`profile::rh_to_iwv`]. Profiles are
/// independent, so they run in parallel. The result drops the level axis: a
/// batch of shape `(n, levels)` comes back as `n` totals, a single profile
/// as a 0-d array.
pub fn rh_to_iwv(
    relhum_lev: ArrayViewD<'_, f64>,
    temp_lev: ArrayViewD<'_, f64>,
    press_lev: ArrayViewD<'_, f64>,
    hgt_lev: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, MeteoError> {
    let shape = common_shape(&[
        relhum_lev.shape(),
        temp_lev.shape(),
        press_lev.shape(),
        hgt_lev.shape(),
    ])?;
    match shape.last() {
        Some(&levels) if levels >= 2 => {}
        _ => return Err(MeteoError::InconsistentInputs),
    }

    let rh = broadcast_to(&relhum_lev, &shape);
    let t = broadcast_to(&temp_lev, &shape);
    let p = broadcast_to(&press_lev, &shape);
    let z = broadcast_to(&hgt_lev, &shape);

    let axis = Axis(shape.len() - 1);
    let rh_lanes: Vec<_> = rh.lanes(axis).into_iter().collect();
    let t_lanes: Vec<_> = t.lanes(axis).into_iter().collect();
    let p_lanes: Vec<_> = p.lanes(axis).into_iter().collect();
    let z_lanes: Vec<_> = z.lanes(axis).into_iter().collect();

    let iwv = (0..rh_lanes.len())
        .into_par_iter()
        .map(|lane| {
            // Broadcast lanes aren't contiguous in general, so gather each
            // one; profiles rarely have more than a few dozen levels
            let rh: SmallVec<[f64; 64]> = rh_lanes[lane].iter().copied().collect();
            let t: SmallVec<[f64; 64]> = t_lanes[lane].iter().copied().collect();
            let p: SmallVec<[f64; 64]> = p_lanes[lane].iter().copied().collect();
            let z: SmallVec<[f64; 64]> = z_lanes[lane].iter().copied().collect();
            profile::rh_to_iwv(&rh, &t, &p, &z)
        })
        .collect::<Result<Vec<_>, _>>()?;

    // The unwrap() here is okay since the lane count always matches the
    // reduced shape
    Ok(ArrayD::from_shape_vec(IxDyn(&shape[..shape.len() - 1]), iwv).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr0, arr1, arr2};

    #[test]
    fn unary_conversions_keep_the_shape() {
        let t = arr2(&[[273.15, 293.15], [233.15, 300.]]).into_dyn();
        let c = kelvin_to_celsius(t.view());
        assert_eq!(c.shape(), &[2, 2]);
        for (&c, &t) in c.iter().zip(t.iter()) {
            assert_relative_eq!(c, t - 273.15);
        }

        let e = e_sat_gg_water(arr0(273.15).into_dyn().view());
        assert_eq!(e.shape(), &[] as &[usize]);
        assert_relative_eq!(*e.first().unwrap(), 611.2, max_relative = 1e-12);
    }

    #[test]
    fn scalars_broadcast_against_arrays() {
        let rh = arr1(&[0.3, 0.5, 0.7]).into_dyn();
        let t = arr0(280.).into_dyn();
        let p = arr0(101_325.).into_dyn();

        let q = rh2q(rh.view(), t.view(), p.view()).unwrap();
        assert_eq!(q.shape(), &[3]);
        for (&q, &rh) in q.iter().zip(rh.iter()) {
            assert_relative_eq!(q, humidity::rh2q(rh, 280., 101_325.).unwrap());
        }
    }

    #[test]
    fn trailing_axes_align() {
        let t = arr2(&[[280.], [300.]]).into_dyn();
        let q = arr1(&[0., 0.005, 0.01]).into_dyn();

        let tv = t_virt_q(t.view(), q.view()).unwrap();
        assert_eq!(tv.shape(), &[2, 3]);
        assert_relative_eq!(tv[[0, 0]], temperature::t_virt_q(280., 0.));
        assert_relative_eq!(tv[[0, 2]], temperature::t_virt_q(280., 0.01));
        assert_relative_eq!(tv[[1, 1]], temperature::t_virt_q(300., 0.005));
    }

    #[test]
    fn incompatible_shapes_are_reported() {
        let e = arr1(&[1000., 2000.]).into_dyn();
        let p = arr1(&[101_325., 95_000., 90_000.]).into_dyn();
        match e2q(e.view(), p.view()) {
            Err(MeteoError::ShapeMismatch(lhs, rhs)) => {
                assert_eq!(lhs, vec![2]);
                assert_eq!(rhs, vec![3]);
            }
            other => panic!("expected a shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn percent_guard_screens_every_element() {
        let rh = arr1(&[0.5, 6.]).into_dyn();
        let t = arr0(280.).into_dyn();
        let p = arr0(101_325.).into_dyn();
        assert!(matches!(
            rh2q(rh.view(), t.view(), p.view()),
            Err(MeteoError::RelativeHumidityInPercent)
        ));
    }

    #[test]
    fn virtual_temperature_matches_scalar_composition() {
        let t = arr1(&[280., 290., 300.]).into_dyn();
        let rh = arr0(0.6).into_dyn();
        let p = arr0(101_325.).into_dyn();

        let tv = t_virt_rh(t.view(), rh.view(), p.view()).unwrap();
        for (&tv, &t) in tv.iter().zip(t.iter()) {
            assert_relative_eq!(tv, temperature::t_virt_rh(t, 0.6, 101_325.).unwrap());
        }
    }

    #[test]
    fn q2rh_inverts_rh2q_elementwise() {
        let rh = arr1(&[0.1, 0.5, 1.2]).into_dyn();
        let t = arr0(290.).into_dyn();
        let p = arr0(101_325.).into_dyn();

        let q = rh2q(rh.view(), t.view(), p.view()).unwrap();
        let back = q2rh(q.view(), t.view(), p.view()).unwrap();
        for (&back, &rh) in back.iter().zip(rh.iter()) {
            assert_relative_eq!(back, rh, max_relative = 1e-12);
        }
    }

    #[test]
    fn species_broadcast_and_clamp() {
        let p = arr1(&[101_325., 95_000.]).into_dyn();
        let t = arr0(280.).into_dyn();
        let q = arr0(0.01).into_dyn();
        let sentinel = arr0(-0.5).into_dyn();
        let cloud = arr1(&[0.001, 0.002]).into_dyn();

        let rho = moist_rho_q(
            p.view(),
            t.view(),
            q.view(),
            &[sentinel.view(), cloud.view()],
        )
        .unwrap();
        assert_eq!(rho.shape(), &[2]);
        for ((&rho, &p), &cloud) in rho.iter().zip(p.iter()).zip(cloud.iter()) {
            let expected = density::moist_rho_q(p, 280., 0.01, &[-0.5, cloud]).unwrap();
            assert_relative_eq!(rho, expected, max_relative = 1e-15);
        }
    }

    #[test]
    fn one_bad_density_fails_the_whole_call() {
        let p = arr0(101_325.).into_dyn();
        let t = arr0(280.).into_dyn();
        let q = arr0(0.).into_dyn();
        let qm = arr1(&[0., 2.]).into_dyn();
        assert!(matches!(
            moist_rho_q(p.view(), t.view(), q.view(), &[qm.view()]),
            Err(MeteoError::NegativeDensity)
        ));
    }

    #[test]
    fn noise_densities_clamp_to_zero() {
        let p = arr1(&[101_325., 101_325.]).into_dyn();
        let t = arr0(280.).into_dyn();
        let q = arr0(0.).into_dyn();
        let qm = arr0(1300.).into_dyn();
        let rho = moist_rho_q(p.view(), t.view(), q.view(), &[qm.view()]).unwrap();
        assert!(rho.iter().all(|&r| r == 0.));
    }

    #[test]
    fn rh_density_variant_matches_composed_path() {
        let p = arr1(&[101_325., 95_000.]).into_dyn();
        let t = arr0(285.).into_dyn();
        let rh = arr0(0.6).into_dyn();

        let via_rh = moist_rho_rh(p.view(), t.view(), rh.view(), &[]).unwrap();
        let q = rh2q(rh.view(), t.view(), p.view()).unwrap();
        let via_q = moist_rho_q(p.view(), t.view(), q.view(), &[]).unwrap();
        assert_eq!(via_rh, via_q);
    }

    #[test]
    fn iwv_batch_matches_per_profile_integration() {
        // Two profiles share the same coordinates through broadcasting
        let rh = arr2(&[[0.7, 0.6, 0.5], [0.3, 0.3, 0.3]]).into_dyn();
        let t = arr1(&[290., 285., 278.]).into_dyn();
        let p = arr1(&[101_325., 92_000., 80_000.]).into_dyn();
        let z = arr1(&[0., 800., 2000.]).into_dyn();

        let iwv = rh_to_iwv(rh.view(), t.view(), p.view(), z.view()).unwrap();
        assert_eq!(iwv.shape(), &[2]);

        let t_s = [290., 285., 278.];
        let p_s = [101_325., 92_000., 80_000.];
        let z_s = [0., 800., 2000.];
        let rows = [[0.7, 0.6, 0.5], [0.3, 0.3, 0.3]];
        for (&iwv, row) in iwv.iter().zip(rows.iter()) {
            let expected = profile::rh_to_iwv(row, &t_s, &p_s, &z_s).unwrap();
            assert_relative_eq!(iwv, expected);
        }
    }

    #[test]
    fn iwv_single_profile_drops_to_a_scalar() {
        let rh = arr1(&[0.5, 0.5]).into_dyn();
        let t = arr1(&[280., 280.]).into_dyn();
        let p = arr1(&[100_000., 100_000.]).into_dyn();
        let z = arr1(&[0., 1000.]).into_dyn();

        let iwv = rh_to_iwv(rh.view(), t.view(), p.view(), z.view()).unwrap();
        assert_eq!(iwv.shape(), &[] as &[usize]);
        let expected =
            profile::rh_to_iwv(&[0.5, 0.5], &[280., 280.], &[100_000., 100_000.], &[0., 1000.])
                .unwrap();
        assert_relative_eq!(*iwv.first().unwrap(), expected);
    }

    #[test]
    fn iwv_needs_a_level_axis() {
        let scalar = arr0(0.5).into_dyn();
        assert!(matches!(
            rh_to_iwv(scalar.view(), scalar.view(), scalar.view(), scalar.view()),
            Err(MeteoError::InconsistentInputs)
        ));

        let single = arr1(&[0.5]).into_dyn();
        assert!(matches!(
            rh_to_iwv(single.view(), single.view(), single.view(), single.view()),
            Err(MeteoError::InconsistentInputs)
        ));
    }
}
