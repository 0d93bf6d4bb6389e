//! Python interface for the conversion functions.
//!
//! NOTE: this module is the interface between Rust and Python. The real work
//! happens in the other modules, and they do not use `pyo3`, it's only used
//! here.
//!
//! Every function takes numpy arrays of any rank (scalars arrive as 0-d
//! arrays) and returns numpy arrays. The `over_ice` keyword selects the ice
//! saturation curve where the Rust API takes a saturation-curve strategy;
//! arbitrary Python callables are not accepted across the boundary.

use ndarray::ArrayViewD;
use numpy::{IntoPyArray, PyArrayDyn, PyReadonlyArrayDyn};
use pyo3::prelude::*;
use pyo3::types::PyTuple;

use crate::arrays;
use crate::error::MeteoError;
use crate::humidity;

impl From<MeteoError> for PyErr {
    fn from(e: MeteoError) -> Self {
        use pyo3::exceptions::PyValueError;

        PyValueError::new_err(e.to_string())
    }
}

/// Extract the star-args mass-loading species as readonly arrays.
fn species(qm: &PyTuple) -> PyResult<Vec<PyReadonlyArrayDyn<'_, f64>>> {
    qm.iter()
        .map(|m| m.extract::<PyReadonlyArrayDyn<f64>>())
        .collect()
}

/// Convert temperatures in K to °C.
#[pyfunction]
fn kelvin_to_celsius<'py>(py: Python<'py>, t: PyReadonlyArrayDyn<f64>) -> &'py PyArrayDyn<f64> {
    arrays::kelvin_to_celsius(t.as_array()).into_pyarray(py)
}

/// Convert temperatures in °C to K.
#[pyfunction]
fn celsius_to_kelvin<'py>(py: Python<'py>, c: PyReadonlyArrayDyn<f64>) -> &'py PyArrayDyn<f64> {
    arrays::celsius_to_kelvin(c.as_array()).into_pyarray(py)
}

/// Virtual temperature from specific humidity.
#[pyfunction]
fn t_virt_q<'py>(
    py: Python<'py>,
    t: PyReadonlyArrayDyn<f64>,
    q: PyReadonlyArrayDyn<f64>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let tv = arrays::t_virt_q(t.as_array(), q.as_array())?;
    Ok(tv.into_pyarray(py))
}

/// Virtual temperature from relative humidity.
#[pyfunction]
fn t_virt_rh<'py>(
    py: Python<'py>,
    t: PyReadonlyArrayDyn<f64>,
    rh: PyReadonlyArrayDyn<f64>,
    p: PyReadonlyArrayDyn<f64>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let tv = arrays::t_virt_rh(t.as_array(), rh.as_array(), p.as_array())?;
    Ok(tv.into_pyarray(py))
}

/// Saturation vapor pressure over liquid water, CIMO Guide (WMO 2008).
#[pyfunction]
fn e_sat_gg_water<'py>(py: Python<'py>, t: PyReadonlyArrayDyn<f64>) -> &'py PyArrayDyn<f64> {
    arrays::e_sat_gg_water(t.as_array()).into_pyarray(py)
}

/// Saturation vapor pressure over ice, CIMO Guide (WMO 2008).
#[pyfunction]
fn e_sat_gg_ice<'py>(py: Python<'py>, t: PyReadonlyArrayDyn<f64>) -> &'py PyArrayDyn<f64> {
    arrays::e_sat_gg_ice(t.as_array()).into_pyarray(py)
}

/// Specific humidity from vapor pressure and total pressure.
#[pyfunction]
fn e2q<'py>(
    py: Python<'py>,
    e: PyReadonlyArrayDyn<f64>,
    p: PyReadonlyArrayDyn<f64>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let q = arrays::e2q(e.as_array(), p.as_array())?;
    Ok(q.into_pyarray(py))
}

/// Vapor pressure from specific humidity and total pressure.
#[pyfunction]
fn q2e<'py>(
    py: Python<'py>,
    q: PyReadonlyArrayDyn<f64>,
    p: PyReadonlyArrayDyn<f64>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let e = arrays::q2e(q.as_array(), p.as_array())?;
    Ok(e.into_pyarray(py))
}

/// Specific humidity from relative humidity.
#[pyfunction]
#[pyo3(signature = (rh, t, p, over_ice = false))]
fn rh2q<'py>(
    py: Python<'py>,
    rh: PyReadonlyArrayDyn<f64>,
    t: PyReadonlyArrayDyn<f64>,
    p: PyReadonlyArrayDyn<f64>,
    over_ice: bool,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let q = if over_ice {
        arrays::rh2q_with(rh.as_array(), t.as_array(), p.as_array(), humidity::e_sat_gg_ice)?
    } else {
        arrays::rh2q(rh.as_array(), t.as_array(), p.as_array())?
    };
    Ok(q.into_pyarray(py))
}

/// Absolute humidity from relative humidity.
#[pyfunction]
#[pyo3(signature = (rh, t, over_ice = false))]
fn rh2a<'py>(
    py: Python<'py>,
    rh: PyReadonlyArrayDyn<f64>,
    t: PyReadonlyArrayDyn<f64>,
    over_ice: bool,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let a = if over_ice {
        arrays::rh2a_with(rh.as_array(), t.as_array(), humidity::e_sat_gg_ice)?
    } else {
        arrays::rh2a(rh.as_array(), t.as_array())?
    };
    Ok(a.into_pyarray(py))
}

/// Relative humidity from absolute humidity.
#[pyfunction]
#[pyo3(signature = (a, t, over_ice = false))]
fn a2rh<'py>(
    py: Python<'py>,
    a: PyReadonlyArrayDyn<f64>,
    t: PyReadonlyArrayDyn<f64>,
    over_ice: bool,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let rh = if over_ice {
        arrays::a2rh_with(a.as_array(), t.as_array(), humidity::e_sat_gg_ice)?
    } else {
        arrays::a2rh(a.as_array(), t.as_array())?
    };
    Ok(rh.into_pyarray(py))
}

/// Relative humidity from specific humidity.
#[pyfunction]
#[pyo3(signature = (q, t, p, over_ice = false))]
fn q2rh<'py>(
    py: Python<'py>,
    q: PyReadonlyArrayDyn<f64>,
    t: PyReadonlyArrayDyn<f64>,
    p: PyReadonlyArrayDyn<f64>,
    over_ice: bool,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let rh = if over_ice {
        arrays::q2rh_with(q.as_array(), t.as_array(), p.as_array(), humidity::e_sat_gg_ice)?
    } else {
        arrays::q2rh(q.as_array(), t.as_array(), p.as_array())?
    };
    Ok(rh.into_pyarray(py))
}

/// Moist air density from specific humidity, plus any number of extra
/// mass-loading species arrays.
#[pyfunction]
#[pyo3(signature = (p, t, q, *qm))]
fn moist_rho_q<'py>(
    py: Python<'py>,
    p: PyReadonlyArrayDyn<f64>,
    t: PyReadonlyArrayDyn<f64>,
    q: PyReadonlyArrayDyn<f64>,
    qm: &PyTuple,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let qm = species(qm)?;
    let qm: Vec<ArrayViewD<f64>> = qm.iter().map(|m| m.as_array()).collect();
    let rho = arrays::moist_rho_q(p.as_array(), t.as_array(), q.as_array(), &qm)?;
    Ok(rho.into_pyarray(py))
}

/// Moist air density from relative humidity, plus any number of extra
/// mass-loading species arrays.
#[pyfunction]
#[pyo3(signature = (p, t, rh, *qm))]
fn moist_rho_rh<'py>(
    py: Python<'py>,
    p: PyReadonlyArrayDyn<f64>,
    t: PyReadonlyArrayDyn<f64>,
    rh: PyReadonlyArrayDyn<f64>,
    qm: &PyTuple,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let qm = species(qm)?;
    let qm: Vec<ArrayViewD<f64>> = qm.iter().map(|m| m.as_array()).collect();
    let rho = arrays::moist_rho_rh(p.as_array(), t.as_array(), rh.as_array(), &qm)?;
    Ok(rho.into_pyarray(py))
}

/// Integrated water vapor over the last axis of the profile arrays.
#[pyfunction]
fn rh_to_iwv<'py>(
    py: Python<'py>,
    relhum_lev: PyReadonlyArrayDyn<f64>,
    temp_lev: PyReadonlyArrayDyn<f64>,
    press_lev: PyReadonlyArrayDyn<f64>,
    hgt_lev: PyReadonlyArrayDyn<f64>,
) -> PyResult<&'py PyArrayDyn<f64>> {
    let iwv = arrays::rh_to_iwv(
        relhum_lev.as_array(),
        temp_lev.as_array(),
        press_lev.as_array(),
        hgt_lev.as_array(),
    )?;
    Ok(iwv.into_pyarray(py))
}

/// A Python module implemented in Rust.
#[pymodule]
fn meteo_si(_py: Python, m: &PyModule) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(kelvin_to_celsius, m)?)?;
    m.add_function(wrap_pyfunction!(celsius_to_kelvin, m)?)?;
    m.add_function(wrap_pyfunction!(t_virt_q, m)?)?;
    m.add_function(wrap_pyfunction!(t_virt_rh, m)?)?;
    m.add_function(wrap_pyfunction!(e_sat_gg_water, m)?)?;
    m.add_function(wrap_pyfunction!(e_sat_gg_ice, m)?)?;
    m.add_function(wrap_pyfunction!(e2q, m)?)?;
    m.add_function(wrap_pyfunction!(q2e, m)?)?;
    m.add_function(wrap_pyfunction!(rh2q, m)?)?;
    m.add_function(wrap_pyfunction!(rh2a, m)?)?;
    m.add_function(wrap_pyfunction!(a2rh, m)?)?;
    m.add_function(wrap_pyfunction!(q2rh, m)?)?;
    m.add_function(wrap_pyfunction!(moist_rho_q, m)?)?;
    m.add_function(wrap_pyfunction!(moist_rho_rh, m)?)?;
    m.add_function(wrap_pyfunction!(rh_to_iwv, m)?)?;
    Ok(())
}
