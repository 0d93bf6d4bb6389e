//! Meteorological conversion formulas in SI units.
//!
//! Moist air density, humidity conversions, saturation vapor pressure,
//! virtual temperature, and integrated water vapor. The formula modules
//! ([`temperature`], [`humidity`], [`density`], [`profile`]) work on plain
//! `f64` values and slices; [`arrays`] wraps them with numpy-style
//! broadcasting over `ndarray` views.
//!
//! All quantities are SI: pressures in Pa, temperatures in K, specific
//! humidities in kg/kg, and relative humidities as fractions, never
//! percentages.
//!
//! The `python` feature adds a CPython extension module exposing the same
//! functions; `pyo3` is only used there.

pub mod arrays;
pub mod constants;
pub mod density;
pub mod error;
pub mod humidity;
pub mod profile;
pub mod temperature;

#[cfg(feature = "python")]
mod python;

pub use error::MeteoError;
