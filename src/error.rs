/// Possible errors from the conversion functions.
#[derive(Debug)]
pub enum MeteoError {
    /// A relative humidity is larger than 5, so it's almost certainly a
    /// percentage instead of a fraction
    RelativeHumidityInPercent,
    /// A computed air density is negative beyond numerical noise
    NegativeDensity,
    /// The profile inputs don't have the expected shape(s)
    InconsistentInputs,
    /// Two array shapes can't be broadcast against each other
    ShapeMismatch(Vec<usize>, Vec<usize>),
}

impl std::fmt::Display for MeteoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeteoError::RelativeHumidityInPercent => {
                write!(f, "rh must not be in %")
            }
            MeteoError::NegativeDensity => {
                write!(f, "calculated negative densities")
            }
            MeteoError::InconsistentInputs => {
                write!(f, "profile inputs have the wrong shape")
            }
            MeteoError::ShapeMismatch(lhs, rhs) => {
                write!(f, "shapes {lhs:?} and {rhs:?} cannot be broadcast together")
            }
        }
    }
}

impl std::error::Error for MeteoError {}
