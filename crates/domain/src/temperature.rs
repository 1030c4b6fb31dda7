//! Unit-safe temperature value with bounds checking.
//!
//! Stored internally in Celsius. Conversion to and from Fahrenheit is the
//! exact affine transform, so round-trips lose nothing beyond floating-point
//! rounding — which is why comparisons go through [`EPSILON`].

use crate::error::ValidationError;

/// Lower bound of the appliance's safe operating envelope, inclusive.
pub const SAFE_MIN_C: f64 = -50.0;
/// Upper bound of the appliance's safe operating envelope, inclusive.
pub const SAFE_MAX_C: f64 = 500.0;

/// Lower bound of the probe-specific safe range, inclusive.
pub const PROBE_MIN_C: f64 = 0.0;
/// Upper bound of the probe-specific safe range, inclusive.
pub const PROBE_MAX_C: f64 = 100.0;

/// Comparison tolerance absorbing C↔F conversion rounding.
pub const EPSILON: f64 = 1e-6;

/// Temperature unit for user-facing input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Unit {
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

/// An immutable temperature inside the appliance's safe envelope.
#[derive(Debug, Clone, Copy)]
pub struct Temperature {
    celsius: f64,
}

impl Temperature {
    /// Build from a Celsius reading.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TemperatureOutOfRange`] when the value is
    /// outside [`SAFE_MIN_C`]..=[`SAFE_MAX_C`].
    pub fn from_celsius(celsius: f64) -> Result<Self, ValidationError> {
        if !celsius.is_finite() || celsius < SAFE_MIN_C || celsius > SAFE_MAX_C {
            return Err(ValidationError::TemperatureOutOfRange {
                celsius,
                min: SAFE_MIN_C,
                max: SAFE_MAX_C,
            });
        }
        Ok(Self { celsius })
    }

    /// Build from a Fahrenheit reading.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TemperatureOutOfRange`] when the resulting
    /// Celsius value falls outside the safe envelope.
    pub fn from_fahrenheit(fahrenheit: f64) -> Result<Self, ValidationError> {
        Self::from_celsius((fahrenheit - 32.0) * 5.0 / 9.0)
    }

    /// Build from a value in the given unit.
    pub fn from_value(value: f64, unit: Unit) -> Result<Self, ValidationError> {
        match unit {
            Unit::Celsius => Self::from_celsius(value),
            Unit::Fahrenheit => Self::from_fahrenheit(value),
        }
    }

    /// The Celsius reading.
    #[must_use]
    pub fn celsius(self) -> f64 {
        self.celsius
    }

    /// The Fahrenheit reading.
    #[must_use]
    pub fn fahrenheit(self) -> f64 {
        self.celsius * 9.0 / 5.0 + 32.0
    }

    /// Check this temperature against the narrower probe range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ProbeTargetOutOfRange`] when the value is
    /// outside [`PROBE_MIN_C`]..=[`PROBE_MAX_C`].
    pub fn validate_probe_range(self) -> Result<Self, ValidationError> {
        if self.celsius < PROBE_MIN_C || self.celsius > PROBE_MAX_C {
            return Err(ValidationError::ProbeTargetOutOfRange {
                celsius: self.celsius,
                min: PROBE_MIN_C,
                max: PROBE_MAX_C,
            });
        }
        Ok(self)
    }
}

impl PartialEq for Temperature {
    fn eq(&self, other: &Self) -> bool {
        (self.celsius - other.celsius).abs() < EPSILON
    }
}

impl PartialOrd for Temperature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self == other {
            Some(std::cmp::Ordering::Equal)
        } else {
            self.celsius.partial_cmp(&other.celsius)
        }
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}°C", self.celsius)
    }
}
