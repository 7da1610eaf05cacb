//! Typed keys for event parameters.
//!
//! A [`Key<T>`] names one parameter of a known value type. The value type is
//! fixed when the key is constructed; every read and write through the key
//! uses that single type.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::params::Parameter;
use crate::value::FieldValue;

/// Unit tag attached to a parameter's values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    /// Dimensionless.
    #[default]
    None,
    /// Power in watts.
    Watt,
    /// Length in meters.
    Meter,
    /// Length in millimeters.
    Millimeter,
    /// Angle in degrees.
    Degree,
    /// Temperature in kelvin.
    Kelvin,
    /// Time in seconds.
    Second,
    /// Frequency in hertz.
    Hertz,
    /// Any unit not covered above.
    Custom(String),
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Watt => write!(f, "watt"),
            Self::Meter => write!(f, "meter"),
            Self::Millimeter => write!(f, "millimeter"),
            Self::Degree => write!(f, "degree"),
            Self::Kelvin => write!(f, "kelvin"),
            Self::Second => write!(f, "second"),
            Self::Hertz => write!(f, "hertz"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// A named, type-tagged accessor into an event's parameter collection.
///
/// # Examples
///
/// ```
/// use procvar::{int_key, Units};
///
/// let temperature = int_key("temperature");
/// let param = temperature.set(42);
/// assert_eq!(param.name(), "temperature");
///
/// let power = procvar::double_key("power").with_units(Units::Watt);
/// let param = power.set_all([1.1, 2.2, 3.3]);
/// assert_eq!(param.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key<T: FieldValue> {
    name: String,
    units: Units,
    _value: PhantomData<fn() -> T>,
}

impl<T: FieldValue> Key<T> {
    /// Creates a key with no units.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Units::None,
            _value: PhantomData,
        }
    }

    /// Attaches a unit tag to the key.
    #[must_use]
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// The parameter name this key addresses.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit tag parameters built from this key carry.
    #[must_use]
    pub const fn units(&self) -> &Units {
        &self.units
    }

    /// Builds a single-valued parameter from this key.
    #[must_use]
    pub fn set(&self, value: T) -> Parameter {
        Parameter::new(self.name.clone(), self.units.clone(), vec![value.into_value()])
    }

    /// Builds a multi-valued parameter from this key.
    #[must_use]
    pub fn set_all(&self, values: impl IntoIterator<Item = T>) -> Parameter {
        let values = values.into_iter().map(FieldValue::into_value).collect();
        Parameter::new(self.name.clone(), self.units.clone(), values)
    }
}

/// Creates a boolean-typed key.
#[must_use]
pub fn bool_key(name: impl Into<String>) -> Key<bool> {
    Key::new(name)
}

/// Creates an integer-typed key.
#[must_use]
pub fn int_key(name: impl Into<String>) -> Key<i64> {
    Key::new(name)
}

/// Creates a float-typed key.
#[must_use]
pub fn double_key(name: impl Into<String>) -> Key<f64> {
    Key::new(name)
}

/// Creates a string-typed key.
#[must_use]
pub fn string_key(name: impl Into<String>) -> Key<String> {
    Key::new(name)
}

/// Creates a timestamp-typed key.
#[must_use]
pub fn time_key(name: impl Into<String>) -> Key<chrono::DateTime<chrono::Utc>> {
    Key::new(name)
}
