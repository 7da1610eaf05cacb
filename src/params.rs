//! Parameters and parameter collections.
//!
//! A [`Parameter`] is one named, unit-tagged, multi-valued field. [`Params`]
//! is an ordered collection of parameters, unique by name. Both are
//! immutable: every update operation returns a new value and leaves the
//! original untouched.

use serde::{Deserialize, Serialize};

use crate::error::{PvError, PvResult};
use crate::key::{Key, Units};
use crate::value::{FieldValue, Value};

/// One named field carried by an event.
///
/// Parameters hold an ordered list of scalar [`Value`]s. Most telemetry
/// fields are single-valued; array-shaped fields (axis positions, filter
/// wheels) use the full list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    #[serde(default)]
    units: Units,
    values: Vec<Value>,
}

impl Parameter {
    /// Creates a parameter from raw parts. Prefer [`Key::set`] in
    /// application code so the value tag matches the key type.
    #[must_use]
    pub fn new(name: impl Into<String>, units: Units, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            units,
            values,
        }
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit tag.
    #[must_use]
    pub const fn units(&self) -> &Units {
        &self.units
    }

    /// All values, in insertion order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The first value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the parameter carries no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Extracts the first value as `T`.
    ///
    /// # Errors
    /// - [`PvError::NotFound`] when the parameter holds no values
    /// - [`PvError::TypeMismatch`] when the first value has a different tag
    pub fn first_as<T: FieldValue>(&self) -> PvResult<T> {
        let Some(value) = self.values.first() else {
            return Err(PvError::NotFound {
                name: self.name.clone(),
            });
        };

        T::from_value(value).ok_or_else(|| PvError::TypeMismatch {
            name: self.name.clone(),
            expected: T::TYPE_NAME,
            actual: value.type_name(),
        })
    }
}

/// Ordered collection of parameters, unique by name.
///
/// Adding a parameter whose name is already present replaces it in place
/// (upsert); insertion order of the remaining names is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Vec<Parameter>);

impl Params {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns a new collection with `param` upserted.
    #[must_use]
    pub fn with(&self, param: Parameter) -> Self {
        let mut next = self.clone();
        next.upsert(param);
        next
    }

    /// Returns a new collection with every parameter of `params` upserted.
    #[must_use]
    pub fn madd(&self, params: impl IntoIterator<Item = Parameter>) -> Self {
        let mut next = self.clone();
        for param in params {
            next.upsert(param);
        }
        next
    }

    /// Returns a new collection with every parameter of `other` upserted.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        self.madd(other.0.iter().cloned())
    }

    /// Returns a new collection without the parameter named by `key`.
    #[must_use]
    pub fn without<T: FieldValue>(&self, key: &Key<T>) -> Self {
        Self(
            self.0
                .iter()
                .filter(|p| p.name() != key.name())
                .cloned()
                .collect(),
        )
    }

    /// Looks up the parameter named by `key`.
    #[must_use]
    pub fn get<T: FieldValue>(&self, key: &Key<T>) -> Option<&Parameter> {
        self.find(key.name())
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Parameter> {
        self.0.iter().find(|p| p.name() == name)
    }

    /// Returns true if a parameter named by `key` is present.
    #[must_use]
    pub fn exists<T: FieldValue>(&self, key: &Key<T>) -> bool {
        self.get(key).is_some()
    }

    /// Extracts the first value of the parameter named by `key`.
    ///
    /// # Errors
    /// - [`PvError::NotFound`] when no such parameter exists or it is empty
    /// - [`PvError::TypeMismatch`] when the stored value has a different tag
    pub fn first_value<T: FieldValue>(&self, key: &Key<T>) -> PvResult<T> {
        let Some(param) = self.get(key) else {
            return Err(PvError::NotFound {
                name: key.name().to_string(),
            });
        };

        param.first_as::<T>()
    }

    /// Iterates the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn upsert(&mut self, param: Parameter) {
        match self.0.iter_mut().find(|p| p.name() == param.name()) {
            Some(slot) => *slot = param,
            None => self.0.push(param),
        }
    }
}

impl FromIterator<Parameter> for Params {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self::new().madd(iter)
    }
}
