//! Data fields and metadata naming helpers
//!
//! A [`DataField`] is one named variable of a container: a unit, the list of
//! axes it depends on, its values and free-form metadata. Fields without
//! axes are independents (axes); fields with axes are dependents.

use indexmap::IndexMap;
use ndarray::{Array1, ArrayD, IxDyn};
use serde_json::Value as JsonValue;

/// Metadata attached to a container or a field, in insertion order
pub type Meta = IndexMap<String, JsonValue>;

/// Returns true if `key` follows the `__name__` convention used on disk
pub fn is_meta_key(key: &str) -> bool {
    key.len() > 4 && key.starts_with("__") && key.ends_with("__")
}

/// Strip the `__` markers from an on-disk metadata key
pub fn meta_key_to_name(key: &str) -> Option<&str> {
    if is_meta_key(key) {
        Some(&key[2..key.len() - 2])
    } else {
        None
    }
}

/// Wrap a metadata name into its on-disk `__name__` form
pub fn meta_name_to_key(name: &str) -> String {
    format!("__{name}__")
}

/// A single variable of a data container
#[derive(Debug, Clone, PartialEq)]
pub struct DataField {
    pub unit: String,
    pub axes: Vec<String>,
    pub values: ArrayD<f64>,
    pub meta: Meta,
}

impl Default for DataField {
    fn default() -> Self {
        Self::empty()
    }
}

impl DataField {
    /// Create an independent, unitless field holding `values`
    pub fn new(values: ArrayD<f64>) -> Self {
        Self {
            unit: String::new(),
            axes: Vec::new(),
            values,
            meta: Meta::new(),
        }
    }

    /// Create a field with no records
    pub fn empty() -> Self {
        Self::new(ArrayD::zeros(IxDyn(&[0])))
    }

    /// Create a 1-d field from a vector of record values
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self::new(Array1::from_vec(values).into_dyn())
    }

    #[must_use]
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    #[must_use]
    pub fn with_axes<S: AsRef<str>>(mut self, axes: &[S]) -> Self {
        self.axes = axes.iter().map(|a| a.as_ref().to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    /// True if the field depends on at least one axis
    pub fn is_dependent(&self) -> bool {
        !self.axes.is_empty()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.values.shape().to_vec()
    }

    /// Copy of this field without values (an empty 1-d array)
    pub(crate) fn without_values(&self) -> Self {
        Self {
            unit: self.unit.clone(),
            axes: self.axes.clone(),
            values: ArrayD::zeros(IxDyn(&[0])),
            meta: self.meta.clone(),
        }
    }

    /// Same unit and axes, ignoring values and metadata
    pub(crate) fn same_layout(&self, other: &Self) -> bool {
        self.unit == other.unit && self.axes == other.axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_key_conversion() {
        assert!(is_meta_key("__info__"));
        assert!(!is_meta_key("____"));
        assert!(!is_meta_key("info"));
        assert_eq!(meta_key_to_name("__more_info__"), Some("more_info"));
        assert_eq!(meta_key_to_name("x"), None);
        assert_eq!(meta_name_to_key("1234!"), "__1234!__");
    }

    #[test]
    fn builder() {
        let f = DataField::from_vec(vec![1.0, 2.0])
            .with_unit("V")
            .with_axes(&["x"])
            .with_meta("info", "careful");
        assert!(f.is_dependent());
        assert_eq!(f.shape(), vec![2]);
        assert_eq!(f.meta["info"], JsonValue::from("careful"));
        assert_eq!(f.without_values().shape(), vec![0]);
    }
}
