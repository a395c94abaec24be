//! Experiment variants

use std::fmt;

/// Name reserved for the empty variant
pub const EMPTY_VARIANT_NAME: &str = "__undefined__";

/// One named, weighted outcome an experiment can assign
///
/// Variants are immutable once built and are shared through `Arc`, so two
/// handles refer to the same variant only when they point at the same
/// allocation.
#[derive(Clone)]
pub struct Variant<V> {
    name: String,
    ratio: f64,
    value: Option<V>,
}

impl<V> Variant<V> {
    /// Create a variant carrying a payload
    pub fn new(name: impl Into<String>, ratio: f64, value: V) -> Self {
        Self {
            name: name.into(),
            ratio,
            value: Some(value),
        }
    }

    /// Create a variant without a payload
    ///
    /// Hosts reading a control variant get back their own default value.
    pub fn control(name: impl Into<String>, ratio: f64) -> Self {
        Self {
            name: name.into(),
            ratio,
            value: None,
        }
    }

    /// The empty variant, meaning "no treatment assigned"
    pub fn empty() -> Self {
        Self {
            name: EMPTY_VARIANT_NAME.to_string(),
            ratio: 1.0,
            value: None,
        }
    }

    /// Get the variant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the selection weight
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Get the payload, if any
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Check if this is the empty variant
    pub fn is_empty_variant(&self) -> bool {
        self.name == EMPTY_VARIANT_NAME
    }
}

impl<V> fmt::Debug for Variant<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("ratio", &self.ratio)
            .field("has_value", &self.value.is_some())
            .finish()
    }
}
