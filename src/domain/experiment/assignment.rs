//! Persisted experiment → variant assignments

use serde_json::Value;

use crate::domain::DomainError;

/// Default storage key for persisted assignments
pub const PERSIST_KEY: &str = "dcl_experiments";

/// Ordered mapping from experiment name to assigned variant name
///
/// Serialized as a JSON array of `[experiment, variant]` pairs so the order
/// of first assignment is kept. Names of experiments that are not registered
/// are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedAssignments {
    entries: Vec<(String, String)>,
}

impl PersistedAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized payload
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let mut assignments = Self::new();
        assignments.merge_raw(raw)?;
        Ok(assignments)
    }

    /// Variant name assigned to an experiment
    pub fn get(&self, experiment: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == experiment)
            .map(|(_, variant)| variant.as_str())
    }

    /// Record an assignment, returning whether anything changed
    ///
    /// Re-assigning an experiment keeps its original position.
    pub fn set(&mut self, experiment: &str, variant: &str) -> bool {
        match self.entries.iter_mut().find(|(name, _)| name == experiment) {
            Some((_, current)) if current == variant => false,
            Some((_, current)) => {
                *current = variant.to_string();
                true
            }
            None => {
                self.entries
                    .push((experiment.to_string(), variant.to_string()));
                true
            }
        }
    }

    /// Merge a serialized payload into this mapping
    ///
    /// Entries that are not `[string, string]` pairs are skipped one by one, and
    /// a payload that is not an array is ignored. Only input that is not JSON
    /// at all is an error; the mapping is left untouched in that case.
    /// Returns the number of entries merged.
    pub fn merge_raw(&mut self, raw: &str) -> Result<usize, DomainError> {
        let parsed: Value = serde_json::from_str(raw)?;

        let Value::Array(items) = parsed else {
            return Ok(0);
        };

        let mut merged = 0;
        for item in items {
            if let Value::Array(pair) = item {
                if let [Value::String(experiment), Value::String(variant)] = pair.as_slice() {
                    self.set(experiment, variant);
                    merged += 1;
                }
            }
        }

        Ok(merged)
    }

    /// Serialize as an array of pairs
    pub fn to_json(&self) -> Result<String, DomainError> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// All assignments, in order of first assignment
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
