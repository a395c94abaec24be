//! Type-erased view of an experiment used by the registry

use std::any::Any;

use serde::Serialize;
use serde_json::Value;

use super::entity::{Experiment, ExperimentStatus};
use super::error::ExperimentError;
use super::event::{ExperimentState, TrackEvent};
use super::random::RandomSource;

/// Owned, non-generic snapshot of an experiment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSnapshot {
    pub name: String,
    pub status: ExperimentStatus,
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ExperimentState>,
}

impl ExperimentSnapshot {
    pub fn is_active(&self) -> bool {
        self.status == ExperimentStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == ExperimentStatus::Completed
    }
}

/// Lifecycle surface shared by experiments of every payload type
pub trait ExperimentHandle: Send {
    fn name(&self) -> &str;

    fn activate(
        &mut self,
        force_variant: Option<&str>,
        rng: &mut dyn RandomSource,
    ) -> Result<(), ExperimentError>;

    fn track(&mut self, event: &TrackEvent) -> Result<(), ExperimentError>;

    fn is_active(&self) -> bool;

    fn is_completed(&self) -> bool;

    fn complete(&mut self);

    fn set_state(&mut self, patch: Value);

    fn state(&self) -> Option<&ExperimentState>;

    /// Name of the active variant, or the empty variant's name
    fn variant_name(&self) -> &str;

    /// Whether the active variant is the empty variant
    fn is_empty_variant(&self) -> bool;

    fn snapshot(&self) -> ExperimentSnapshot;

    fn as_any(&self) -> &dyn Any;
}

impl<V> ExperimentHandle for Experiment<V>
where
    V: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        Experiment::name(self)
    }

    fn activate(
        &mut self,
        force_variant: Option<&str>,
        rng: &mut dyn RandomSource,
    ) -> Result<(), ExperimentError> {
        Experiment::activate(self, force_variant, rng)
    }

    fn track(&mut self, event: &TrackEvent) -> Result<(), ExperimentError> {
        Experiment::track(self, event)
    }

    fn is_active(&self) -> bool {
        Experiment::is_active(self)
    }

    fn is_completed(&self) -> bool {
        Experiment::is_completed(self)
    }

    fn complete(&mut self) {
        Experiment::complete(self)
    }

    fn set_state(&mut self, patch: Value) {
        Experiment::set_state(self, patch)
    }

    fn state(&self) -> Option<&ExperimentState> {
        Experiment::state(self)
    }

    fn variant_name(&self) -> &str {
        self.variant().name()
    }

    fn is_empty_variant(&self) -> bool {
        self.variant().is_empty_variant()
    }

    fn snapshot(&self) -> ExperimentSnapshot {
        ExperimentSnapshot {
            name: self.name().to_string(),
            status: self.status(),
            variant: self.variant().name().to_string(),
            state: self.state().cloned(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::random::fake::ScriptedRandom;
    use crate::domain::experiment::Variant;
    use serde_json::json;

    fn boxed() -> Box<dyn ExperimentHandle> {
        Box::new(
            Experiment::new("erased", |_, _| Ok(()))
                .with_variant(Variant::new("a", 1.0, "payload".to_string())),
        )
    }

    #[test]
    fn test_snapshot_before_activation() {
        let handle = boxed();
        let snapshot = handle.snapshot();

        assert_eq!(snapshot.name, "erased");
        assert_eq!(snapshot.status, ExperimentStatus::Inert);
        assert_eq!(snapshot.variant, crate::domain::experiment::EMPTY_VARIANT_NAME);
        assert!(snapshot.state.is_none());
        assert!(handle.is_empty_variant());
    }

    #[test]
    fn test_lifecycle_through_handle() {
        let mut handle = boxed();
        let mut rng = ScriptedRandom::new([0.5]);

        handle.activate(None, &mut rng).unwrap();
        handle.set_state(json!({"k": 1}));
        assert_eq!(handle.variant_name(), "a");
        assert!(handle.snapshot().is_active());

        handle.complete();
        let snapshot = handle.snapshot();
        assert!(snapshot.is_completed());
        assert_eq!(snapshot.state.unwrap().get("k"), Some(&json!(1)));
    }

    #[test]
    fn test_downcast_recovers_payload_type() {
        let mut handle = boxed();
        let mut rng = ScriptedRandom::new([0.5]);
        handle.activate(None, &mut rng).unwrap();

        let typed = handle
            .as_any()
            .downcast_ref::<Experiment<String>>()
            .unwrap();
        assert_eq!(typed.value().map(String::as_str), Some("payload"));
        assert!(handle.as_any().downcast_ref::<Experiment<i32>>().is_none());
    }

    #[test]
    fn test_snapshot_serializes_status() {
        let snapshot = boxed().snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], json!("inert"));
        assert!(json.get("state").is_none());
    }
}
