//! Named domain actions ("calculate fee", "escalate", ...) run by stores
//! that execute actions in-process.
//!
//! # Invariants
//! - Action names are lowercase `[a-z0-9_-]` and unique per registry.
//! - A handler never writes; it returns an optional patch the store applies.

use crate::backend::{BackendError, BackendResult};
use crate::model::artifact::{Artifact, ArtifactPatch};
use crate::model::status::LensStatus;
use crate::schema::government::{Permit, Violation, ViolationStatus};
use crate::schema::hypothesis::Hypothesis;
use crate::schema::{decode_data, ArtifactKind, SchemaError};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of one action run.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Opaque object handed back to the caller as `{result: ...}`.
    pub result: Value,
    /// Mutation to persist on the target artifact, if any.
    pub patch: Option<ArtifactPatch>,
}

impl ActionOutcome {
    pub fn read_only(result: Value) -> Self {
        Self {
            result,
            patch: None,
        }
    }
}

/// One named side-effect bound to an artifact type.
pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Artifact type this action accepts; `None` accepts any type.
    fn applies_to(&self) -> Option<&str> {
        None
    }

    fn run(&self, artifact: &Artifact, params: &Value) -> BackendResult<ActionOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionRegistryError {
    #[error("action name is invalid: {0}")]
    InvalidActionName(String),
    #[error("action name already registered: {0}")]
    DuplicateActionName(String),
}

/// Registry of action handlers keyed by name.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: BTreeMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the stock government/hypothesis actions.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [Arc<dyn ActionHandler>; 3] = [
            Arc::new(CalculateFee),
            Arc::new(Escalate),
            Arc::new(Evaluate),
        ];
        for handler in builtin {
            if let Err(err) = registry.register(handler) {
                log::error!("event=action_register module=actions status=error error={err}");
            }
        }
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) -> Result<(), ActionRegistryError> {
        let name = handler.name().trim().to_string();
        if !is_valid_action_name(&name) {
            return Err(ActionRegistryError::InvalidActionName(name));
        }
        if self.handlers.contains_key(&name) {
            return Err(ActionRegistryError::DuplicateActionName(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Sorted action names.
    pub fn action_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name.trim()).cloned()
    }

    /// Resolves and runs `action` against `artifact`.
    pub fn dispatch(
        &self,
        artifact: &Artifact,
        action: &str,
        params: &Value,
    ) -> BackendResult<ActionOutcome> {
        let handler = self
            .get(action)
            .ok_or_else(|| BackendError::UnknownAction(action.trim().to_string()))?;
        if let Some(expected) = handler.applies_to() {
            if expected != artifact.artifact_type {
                return Err(BackendError::ActionFailed {
                    action: handler.name().to_string(),
                    message: format!(
                        "action applies to `{expected}`, not `{}`",
                        artifact.artifact_type
                    ),
                });
            }
        }
        handler.run(artifact, params)
    }
}

fn is_valid_action_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

fn action_failed(action: &str, err: SchemaError) -> BackendError {
    BackendError::ActionFailed {
        action: action.to_string(),
        message: err.to_string(),
    }
}

/// Recomputes a permit's fee and stores it in `data.fee`.
struct CalculateFee;

impl ActionHandler for CalculateFee {
    fn name(&self) -> &str {
        "calculate_fee"
    }

    fn applies_to(&self) -> Option<&str> {
        Some(Permit::TYPE_NAME)
    }

    fn run(&self, artifact: &Artifact, _params: &Value) -> BackendResult<ActionOutcome> {
        let permit = decode_data::<Permit>(&artifact.data).map_err(|err| action_failed(self.name(), err))?;
        let fee = permit.calculate_fee();
        Ok(ActionOutcome {
            result: json!({ "fee": fee, "baseFee": permit.base_fee() }),
            patch: Some(ArtifactPatch::default().with_field("fee", fee)),
        })
    }
}

/// Raises a violation's escalation level and marks it escalated.
struct Escalate;

impl ActionHandler for Escalate {
    fn name(&self) -> &str {
        "escalate"
    }

    fn applies_to(&self) -> Option<&str> {
        Some(Violation::TYPE_NAME)
    }

    fn run(&self, artifact: &Artifact, _params: &Value) -> BackendResult<ActionOutcome> {
        let violation =
            decode_data::<Violation>(&artifact.data).map_err(|err| action_failed(self.name(), err))?;
        let level = violation.escalation_level.saturating_add(1);
        Ok(ActionOutcome {
            result: json!({ "escalationLevel": level }),
            patch: Some(
                ArtifactPatch::default()
                    .with_field("escalationLevel", level)
                    .with_status(ViolationStatus::Escalated.as_str()),
            ),
        })
    }
}

/// Scores a hypothesis against its evidence counters. Read-only.
struct Evaluate;

impl ActionHandler for Evaluate {
    fn name(&self) -> &str {
        "evaluate"
    }

    fn applies_to(&self) -> Option<&str> {
        Some(Hypothesis::TYPE_NAME)
    }

    fn run(&self, artifact: &Artifact, _params: &Value) -> BackendResult<ActionOutcome> {
        let hypothesis =
            decode_data::<Hypothesis>(&artifact.data).map_err(|err| action_failed(self.name(), err))?;
        Ok(ActionOutcome::read_only(json!({
            "support": hypothesis.support(),
            "verdict": hypothesis.verdict().as_str(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionHandler, ActionOutcome, ActionRegistry, ActionRegistryError};
    use crate::backend::{BackendError, BackendResult};
    use crate::model::artifact::{Artifact, ArtifactDraft, ArtifactId};
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Echo(&'static str);

    impl ActionHandler for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn run(&self, _artifact: &Artifact, params: &Value) -> BackendResult<ActionOutcome> {
            Ok(ActionOutcome::read_only(params.clone()))
        }
    }

    fn artifact(artifact_type: &str, draft: ArtifactDraft) -> Artifact {
        Artifact::from_draft(ArtifactId::new("a-1"), artifact_type, draft)
    }

    #[test]
    fn rejects_invalid_or_duplicate_names() {
        let mut registry = ActionRegistry::new();
        assert!(matches!(
            registry.register(Arc::new(Echo("Calculate Fee"))),
            Err(ActionRegistryError::InvalidActionName(_))
        ));
        assert!(matches!(
            registry.register(Arc::new(Echo("  "))),
            Err(ActionRegistryError::InvalidActionName(_))
        ));
        registry.register(Arc::new(Echo("echo"))).unwrap();
        assert!(matches!(
            registry.register(Arc::new(Echo("echo"))),
            Err(ActionRegistryError::DuplicateActionName(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn builtin_actions_are_registered() {
        let registry = ActionRegistry::with_builtin();
        assert_eq!(
            registry.action_names(),
            vec!["calculate_fee", "escalate", "evaluate"]
        );
    }

    #[test]
    fn dispatch_checks_name_and_type() {
        let registry = ActionRegistry::with_builtin();
        let chore = artifact("Chore", ArtifactDraft::new("Dishes"));

        assert!(matches!(
            registry.dispatch(&chore, "teleport", &Value::Null),
            Err(BackendError::UnknownAction(_))
        ));
        assert!(matches!(
            registry.dispatch(&chore, "escalate", &Value::Null),
            Err(BackendError::ActionFailed { .. })
        ));
    }

    #[test]
    fn escalate_bumps_level_and_status() {
        let registry = ActionRegistry::with_builtin();
        let violation = artifact(
            "Violation",
            ArtifactDraft::new("Overgrown lot").with_field("escalationLevel", 1),
        );
        let outcome = registry.dispatch(&violation, "escalate", &Value::Null).unwrap();
        assert_eq!(outcome.result, json!({"escalationLevel": 2}));

        let mut patched = violation.clone();
        patched.apply_patch(&outcome.patch.expect("escalate writes"));
        assert_eq!(patched.status(), Some("escalated"));
        assert_eq!(patched.data_f64("escalationLevel"), Some(2.0));
    }

    #[test]
    fn evaluate_is_read_only() {
        let registry = ActionRegistry::with_builtin();
        let hypothesis = artifact(
            "Hypothesis",
            ArtifactDraft::new("Rain boosts sales")
                .with_field("evidenceFor", 8)
                .with_field("evidenceAgainst", 2),
        );
        let outcome = registry.dispatch(&hypothesis, "evaluate", &json!({})).unwrap();
        assert_eq!(outcome.result, json!({"support": 0.8, "verdict": "supported"}));
        assert!(outcome.patch.is_none());
    }
}
