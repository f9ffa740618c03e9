// crates/chronicle-core/src/core/registry/command.rs
// ============================================================================
// Module: Chronicle Command Registry
// Description: Catalog of command definitions with decision-path validation.
// Purpose: Normalize and validate commands before gate checks and deciders run.
// Dependencies: crate::core::{envelope, hashing, registry}
// ============================================================================

//! ## Overview
//! The command registry owns one definition row per command type: ownership,
//! optional payload validator, and gate policy. `validate_for_decision` trims
//! string fields, enforces required envelope fields, canonicalizes the
//! payload, and runs the per-type validator, returning the normalized command
//! the rest of the pipeline operates on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::envelope::Command;
use crate::core::hashing::canonicalize_json_text;
use crate::core::identifiers::CampaignId;
use crate::core::registry::GatePolicy;
use crate::core::registry::MAX_PAYLOAD_BYTES;
use crate::core::registry::Owner;
use crate::core::registry::PayloadValidator;
use crate::core::registry::RegistryError;
use crate::core::registry::require_actor_id;
use crate::core::registry::trim_actor;
use crate::core::registry::trim_causation;
use crate::core::registry::trim_correlation;
use crate::core::registry::trim_entity_id;
use crate::core::registry::trim_entity_type;
use crate::core::registry::trim_invocation;
use crate::core::registry::trim_request;
use crate::core::registry::trim_session;
use crate::core::registry::trim_system_id;
use crate::core::registry::trim_system_version;

// ============================================================================
// SECTION: Command Definitions
// ============================================================================

/// Registry row describing a command type.
///
/// # Invariants
/// - `command_type` is non-empty once registered.
/// - Gate policy applies to every instance of the type.
#[derive(Clone)]
pub struct CommandDefinition {
    /// Command type string.
    pub command_type: String,
    /// Ownership class.
    pub owner: Owner,
    /// Optional payload validator run with canonical payload bytes.
    pub payload_validator: Option<Arc<dyn PayloadValidator>>,
    /// Gate policy for the command.
    pub gate: GatePolicy,
}

impl CommandDefinition {
    /// Creates a definition with no validator and no gate policy.
    #[must_use]
    pub fn new(command_type: impl Into<String>, owner: Owner) -> Self {
        Self {
            command_type: command_type.into(),
            owner,
            payload_validator: None,
            gate: GatePolicy::none(),
        }
    }

    /// Attaches a payload validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn PayloadValidator>) -> Self {
        self.payload_validator = Some(validator);
        self
    }

    /// Attaches a gate policy.
    #[must_use]
    pub const fn with_gate(mut self, gate: GatePolicy) -> Self {
        self.gate = gate;
        self
    }
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("command_type", &self.command_type)
            .field("owner", &self.owner)
            .field("has_validator", &self.payload_validator.is_some())
            .field("gate", &self.gate)
            .finish()
    }
}

// ============================================================================
// SECTION: Command Registry
// ============================================================================

/// Catalog of command definitions keyed by type.
///
/// # Invariants
/// - Types are unique; registration is startup-only.
/// - Iteration order is stable (sorted by type).
#[derive(Debug, Default)]
pub struct CommandRegistry {
    /// Definitions keyed by command type.
    definitions: BTreeMap<String, CommandDefinition>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyType`] for an empty type and
    /// [`RegistryError::DuplicateType`] for an already-registered type.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), RegistryError> {
        let command_type = definition.command_type.trim().to_string();
        if command_type.is_empty() {
            return Err(RegistryError::EmptyType);
        }
        if self.definitions.contains_key(&command_type) {
            return Err(RegistryError::DuplicateType {
                type_name: command_type,
            });
        }
        let mut definition = definition;
        definition.command_type.clone_from(&command_type);
        self.definitions.insert(command_type, definition);
        Ok(())
    }

    /// Returns the definition for a command type.
    #[must_use]
    pub fn definition(&self, command_type: &str) -> Option<&CommandDefinition> {
        self.definitions.get(command_type)
    }

    /// Returns all definitions in stable (sorted) order.
    #[must_use]
    pub fn list_definitions(&self) -> Vec<&CommandDefinition> {
        self.definitions.values().collect()
    }

    /// Validates and normalizes a command for the decision path.
    ///
    /// Trims string fields, enforces the required envelope fields, resolves
    /// the definition, canonicalizes the payload, and runs the per-type
    /// payload validator.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] naming the first violated rule.
    pub fn validate_for_decision(&self, command: &Command) -> Result<Command, RegistryError> {
        let mut normalized = command.clone();
        normalized.campaign_id = CampaignId::new(command.campaign_id.as_str().trim());
        normalized.command_type = command.command_type.trim().to_string();
        normalized.actor_id = trim_actor(normalized.actor_id);
        normalized.session_id = trim_session(normalized.session_id);
        normalized.request_id = trim_request(normalized.request_id);
        normalized.invocation_id = trim_invocation(normalized.invocation_id);
        normalized.entity_type = trim_entity_type(normalized.entity_type);
        normalized.entity_id = trim_entity_id(normalized.entity_id);
        normalized.system_id = trim_system_id(normalized.system_id);
        normalized.system_version = trim_system_version(normalized.system_version);
        normalized.correlation_id = trim_correlation(normalized.correlation_id);
        normalized.causation_id = trim_causation(normalized.causation_id);

        if normalized.campaign_id.is_empty() {
            return Err(RegistryError::CampaignRequired);
        }
        if normalized.command_type.is_empty() {
            return Err(RegistryError::EmptyType);
        }
        require_actor_id(normalized.actor_type, normalized.actor_id.as_ref())?;

        let Some(definition) = self.definitions.get(&normalized.command_type) else {
            return Err(RegistryError::TypeUnknown {
                type_name: normalized.command_type,
            });
        };

        match definition.owner {
            Owner::System => {
                if normalized.system_id.is_none() || normalized.system_version.is_none() {
                    return Err(RegistryError::SystemMetadataRequired {
                        type_name: normalized.command_type,
                    });
                }
            }
            Owner::Core => {
                if normalized.system_id.is_some() || normalized.system_version.is_some() {
                    return Err(RegistryError::SystemMetadataForbidden {
                        type_name: normalized.command_type,
                    });
                }
            }
        }

        let raw_payload =
            if normalized.payload.trim().is_empty() { "{}" } else { normalized.payload.as_str() };
        if raw_payload.len() > MAX_PAYLOAD_BYTES {
            return Err(RegistryError::PayloadTooLarge {
                limit: MAX_PAYLOAD_BYTES,
                actual: raw_payload.len(),
            });
        }
        normalized.payload =
            canonicalize_json_text(raw_payload).map_err(|err| RegistryError::PayloadDecode {
                type_name: normalized.command_type.clone(),
                message: err.to_string(),
            })?;

        if let Some(validator) = &definition.payload_validator {
            validator.validate(&normalized.payload).map_err(|violation| {
                RegistryError::PayloadInvalid {
                    type_name: normalized.command_type.clone(),
                    message: violation.message,
                }
            })?;
        }

        Ok(normalized)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only output and panic-based assertions are permitted."
    )]

    use super::CommandDefinition;
    use super::CommandRegistry;
    use crate::core::envelope::ActorType;
    use crate::core::envelope::Command;
    use crate::core::identifiers::ActorId;
    use crate::core::identifiers::CampaignId;
    use crate::core::registry::Owner;
    use crate::core::registry::RegistryError;

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDefinition::new("session.start", Owner::Core))
            .expect("register");
        registry
    }

    #[test]
    fn register_rejects_empty_type() {
        let mut registry = CommandRegistry::new();
        let err = registry.register(CommandDefinition::new("  ", Owner::Core)).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyType));
    }

    #[test]
    fn register_rejects_duplicate_type() {
        let mut registry = registry();
        let err =
            registry.register(CommandDefinition::new("session.start", Owner::Core)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType { .. }));
    }

    #[test]
    fn validate_trims_and_canonicalizes() {
        let registry = registry();
        let command = Command::new(CampaignId::new("  camp-1  "), " session.start ", ActorType::System)
            .with_payload(r#"{ "b" : 2, "a" : 1 }"#);
        let normalized = registry.validate_for_decision(&command).expect("validate");
        assert_eq!(normalized.campaign_id.as_str(), "camp-1");
        assert_eq!(normalized.command_type, "session.start");
        assert_eq!(normalized.payload, r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn validate_rejects_unknown_type() {
        let registry = registry();
        let command =
            Command::new(CampaignId::new("camp-1"), "session.unknown", ActorType::System);
        let err = registry.validate_for_decision(&command).unwrap_err();
        assert!(matches!(err, RegistryError::TypeUnknown { .. }));
    }

    #[test]
    fn validate_requires_actor_id_for_participants() {
        let registry = registry();
        let command =
            Command::new(CampaignId::new("camp-1"), "session.start", ActorType::Participant);
        let err = registry.validate_for_decision(&command).unwrap_err();
        assert!(matches!(err, RegistryError::ActorIdRequired { .. }));
    }

    #[test]
    fn validate_accepts_participant_with_actor_id() {
        let registry = registry();
        let command =
            Command::new(CampaignId::new("camp-1"), "session.start", ActorType::Participant)
                .with_actor_id(ActorId::new("player-1"));
        assert!(registry.validate_for_decision(&command).is_ok());
    }

    #[test]
    fn validate_rejects_invalid_payload_json() {
        let registry = registry();
        let command = Command::new(CampaignId::new("camp-1"), "session.start", ActorType::System)
            .with_payload("{broken");
        let err = registry.validate_for_decision(&command).unwrap_err();
        assert!(matches!(err, RegistryError::PayloadDecode { .. }));
    }

    #[test]
    fn validate_defaults_blank_payload_to_empty_object() {
        let registry = registry();
        let command = Command::new(CampaignId::new("camp-1"), "session.start", ActorType::System)
            .with_payload("   ");
        let normalized = registry.validate_for_decision(&command).expect("validate");
        assert_eq!(normalized.payload, "{}");
    }
}
