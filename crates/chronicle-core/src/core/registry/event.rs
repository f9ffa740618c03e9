// crates/chronicle-core/src/core/registry/event.rs
// ============================================================================
// Module: Chronicle Event Registry
// Description: Catalog of event definitions with append-path validation.
// Purpose: Normalize and validate emitted events before the journal persists them.
// Dependencies: crate::core::{envelope, hashing, registry}
// ============================================================================

//! ## Overview
//! The event registry owns one definition row per event type: ownership,
//! addressing policy, optional payload validator, and intent. It also tracks
//! type aliases for renamed events. `validate_for_append` refuses envelopes
//! with pre-set storage fields, enforces actor, addressing, and system
//! metadata rules, canonicalizes the payload, and runs the per-type
//! validator. Startup validators consume `list_definitions`, `list_aliases`,
//! and `missing_payload_validators`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::envelope::Event;
use crate::core::hashing::canonicalize_json_text;
use crate::core::identifiers::CampaignId;
use crate::core::registry::AddressingPolicy;
use crate::core::registry::Intent;
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
// SECTION: Event Definitions
// ============================================================================

/// Registry row describing an event type.
///
/// # Invariants
/// - `event_type` is non-empty once registered.
/// - `intent` defaults to projection-and-replay.
#[derive(Clone)]
pub struct EventDefinition {
    /// Event type string.
    pub event_type: String,
    /// Ownership class.
    pub owner: Owner,
    /// Entity addressing requirement.
    pub addressing: AddressingPolicy,
    /// Optional payload validator run with canonical payload bytes.
    pub payload_validator: Option<Arc<dyn PayloadValidator>>,
    /// Declared purpose of the event type.
    pub intent: Intent,
}

impl EventDefinition {
    /// Creates a definition with default addressing and intent.
    #[must_use]
    pub fn new(event_type: impl Into<String>, owner: Owner) -> Self {
        Self {
            event_type: event_type.into(),
            owner,
            addressing: AddressingPolicy::None,
            payload_validator: None,
            intent: Intent::ProjectionAndReplay,
        }
    }

    /// Sets the addressing policy.
    #[must_use]
    pub const fn with_addressing(mut self, addressing: AddressingPolicy) -> Self {
        self.addressing = addressing;
        self
    }

    /// Attaches a payload validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn PayloadValidator>) -> Self {
        self.payload_validator = Some(validator);
        self
    }

    /// Sets the intent.
    #[must_use]
    pub const fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }
}

impl std::fmt::Debug for EventDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDefinition")
            .field("event_type", &self.event_type)
            .field("owner", &self.owner)
            .field("addressing", &self.addressing)
            .field("has_validator", &self.payload_validator.is_some())
            .field("intent", &self.intent)
            .finish()
    }
}

// ============================================================================
// SECTION: Event Registry
// ============================================================================

/// Catalog of event definitions and aliases keyed by type.
///
/// # Invariants
/// - Types and alias sources are unique and never collide with each other.
/// - Alias targets are registered definitions.
/// - Iteration order is stable (sorted by type).
#[derive(Debug, Default)]
pub struct EventRegistry {
    /// Definitions keyed by event type.
    definitions: BTreeMap<String, EventDefinition>,
    /// Alias map from retired type names to canonical types.
    aliases: BTreeMap<String, String>,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an event definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyType`] for an empty type and
    /// [`RegistryError::DuplicateType`] when the type or an alias with the
    /// same name already exists.
    pub fn register(&mut self, definition: EventDefinition) -> Result<(), RegistryError> {
        let event_type = definition.event_type.trim().to_string();
        if event_type.is_empty() {
            return Err(RegistryError::EmptyType);
        }
        if self.definitions.contains_key(&event_type) || self.aliases.contains_key(&event_type) {
            return Err(RegistryError::DuplicateType {
                type_name: event_type,
            });
        }
        let mut definition = definition;
        definition.event_type.clone_from(&event_type);
        self.definitions.insert(event_type, definition);
        Ok(())
    }

    /// Registers an alias from a retired type name to a canonical type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyType`] for an empty source,
    /// [`RegistryError::AliasDuplicate`] or [`RegistryError::DuplicateType`]
    /// for colliding names, and [`RegistryError::AliasTargetUnknown`] when
    /// the target has no definition.
    pub fn register_alias(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let from = from.into().trim().to_string();
        let to = to.into().trim().to_string();
        if from.is_empty() || to.is_empty() {
            return Err(RegistryError::EmptyType);
        }
        if self.aliases.contains_key(&from) {
            return Err(RegistryError::AliasDuplicate {
                from,
            });
        }
        if self.definitions.contains_key(&from) {
            return Err(RegistryError::DuplicateType {
                type_name: from,
            });
        }
        if !self.definitions.contains_key(&to) {
            return Err(RegistryError::AliasTargetUnknown {
                from,
                to,
            });
        }
        self.aliases.insert(from, to);
        Ok(())
    }

    /// Resolves a type through the alias map, returning the canonical type.
    #[must_use]
    pub fn resolve<'a>(&'a self, event_type: &'a str) -> &'a str {
        self.aliases.get(event_type).map_or(event_type, String::as_str)
    }

    /// Returns the definition for a type, resolving aliases.
    #[must_use]
    pub fn definition(&self, event_type: &str) -> Option<&EventDefinition> {
        self.definitions.get(self.resolve(event_type))
    }

    /// Returns all definitions in stable (sorted) order.
    #[must_use]
    pub fn list_definitions(&self) -> Vec<&EventDefinition> {
        self.definitions.values().collect()
    }

    /// Returns all aliases as `(from, to)` pairs in stable order.
    #[must_use]
    pub fn list_aliases(&self) -> Vec<(&str, &str)> {
        self.aliases.iter().map(|(from, to)| (from.as_str(), to.as_str())).collect()
    }

    /// Returns non-audit event types that lack a payload validator.
    ///
    /// A non-empty result is a startup error: every replay-bearing type must
    /// re-assert its payload shape.
    #[must_use]
    pub fn missing_payload_validators(&self) -> Vec<String> {
        self.definitions
            .values()
            .filter(|definition| {
                definition.intent != Intent::AuditOnly && definition.payload_validator.is_none()
            })
            .map(|definition| definition.event_type.clone())
            .collect()
    }

    /// Validates and normalizes an event for the append path.
    ///
    /// Refuses envelopes whose storage fields are pre-set, trims string
    /// fields, enforces actor, addressing, and system metadata rules,
    /// canonicalizes the payload, and runs the per-type validator. The
    /// returned event carries the canonical (alias-resolved) type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] naming the first violated rule.
    pub fn validate_for_append(&self, event: &Event) -> Result<Event, RegistryError> {
        if event.has_storage_fields() {
            return Err(RegistryError::StorageFieldsSet {
                type_name: event.event_type.clone(),
            });
        }

        let mut normalized = event.clone();
        normalized.campaign_id = CampaignId::new(event.campaign_id.as_str().trim());
        normalized.event_type = self.resolve(event.event_type.trim()).to_string();
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
        if normalized.event_type.is_empty() {
            return Err(RegistryError::EmptyType);
        }
        require_actor_id(normalized.actor_type, normalized.actor_id.as_ref())?;

        let Some(definition) = self.definitions.get(&normalized.event_type) else {
            return Err(RegistryError::TypeUnknown {
                type_name: normalized.event_type,
            });
        };

        match definition.addressing {
            AddressingPolicy::None => {}
            AddressingPolicy::EntityTypeOnly => {
                if normalized.entity_type.is_none() {
                    return Err(RegistryError::EntityTypeRequired {
                        type_name: normalized.event_type,
                    });
                }
            }
            AddressingPolicy::EntityTypeAndId => {
                if normalized.entity_type.is_none() {
                    return Err(RegistryError::EntityTypeRequired {
                        type_name: normalized.event_type,
                    });
                }
                if normalized.entity_id.is_none() {
                    return Err(RegistryError::EntityIdRequired {
                        type_name: normalized.event_type,
                    });
                }
            }
        }

        match definition.owner {
            Owner::System => {
                if normalized.system_id.is_none() || normalized.system_version.is_none() {
                    return Err(RegistryError::SystemMetadataRequired {
                        type_name: normalized.event_type,
                    });
                }
                if normalized.entity_type.is_none() {
                    return Err(RegistryError::EntityTypeRequired {
                        type_name: normalized.event_type,
                    });
                }
                if normalized.entity_id.is_none() {
                    return Err(RegistryError::EntityIdRequired {
                        type_name: normalized.event_type,
                    });
                }
            }
            Owner::Core => {
                if normalized.system_id.is_some() || normalized.system_version.is_some() {
                    return Err(RegistryError::SystemMetadataForbidden {
                        type_name: normalized.event_type,
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
                type_name: normalized.event_type.clone(),
                message: err.to_string(),
            })?;

        if let Some(validator) = &definition.payload_validator {
            validator.validate(&normalized.payload).map_err(|violation| {
                RegistryError::PayloadInvalid {
                    type_name: normalized.event_type.clone(),
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

    use super::EventDefinition;
    use super::EventRegistry;
    use crate::core::envelope::ActorType;
    use crate::core::envelope::Event;
    use crate::core::identifiers::CampaignId;
    use crate::core::identifiers::EntityId;
    use crate::core::identifiers::EntityType;
    use crate::core::identifiers::SystemId;
    use crate::core::identifiers::SystemVersion;
    use crate::core::registry::AddressingPolicy;
    use crate::core::registry::Intent;
    use crate::core::registry::Owner;
    use crate::core::registry::RegistryError;
    use crate::core::time::Timestamp;

    fn timestamp() -> Timestamp {
        Timestamp::from_unix_nanos(1_700_000_000_000_000_000).expect("timestamp")
    }

    fn registry() -> EventRegistry {
        let mut registry = EventRegistry::new();
        registry
            .register(
                EventDefinition::new("session.started", Owner::Core)
                    .with_addressing(AddressingPolicy::EntityTypeAndId),
            )
            .expect("register started");
        registry
            .register(
                EventDefinition::new("sys.d20.check_resolved", Owner::System)
                    .with_addressing(AddressingPolicy::EntityTypeAndId),
            )
            .expect("register system event");
        registry
    }

    fn started_event() -> Event {
        Event::new(CampaignId::new("camp-1"), "session.started", timestamp(), ActorType::System)
            .with_entity(EntityType::new("session"), EntityId::new("sess-1"))
    }

    #[test]
    fn validate_rejects_preset_storage_fields() {
        let registry = registry();
        let mut event = started_event();
        event.seq = 3;
        let err = registry.validate_for_append(&event).unwrap_err();
        assert!(matches!(err, RegistryError::StorageFieldsSet { .. }));
    }

    #[test]
    fn validate_rejects_unknown_type() {
        let registry = registry();
        let event = Event::new(
            CampaignId::new("camp-1"),
            "session.vanished",
            timestamp(),
            ActorType::System,
        );
        let err = registry.validate_for_append(&event).unwrap_err();
        assert!(matches!(err, RegistryError::TypeUnknown { .. }));
    }

    #[test]
    fn validate_enforces_entity_addressing() {
        let registry = registry();
        let mut event = started_event();
        event.entity_id = None;
        let err = registry.validate_for_append(&event).unwrap_err();
        assert!(matches!(err, RegistryError::EntityIdRequired { .. }));
        event.entity_type = None;
        let err = registry.validate_for_append(&event).unwrap_err();
        assert!(matches!(err, RegistryError::EntityTypeRequired { .. }));
    }

    #[test]
    fn validate_requires_system_metadata_for_system_events() {
        let registry = registry();
        let event = Event::new(
            CampaignId::new("camp-1"),
            "sys.d20.check_resolved",
            timestamp(),
            ActorType::System,
        )
        .with_entity(EntityType::new("character"), EntityId::new("char-1"));
        let err = registry.validate_for_append(&event).unwrap_err();
        assert!(matches!(err, RegistryError::SystemMetadataRequired { .. }));
    }

    #[test]
    fn validate_forbids_system_metadata_on_core_events() {
        let registry = registry();
        let event = started_event()
            .with_system(SystemId::new("d20"), SystemVersion::new("1"));
        let err = registry.validate_for_append(&event).unwrap_err();
        assert!(matches!(err, RegistryError::SystemMetadataForbidden { .. }));
    }

    #[test]
    fn validate_accepts_and_canonicalizes() {
        let registry = registry();
        let event = started_event().with_payload(r#"{ "session_id" : "sess-1" }"#);
        let normalized = registry.validate_for_append(&event).expect("validate");
        assert_eq!(normalized.payload, r#"{"session_id":"sess-1"}"#);
    }

    #[test]
    fn alias_resolves_to_canonical_type() {
        let mut registry = registry();
        registry.register_alias("session.begun", "session.started").expect("alias");
        assert_eq!(registry.resolve("session.begun"), "session.started");
        let event = {
            let mut event = started_event();
            event.event_type = "session.begun".to_string();
            event
        };
        let normalized = registry.validate_for_append(&event).expect("validate");
        assert_eq!(normalized.event_type, "session.started");
    }

    #[test]
    fn alias_requires_registered_target() {
        let mut registry = registry();
        let err = registry.register_alias("session.begun", "session.gone").unwrap_err();
        assert!(matches!(err, RegistryError::AliasTargetUnknown { .. }));
    }

    #[test]
    fn missing_payload_validators_reports_non_audit_types() {
        let mut registry = registry();
        registry
            .register(
                EventDefinition::new("session.note_logged", Owner::Core)
                    .with_intent(Intent::AuditOnly),
            )
            .expect("register audit event");
        let missing = registry.missing_payload_validators();
        assert!(missing.contains(&"session.started".to_string()));
        assert!(!missing.contains(&"session.note_logged".to_string()));
    }
}
