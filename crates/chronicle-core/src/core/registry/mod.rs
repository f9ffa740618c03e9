// crates/chronicle-core/src/core/registry/mod.rs
// ============================================================================
// Module: Chronicle Registries
// Description: Strongly-typed catalogs of command and event definitions.
// Purpose: Own definition rows, payload validators, and envelope normalization.
// Dependencies: crate::core::{envelope, hashing, identifiers}, serde, thiserror
// ============================================================================

//! ## Overview
//! Registries are the write path's first line of defense: every command and
//! event passes through definition lookup, field trimming, actor and
//! addressing validation, payload canonicalization, and per-type payload
//! validation before anything downstream sees it. Registries are constructed
//! once at startup, cross-checked by the startup validators, then frozen for
//! concurrent read.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod command;
pub mod event;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::envelope::ActorType;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::CausationId;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::EntityId;
use crate::core::identifiers::EntityType;
use crate::core::identifiers::InvocationId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::SystemId;
use crate::core::identifiers::SystemVersion;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use command::CommandDefinition;
pub use command::CommandRegistry;
pub use event::EventDefinition;
pub use event::EventRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum canonical payload size accepted by either registry.
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Ownership and Policies
// ============================================================================

/// Ownership class of a command or event definition.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// Defined by a core domain package.
    Core,
    /// Defined by a pluggable game-system module.
    System,
}

/// Scope of a command's gate policy.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateScope {
    /// Command is never gate-checked.
    #[default]
    None,
    /// Command is checked against the session gate.
    Session,
}

/// Gate policy attached to a command definition.
///
/// # Invariants
/// - `allow_when_open` is meaningful only when `scope` is `Session`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Gate scope for the command.
    pub scope: GateScope,
    /// True when the command may proceed while a gate is open.
    pub allow_when_open: bool,
}

impl GatePolicy {
    /// Policy for commands that are never gate-checked.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            scope: GateScope::None,
            allow_when_open: false,
        }
    }

    /// Policy for session-scoped commands blocked while a gate is open.
    #[must_use]
    pub const fn session_blocked() -> Self {
        Self {
            scope: GateScope::Session,
            allow_when_open: false,
        }
    }

    /// Policy for session-scoped commands permitted while a gate is open.
    #[must_use]
    pub const fn session_allowed() -> Self {
        Self {
            scope: GateScope::Session,
            allow_when_open: true,
        }
    }
}

/// Entity addressing requirement of an event definition.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingPolicy {
    /// No addressing requirement.
    #[default]
    None,
    /// Entity type must be present; entity id is optional.
    EntityTypeOnly,
    /// Entity type and entity id must both be present.
    EntityTypeAndId,
}

/// Declared purpose of an event type.
///
/// Intent governs which downstream handlers must exist: fold handlers are
/// required for replay-bearing intents, projection handlers only for
/// `ProjectionAndReplay`.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Folded during replay and consumed by projections.
    #[default]
    ProjectionAndReplay,
    /// Folded during replay only.
    ReplayOnly,
    /// Recorded for audit; never folded, never projected.
    AuditOnly,
}

impl Intent {
    /// Returns true when the intent requires a fold handler.
    #[must_use]
    pub const fn requires_fold(self) -> bool {
        matches!(self, Self::ProjectionAndReplay | Self::ReplayOnly)
    }

    /// Returns true when the intent requires a projection handler.
    #[must_use]
    pub const fn requires_projection(self) -> bool {
        matches!(self, Self::ProjectionAndReplay)
    }
}

// ============================================================================
// SECTION: Payload Validation
// ============================================================================

/// Violation reported by a payload validator.
///
/// # Invariants
/// - `message` is human-readable context, not a stable contract.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PayloadViolation {
    /// Human-readable violation description.
    pub message: String,
}

impl PayloadViolation {
    /// Creates a violation with the provided message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-type payload validator invoked with canonical payload bytes.
pub trait PayloadValidator: Send + Sync {
    /// Validates a canonical JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadViolation`] when the payload does not satisfy the
    /// type's contract.
    fn validate(&self, payload: &str) -> Result<(), PayloadViolation>;
}

/// Validator asserting a payload parses into the typed form `T`.
///
/// # Invariants
/// - Accepts exactly the payloads `serde_json` deserializes into `T`.
pub struct TypedValidator<T> {
    /// Marker for the payload type.
    _payload: PhantomData<fn() -> T>,
}

impl<T> Default for TypedValidator<T> {
    fn default() -> Self {
        Self {
            _payload: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> PayloadValidator for TypedValidator<T> {
    fn validate(&self, payload: &str) -> Result<(), PayloadViolation> {
        serde_json::from_str::<T>(payload)
            .map(|_| ())
            .map_err(|err| PayloadViolation::new(err.to_string()))
    }
}

/// Returns a shared validator asserting payloads parse into `T`.
#[must_use]
pub fn typed_validator<T: DeserializeOwned + 'static>() -> Arc<dyn PayloadValidator> {
    Arc::new(TypedValidator::<T>::default())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry registration and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Definition or envelope type string is empty.
    #[error("type is empty")]
    EmptyType,
    /// Type is already registered.
    #[error("type already registered: {type_name}")]
    DuplicateType {
        /// Offending type string.
        type_name: String,
    },
    /// Type has no registered definition.
    #[error("type unknown: {type_name}")]
    TypeUnknown {
        /// Offending type string.
        type_name: String,
    },
    /// Envelope campaign identifier is missing.
    #[error("campaign id is required")]
    CampaignRequired,
    /// Actor identifier is missing for a participant or GM envelope.
    #[error("actor id is required for actor type {actor_type}")]
    ActorIdRequired {
        /// Actor type requiring an identifier.
        actor_type: String,
    },
    /// Entity type is missing for an addressed event.
    #[error("entity type is required for {type_name}")]
    EntityTypeRequired {
        /// Offending type string.
        type_name: String,
    },
    /// Entity identifier is missing for an addressed event.
    #[error("entity id is required for {type_name}")]
    EntityIdRequired {
        /// Offending type string.
        type_name: String,
    },
    /// System metadata is missing for a system-owned envelope.
    #[error("system id and version are required for {type_name}")]
    SystemMetadataRequired {
        /// Offending type string.
        type_name: String,
    },
    /// System metadata is present on a core-owned envelope.
    #[error("system metadata is forbidden for core-owned {type_name}")]
    SystemMetadataForbidden {
        /// Offending type string.
        type_name: String,
    },
    /// Storage-assigned fields were set before append validation.
    #[error("storage fields must be empty before append: {type_name}")]
    StorageFieldsSet {
        /// Offending type string.
        type_name: String,
    },
    /// Alias source is already registered.
    #[error("alias already registered: {from}")]
    AliasDuplicate {
        /// Alias source type.
        from: String,
    },
    /// Alias target is not a registered type.
    #[error("alias target unknown: {from} -> {to}")]
    AliasTargetUnknown {
        /// Alias source type.
        from: String,
        /// Alias target type.
        to: String,
    },
    /// Payload exceeds the registry size cap.
    #[error("payload too large: {actual} bytes (limit {limit})")]
    PayloadTooLarge {
        /// Maximum allowed bytes.
        limit: usize,
        /// Actual payload size in bytes.
        actual: usize,
    },
    /// Payload is not valid JSON.
    #[error("payload decode failure for {type_name}: {message}")]
    PayloadDecode {
        /// Offending type string.
        type_name: String,
        /// Decoder error context.
        message: String,
    },
    /// Payload failed its type's validator.
    #[error("payload invalid for {type_name}: {message}")]
    PayloadInvalid {
        /// Offending type string.
        type_name: String,
        /// Validator violation context.
        message: String,
    },
}

// ============================================================================
// SECTION: Normalization Helpers
// ============================================================================

/// Trims an optional session identifier, dropping it when empty.
pub(crate) fn trim_session(value: Option<SessionId>) -> Option<SessionId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(SessionId::new(trimmed)) }
    })
}

/// Trims an optional actor identifier, dropping it when empty.
pub(crate) fn trim_actor(value: Option<ActorId>) -> Option<ActorId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(ActorId::new(trimmed)) }
    })
}

/// Trims an optional request identifier, dropping it when empty.
pub(crate) fn trim_request(value: Option<RequestId>) -> Option<RequestId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(RequestId::new(trimmed)) }
    })
}

/// Trims an optional invocation identifier, dropping it when empty.
pub(crate) fn trim_invocation(value: Option<InvocationId>) -> Option<InvocationId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(InvocationId::new(trimmed)) }
    })
}

/// Trims an optional entity type, dropping it when empty.
pub(crate) fn trim_entity_type(value: Option<EntityType>) -> Option<EntityType> {
    value.and_then(|label| {
        let trimmed = label.as_str().trim();
        if trimmed.is_empty() { None } else { Some(EntityType::new(trimmed)) }
    })
}

/// Trims an optional entity identifier, dropping it when empty.
pub(crate) fn trim_entity_id(value: Option<EntityId>) -> Option<EntityId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(EntityId::new(trimmed)) }
    })
}

/// Trims an optional system identifier, dropping it when empty.
pub(crate) fn trim_system_id(value: Option<SystemId>) -> Option<SystemId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(SystemId::new(trimmed)) }
    })
}

/// Trims an optional system version, dropping it when empty.
pub(crate) fn trim_system_version(value: Option<SystemVersion>) -> Option<SystemVersion> {
    value.and_then(|version| {
        let trimmed = version.as_str().trim();
        if trimmed.is_empty() { None } else { Some(SystemVersion::new(trimmed)) }
    })
}

/// Trims an optional correlation identifier, dropping it when empty.
pub(crate) fn trim_correlation(value: Option<CorrelationId>) -> Option<CorrelationId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(CorrelationId::new(trimmed)) }
    })
}

/// Trims an optional causation identifier, dropping it when empty.
pub(crate) fn trim_causation(value: Option<CausationId>) -> Option<CausationId> {
    value.and_then(|id| {
        let trimmed = id.as_str().trim();
        if trimmed.is_empty() { None } else { Some(CausationId::new(trimmed)) }
    })
}

/// Validates the actor id requirement for an envelope.
pub(crate) fn require_actor_id(
    actor_type: ActorType,
    actor_id: Option<&ActorId>,
) -> Result<(), RegistryError> {
    if actor_type.requires_actor_id() && actor_id.is_none() {
        return Err(RegistryError::ActorIdRequired {
            actor_type: actor_type.as_str().to_string(),
        });
    }
    Ok(())
}
