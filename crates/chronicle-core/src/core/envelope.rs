// crates/chronicle-core/src/core/envelope.rs
// ============================================================================
// Module: Chronicle Envelopes
// Description: Command and event envelopes with content and chain hashing.
// Purpose: Define the immutable event record and the ephemeral command intent.
// Dependencies: crate::core::{hashing, identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Events are the sole source of truth: immutable, sequence-numbered records
//! whose content hashes chain to the previous event, making the per-campaign
//! log tamper-evident. Commands mirror the envelope minus persistence fields
//! and never outlive their handling. Hash inputs are canonical field maps so
//! semantically equivalent payloads always hash identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::CampaignId;
use crate::core::identifiers::CausationId;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::EntityId;
use crate::core::identifiers::EntityType;
use crate::core::identifiers::InvocationId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::SystemId;
use crate::core::identifiers::SystemVersion;
use crate::core::time::TimeError;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Actor Types
// ============================================================================

/// Originating actor class for commands and events.
///
/// # Invariants
/// - Variants are stable for serialization and hashing.
/// - `Participant` and `Gm` envelopes require an actor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// The platform itself.
    System,
    /// A player seat.
    Participant,
    /// The game master seat.
    Gm,
}

impl ActorType {
    /// Returns the stable wire label for the actor type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Participant => "participant",
            Self::Gm => "gm",
        }
    }

    /// Returns true when envelopes from this actor require an actor identifier.
    #[must_use]
    pub const fn requires_actor_id(self) -> bool {
        matches!(self, Self::Participant | Self::Gm)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Envelope hashing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Payload or field map failed to canonicalize.
    #[error("envelope hash failure: {0}")]
    Hashing(#[from] HashError),
    /// Timestamp failed to format canonically.
    #[error("envelope timestamp failure: {0}")]
    Time(#[from] TimeError),
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Ephemeral intent to change campaign state.
///
/// # Invariants
/// - Mirrors the event envelope minus persistence fields.
/// - Normalization (trimming, payload canonicalization) happens in the
///   command registry, not in this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Campaign the command addresses.
    pub campaign_id: CampaignId,
    /// Command type, e.g. `session.start`.
    pub command_type: String,
    /// Originating actor class.
    pub actor_type: ActorType,
    /// Actor identifier; required for participant and GM actors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
    /// Session scope, when the command addresses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Transport request identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Invocation identifier distinguishing retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<InvocationId>,
    /// Entity type for aggregate addressing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    /// Entity identifier for aggregate addressing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    /// System module identifier for system-owned commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<SystemId>,
    /// System module version for system-owned commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_version: Option<SystemVersion>,
    /// Correlation identifier linking a business flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    /// Causation identifier naming the triggering envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<CausationId>,
    /// Payload JSON text; canonicalized during validation.
    #[serde(default = "empty_payload")]
    pub payload: String,
}

impl Command {
    /// Creates a command with the required fields and an empty payload.
    #[must_use]
    pub fn new(
        campaign_id: CampaignId,
        command_type: impl Into<String>,
        actor_type: ActorType,
    ) -> Self {
        Self {
            campaign_id,
            command_type: command_type.into(),
            actor_type,
            actor_id: None,
            session_id: None,
            request_id: None,
            invocation_id: None,
            entity_type: None,
            entity_id: None,
            system_id: None,
            system_version: None,
            correlation_id: None,
            causation_id: None,
            payload: empty_payload(),
        }
    }

    /// Sets the actor identifier.
    #[must_use]
    pub fn with_actor_id(mut self, actor_id: ActorId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Sets the session scope.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Sets the transport request identifier.
    #[must_use]
    pub fn with_request(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Sets the invocation identifier.
    #[must_use]
    pub fn with_invocation(mut self, invocation_id: InvocationId) -> Self {
        self.invocation_id = Some(invocation_id);
        self
    }

    /// Sets entity addressing.
    #[must_use]
    pub fn with_entity(mut self, entity_type: EntityType, entity_id: EntityId) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id);
        self
    }

    /// Sets system ownership metadata.
    #[must_use]
    pub fn with_system(mut self, system_id: SystemId, system_version: SystemVersion) -> Self {
        self.system_id = Some(system_id);
        self.system_version = Some(system_version);
        self
    }

    /// Sets correlation metadata.
    #[must_use]
    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Sets causation metadata.
    #[must_use]
    pub fn with_causation(mut self, causation_id: CausationId) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    /// Sets the payload JSON text.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// Default payload for envelopes constructed without one.
fn empty_payload() -> String {
    "{}".to_string()
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Immutable record of a business fact within a campaign stream.
///
/// # Invariants
/// - `seq`, `hash`, `prev_hash`, `chain_hash`, and `signature` are empty on
///   input to append validation and immutable after persistence.
/// - `seq` is contiguous per campaign, starting at 1.
/// - `payload` is canonical JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Campaign the event belongs to.
    pub campaign_id: CampaignId,
    /// Sequence number assigned on persist; 0 while unassigned.
    #[serde(default)]
    pub seq: u64,
    /// Content hash, lowercase hex; empty while unassigned.
    #[serde(default)]
    pub hash: String,
    /// Previous event's chain hash; empty for the first event.
    #[serde(default)]
    pub prev_hash: String,
    /// This event's chain hash; empty while unassigned.
    #[serde(default)]
    pub chain_hash: String,
    /// Reserved host signature field; empty within the core.
    #[serde(default)]
    pub signature: String,
    /// Event type, e.g. `session.started`.
    pub event_type: String,
    /// Event timestamp, UTC with nanosecond precision.
    pub timestamp: Timestamp,
    /// Originating actor class.
    pub actor_type: ActorType,
    /// Actor identifier; required for participant and GM actors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
    /// Session scope, when the event addresses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Transport request identifier copied from the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Invocation identifier copied from the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<InvocationId>,
    /// Entity type for aggregate addressing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    /// Entity identifier for aggregate addressing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    /// System module identifier for system-owned events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<SystemId>,
    /// System module version for system-owned events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_version: Option<SystemVersion>,
    /// Correlation identifier linking a business flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    /// Causation identifier naming the triggering envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<CausationId>,
    /// Canonical JSON payload text.
    #[serde(default = "empty_payload")]
    pub payload: String,
}

impl Event {
    /// Creates an unpersisted event with the required fields.
    #[must_use]
    pub fn new(
        campaign_id: CampaignId,
        event_type: impl Into<String>,
        timestamp: Timestamp,
        actor_type: ActorType,
    ) -> Self {
        Self {
            campaign_id,
            seq: 0,
            hash: String::new(),
            prev_hash: String::new(),
            chain_hash: String::new(),
            signature: String::new(),
            event_type: event_type.into(),
            timestamp,
            actor_type,
            actor_id: None,
            session_id: None,
            request_id: None,
            invocation_id: None,
            entity_type: None,
            entity_id: None,
            system_id: None,
            system_version: None,
            correlation_id: None,
            causation_id: None,
            payload: empty_payload(),
        }
    }

    /// Creates an unpersisted event copying envelope metadata from a command.
    ///
    /// This is the single constructor deciders use: campaign, actor, session,
    /// request, invocation, correlation, and causation metadata all carry
    /// over; addressing and payload are set by the caller.
    #[must_use]
    pub fn from_command(
        command: &Command,
        event_type: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        let mut event = Self::new(
            command.campaign_id.clone(),
            event_type,
            timestamp,
            command.actor_type,
        );
        event.actor_id = command.actor_id.clone();
        event.session_id = command.session_id.clone();
        event.request_id = command.request_id.clone();
        event.invocation_id = command.invocation_id.clone();
        event.correlation_id = command.correlation_id.clone();
        event.causation_id = command.causation_id.clone();
        event
    }

    /// Sets entity addressing.
    #[must_use]
    pub fn with_entity(mut self, entity_type: EntityType, entity_id: EntityId) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id);
        self
    }

    /// Sets system ownership metadata.
    #[must_use]
    pub fn with_system(mut self, system_id: SystemId, system_version: SystemVersion) -> Self {
        self.system_id = Some(system_id);
        self.system_version = Some(system_version);
        self
    }

    /// Sets the payload JSON text.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Returns true when any storage-assigned field is set.
    #[must_use]
    pub fn has_storage_fields(&self) -> bool {
        self.seq != 0
            || !self.hash.is_empty()
            || !self.prev_hash.is_empty()
            || !self.chain_hash.is_empty()
            || !self.signature.is_empty()
    }

    /// Returns true when the event carries system ownership metadata.
    #[must_use]
    pub fn is_system_owned(&self) -> bool {
        self.system_id.is_some() || self.system_version.is_some()
    }
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Builds the canonical content field map for an event.
///
/// Optional fields are included only when present and non-empty, so the hash
/// input is identical whether an absent field arrived as `None` or as an
/// empty string upstream.
fn content_field_map(event: &Event) -> Result<Map<String, Value>, EnvelopeError> {
    let mut fields = Map::new();
    fields.insert("campaign_id".to_string(), Value::String(event.campaign_id.as_str().to_string()));
    fields.insert("event_type".to_string(), Value::String(event.event_type.clone()));
    fields.insert("timestamp".to_string(), Value::String(event.timestamp.canonical()?));
    fields
        .insert("actor_type".to_string(), Value::String(event.actor_type.as_str().to_string()));
    let payload: Value = serde_json::from_str(&event.payload)
        .map_err(|err| EnvelopeError::Hashing(HashError::Canonicalization(err.to_string())))?;
    fields.insert("payload".to_string(), payload);

    if let Some(actor_id) = &event.actor_id
        && !actor_id.is_empty()
    {
        fields.insert("actor_id".to_string(), Value::String(actor_id.as_str().to_string()));
    }
    if let Some(session_id) = &event.session_id
        && !session_id.is_empty()
    {
        fields.insert("session_id".to_string(), Value::String(session_id.as_str().to_string()));
    }
    if let Some(request_id) = &event.request_id
        && !request_id.is_empty()
    {
        fields.insert("request_id".to_string(), Value::String(request_id.as_str().to_string()));
    }
    if let Some(invocation_id) = &event.invocation_id
        && !invocation_id.is_empty()
    {
        fields.insert(
            "invocation_id".to_string(),
            Value::String(invocation_id.as_str().to_string()),
        );
    }
    if let Some(entity_type) = &event.entity_type
        && !entity_type.is_empty()
    {
        fields.insert("entity_type".to_string(), Value::String(entity_type.as_str().to_string()));
    }
    if let Some(entity_id) = &event.entity_id
        && !entity_id.is_empty()
    {
        fields.insert("entity_id".to_string(), Value::String(entity_id.as_str().to_string()));
    }
    if let Some(system_id) = &event.system_id
        && !system_id.is_empty()
    {
        fields.insert("system_id".to_string(), Value::String(system_id.as_str().to_string()));
    }
    if let Some(system_version) = &event.system_version
        && !system_version.is_empty()
    {
        fields.insert(
            "system_version".to_string(),
            Value::String(system_version.as_str().to_string()),
        );
    }
    if let Some(correlation_id) = &event.correlation_id
        && !correlation_id.is_empty()
    {
        fields.insert(
            "correlation_id".to_string(),
            Value::String(correlation_id.as_str().to_string()),
        );
    }
    if let Some(causation_id) = &event.causation_id
        && !causation_id.is_empty()
    {
        fields.insert("causation_id".to_string(), Value::String(causation_id.as_str().to_string()));
    }
    Ok(fields)
}

/// Computes the content hash of an event.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when the payload is not valid JSON or the
/// timestamp cannot be formatted.
pub fn content_hash(event: &Event) -> Result<HashDigest, EnvelopeError> {
    let fields = content_field_map(event)?;
    let bytes = canonical_json_bytes(&Value::Object(fields))?;
    Ok(hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes))
}

/// Computes the chain hash of an event from its content hash and the
/// previous event's chain hash.
///
/// The first event of a campaign passes an empty `prev_chain_hash`.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when the payload is not valid JSON or the
/// timestamp cannot be formatted.
pub fn chain_hash(
    event: &Event,
    seq: u64,
    content: &HashDigest,
    prev_chain_hash: &str,
) -> Result<HashDigest, EnvelopeError> {
    let mut fields = content_field_map(event)?;
    fields.insert("seq".to_string(), Value::Number(seq.into()));
    fields.insert("hash".to_string(), Value::String(content.value.clone()));
    fields.insert("prev_chain_hash".to_string(), Value::String(prev_chain_hash.to_string()));
    let bytes = canonical_json_bytes(&Value::Object(fields))?;
    Ok(hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes))
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

    use super::ActorType;
    use super::Command;
    use super::Event;
    use super::content_hash;
    use crate::core::identifiers::ActorId;
    use crate::core::identifiers::CampaignId;
    use crate::core::identifiers::CorrelationId;
    use crate::core::identifiers::SessionId;
    use crate::core::time::Timestamp;

    fn timestamp() -> Timestamp {
        Timestamp::from_unix_nanos(1_700_000_000_000_000_007).expect("timestamp")
    }

    #[test]
    fn from_command_copies_envelope_metadata() {
        let command = Command::new(CampaignId::new("camp-1"), "session.start", ActorType::Gm)
            .with_actor_id(ActorId::new("gm-1"))
            .with_session(SessionId::new("sess-1"))
            .with_correlation(CorrelationId::new("corr-1"));
        let event = Event::from_command(&command, "session.started", timestamp());
        assert_eq!(event.campaign_id, command.campaign_id);
        assert_eq!(event.actor_type, command.actor_type);
        assert_eq!(event.actor_id, command.actor_id);
        assert_eq!(event.session_id, command.session_id);
        assert_eq!(event.correlation_id, command.correlation_id);
        assert!(!event.has_storage_fields());
    }

    #[test]
    fn content_hash_is_payload_order_independent() {
        let base = Event::new(
            CampaignId::new("camp-1"),
            "session.started",
            timestamp(),
            ActorType::System,
        );
        let event_a = base.clone().with_payload(r#"{"a":1,"b":2}"#);
        let event_b = base.with_payload(r#"{"b":2,"a":1}"#);
        let hash_a = content_hash(&event_a).expect("hash a");
        let hash_b = content_hash(&event_b).expect("hash b");
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn content_hash_changes_with_optional_fields() {
        let base = Event::new(
            CampaignId::new("camp-1"),
            "session.started",
            timestamp(),
            ActorType::System,
        );
        let with_session = {
            let mut event = base.clone();
            event.session_id = Some(SessionId::new("sess-1"));
            event
        };
        let hash_base = content_hash(&base).expect("hash base");
        let hash_session = content_hash(&with_session).expect("hash session");
        assert_ne!(hash_base, hash_session);
    }

    #[test]
    fn empty_optional_fields_hash_like_absent_fields() {
        let base = Event::new(
            CampaignId::new("camp-1"),
            "session.started",
            timestamp(),
            ActorType::System,
        );
        let with_empty = {
            let mut event = base.clone();
            event.session_id = Some(SessionId::new(""));
            event
        };
        let hash_base = content_hash(&base).expect("hash base");
        let hash_empty = content_hash(&with_empty).expect("hash empty");
        assert_eq!(hash_base, hash_empty);
    }
}
