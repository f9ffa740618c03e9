// crates/chronicle-domains/src/session.rs
// ============================================================================
// Module: Session Domain
// Description: Session lifecycle, gates, spotlight, and GM notes.
// Purpose: Decide and fold session commands and events for a campaign.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The session domain owns the session sub-state: start and end, the GM
//! adjudication gate, the spotlight, and audit-only GM notes. Gate state
//! folded here is what the centralized gate evaluator consults before any
//! session-scoped command reaches a decider.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chronicle_core::AggregateState;
use chronicle_core::CharacterId;
use chronicle_core::Command;
use chronicle_core::CommandDefinition;
use chronicle_core::CommandRegistry;
use chronicle_core::Decision;
use chronicle_core::EntityId;
use chronicle_core::EntityType;
use chronicle_core::Event;
use chronicle_core::EventDefinition;
use chronicle_core::EventRegistry;
use chronicle_core::FoldError;
use chronicle_core::GateId;
use chronicle_core::GatePolicy;
use chronicle_core::Intent;
use chronicle_core::Owner;
use chronicle_core::RegistryError;
use chronicle_core::SessionId;
use chronicle_core::SessionState;
use chronicle_core::codes;
use chronicle_core::core::registry::AddressingPolicy;
use chronicle_core::core::time::Clock;
use chronicle_core::typed_validator;
use serde::Deserialize;
use serde::Serialize;

use crate::DomainPackage;
use crate::support::decode_command_payload;
use crate::support::decode_event_payload;
use crate::support::encode_payload;

// ============================================================================
// SECTION: Type Constants
// ============================================================================

/// Command: start a session.
pub const CMD_SESSION_START: &str = "session.start";
/// Command: end the running session.
pub const CMD_SESSION_END: &str = "session.end";
/// Command: open an adjudication gate.
pub const CMD_SESSION_OPEN_GATE: &str = "session.open_gate";
/// Command: close the open adjudication gate.
pub const CMD_SESSION_CLOSE_GATE: &str = "session.close_gate";
/// Command: move the spotlight.
pub const CMD_SESSION_SET_SPOTLIGHT: &str = "session.set_spotlight";
/// Command: record a GM note.
pub const CMD_SESSION_LOG_NOTE: &str = "session.log_note";

/// Event: a session started.
pub const EVT_SESSION_STARTED: &str = "session.started";
/// Event: the session ended.
pub const EVT_SESSION_ENDED: &str = "session.ended";
/// Event: an adjudication gate opened.
pub const EVT_SESSION_GATE_OPENED: &str = "session.gate_opened";
/// Event: the adjudication gate closed.
pub const EVT_SESSION_GATE_CLOSED: &str = "session.gate_closed";
/// Event: the spotlight moved.
pub const EVT_SESSION_SPOTLIGHT_SET: &str = "session.spotlight_set";
/// Event: a GM note was recorded (audit-only).
pub const EVT_SESSION_NOTE_LOGGED: &str = "session.note_logged";

/// Entity type label for session-addressed events.
const ENTITY_SESSION: &str = "session";

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Payload for `session.start` and `session.started`.
///
/// # Invariants
/// - `session_id` is required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartPayload {
    /// Identifier of the session to start.
    pub session_id: String,
    /// Display name of the session.
    #[serde(default)]
    pub session_name: String,
}

/// Payload for `session.end` and `session.ended`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndPayload {
    /// Identifier of the session being ended.
    #[serde(default)]
    pub session_id: String,
}

/// Payload for `session.open_gate` and `session.gate_opened`.
///
/// # Invariants
/// - `gate_id` and `gate_type` are required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOpenPayload {
    /// Identifier of the gate being opened.
    pub gate_id: String,
    /// Gate type label, e.g. `gm_consequence`.
    pub gate_type: String,
}

/// Payload for `session.close_gate` and `session.gate_closed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateClosePayload {
    /// Identifier of the gate being closed.
    #[serde(default)]
    pub gate_id: String,
}

/// Payload for `session.set_spotlight` and `session.spotlight_set`.
///
/// # Invariants
/// - `spotlight_type` is required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotlightPayload {
    /// Spotlight type label, e.g. `character` or `scene`.
    pub spotlight_type: String,
    /// Character receiving the spotlight, when the type is `character`.
    #[serde(default)]
    pub character_id: String,
}

/// Payload for `session.log_note` and `session.note_logged`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePayload {
    /// Free-form GM note text.
    pub note: String,
}

// ============================================================================
// SECTION: Domain Package
// ============================================================================

/// Session domain package.
pub struct SessionDomain;

impl DomainPackage for SessionDomain {
    fn name(&self) -> &'static str {
        "session"
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        registry.register(
            CommandDefinition::new(CMD_SESSION_START, Owner::Core)
                .with_validator(typed_validator::<SessionStartPayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_SESSION_END, Owner::Core)
                .with_validator(typed_validator::<SessionEndPayload>())
                .with_gate(GatePolicy::session_blocked()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_SESSION_OPEN_GATE, Owner::Core)
                .with_validator(typed_validator::<GateOpenPayload>())
                .with_gate(GatePolicy::session_blocked()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_SESSION_CLOSE_GATE, Owner::Core)
                .with_validator(typed_validator::<GateClosePayload>())
                .with_gate(GatePolicy::session_allowed()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_SESSION_SET_SPOTLIGHT, Owner::Core)
                .with_validator(typed_validator::<SpotlightPayload>())
                .with_gate(GatePolicy::session_blocked()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_SESSION_LOG_NOTE, Owner::Core)
                .with_validator(typed_validator::<NotePayload>()),
        )?;
        Ok(())
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        registry.register(
            EventDefinition::new(EVT_SESSION_STARTED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<SessionStartPayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_SESSION_ENDED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<SessionEndPayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_SESSION_GATE_OPENED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<GateOpenPayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_SESSION_GATE_CLOSED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<GateClosePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_SESSION_SPOTLIGHT_SET, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<SpotlightPayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_SESSION_NOTE_LOGGED, Owner::Core)
                .with_intent(Intent::AuditOnly),
        )?;
        Ok(())
    }

    fn emittable_event_types(&self) -> Vec<String> {
        vec![
            EVT_SESSION_STARTED.to_string(),
            EVT_SESSION_ENDED.to_string(),
            EVT_SESSION_GATE_OPENED.to_string(),
            EVT_SESSION_GATE_CLOSED.to_string(),
            EVT_SESSION_SPOTLIGHT_SET.to_string(),
            EVT_SESSION_NOTE_LOGGED.to_string(),
        ]
    }

    fn decider_handled_commands(&self) -> Vec<String> {
        vec![
            CMD_SESSION_START.to_string(),
            CMD_SESSION_END.to_string(),
            CMD_SESSION_OPEN_GATE.to_string(),
            CMD_SESSION_CLOSE_GATE.to_string(),
            CMD_SESSION_SET_SPOTLIGHT.to_string(),
            CMD_SESSION_LOG_NOTE.to_string(),
        ]
    }

    fn fold_handled_types(&self) -> Vec<String> {
        vec![
            EVT_SESSION_STARTED.to_string(),
            EVT_SESSION_ENDED.to_string(),
            EVT_SESSION_GATE_OPENED.to_string(),
            EVT_SESSION_GATE_CLOSED.to_string(),
            EVT_SESSION_SPOTLIGHT_SET.to_string(),
        ]
    }

    fn projection_handled_types(&self) -> Vec<String> {
        vec![
            EVT_SESSION_STARTED.to_string(),
            EVT_SESSION_ENDED.to_string(),
            EVT_SESSION_GATE_OPENED.to_string(),
            EVT_SESSION_GATE_CLOSED.to_string(),
            EVT_SESSION_SPOTLIGHT_SET.to_string(),
        ]
    }

    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        match command.command_type.as_str() {
            CMD_SESSION_START => decide_start(state, command, clock),
            CMD_SESSION_END => decide_end(state, command, clock),
            CMD_SESSION_OPEN_GATE => decide_open_gate(state, command, clock),
            CMD_SESSION_CLOSE_GATE => decide_close_gate(state, command, clock),
            CMD_SESSION_SET_SPOTLIGHT => decide_set_spotlight(state, command, clock),
            CMD_SESSION_LOG_NOTE => decide_log_note(command, clock),
            other => Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("session domain does not handle {other}"),
            ),
        }
    }

    fn fold(&self, state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
        fold(state, event)
    }
}

// ============================================================================
// SECTION: Deciders
// ============================================================================

/// Decides `session.start`.
fn decide_start(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if state.session.started && !state.session.ended {
        return Decision::reject(
            codes::SESSION_ALREADY_STARTED,
            format!(
                "session {} is already started",
                state.session.session_id.as_ref().map_or("<unknown>", SessionId::as_str)
            ),
        );
    }
    let payload: SessionStartPayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let session_id = payload.session_id.trim().to_string();
    if session_id.is_empty() {
        return Decision::reject(codes::SESSION_ID_REQUIRED, "session id is required to start");
    }
    let normalized = SessionStartPayload {
        session_id: session_id.clone(),
        session_name: payload.session_name.trim().to_string(),
    };
    let encoded = match encode_payload(CMD_SESSION_START, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_SESSION_STARTED, clock.now())
            .with_entity(EntityType::new(ENTITY_SESSION), EntityId::new(session_id))
            .with_payload(encoded),
    ])
}

/// Decides `session.end`.
fn decide_end(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if !state.session.started || state.session.ended {
        return Decision::reject(codes::SESSION_NOT_STARTED, "no session is running");
    }
    let Some(session_id) = state.session.session_id.clone() else {
        return Decision::reject(codes::SESSION_NOT_STARTED, "no session is running");
    };
    let payload = SessionEndPayload {
        session_id: session_id.as_str().to_string(),
    };
    let encoded = match encode_payload(CMD_SESSION_END, &payload) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_SESSION_ENDED, clock.now())
            .with_entity(EntityType::new(ENTITY_SESSION), EntityId::new(session_id.as_str()))
            .with_payload(encoded),
    ])
}

/// Decides `session.open_gate`.
fn decide_open_gate(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if !state.session.started || state.session.ended {
        return Decision::reject(codes::SESSION_NOT_STARTED, "no session is running");
    }
    if state.session.gate_open {
        return Decision::reject(
            codes::SESSION_GATE_ALREADY_OPEN,
            format!(
                "gate {} is already open",
                state.session.gate_id.as_ref().map_or("<unknown>", GateId::as_str)
            ),
        );
    }
    let payload: GateOpenPayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let gate_id = payload.gate_id.trim().to_string();
    if gate_id.is_empty() {
        return Decision::reject(codes::SESSION_GATE_ID_REQUIRED, "gate id is required");
    }
    let gate_type = payload.gate_type.trim().to_string();
    if gate_type.is_empty() {
        return Decision::reject(codes::SESSION_GATE_TYPE_REQUIRED, "gate type is required");
    }
    let session_entity = session_entity_id(state);
    let normalized = GateOpenPayload {
        gate_id,
        gate_type,
    };
    let encoded = match encode_payload(CMD_SESSION_OPEN_GATE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_SESSION_GATE_OPENED, clock.now())
            .with_entity(EntityType::new(ENTITY_SESSION), session_entity)
            .with_payload(encoded),
    ])
}

/// Decides `session.close_gate`.
fn decide_close_gate(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if !state.session.started || state.session.ended {
        return Decision::reject(codes::SESSION_NOT_STARTED, "no session is running");
    }
    if !state.session.gate_open {
        return Decision::reject(codes::SESSION_GATE_NOT_OPEN, "no gate is open");
    }
    let payload = GateClosePayload {
        gate_id: state.session.gate_id.as_ref().map_or_else(String::new, |id| {
            id.as_str().to_string()
        }),
    };
    let encoded = match encode_payload(CMD_SESSION_CLOSE_GATE, &payload) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_SESSION_GATE_CLOSED, clock.now())
            .with_entity(EntityType::new(ENTITY_SESSION), session_entity_id(state))
            .with_payload(encoded),
    ])
}

/// Decides `session.set_spotlight`.
fn decide_set_spotlight(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if !state.session.started || state.session.ended {
        return Decision::reject(codes::SESSION_NOT_STARTED, "no session is running");
    }
    let payload: SpotlightPayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let spotlight_type = payload.spotlight_type.trim().to_string();
    if spotlight_type.is_empty() {
        return Decision::reject(
            codes::SESSION_SPOTLIGHT_TYPE_REQUIRED,
            "spotlight type is required",
        );
    }
    let normalized = SpotlightPayload {
        spotlight_type,
        character_id: payload.character_id.trim().to_string(),
    };
    let encoded = match encode_payload(CMD_SESSION_SET_SPOTLIGHT, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_SESSION_SPOTLIGHT_SET, clock.now())
            .with_entity(EntityType::new(ENTITY_SESSION), session_entity_id(state))
            .with_payload(encoded),
    ])
}

/// Decides `session.log_note`.
fn decide_log_note(command: &Command, clock: &dyn Clock) -> Decision {
    let payload: NotePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let note = payload.note.trim().to_string();
    if note.is_empty() {
        return Decision::reject(codes::SESSION_NOTE_REQUIRED, "note text is required");
    }
    let normalized = NotePayload {
        note,
    };
    let encoded = match encode_payload(CMD_SESSION_LOG_NOTE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_SESSION_NOTE_LOGGED, clock.now()).with_payload(encoded),
    ])
}

/// Returns the entity id for the running session, empty when unset.
fn session_entity_id(state: &AggregateState) -> EntityId {
    EntityId::new(state.session.session_id.as_ref().map_or("", SessionId::as_str))
}

// ============================================================================
// SECTION: Folder
// ============================================================================

/// Folds session events into the session sub-state.
fn fold(mut state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
    match event.event_type.as_str() {
        EVT_SESSION_STARTED => {
            let payload: SessionStartPayload = decode_event_payload(event)?;
            state.session = SessionState {
                started: true,
                ended: false,
                session_id: Some(SessionId::new(payload.session_id)),
                name: payload.session_name,
                ..SessionState::default()
            };
        }
        EVT_SESSION_ENDED => {
            state.session.ended = true;
            state.session.gate_open = false;
            state.session.gate_id = None;
            state.session.gate_type.clear();
        }
        EVT_SESSION_GATE_OPENED => {
            let payload: GateOpenPayload = decode_event_payload(event)?;
            state.session.gate_open = true;
            state.session.gate_id = Some(GateId::new(payload.gate_id));
            state.session.gate_type = payload.gate_type;
        }
        EVT_SESSION_GATE_CLOSED => {
            state.session.gate_open = false;
            state.session.gate_id = None;
            state.session.gate_type.clear();
        }
        EVT_SESSION_SPOTLIGHT_SET => {
            let payload: SpotlightPayload = decode_event_payload(event)?;
            state.session.spotlight_type = payload.spotlight_type;
            state.session.spotlight_character_id = if payload.character_id.is_empty() {
                None
            } else {
                Some(CharacterId::new(payload.character_id))
            };
        }
        _ => {}
    }
    Ok(state)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
