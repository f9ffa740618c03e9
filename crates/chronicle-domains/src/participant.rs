// crates/chronicle-domains/src/participant.rs
// ============================================================================
// Module: Participant Domain
// Description: Participant join, leave, and role management.
// Purpose: Decide and fold participant commands and events.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The participant domain owns the participant map: joining a campaign,
//! leaving it, and role changes. A participant who left may rejoin; the
//! folded state keeps the seat with its history flags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chronicle_core::AggregateState;
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
use chronicle_core::Owner;
use chronicle_core::ParticipantId;
use chronicle_core::ParticipantState;
use chronicle_core::RegistryError;
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

/// Command: join the campaign.
pub const CMD_PARTICIPANT_JOIN: &str = "participant.join";
/// Command: leave the campaign.
pub const CMD_PARTICIPANT_LEAVE: &str = "participant.leave";
/// Command: change a participant's role.
pub const CMD_PARTICIPANT_SET_ROLE: &str = "participant.set_role";

/// Event: a participant joined.
pub const EVT_PARTICIPANT_JOINED: &str = "participant.joined";
/// Event: a participant left.
pub const EVT_PARTICIPANT_LEFT: &str = "participant.left";
/// Event: a participant's role changed.
pub const EVT_PARTICIPANT_ROLE_SET: &str = "participant.role_set";

/// Entity type label for participant-addressed events.
const ENTITY_PARTICIPANT: &str = "participant";

/// Default role assigned on join when none is provided.
const DEFAULT_ROLE: &str = "player";

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Payload for `participant.join` and `participant.joined`.
///
/// # Invariants
/// - `participant_id` is required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantJoinPayload {
    /// Identifier of the joining participant.
    pub participant_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Seat role label; defaults to `player`.
    #[serde(default)]
    pub role: String,
}

/// Payload for `participant.leave` and `participant.left`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLeavePayload {
    /// Identifier of the leaving participant.
    pub participant_id: String,
}

/// Payload for `participant.set_role` and `participant.role_set`.
///
/// # Invariants
/// - `participant_id` and `role` are required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRolePayload {
    /// Identifier of the participant.
    pub participant_id: String,
    /// New seat role label.
    pub role: String,
}

// ============================================================================
// SECTION: Domain Package
// ============================================================================

/// Participant domain package.
pub struct ParticipantDomain;

impl DomainPackage for ParticipantDomain {
    fn name(&self) -> &'static str {
        "participant"
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        registry.register(
            CommandDefinition::new(CMD_PARTICIPANT_JOIN, Owner::Core)
                .with_validator(typed_validator::<ParticipantJoinPayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_PARTICIPANT_LEAVE, Owner::Core)
                .with_validator(typed_validator::<ParticipantLeavePayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_PARTICIPANT_SET_ROLE, Owner::Core)
                .with_validator(typed_validator::<ParticipantRolePayload>()),
        )?;
        Ok(())
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        registry.register(
            EventDefinition::new(EVT_PARTICIPANT_JOINED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<ParticipantJoinPayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_PARTICIPANT_LEFT, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<ParticipantLeavePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_PARTICIPANT_ROLE_SET, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<ParticipantRolePayload>()),
        )?;
        Ok(())
    }

    fn emittable_event_types(&self) -> Vec<String> {
        vec![
            EVT_PARTICIPANT_JOINED.to_string(),
            EVT_PARTICIPANT_LEFT.to_string(),
            EVT_PARTICIPANT_ROLE_SET.to_string(),
        ]
    }

    fn decider_handled_commands(&self) -> Vec<String> {
        vec![
            CMD_PARTICIPANT_JOIN.to_string(),
            CMD_PARTICIPANT_LEAVE.to_string(),
            CMD_PARTICIPANT_SET_ROLE.to_string(),
        ]
    }

    fn fold_handled_types(&self) -> Vec<String> {
        self.emittable_event_types()
    }

    fn projection_handled_types(&self) -> Vec<String> {
        self.emittable_event_types()
    }

    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        match command.command_type.as_str() {
            CMD_PARTICIPANT_JOIN => decide_join(state, command, clock),
            CMD_PARTICIPANT_LEAVE => decide_leave(state, command, clock),
            CMD_PARTICIPANT_SET_ROLE => decide_set_role(state, command, clock),
            other => Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("participant domain does not handle {other}"),
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

/// Decides `participant.join`.
fn decide_join(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: ParticipantJoinPayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let participant_id = payload.participant_id.trim().to_string();
    if participant_id.is_empty() {
        return Decision::reject(codes::PARTICIPANT_ID_REQUIRED, "participant id is required");
    }
    let key = ParticipantId::new(participant_id.as_str());
    if state.participants.get(&key).is_some_and(|seat| !seat.left) {
        return Decision::reject(
            codes::PARTICIPANT_ALREADY_JOINED,
            format!("participant {participant_id} has already joined"),
        );
    }
    let role = payload.role.trim();
    let normalized = ParticipantJoinPayload {
        participant_id: participant_id.clone(),
        name: payload.name.trim().to_string(),
        role: if role.is_empty() { DEFAULT_ROLE.to_string() } else { role.to_string() },
    };
    let encoded = match encode_payload(CMD_PARTICIPANT_JOIN, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_PARTICIPANT_JOINED, clock.now())
            .with_entity(EntityType::new(ENTITY_PARTICIPANT), EntityId::new(participant_id))
            .with_payload(encoded),
    ])
}

/// Decides `participant.leave`.
fn decide_leave(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: ParticipantLeavePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let participant_id = payload.participant_id.trim().to_string();
    if participant_id.is_empty() {
        return Decision::reject(codes::PARTICIPANT_ID_REQUIRED, "participant id is required");
    }
    let key = ParticipantId::new(participant_id.as_str());
    if !state.participants.get(&key).is_some_and(|seat| !seat.left) {
        return Decision::reject(
            codes::PARTICIPANT_NOT_JOINED,
            format!("participant {participant_id} has not joined"),
        );
    }
    let normalized = ParticipantLeavePayload {
        participant_id: participant_id.clone(),
    };
    let encoded = match encode_payload(CMD_PARTICIPANT_LEAVE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_PARTICIPANT_LEFT, clock.now())
            .with_entity(EntityType::new(ENTITY_PARTICIPANT), EntityId::new(participant_id))
            .with_payload(encoded),
    ])
}

/// Decides `participant.set_role`.
fn decide_set_role(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: ParticipantRolePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let participant_id = payload.participant_id.trim().to_string();
    if participant_id.is_empty() {
        return Decision::reject(codes::PARTICIPANT_ID_REQUIRED, "participant id is required");
    }
    let role = payload.role.trim().to_string();
    if role.is_empty() {
        return Decision::reject(codes::PARTICIPANT_ROLE_REQUIRED, "participant role is required");
    }
    let key = ParticipantId::new(participant_id.as_str());
    if !state.participants.get(&key).is_some_and(|seat| !seat.left) {
        return Decision::reject(
            codes::PARTICIPANT_NOT_JOINED,
            format!("participant {participant_id} has not joined"),
        );
    }
    let normalized = ParticipantRolePayload {
        participant_id: participant_id.clone(),
        role,
    };
    let encoded = match encode_payload(CMD_PARTICIPANT_SET_ROLE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_PARTICIPANT_ROLE_SET, clock.now())
            .with_entity(EntityType::new(ENTITY_PARTICIPANT), EntityId::new(participant_id))
            .with_payload(encoded),
    ])
}

// ============================================================================
// SECTION: Folder
// ============================================================================

/// Folds participant events into the participant map.
fn fold(mut state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
    match event.event_type.as_str() {
        EVT_PARTICIPANT_JOINED => {
            let payload: ParticipantJoinPayload = decode_event_payload(event)?;
            let key = ParticipantId::new(payload.participant_id);
            state.participants.insert(key, ParticipantState {
                name: payload.name,
                role: payload.role,
                left: false,
                joined_at: Some(event.timestamp),
            });
        }
        EVT_PARTICIPANT_LEFT => {
            let payload: ParticipantLeavePayload = decode_event_payload(event)?;
            let key = ParticipantId::new(payload.participant_id);
            let Some(seat) = state.participants.get_mut(&key) else {
                return Err(FoldError::StateAssert {
                    message: format!("participant {key} has no seat to leave"),
                });
            };
            seat.left = true;
        }
        EVT_PARTICIPANT_ROLE_SET => {
            let payload: ParticipantRolePayload = decode_event_payload(event)?;
            let key = ParticipantId::new(payload.participant_id);
            let Some(seat) = state.participants.get_mut(&key) else {
                return Err(FoldError::StateAssert {
                    message: format!("participant {key} has no seat for a role change"),
                });
            };
            seat.role = payload.role;
        }
        _ => {}
    }
    Ok(state)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
