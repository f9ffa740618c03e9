// crates/chronicle-domains/src/invite.rs
// ============================================================================
// Module: Invite Domain
// Description: Invite creation, acceptance, and revocation.
// Purpose: Decide and fold invite commands and events.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The invite domain owns the invite map. `invite.revoked` carries
//! replay-only intent: it must fold (the invite leaves the pending state)
//! but no projection consumes it.

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
use chronicle_core::Intent;
use chronicle_core::InviteId;
use chronicle_core::InviteState;
use chronicle_core::InviteStatus;
use chronicle_core::Owner;
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

/// Command: create an invite.
pub const CMD_INVITE_CREATE: &str = "invite.create";
/// Command: accept an invite.
pub const CMD_INVITE_ACCEPT: &str = "invite.accept";
/// Command: revoke an invite.
pub const CMD_INVITE_REVOKE: &str = "invite.revoke";

/// Event: an invite was created.
pub const EVT_INVITE_CREATED: &str = "invite.created";
/// Event: an invite was accepted.
pub const EVT_INVITE_ACCEPTED: &str = "invite.accepted";
/// Event: an invite was revoked (replay-only).
pub const EVT_INVITE_REVOKED: &str = "invite.revoked";

/// Entity type label for invite-addressed events.
const ENTITY_INVITE: &str = "invite";

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Payload for `invite.create` and `invite.created`.
///
/// # Invariants
/// - `invite_id` is required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCreatePayload {
    /// Identifier of the new invite.
    pub invite_id: String,
    /// Opaque recipient reference (email hash, handle, etc.).
    #[serde(default)]
    pub recipient: String,
}

/// Payload for `invite.accept` and `invite.accepted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteAcceptPayload {
    /// Identifier of the invite.
    pub invite_id: String,
}

/// Payload for `invite.revoke` and `invite.revoked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRevokePayload {
    /// Identifier of the invite.
    pub invite_id: String,
}

// ============================================================================
// SECTION: Domain Package
// ============================================================================

/// Invite domain package.
pub struct InviteDomain;

impl DomainPackage for InviteDomain {
    fn name(&self) -> &'static str {
        "invite"
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        registry.register(
            CommandDefinition::new(CMD_INVITE_CREATE, Owner::Core)
                .with_validator(typed_validator::<InviteCreatePayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_INVITE_ACCEPT, Owner::Core)
                .with_validator(typed_validator::<InviteAcceptPayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_INVITE_REVOKE, Owner::Core)
                .with_validator(typed_validator::<InviteRevokePayload>()),
        )?;
        Ok(())
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        registry.register(
            EventDefinition::new(EVT_INVITE_CREATED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<InviteCreatePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_INVITE_ACCEPTED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<InviteAcceptPayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_INVITE_REVOKED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<InviteRevokePayload>())
                .with_intent(Intent::ReplayOnly),
        )?;
        Ok(())
    }

    fn emittable_event_types(&self) -> Vec<String> {
        vec![
            EVT_INVITE_CREATED.to_string(),
            EVT_INVITE_ACCEPTED.to_string(),
            EVT_INVITE_REVOKED.to_string(),
        ]
    }

    fn decider_handled_commands(&self) -> Vec<String> {
        vec![
            CMD_INVITE_CREATE.to_string(),
            CMD_INVITE_ACCEPT.to_string(),
            CMD_INVITE_REVOKE.to_string(),
        ]
    }

    fn fold_handled_types(&self) -> Vec<String> {
        self.emittable_event_types()
    }

    fn projection_handled_types(&self) -> Vec<String> {
        // invite.revoked is replay-only; projections never see it.
        vec![EVT_INVITE_CREATED.to_string(), EVT_INVITE_ACCEPTED.to_string()]
    }

    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        match command.command_type.as_str() {
            CMD_INVITE_CREATE => decide_create(state, command, clock),
            CMD_INVITE_ACCEPT => decide_accept(state, command, clock),
            CMD_INVITE_REVOKE => decide_revoke(state, command, clock),
            other => Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("invite domain does not handle {other}"),
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

/// Decides `invite.create`.
fn decide_create(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: InviteCreatePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let invite_id = payload.invite_id.trim().to_string();
    if invite_id.is_empty() {
        return Decision::reject(codes::INVITE_ID_REQUIRED, "invite id is required");
    }
    if state.invites.contains_key(&InviteId::new(invite_id.as_str())) {
        return Decision::reject(
            codes::INVITE_ALREADY_EXISTS,
            format!("invite {invite_id} already exists"),
        );
    }
    let normalized = InviteCreatePayload {
        invite_id: invite_id.clone(),
        recipient: payload.recipient.trim().to_string(),
    };
    let encoded = match encode_payload(CMD_INVITE_CREATE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_INVITE_CREATED, clock.now())
            .with_entity(EntityType::new(ENTITY_INVITE), EntityId::new(invite_id))
            .with_payload(encoded),
    ])
}

/// Looks up a pending invite, returning a rejection when it cannot transition.
fn require_pending(state: &AggregateState, invite_id: &str) -> Option<Decision> {
    match state.invites.get(&InviteId::new(invite_id)) {
        None => Some(Decision::reject(
            codes::INVITE_NOT_FOUND,
            format!("invite {invite_id} does not exist"),
        )),
        Some(invite) if invite.status != InviteStatus::Pending => Some(Decision::reject(
            codes::INVITE_NOT_PENDING,
            format!("invite {invite_id} is not pending"),
        )),
        Some(_) => None,
    }
}

/// Decides `invite.accept`.
fn decide_accept(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: InviteAcceptPayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let invite_id = payload.invite_id.trim().to_string();
    if invite_id.is_empty() {
        return Decision::reject(codes::INVITE_ID_REQUIRED, "invite id is required");
    }
    if let Some(rejection) = require_pending(state, &invite_id) {
        return rejection;
    }
    let normalized = InviteAcceptPayload {
        invite_id: invite_id.clone(),
    };
    let encoded = match encode_payload(CMD_INVITE_ACCEPT, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_INVITE_ACCEPTED, clock.now())
            .with_entity(EntityType::new(ENTITY_INVITE), EntityId::new(invite_id))
            .with_payload(encoded),
    ])
}

/// Decides `invite.revoke`.
fn decide_revoke(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: InviteRevokePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let invite_id = payload.invite_id.trim().to_string();
    if invite_id.is_empty() {
        return Decision::reject(codes::INVITE_ID_REQUIRED, "invite id is required");
    }
    if let Some(rejection) = require_pending(state, &invite_id) {
        return rejection;
    }
    let normalized = InviteRevokePayload {
        invite_id: invite_id.clone(),
    };
    let encoded = match encode_payload(CMD_INVITE_REVOKE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_INVITE_REVOKED, clock.now())
            .with_entity(EntityType::new(ENTITY_INVITE), EntityId::new(invite_id))
            .with_payload(encoded),
    ])
}

// ============================================================================
// SECTION: Folder
// ============================================================================

/// Folds invite events into the invite map.
fn fold(mut state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
    match event.event_type.as_str() {
        EVT_INVITE_CREATED => {
            let payload: InviteCreatePayload = decode_event_payload(event)?;
            let key = InviteId::new(payload.invite_id);
            state.invites.insert(key, InviteState {
                recipient: payload.recipient,
                status: InviteStatus::Pending,
            });
        }
        EVT_INVITE_ACCEPTED => {
            let payload: InviteAcceptPayload = decode_event_payload(event)?;
            let key = InviteId::new(payload.invite_id);
            let Some(invite) = state.invites.get_mut(&key) else {
                return Err(FoldError::StateAssert {
                    message: format!("invite {key} does not exist to accept"),
                });
            };
            invite.status = InviteStatus::Accepted;
        }
        EVT_INVITE_REVOKED => {
            let payload: InviteRevokePayload = decode_event_payload(event)?;
            let key = InviteId::new(payload.invite_id);
            let Some(invite) = state.invites.get_mut(&key) else {
                return Err(FoldError::StateAssert {
                    message: format!("invite {key} does not exist to revoke"),
                });
            };
            invite.status = InviteStatus::Revoked;
        }
        _ => {}
    }
    Ok(state)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
