// crates/chronicle-domains/src/action.rs
// ============================================================================
// Module: Action Domain
// Description: Action outcome application with ordered pre/post effects.
// Purpose: Decide and fold the compound outcome-apply command and its event.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Applying an action outcome is the one place a single command produces a
//! compound, ordered event list: allow-listed pre-effects, the main
//! `action.outcome_applied`, then post-effects. Effects must be core-owned
//! session events from the allow-listed set; a roll sequence is applied at
//! most once.

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
use chronicle_core::GatePolicy;
use chronicle_core::Owner;
use chronicle_core::RegistryError;
use chronicle_core::codes;
use chronicle_core::core::registry::AddressingPolicy;
use chronicle_core::core::time::Clock;
use chronicle_core::typed_validator;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::DomainPackage;
use crate::session::EVT_SESSION_GATE_OPENED;
use crate::session::EVT_SESSION_SPOTLIGHT_SET;
use crate::support::decode_command_payload;
use crate::support::decode_event_payload;
use crate::support::encode_payload;

// ============================================================================
// SECTION: Type Constants
// ============================================================================

/// Command: apply an action outcome.
pub const CMD_ACTION_OUTCOME_APPLY: &str = "action.outcome.apply";

/// Event: an action outcome was applied.
pub const EVT_ACTION_OUTCOME_APPLIED: &str = "action.outcome_applied";

/// Entity type label for action-addressed events.
const ENTITY_ACTION: &str = "action";

/// System type prefix; effects carrying it are refused.
const SYSTEM_TYPE_PREFIX: &str = "sys.";

/// Event types an outcome effect may name.
const ALLOWED_EFFECT_TYPES: [&str; 2] = [EVT_SESSION_GATE_OPENED, EVT_SESSION_SPOTLIGHT_SET];

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Side-effect specification inside an outcome-apply payload.
///
/// # Invariants
/// - `effect_type` must be core-owned and allow-listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    /// Event type the effect emits.
    #[serde(rename = "type")]
    pub effect_type: String,
    /// Entity type the effect addresses.
    #[serde(default)]
    pub entity_type: String,
    /// Entity identifier the effect addresses.
    #[serde(default)]
    pub entity_id: String,
    /// Effect payload, passed through to the emitted event.
    #[serde(default)]
    pub payload: Value,
}

/// Payload for `action.outcome.apply`.
///
/// # Invariants
/// - `request_id` and a non-zero `roll_seq` are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeApplyPayload {
    /// Request identifier of the outcome application.
    pub request_id: String,
    /// Roll sequence the outcome resolves; applied at most once.
    #[serde(default)]
    pub roll_seq: u64,
    /// Free-form outcome description, passed through to the event.
    #[serde(default)]
    pub outcome: Value,
    /// Effects emitted before the outcome event.
    #[serde(default)]
    pub pre_effects: Vec<EffectSpec>,
    /// Effects emitted after the outcome event.
    #[serde(default)]
    pub post_effects: Vec<EffectSpec>,
}

/// Payload for `action.outcome_applied`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeAppliedPayload {
    /// Request identifier of the outcome application.
    pub request_id: String,
    /// Roll sequence the outcome resolved.
    pub roll_seq: u64,
    /// Free-form outcome description.
    #[serde(default)]
    pub outcome: Value,
}

// ============================================================================
// SECTION: Domain Package
// ============================================================================

/// Action domain package.
pub struct ActionDomain;

impl DomainPackage for ActionDomain {
    fn name(&self) -> &'static str {
        "action"
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        registry.register(
            CommandDefinition::new(CMD_ACTION_OUTCOME_APPLY, Owner::Core)
                .with_validator(typed_validator::<OutcomeApplyPayload>())
                .with_gate(GatePolicy::session_allowed()),
        )?;
        Ok(())
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        registry.register(
            EventDefinition::new(EVT_ACTION_OUTCOME_APPLIED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<OutcomeAppliedPayload>()),
        )?;
        Ok(())
    }

    fn emittable_event_types(&self) -> Vec<String> {
        // The decider also re-emits the allow-listed session effects.
        vec![
            EVT_ACTION_OUTCOME_APPLIED.to_string(),
            EVT_SESSION_GATE_OPENED.to_string(),
            EVT_SESSION_SPOTLIGHT_SET.to_string(),
        ]
    }

    fn decider_handled_commands(&self) -> Vec<String> {
        vec![CMD_ACTION_OUTCOME_APPLY.to_string()]
    }

    fn fold_handled_types(&self) -> Vec<String> {
        vec![EVT_ACTION_OUTCOME_APPLIED.to_string()]
    }

    fn projection_handled_types(&self) -> Vec<String> {
        vec![EVT_ACTION_OUTCOME_APPLIED.to_string()]
    }

    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        match command.command_type.as_str() {
            CMD_ACTION_OUTCOME_APPLY => decide_outcome_apply(state, command, clock),
            other => Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("action domain does not handle {other}"),
            ),
        }
    }

    fn fold(&self, state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
        fold(state, event)
    }
}

// ============================================================================
// SECTION: Decider
// ============================================================================

/// Validates one effect specification against the allow-list.
fn check_effect(effect: &EffectSpec) -> Option<Decision> {
    if effect.effect_type.starts_with(SYSTEM_TYPE_PREFIX) {
        return Some(Decision::reject(
            codes::OUTCOME_EFFECT_SYSTEM_OWNED_FORBIDDEN,
            format!("outcome effect {} is system-owned", effect.effect_type),
        ));
    }
    if !ALLOWED_EFFECT_TYPES.contains(&effect.effect_type.as_str()) {
        return Some(Decision::reject(
            codes::OUTCOME_EFFECT_TYPE_FORBIDDEN,
            format!("outcome effect {} is not allow-listed", effect.effect_type),
        ));
    }
    None
}

/// Builds the event for one effect specification.
fn effect_event(
    command: &Command,
    effect: &EffectSpec,
    clock: &dyn Clock,
) -> Result<Event, Box<Decision>> {
    let payload =
        if effect.payload.is_null() { Value::Object(serde_json::Map::new()) } else { effect.payload.clone() };
    let encoded = encode_payload(&effect.effect_type, &payload)?;
    Ok(Event::from_command(command, effect.effect_type.as_str(), clock.now())
        .with_entity(
            EntityType::new(effect.entity_type.as_str()),
            EntityId::new(effect.entity_id.as_str()),
        )
        .with_payload(encoded))
}

/// Decides `action.outcome.apply`: pre-effects, outcome, post-effects.
fn decide_outcome_apply(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: OutcomeApplyPayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let request_id = payload.request_id.trim().to_string();
    if request_id.is_empty() {
        return Decision::reject(codes::REQUEST_ID_REQUIRED, "request id is required");
    }
    if payload.roll_seq == 0 {
        return Decision::reject(codes::ROLL_SEQ_REQUIRED, "roll sequence is required");
    }
    if state.actions.applied_outcomes.contains(&payload.roll_seq) {
        return Decision::reject(
            codes::OUTCOME_ALREADY_APPLIED,
            format!("outcome for roll {} is already applied", payload.roll_seq),
        );
    }
    for effect in payload.pre_effects.iter().chain(payload.post_effects.iter()) {
        if let Some(rejection) = check_effect(effect) {
            return rejection;
        }
    }

    let mut events = Vec::with_capacity(payload.pre_effects.len() + payload.post_effects.len() + 1);
    for effect in &payload.pre_effects {
        match effect_event(command, effect, clock) {
            Ok(event) => events.push(event),
            Err(decision) => return *decision,
        }
    }
    let applied = OutcomeAppliedPayload {
        request_id: request_id.clone(),
        roll_seq: payload.roll_seq,
        outcome: payload.outcome,
    };
    let encoded = match encode_payload(CMD_ACTION_OUTCOME_APPLY, &applied) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    events.push(
        Event::from_command(command, EVT_ACTION_OUTCOME_APPLIED, clock.now())
            .with_entity(EntityType::new(ENTITY_ACTION), EntityId::new(request_id))
            .with_payload(encoded),
    );
    for effect in &payload.post_effects {
        match effect_event(command, effect, clock) {
            Ok(event) => events.push(event),
            Err(decision) => return *decision,
        }
    }
    Decision::accept(events)
}

// ============================================================================
// SECTION: Folder
// ============================================================================

/// Folds action events into the action sub-state.
fn fold(mut state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
    if event.event_type == EVT_ACTION_OUTCOME_APPLIED {
        let payload: OutcomeAppliedPayload = decode_event_payload(event)?;
        state.actions.applied_outcomes.insert(payload.roll_seq);
    }
    Ok(state)
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

    use chronicle_core::ActorId;
    use chronicle_core::ActorType;
    use chronicle_core::AggregateState;
    use chronicle_core::CampaignId;
    use chronicle_core::Command;
    use chronicle_core::FixedClock;
    use chronicle_core::RequestId;
    use chronicle_core::Timestamp;
    use chronicle_core::codes;

    use super::ActionDomain;
    use super::CMD_ACTION_OUTCOME_APPLY;
    use super::EVT_ACTION_OUTCOME_APPLIED;
    use crate::DomainPackage;
    use crate::session::EVT_SESSION_SPOTLIGHT_SET;

    fn clock() -> FixedClock {
        FixedClock::new(Timestamp::from_unix_nanos(1_700_000_000_000_000_000).expect("timestamp"))
    }

    fn apply_command(payload: &str) -> Command {
        Command::new(CampaignId::new("camp-1"), CMD_ACTION_OUTCOME_APPLY, ActorType::Gm)
            .with_actor_id(ActorId::new("gm-1"))
            .with_request(RequestId::new("req-1"))
            .with_payload(payload)
    }

    #[test]
    fn outcome_apply_emits_single_event_without_effects() {
        let command = apply_command(r#"{"request_id":"req-1","roll_seq":3}"#);
        let decision = ActionDomain.decide(&AggregateState::default(), &command, &clock());
        assert_eq!(decision.events.len(), 1);
        assert_eq!(decision.events[0].event_type, EVT_ACTION_OUTCOME_APPLIED);
    }

    #[test]
    fn outcome_apply_orders_pre_effects_first() {
        let command = apply_command(
            r#"{"request_id":"req-1","roll_seq":3,"pre_effects":[{"type":"session.spotlight_set","entity_type":"session","entity_id":"s1","payload":{"spotlight_type":"character","character_id":"char-1"}}],"post_effects":[]}"#,
        );
        let decision = ActionDomain.decide(&AggregateState::default(), &command, &clock());
        assert_eq!(decision.events.len(), 2);
        assert_eq!(decision.events[0].event_type, EVT_SESSION_SPOTLIGHT_SET);
        assert_eq!(decision.events[1].event_type, EVT_ACTION_OUTCOME_APPLIED);
    }

    #[test]
    fn outcome_apply_rejects_duplicate_roll_seq() {
        let mut state = AggregateState::default();
        state.actions.applied_outcomes.insert(7);
        let command = apply_command(r#"{"request_id":"req-1","roll_seq":7}"#);
        let decision = ActionDomain.decide(&state, &command, &clock());
        assert_eq!(decision.events.len(), 0);
        assert_eq!(decision.rejections[0].code, codes::OUTCOME_ALREADY_APPLIED);
    }

    #[test]
    fn outcome_apply_rejects_system_owned_effects() {
        let command = apply_command(
            r#"{"request_id":"req-1","roll_seq":3,"pre_effects":[{"type":"sys.d20.check_resolved","entity_type":"character","entity_id":"c1"}]}"#,
        );
        let decision = ActionDomain.decide(&AggregateState::default(), &command, &clock());
        assert_eq!(decision.rejections[0].code, codes::OUTCOME_EFFECT_SYSTEM_OWNED_FORBIDDEN);
    }

    #[test]
    fn outcome_apply_rejects_non_allowlisted_effects() {
        let command = apply_command(
            r#"{"request_id":"req-1","roll_seq":3,"post_effects":[{"type":"session.ended","entity_type":"session","entity_id":"s1"}]}"#,
        );
        let decision = ActionDomain.decide(&AggregateState::default(), &command, &clock());
        assert_eq!(decision.rejections[0].code, codes::OUTCOME_EFFECT_TYPE_FORBIDDEN);
    }

    #[test]
    fn outcome_apply_requires_request_id_and_roll_seq() {
        let missing_request = apply_command(r#"{"request_id":"","roll_seq":3}"#);
        let decision = ActionDomain.decide(&AggregateState::default(), &missing_request, &clock());
        assert_eq!(decision.rejections[0].code, codes::REQUEST_ID_REQUIRED);

        let missing_roll = apply_command(r#"{"request_id":"req-1"}"#);
        let decision = ActionDomain.decide(&AggregateState::default(), &missing_roll, &clock());
        assert_eq!(decision.rejections[0].code, codes::ROLL_SEQ_REQUIRED);
    }

    #[test]
    fn fold_records_applied_roll_seq() {
        let command = apply_command(r#"{"request_id":"req-1","roll_seq":3}"#);
        let decision = ActionDomain.decide(&AggregateState::default(), &command, &clock());
        let state = ActionDomain
            .fold(AggregateState::default(), &decision.events[0])
            .expect("fold");
        assert!(state.actions.applied_outcomes.contains(&3));
    }
}
