// system-tests/tests/functional.rs
// ============================================================================
// Module: Functional Scenarios
// Description: End-to-end write-path scenarios over the full pipeline.
// ============================================================================
//! ## Overview
//! The literal end-to-end scenarios: session start, double start, gated
//! mutation, duplicate outcome, compound outcome with effects, and
//! checkpoint-resumed replay.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use chronicle_core::ActorId;
use chronicle_core::ActorType;
use chronicle_core::AggregateState;
use chronicle_core::CampaignId;
use chronicle_core::Cancellation;
use chronicle_core::Checkpoint;
use chronicle_core::Command;
use chronicle_core::codes;
use chronicle_core::core::time::Clock;
use chronicle_core::interfaces::Applier;
use chronicle_core::interfaces::CheckpointStore;
use chronicle_core::interfaces::Journal;
use chronicle_runtime::NoopMetrics;
use chronicle_runtime::ReplayOptions;
use chronicle_runtime::replay;
use chronicle_store_memory::MemoryCheckpointStore;
use system_tests::Harness;

// ============================================================================
// SECTION: Scenario Helpers
// ============================================================================

fn campaign() -> CampaignId {
    CampaignId::new("camp-1")
}

fn start_session(harness: &Harness) {
    let command = Command::new(campaign(), "session.start", ActorType::System)
        .with_payload(r#"{"session_id":"sess-1","session_name":"Chapter One"}"#);
    let decision = harness.handler.handle(&command, &Cancellation::new()).expect("session start");
    assert!(!decision.is_rejected());
}

// ============================================================================
// SECTION: Session Start
// ============================================================================

#[test]
fn starting_a_session_persists_one_addressed_event() {
    let harness = Harness::new();
    let cancel = Cancellation::new();
    let command = Command::new(campaign(), "session.start", ActorType::System)
        .with_session(chronicle_core::SessionId::new("sess-1"))
        .with_payload(r#"{"session_id":"sess-1","session_name":"Chapter One"}"#);
    let outcome = harness.handler.execute(&command, &cancel).expect("execute");

    assert_eq!(outcome.decision.events.len(), 1);
    let event = &outcome.decision.events[0];
    assert_eq!(event.event_type, "session.started");
    assert_eq!(event.seq, 1);
    assert_eq!(event.entity_type.as_ref().map(|t| t.as_str()), Some("session"));
    assert_eq!(event.entity_id.as_ref().map(|i| i.as_str()), Some("sess-1"));

    let state = outcome.state.expect("state");
    assert!(state.session.started);
    assert_eq!(state.session.session_id.as_ref().map(|i| i.as_str()), Some("sess-1"));
    assert_eq!(state.session.name, "Chapter One");
}

#[test]
fn double_start_yields_zero_events_and_one_rejection() {
    let harness = Harness::new();
    start_session(&harness);
    let command = Command::new(campaign(), "session.start", ActorType::System)
        .with_payload(r#"{"session_id":"sess-1","session_name":"Chapter One"}"#);
    let decision = harness.handler.handle(&command, &Cancellation::new()).expect("second start");
    assert_eq!(decision.events.len(), 0);
    assert_eq!(decision.rejections.len(), 1);
    assert_eq!(decision.rejections[0].code, codes::SESSION_ALREADY_STARTED);
}

// ============================================================================
// SECTION: Gated Mutation
// ============================================================================

#[test]
fn gated_command_is_rejected_while_gate_is_open() {
    let harness = Harness::new();
    let cancel = Cancellation::new();
    start_session(&harness);
    let open = Command::new(campaign(), "session.open_gate", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"))
        .with_payload(r#"{"gate_id":"gate-1","gate_type":"gm_consequence"}"#);
    harness.handler.handle(&open, &cancel).expect("open gate");

    let create = Command::new(campaign(), "character.create", ActorType::Participant)
        .with_actor_id(ActorId::new("player-1"))
        .with_payload(r#"{"character_id":"char-1","name":"Vex"}"#);
    let outcome = harness.handler.execute(&create, &cancel).expect("gated create");
    assert_eq!(outcome.decision.rejections.len(), 1);
    assert_eq!(outcome.decision.rejections[0].code, codes::SESSION_GATE_OPEN);
    assert!(outcome.decision.rejections[0].message.contains("gate-1"));
    assert!(outcome.state.is_none(), "decider must not run on a gate rejection");

    // Nothing was persisted for the gated command.
    let stored = harness.journal.list_events(&campaign(), 0, 10, &cancel).expect("list");
    assert_eq!(stored.len(), 2);
}

// ============================================================================
// SECTION: Outcome Apply
// ============================================================================

#[test]
fn duplicate_roll_seq_is_rejected() {
    let harness = Harness::new();
    let cancel = Cancellation::new();
    start_session(&harness);
    let apply = Command::new(campaign(), "action.outcome.apply", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"))
        .with_payload(r#"{"request_id":"req-0","roll_seq":7}"#);
    harness.handler.handle(&apply, &cancel).expect("first apply");

    let repeat = Command::new(campaign(), "action.outcome.apply", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"))
        .with_payload(r#"{"request_id":"req-1","roll_seq":7}"#);
    let decision = harness.handler.handle(&repeat, &cancel).expect("repeat apply");
    assert_eq!(decision.events.len(), 0);
    assert_eq!(decision.rejections.len(), 1);
    assert_eq!(decision.rejections[0].code, codes::OUTCOME_ALREADY_APPLIED);
}

#[test]
fn outcome_with_pre_effect_persists_two_ordered_events() {
    let harness = Harness::new();
    let cancel = Cancellation::new();
    start_session(&harness);
    let apply = Command::new(campaign(), "action.outcome.apply", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"))
        .with_payload(
            r#"{"request_id":"req-1","roll_seq":3,"pre_effects":[{"type":"session.spotlight_set","entity_type":"session","entity_id":"s1","payload":{"spotlight_type":"character","character_id":"char-1"}}],"post_effects":[]}"#,
        );
    let outcome = harness.handler.execute(&apply, &cancel).expect("apply");

    assert_eq!(outcome.decision.events.len(), 2);
    assert_eq!(outcome.decision.events[0].event_type, "session.spotlight_set");
    assert_eq!(outcome.decision.events[1].event_type, "action.outcome_applied");
    assert_eq!(outcome.decision.events[1].seq, outcome.decision.events[0].seq + 1);
    assert_eq!(
        outcome.decision.events[1].prev_hash,
        outcome.decision.events[0].chain_hash,
        "batch must persist atomically in order"
    );
    let state = outcome.state.expect("state");
    assert!(state.actions.applied_outcomes.contains(&3));
}

// ============================================================================
// SECTION: Checkpoint Resume
// ============================================================================

#[test]
fn checkpoint_resume_lists_only_the_tail() {
    let harness = Harness::new();
    let cancel = Cancellation::new();
    start_session(&harness);
    for n in 0 .. 19 {
        let join = Command::new(campaign(), "participant.join", ActorType::System)
            .with_payload(&format!(r#"{{"participant_id":"player-{n}","name":"P{n}"}}"#));
        harness.handler.handle(&join, &cancel).expect("join");
    }
    let all = harness.journal.list_events(&campaign(), 0, 100, &cancel).expect("list");
    assert_eq!(all.len(), 20);

    // Rebuild the first ten events, then resume from a checkpoint.
    let folder = &harness.built.folder;
    let clock = harness.clock.as_ref();
    let mut prefix_state = AggregateState::for_campaign(campaign());
    for event in &all[.. 10] {
        prefix_state = folder.apply(prefix_state, event).expect("prefix fold");
    }
    let checkpoints = MemoryCheckpointStore::new();
    checkpoints
        .save(
            &Checkpoint {
                campaign_id: campaign(),
                last_seq: 10,
                updated_at: clock.now(),
            },
            &cancel,
        )
        .expect("save checkpoint");

    let resumed = replay(
        harness.journal.as_ref(),
        Some(&checkpoints),
        None,
        folder.as_ref(),
        clock,
        &NoopMetrics,
        &campaign(),
        prefix_state,
        ReplayOptions::default(),
        &cancel,
    )
    .expect("resume");
    assert_eq!(resumed.folded, 10, "only events 11..20 replay after the checkpoint");
    assert_eq!(resumed.last_seq, 20);

    let from_zero = replay(
        harness.journal.as_ref(),
        None,
        None,
        folder.as_ref(),
        clock,
        &NoopMetrics,
        &campaign(),
        AggregateState::for_campaign(campaign()),
        ReplayOptions::default(),
        &cancel,
    )
    .expect("from zero");
    assert_eq!(resumed.state, from_zero.state);
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

#[test]
fn audit_only_note_is_persisted_but_never_folded() {
    let harness = Harness::new();
    let cancel = Cancellation::new();
    start_session(&harness);
    let before = harness
        .handler
        .execute(
            &Command::new(campaign(), "session.log_note", ActorType::Gm)
                .with_actor_id(ActorId::new("gm-1"))
                .with_payload(r#"{"note":"the bridge is out"}"#),
            &cancel,
        )
        .expect("log note");
    assert_eq!(before.decision.events.len(), 1);
    assert_eq!(before.decision.events[0].event_type, "session.note_logged");

    // The note is durable in the journal but leaves folded state untouched.
    let stored = harness.journal.list_events(&campaign(), 0, 10, &cancel).expect("list");
    assert_eq!(stored.len(), 2);
    let replayed = replay(
        harness.journal.as_ref(),
        None,
        None,
        harness.built.folder.as_ref(),
        harness.clock.as_ref(),
        &NoopMetrics,
        &campaign(),
        AggregateState::for_campaign(campaign()),
        ReplayOptions::default(),
        &cancel,
    )
    .expect("replay");
    let mut without_note = AggregateState::for_campaign(campaign());
    without_note = harness.built.folder.apply(without_note, &stored[0]).expect("fold start");
    assert_eq!(replayed.state, without_note);
}
