// crates/chronicle-runtime/tests/pipeline.rs
// ============================================================================
// Module: Pipeline Integration Tests
// Description: End-to-end command handling over the in-memory stores.
// Purpose: Verify validate, gate, decide, persist, fold, and checkpoint steps.
// ============================================================================

//! ## Overview
//! Exercises the full write path: accepted commands persist chained events
//! and fold state, rule violations surface as rejections, gate checks
//! short-circuit before the decider, empty decisions are fatal, and
//! post-persist failures carry the non-retryable marker.

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

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use chronicle_core::ActorId;
use chronicle_core::ActorType;
use chronicle_core::AggregateState;
use chronicle_core::CampaignId;
use chronicle_core::Cancellation;
use chronicle_core::Command;
use chronicle_core::Decision;
use chronicle_core::FixedClock;
use chronicle_core::SystemId;
use chronicle_core::SystemKey;
use chronicle_core::SystemVersion;
use chronicle_core::Timestamp;
use chronicle_core::codes;
use chronicle_core::Event;
use chronicle_core::core::time::Clock;
use chronicle_core::interfaces::Applier;
use chronicle_core::interfaces::CheckpointStore;
use chronicle_core::interfaces::Decider;
use chronicle_core::interfaces::FoldError;
use chronicle_core::interfaces::Journal;
use chronicle_core::interfaces::SnapshotStore;
use chronicle_runtime::CommandHandler;
use chronicle_runtime::HandlerError;
use chronicle_runtime::ReplayStateLoader;
use chronicle_runtime::build_default_registries;
use chronicle_runtime::build_registries;
use chronicle_runtime::is_non_retryable;
use chronicle_store_memory::MemoryCheckpointStore;
use chronicle_store_memory::MemoryJournal;
use chronicle_store_memory::MemorySnapshotStore;

use common::SYS_CMD_CHECK;
use common::SYS_EVT_CHECK_RESOLVED;
use common::TestModule;

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Everything a pipeline test needs in one place.
struct Harness {
    /// Handler under test.
    handler: CommandHandler,
    /// Shared journal.
    journal: Arc<MemoryJournal>,
    /// Shared checkpoint store.
    checkpoints: Arc<MemoryCheckpointStore>,
    /// Shared snapshot store.
    snapshots: Arc<MemorySnapshotStore>,
    /// Decider invocation counter.
    decider_calls: Arc<AtomicUsize>,
}

/// Decider wrapper counting invocations.
struct CountingDecider {
    /// Wrapped decider.
    inner: Arc<dyn Decider>,
    /// Invocation counter.
    calls: Arc<AtomicUsize>,
}

impl Decider for CountingDecider {
    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decide(state, command, clock)
    }
}

fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Timestamp::from_unix_nanos(1_700_000_000_000_000_000).expect("timestamp"),
    ))
}

fn harness_with_modules(modules: Vec<Arc<dyn chronicle_core::interfaces::GameModule>>) -> Harness {
    let built = build_registries(chronicle_domains::core_domains(), modules, Vec::new())
        .expect("startup validators");
    let journal = Arc::new(MemoryJournal::new());
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let clock = fixed_clock();
    let loader = Arc::new(ReplayStateLoader::new(
        Arc::clone(&journal) as _,
        Some(Arc::clone(&checkpoints) as _),
        Some(Arc::clone(&snapshots) as _),
        Arc::clone(&built.folder) as _,
        Arc::clone(&clock) as _,
    ));
    let decider_calls = Arc::new(AtomicUsize::new(0));
    let counting = Arc::new(CountingDecider {
        inner: Arc::clone(&built.router) as _,
        calls: Arc::clone(&decider_calls),
    });
    let handler = CommandHandler::builder()
        .command_registry(Arc::clone(&built.command_registry))
        .event_registry(Arc::clone(&built.event_registry))
        .journal(Arc::clone(&journal) as _)
        .checkpoints(Arc::clone(&checkpoints) as _)
        .snapshots(Arc::clone(&snapshots) as _)
        .decider(counting as _)
        .applier(Arc::clone(&built.folder) as _)
        .state_loader(Arc::clone(&loader) as _)
        .gate_loader(loader as _)
        .clock(clock as _)
        .build()
        .expect("handler");
    Harness {
        handler,
        journal,
        checkpoints,
        snapshots,
        decider_calls,
    }
}

fn harness() -> Harness {
    harness_with_modules(Vec::new())
}

fn start_session(command_payload: &str) -> Command {
    Command::new(CampaignId::new("camp-1"), "session.start", ActorType::System)
        .with_payload(command_payload)
}

// ============================================================================
// SECTION: Accept Path
// ============================================================================

#[test]
fn session_start_persists_and_folds() {
    let harness = harness();
    let cancel = Cancellation::new();
    let outcome = harness
        .handler
        .execute(
            &start_session(r#"{"session_id":"sess-1","session_name":"Chapter One"}"#),
            &cancel,
        )
        .expect("execute");
    assert_eq!(outcome.decision.events.len(), 1);
    let event = &outcome.decision.events[0];
    assert_eq!(event.event_type, "session.started");
    assert_eq!(event.seq, 1);
    assert!(!event.hash.is_empty());
    assert!(event.prev_hash.is_empty());
    assert_eq!(event.entity_type.as_ref().map(|t| t.as_str()), Some("session"));
    assert_eq!(event.entity_id.as_ref().map(|i| i.as_str()), Some("sess-1"));

    let state = outcome.state.expect("state");
    assert!(state.session.started);
    assert_eq!(state.session.session_id.as_ref().map(|i| i.as_str()), Some("sess-1"));
    assert_eq!(state.session.name, "Chapter One");

    let checkpoint = harness
        .checkpoints
        .get(&CampaignId::new("camp-1"), &cancel)
        .expect("checkpoint get")
        .expect("checkpoint");
    assert_eq!(checkpoint.last_seq, 1);
    let snapshot = harness
        .snapshots
        .get_state(&CampaignId::new("camp-1"), &cancel)
        .expect("snapshot get")
        .expect("snapshot");
    assert_eq!(snapshot.last_seq, 1);
    assert!(snapshot.state.session.started);
}

#[test]
fn double_start_is_rejected_after_replay() {
    let harness = harness();
    let cancel = Cancellation::new();
    let command = start_session(r#"{"session_id":"sess-1","session_name":"Chapter One"}"#);
    harness.handler.execute(&command, &cancel).expect("first start");
    let decision = harness.handler.handle(&command, &cancel).expect("second start");
    assert_eq!(decision.events.len(), 0);
    assert_eq!(decision.rejections.len(), 1);
    assert_eq!(decision.rejections[0].code, codes::SESSION_ALREADY_STARTED);
}

#[test]
fn compound_outcome_persists_atomically_in_order() {
    let harness = harness();
    let cancel = Cancellation::new();
    harness
        .handler
        .execute(&start_session(r#"{"session_id":"s1"}"#), &cancel)
        .expect("start");
    let apply = Command::new(CampaignId::new("camp-1"), "action.outcome.apply", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"))
        .with_payload(
            r#"{"request_id":"req-1","roll_seq":3,"pre_effects":[{"type":"session.spotlight_set","entity_type":"session","entity_id":"s1","payload":{"spotlight_type":"character","character_id":"char-1"}}],"post_effects":[]}"#,
        );
    let outcome = harness.handler.execute(&apply, &cancel).expect("apply");
    assert_eq!(outcome.decision.events.len(), 2);
    assert_eq!(outcome.decision.events[0].event_type, "session.spotlight_set");
    assert_eq!(outcome.decision.events[0].seq, 2);
    assert_eq!(outcome.decision.events[1].event_type, "action.outcome_applied");
    assert_eq!(outcome.decision.events[1].seq, 3);
    assert_eq!(
        outcome.decision.events[1].prev_hash,
        outcome.decision.events[0].chain_hash
    );
    let state = outcome.state.expect("state");
    assert!(state.actions.applied_outcomes.contains(&3));
    assert_eq!(state.session.spotlight_type, "character");
}

// ============================================================================
// SECTION: Gate Path
// ============================================================================

#[test]
fn open_gate_blocks_character_mutation_without_calling_decider() {
    let harness = harness();
    let cancel = Cancellation::new();
    harness
        .handler
        .execute(&start_session(r#"{"session_id":"s1"}"#), &cancel)
        .expect("start");
    let open = Command::new(CampaignId::new("camp-1"), "session.open_gate", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"))
        .with_payload(r#"{"gate_id":"gate-1","gate_type":"gm_consequence"}"#);
    harness.handler.execute(&open, &cancel).expect("open gate");

    let calls_before = harness.decider_calls.load(Ordering::SeqCst);
    let create = Command::new(CampaignId::new("camp-1"), "character.create", ActorType::Participant)
        .with_actor_id(ActorId::new("player-1"))
        .with_payload(r#"{"character_id":"char-1","name":"Vex"}"#);
    let outcome = harness.handler.execute(&create, &cancel).expect("gated create");
    assert!(outcome.state.is_none());
    assert_eq!(outcome.decision.rejections.len(), 1);
    assert_eq!(outcome.decision.rejections[0].code, codes::SESSION_GATE_OPEN);
    assert!(outcome.decision.rejections[0].message.contains("gate-1"));
    assert_eq!(harness.decider_calls.load(Ordering::SeqCst), calls_before);
}

#[test]
fn close_gate_is_permitted_while_gate_is_open() {
    let harness = harness();
    let cancel = Cancellation::new();
    harness
        .handler
        .execute(&start_session(r#"{"session_id":"s1"}"#), &cancel)
        .expect("start");
    let open = Command::new(CampaignId::new("camp-1"), "session.open_gate", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"))
        .with_payload(r#"{"gate_id":"gate-1","gate_type":"gm_consequence"}"#);
    harness.handler.execute(&open, &cancel).expect("open gate");
    let close = Command::new(CampaignId::new("camp-1"), "session.close_gate", ActorType::Gm)
        .with_actor_id(ActorId::new("gm-1"));
    let outcome = harness.handler.execute(&close, &cancel).expect("close gate");
    assert!(!outcome.decision.is_rejected());
    assert!(!outcome.state.expect("state").session.gate_open);
}

// ============================================================================
// SECTION: Failure Paths
// ============================================================================

/// Decider that always returns an empty decision.
struct EmptyDecider;

impl Decider for EmptyDecider {
    fn decide(&self, _state: &AggregateState, _command: &Command, _clock: &dyn Clock) -> Decision {
        Decision::empty()
    }
}

#[test]
fn empty_decision_is_a_fatal_error() {
    let built = build_default_registries().expect("startup");
    let journal = Arc::new(MemoryJournal::new());
    let clock = fixed_clock();
    let loader = Arc::new(ReplayStateLoader::new(
        Arc::clone(&journal) as _,
        None,
        None,
        Arc::clone(&built.folder) as _,
        Arc::clone(&clock) as _,
    ));
    let handler = CommandHandler::builder()
        .command_registry(Arc::clone(&built.command_registry))
        .event_registry(Arc::clone(&built.event_registry))
        .journal(journal as _)
        .decider(Arc::new(EmptyDecider) as _)
        .applier(Arc::clone(&built.folder) as _)
        .state_loader(Arc::clone(&loader) as _)
        .gate_loader(loader as _)
        .clock(clock as _)
        .build()
        .expect("handler");
    let err = handler
        .handle(&start_session(r#"{"session_id":"s1"}"#), &Cancellation::new())
        .unwrap_err();
    assert!(matches!(err, HandlerError::DecisionEmpty { .. }));
    assert!(err.to_string().contains(codes::COMMAND_MUST_MUTATE));
}

/// Applier that fails on every event.
struct FailingApplier;

impl Applier for FailingApplier {
    fn apply(&self, _state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
        Err(FoldError::StateAssert {
            message: format!("refusing to fold {}", event.event_type),
        })
    }
}

#[test]
fn post_persist_fold_failure_is_non_retryable() {
    let built = build_default_registries().expect("startup");
    let journal = Arc::new(MemoryJournal::new());
    let clock = fixed_clock();
    let loader = Arc::new(ReplayStateLoader::new(
        Arc::clone(&journal) as _,
        None,
        None,
        Arc::new(FailingApplier) as _,
        Arc::clone(&clock) as _,
    ));
    let handler = CommandHandler::builder()
        .command_registry(Arc::clone(&built.command_registry))
        .event_registry(Arc::clone(&built.event_registry))
        .journal(Arc::clone(&journal) as _)
        .decider(Arc::clone(&built.router) as _)
        .applier(Arc::new(FailingApplier) as _)
        .state_loader(Arc::clone(&loader) as _)
        .gate_loader(loader as _)
        .clock(clock as _)
        .build()
        .expect("handler");
    let cancel = Cancellation::new();
    let err = handler
        .handle(&start_session(r#"{"session_id":"s1"}"#), &cancel)
        .unwrap_err();
    assert!(err.is_non_retryable());
    assert!(is_non_retryable(&err));

    // The events are durable even though the fold failed.
    let stored = journal
        .list_events(&CampaignId::new("camp-1"), 0, 10, &cancel)
        .expect("list");
    assert_eq!(stored.len(), 1);
}

#[test]
fn pre_persist_errors_are_retryable() {
    let harness = harness();
    let unknown = Command::new(CampaignId::new("camp-1"), "session.vanish", ActorType::System);
    let err = harness.handler.handle(&unknown, &Cancellation::new()).unwrap_err();
    assert!(!err.is_non_retryable());
    assert!(!is_non_retryable(&err));
}

// ============================================================================
// SECTION: Module Routing
// ============================================================================

#[test]
fn system_command_routes_to_module_and_seeds_slot() {
    let harness = harness_with_modules(vec![Arc::new(TestModule::consistent()) as _]);
    let cancel = Cancellation::new();
    let check = Command::new(CampaignId::new("camp-1"), SYS_CMD_CHECK, ActorType::Participant)
        .with_actor_id(ActorId::new("player-1"))
        .with_system(SystemId::new("d20"), SystemVersion::new("1"))
        .with_payload(r#"{"check_id":"chk-1","character_id":"char-1","result":17}"#);
    let outcome = harness.handler.execute(&check, &cancel).expect("check");
    assert_eq!(outcome.decision.events.len(), 1);
    let event = &outcome.decision.events[0];
    assert_eq!(event.event_type, SYS_EVT_CHECK_RESOLVED);
    assert_eq!(event.system_id.as_ref().map(|i| i.as_str()), Some("d20"));

    let state = outcome.state.expect("state");
    let key = SystemKey::new(SystemId::new("d20"), SystemVersion::new("1"));
    let slot = state.systems.get(&key).expect("slot");
    assert_eq!(slot["resolved"]["chk-1"], serde_json::json!(17));
}

#[test]
fn journal_remains_empty_when_decider_rejects() {
    let harness = harness();
    let cancel = Cancellation::new();
    let end = Command::new(CampaignId::new("camp-1"), "session.end", ActorType::System);
    let decision = harness.handler.handle(&end, &cancel).expect("end");
    assert_eq!(decision.rejections[0].code, codes::SESSION_NOT_STARTED);
    let stored = harness
        .journal
        .list_events(&CampaignId::new("camp-1"), 0, 10, &cancel)
        .expect("list");
    assert!(stored.is_empty());
}
