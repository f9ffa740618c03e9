// crates/chronicle-runtime/src/pipeline.rs
// ============================================================================
// Module: Command Handler Pipeline
// Description: Orchestrates validate, gate, load, decide, persist, fold.
// Purpose: Provide the uniform write path for campaign commands.
// Dependencies: chronicle-core, thiserror
// ============================================================================

//! ## Overview
//! The handler is the central orchestrator: validate against the command
//! registry, evaluate the session gate, load replayed state, call the
//! decider, re-validate emitted events, batch-append atomically, fold the
//! persisted events, then save checkpoint and snapshot. Failures before the
//! batch append returns are retryable; failures after are wrapped in the
//! non-retryable marker because the events are already durable: transport
//! must not retry, and in-process recovery is a fresh replay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::error::Error;
use std::sync::Arc;

use chronicle_core::AggregateState;
use chronicle_core::Cancellation;
use chronicle_core::Checkpoint;
use chronicle_core::Command;
use chronicle_core::CommandRegistry;
use chronicle_core::Decision;
use chronicle_core::EventRegistry;
use chronicle_core::GateScope;
use chronicle_core::RegistryError;
use chronicle_core::SystemClock;
use chronicle_core::codes;
use chronicle_core::core::time::Clock;
use chronicle_core::interfaces::Applier;
use chronicle_core::interfaces::CheckpointStore;
use chronicle_core::interfaces::Decider;
use chronicle_core::interfaces::FoldError;
use chronicle_core::interfaces::GateEvaluator;
use chronicle_core::interfaces::Journal;
use chronicle_core::interfaces::JournalError;
use chronicle_core::interfaces::LoadError;
use chronicle_core::interfaces::SessionStateLoader;
use chronicle_core::interfaces::SnapshotStore;
use chronicle_core::interfaces::StateLoader;
use chronicle_core::interfaces::StoreError;
use thiserror::Error;

use crate::gate::PolicyGateEvaluator;
use crate::telemetry::CommandOutcome;
use crate::telemetry::NoopMetrics;
use crate::telemetry::PipelineMetrics;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Handler pipeline errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `NonRetryable` means events persisted but post-persist work failed;
///   retrying would duplicate events.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Command or event failed registry validation.
    #[error(transparent)]
    Validation(#[from] RegistryError),
    /// State or session load failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// Journal append failed before any event persisted.
    #[error(transparent)]
    Journal(#[from] JournalError),
    /// Folding a persisted event failed (wrapped non-retryable by the
    /// pipeline).
    #[error(transparent)]
    Fold(#[from] FoldError),
    /// Checkpoint or snapshot store failed (wrapped non-retryable by the
    /// pipeline when raised after persistence).
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The decider produced neither events nor rejections.
    #[error("{code}: decider for {command_type} produced neither events nor rejections", code = codes::COMMAND_MUST_MUTATE)]
    DecisionEmpty {
        /// Offending command type.
        command_type: String,
    },
    /// Events persisted but post-persist work failed; do not retry.
    #[error("events persisted but not applied (non-retryable): {0}")]
    NonRetryable(#[source] Box<HandlerError>),
}

impl HandlerError {
    /// Returns true when the error marks persisted-but-not-applied work.
    #[must_use]
    pub const fn is_non_retryable(&self) -> bool {
        matches!(self, Self::NonRetryable(_))
    }
}

/// Walks an error chain looking for the non-retryable marker.
///
/// Transport middleware uses this to distinguish permanent failures from
/// safely retryable ones.
#[must_use]
pub fn is_non_retryable(err: &(dyn Error + 'static)) -> bool {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(inspected) = current {
        if let Some(handler_err) = inspected.downcast_ref::<HandlerError>()
            && handler_err.is_non_retryable()
        {
            return true;
        }
        current = inspected.source();
    }
    false
}

/// Pipeline construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// A required collaborator was not configured.
    #[error("handler requires a {name}")]
    MissingCollaborator {
        /// Collaborator name.
        name: &'static str,
    },
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of one executed command.
///
/// # Invariants
/// - `state` is present only when the pipeline loaded and folded state;
///   gate rejections short-circuit before loading.
/// - Accepted decisions carry the stored envelopes (sequence and hashes
///   assigned).
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    /// Decision produced for the command.
    pub decision: Decision,
    /// Aggregate state after folding the persisted events.
    pub state: Option<AggregateState>,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`CommandHandler`].
///
/// # Invariants
/// - `build` succeeds only when every required collaborator is configured.
/// - Gate evaluator, clock, and metrics fall back to defaults.
#[derive(Default)]
pub struct CommandHandlerBuilder {
    /// Command registry.
    command_registry: Option<Arc<CommandRegistry>>,
    /// Event registry.
    event_registry: Option<Arc<EventRegistry>>,
    /// Journal.
    journal: Option<Arc<dyn Journal>>,
    /// Optional checkpoint store.
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    /// Optional snapshot store.
    snapshots: Option<Arc<dyn SnapshotStore>>,
    /// Decider.
    decider: Option<Arc<dyn Decider>>,
    /// Applier.
    applier: Option<Arc<dyn Applier>>,
    /// Replay-backed state loader.
    state_loader: Option<Arc<dyn StateLoader>>,
    /// Session state loader for gate checks.
    gate_loader: Option<Arc<dyn SessionStateLoader>>,
    /// Gate evaluator.
    gate_evaluator: Option<Arc<dyn GateEvaluator>>,
    /// Clock.
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    /// Metrics sink.
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl CommandHandlerBuilder {
    /// Sets the command registry.
    #[must_use]
    pub fn command_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.command_registry = Some(registry);
        self
    }

    /// Sets the event registry.
    #[must_use]
    pub fn event_registry(mut self, registry: Arc<EventRegistry>) -> Self {
        self.event_registry = Some(registry);
        self
    }

    /// Sets the journal.
    #[must_use]
    pub fn journal(mut self, journal: Arc<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Sets the checkpoint store.
    #[must_use]
    pub fn checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// Sets the snapshot store.
    #[must_use]
    pub fn snapshots(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    /// Sets the decider.
    #[must_use]
    pub fn decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = Some(decider);
        self
    }

    /// Sets the applier.
    #[must_use]
    pub fn applier(mut self, applier: Arc<dyn Applier>) -> Self {
        self.applier = Some(applier);
        self
    }

    /// Sets the replay-backed state loader.
    #[must_use]
    pub fn state_loader(mut self, loader: Arc<dyn StateLoader>) -> Self {
        self.state_loader = Some(loader);
        self
    }

    /// Sets the session state loader for gate checks.
    #[must_use]
    pub fn gate_loader(mut self, loader: Arc<dyn SessionStateLoader>) -> Self {
        self.gate_loader = Some(loader);
        self
    }

    /// Overrides the gate evaluator.
    #[must_use]
    pub fn gate_evaluator(mut self, evaluator: Arc<dyn GateEvaluator>) -> Self {
        self.gate_evaluator = Some(evaluator);
        self
    }

    /// Overrides the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the metrics sink.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the handler.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerBuildError::MissingCollaborator`] when a required
    /// collaborator is absent.
    pub fn build(self) -> Result<CommandHandler, HandlerBuildError> {
        Ok(CommandHandler {
            command_registry: self.command_registry.ok_or(
                HandlerBuildError::MissingCollaborator {
                    name: "command registry",
                },
            )?,
            event_registry: self.event_registry.ok_or(
                HandlerBuildError::MissingCollaborator {
                    name: "event registry",
                },
            )?,
            journal: self.journal.ok_or(HandlerBuildError::MissingCollaborator {
                name: "journal",
            })?,
            checkpoints: self.checkpoints,
            snapshots: self.snapshots,
            decider: self.decider.ok_or(HandlerBuildError::MissingCollaborator {
                name: "decider",
            })?,
            applier: self.applier.ok_or(HandlerBuildError::MissingCollaborator {
                name: "applier",
            })?,
            state_loader: self.state_loader.ok_or(HandlerBuildError::MissingCollaborator {
                name: "state loader",
            })?,
            gate_loader: self.gate_loader.ok_or(HandlerBuildError::MissingCollaborator {
                name: "gate loader",
            })?,
            gate_evaluator: self.gate_evaluator.unwrap_or_else(|| Arc::new(PolicyGateEvaluator)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
        })
    }
}

// ============================================================================
// SECTION: Command Handler
// ============================================================================

/// The uniform write path for campaign commands.
///
/// # Invariants
/// - Per-campaign serialization is provided by the journal; the handler
///   itself is stateless and safe for concurrent use.
/// - Each execution replays its own state; state is never shared between
///   concurrent handlers.
pub struct CommandHandler {
    /// Command registry.
    command_registry: Arc<CommandRegistry>,
    /// Event registry.
    event_registry: Arc<EventRegistry>,
    /// Journal.
    journal: Arc<dyn Journal>,
    /// Optional checkpoint store.
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    /// Optional snapshot store.
    snapshots: Option<Arc<dyn SnapshotStore>>,
    /// Decider.
    decider: Arc<dyn Decider>,
    /// Applier.
    applier: Arc<dyn Applier>,
    /// Replay-backed state loader.
    state_loader: Arc<dyn StateLoader>,
    /// Session state loader for gate checks.
    gate_loader: Arc<dyn SessionStateLoader>,
    /// Gate evaluator.
    gate_evaluator: Arc<dyn GateEvaluator>,
    /// Clock.
    clock: Arc<dyn Clock + Send + Sync>,
    /// Metrics sink.
    metrics: Arc<dyn PipelineMetrics>,
}

impl CommandHandler {
    /// Returns a builder for the handler.
    #[must_use]
    pub fn builder() -> CommandHandlerBuilder {
        CommandHandlerBuilder::default()
    }

    /// Handles a command, returning only the decision.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`]; see [`CommandHandler::execute`].
    pub fn handle(
        &self,
        command: &Command,
        cancel: &Cancellation,
    ) -> Result<Decision, HandlerError> {
        self.execute(command, cancel).map(|outcome| outcome.decision)
    }

    /// Executes a command, returning the decision and the folded state.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`]: validation, load, and journal errors are
    /// retryable; fold and store errors raised after persistence arrive
    /// wrapped in [`HandlerError::NonRetryable`].
    pub fn execute(
        &self,
        command: &Command,
        cancel: &Cancellation,
    ) -> Result<HandlerOutcome, HandlerError> {
        let command_type = command.command_type.trim().to_string();
        let result = self.execute_inner(command, cancel);
        match &result {
            Ok(outcome) => {
                let label = if outcome.state.is_none() {
                    CommandOutcome::GateRejected
                } else if outcome.decision.is_rejected() {
                    CommandOutcome::Rejected
                } else {
                    CommandOutcome::Accepted
                };
                self.metrics.on_command(&command_type, label, outcome.decision.events.len());
            }
            Err(_) => {
                self.metrics.on_command(&command_type, CommandOutcome::Failed, 0);
            }
        }
        result
    }

    /// Runs the ten pipeline steps.
    fn execute_inner(
        &self,
        command: &Command,
        cancel: &Cancellation,
    ) -> Result<HandlerOutcome, HandlerError> {
        let command = self.command_registry.validate_for_decision(command)?;

        if let Some(definition) = self.command_registry.definition(&command.command_type)
            && definition.gate.scope == GateScope::Session
            && !definition.gate.allow_when_open
        {
            let session = self.gate_loader.load_session(&command.campaign_id, cancel)?;
            let gate_decision = self.gate_evaluator.evaluate(definition, &session);
            if gate_decision.is_rejected() {
                return Ok(HandlerOutcome {
                    decision: gate_decision,
                    state: None,
                });
            }
        }

        let mut state = self.state_loader.load(&command.campaign_id, cancel)?;

        let mut decision = self.decider.decide(&state, &command, self.clock.as_ref());
        if decision.is_empty() {
            return Err(HandlerError::DecisionEmpty {
                command_type: command.command_type,
            });
        }
        if decision.is_rejected() {
            decision.events.clear();
            return Ok(HandlerOutcome {
                decision,
                state: Some(state),
            });
        }

        let mut validated = Vec::with_capacity(decision.events.len());
        for event in &decision.events {
            validated.push(self.event_registry.validate_for_append(event)?);
        }

        let stored = self.journal.batch_append(validated, cancel)?;

        for event in &stored {
            state = match self.applier.apply(state, event) {
                Ok(state) => state,
                Err(err) => {
                    return Err(HandlerError::NonRetryable(Box::new(HandlerError::Fold(err))));
                }
            };
        }

        let last_seq = stored.last().map_or(0, |event| event.seq);
        if last_seq > 0 {
            if let Some(checkpoints) = &self.checkpoints {
                let checkpoint = Checkpoint {
                    campaign_id: command.campaign_id.clone(),
                    last_seq,
                    updated_at: self.clock.now(),
                };
                if let Err(err) = checkpoints.save(&checkpoint, cancel) {
                    return Err(HandlerError::NonRetryable(Box::new(HandlerError::Store(err))));
                }
            }
            if let Some(snapshots) = &self.snapshots
                && let Err(err) =
                    snapshots.save_state(&command.campaign_id, last_seq, &state, cancel)
            {
                return Err(HandlerError::NonRetryable(Box::new(HandlerError::Store(err))));
            }
        }

        Ok(HandlerOutcome {
            decision: Decision::accept(stored),
            state: Some(state),
        })
    }
}
