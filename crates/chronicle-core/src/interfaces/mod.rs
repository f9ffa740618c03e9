// crates/chronicle-core/src/interfaces/mod.rs
// ============================================================================
// Module: Chronicle Interfaces
// Description: Backend-agnostic interfaces for journal, stores, and modules.
// Purpose: Define the contract surfaces the handler pipeline composes.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Chronicle integrates with storage and game-system
//! extensions without embedding backend-specific details. Implementations
//! must be deterministic where the contract says so and fail closed on
//! missing or invalid data. Every store-facing operation accepts a
//! [`Cancellation`] handle; errors raised before a successful batch append
//! are retryable, errors raised after are not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::cancel::Cancellation;
use crate::core::codes;
use crate::core::decision::Decision;
use crate::core::envelope::Command;
use crate::core::envelope::EnvelopeError;
use crate::core::envelope::Event;
use crate::core::identifiers::CampaignId;
use crate::core::identifiers::CharacterId;
use crate::core::identifiers::SystemId;
use crate::core::identifiers::SystemVersion;
use crate::core::registry::CommandDefinition;
use crate::core::registry::CommandRegistry;
use crate::core::registry::EventRegistry;
use crate::core::registry::RegistryError;
use crate::core::state::AggregateState;
use crate::core::state::Checkpoint;
use crate::core::state::SessionState;
use crate::core::state::SnapshotRecord;
use crate::core::time::Clock;

// ============================================================================
// SECTION: Journal
// ============================================================================

/// Journal errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - All variants raised before a successful append are safely retryable.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Journal I/O failure.
    #[error("journal io error: {0}")]
    Io(String),
    /// Operation observed a cancelled token before starting.
    #[error("journal operation cancelled")]
    Cancelled,
    /// Batch append was called with no events.
    #[error("batch append requires at least one event")]
    EmptyBatch,
    /// Batch append was called with events for more than one campaign.
    #[error("batch append events must target a single campaign")]
    MixedCampaignBatch,
    /// Envelope hashing failed while assigning storage fields.
    #[error("journal hashing failure: {0}")]
    Hashing(#[from] EnvelopeError),
}

/// Append-only, per-campaign-ordered event journal.
///
/// The journal assigns sequence numbers (contiguous per campaign, starting
/// at 1) and computes content and chain hashes under the same serialization
/// as the append itself.
pub trait Journal: Send + Sync {
    /// Appends a single event, returning the stored envelope.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] when persistence fails; the event was not
    /// stored.
    fn append(&self, event: Event, cancel: &Cancellation) -> Result<Event, JournalError>;

    /// Appends a batch of events atomically, returning the stored envelopes.
    ///
    /// Either every event persists with contiguous sequences or none do.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] when persistence fails; no event was stored.
    fn batch_append(
        &self,
        events: Vec<Event>,
        cancel: &Cancellation,
    ) -> Result<Vec<Event>, JournalError>;

    /// Lists events for a campaign strictly after `after_seq`, ascending,
    /// up to `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] when the listing fails.
    fn list_events(
        &self,
        campaign_id: &CampaignId,
        after_seq: u64,
        limit: usize,
        cancel: &Cancellation,
    ) -> Result<Vec<Event>, JournalError>;
}

// ============================================================================
// SECTION: Checkpoint and Snapshot Stores
// ============================================================================

/// Checkpoint and snapshot store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Operation observed a cancelled token before starting.
    #[error("store operation cancelled")]
    Cancelled,
    /// Store data is corrupted or fails integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
}

/// Per-campaign cursor store.
pub trait CheckpointStore: Send + Sync {
    /// Loads the checkpoint for a campaign, when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<Option<Checkpoint>, StoreError>;

    /// Saves a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, checkpoint: &Checkpoint, cancel: &Cancellation) -> Result<(), StoreError>;
}

/// Per-campaign aggregate state cache.
///
/// Save and get must deep-copy the aggregate so stored state is isolated
/// from caller mutation.
pub trait SnapshotStore: Send + Sync {
    /// Loads the cached state and its sequence for a campaign, when present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_state(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<Option<SnapshotRecord>, StoreError>;

    /// Saves a deep copy of the state with its last applied sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save_state(
        &self,
        campaign_id: &CampaignId,
        last_seq: u64,
        state: &AggregateState,
        cancel: &Cancellation,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Folding
// ============================================================================

/// Fold errors raised while applying an event to state.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum FoldError {
    /// Payload failed to decode into the fold's typed form.
    #[error("fold decode failure for {event_type}: {message}")]
    Decode {
        /// Offending event type.
        event_type: String,
        /// Decoder error context.
        message: String,
    },
    /// A state invariant assertion failed.
    #[error("{code}: fold state assertion failed: {message}", code = codes::STATE_ASSERT_FAILED)]
    StateAssert {
        /// Assertion context.
        message: String,
    },
    /// No module is registered for the event's system metadata.
    #[error("no module registered for system {system_id}@{system_version}")]
    UnknownSystem {
        /// System identifier from the event.
        system_id: SystemId,
        /// System version from the event.
        system_version: SystemVersion,
    },
    /// A system event arrived without system metadata.
    #[error("system metadata missing on event {event_type}")]
    MissingSystemMetadata {
        /// Offending event type.
        event_type: String,
    },
}

/// Applier routing persisted events into aggregate state.
///
/// Implementations are pure: no I/O, no wall-clock reads, and applying a
/// replay-intent event a second time to the state it produced yields an
/// identical state.
pub trait Applier: Send + Sync {
    /// Applies one event, returning the updated state.
    ///
    /// # Errors
    ///
    /// Returns [`FoldError`] when the event cannot be applied.
    fn apply(&self, state: AggregateState, event: &Event) -> Result<AggregateState, FoldError>;
}

// ============================================================================
// SECTION: Deciding
// ============================================================================

/// Decider producing a decision from replayed state and a validated command.
///
/// Implementations are pure and deterministic given their inputs; time
/// arrives only through the supplied clock.
pub trait Decider: Send + Sync {
    /// Decides a command against replayed state.
    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision;
}

// ============================================================================
// SECTION: State Loading
// ============================================================================

/// State loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Journal access failed.
    #[error(transparent)]
    Journal(#[from] JournalError),
    /// Checkpoint or snapshot store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Folding a replayed event failed.
    #[error(transparent)]
    Fold(#[from] FoldError),
    /// The stream skipped a sequence number.
    #[error("sequence gap in campaign {campaign_id}: expected {expected}, got {actual}")]
    SequenceGap {
        /// Campaign whose stream is damaged.
        campaign_id: CampaignId,
        /// Expected next sequence.
        expected: u64,
        /// Sequence actually observed.
        actual: u64,
    },
    /// Operation observed a cancelled token.
    #[error("state load cancelled")]
    Cancelled,
}

/// Replay-backed loader producing the aggregate for a campaign.
pub trait StateLoader: Send + Sync {
    /// Loads the aggregate state for a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when replay fails.
    fn load(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<AggregateState, LoadError>;
}

/// Loader producing only the session sub-state for gate evaluation.
pub trait SessionStateLoader: Send + Sync {
    /// Loads the session sub-state for a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the load fails.
    fn load_session(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<SessionState, LoadError>;
}

// ============================================================================
// SECTION: Gate Evaluation
// ============================================================================

/// Centralized gate policy evaluation.
///
/// Every session-scoped command uses identical policy: when the definition
/// does not allow execution while a gate is open and the session's gate is
/// open, the evaluator returns a single `SESSION_GATE_OPEN` rejection.
pub trait GateEvaluator: Send + Sync {
    /// Evaluates the gate policy of a command definition against session
    /// state, returning an empty decision when the command may proceed.
    fn evaluate(&self, definition: &CommandDefinition, session: &SessionState) -> Decision;
}

// ============================================================================
// SECTION: Game Modules
// ============================================================================

/// Pluggable game-system module.
///
/// A module contributes system-owned commands and events, a decider for its
/// commands, a folder for its events, and deterministic state factories. All
/// of its registered types must carry the `sys.<namespace>.` prefix derived
/// from its identifier.
pub trait GameModule: Send + Sync {
    /// Stable module identifier.
    fn id(&self) -> SystemId;

    /// Module version.
    fn version(&self) -> SystemVersion;

    /// Registers the module's command definitions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a definition is rejected.
    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError>;

    /// Registers the module's event definitions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a definition is rejected.
    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError>;

    /// Event types the module's decider may emit.
    fn emittable_event_types(&self) -> Vec<String>;

    /// Command types the module's decider handles.
    fn command_types(&self) -> Vec<String>;

    /// Event types the module's folder processes.
    fn fold_handled_types(&self) -> Vec<String>;

    /// Decides a system-owned command against replayed state.
    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision;

    /// Folds a system-owned event into the module's slot value.
    ///
    /// # Errors
    ///
    /// Returns [`FoldError`] when the event cannot be applied.
    fn fold(&self, slot: Value, event: &Event) -> Result<Value, FoldError>;

    /// Produces the initial slot value for a campaign.
    ///
    /// Must be deterministic: repeated calls yield deep-equal values.
    fn state_factory(&self) -> Value;

    /// Produces the initial per-character system data.
    ///
    /// Must be deterministic: repeated calls with the same identifier yield
    /// deep-equal values.
    fn character_factory(&self, character_id: &CharacterId) -> Value;
}

// ============================================================================
// SECTION: Projection Adapters
// ============================================================================

/// Adapter errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter failed to update its read model.
    #[error("adapter failure: {0}")]
    Projection(String),
}

/// Projection-side consumer of a module's events.
pub trait ProjectionAdapter: Send + Sync {
    /// System identifier the adapter serves.
    fn system_id(&self) -> SystemId;

    /// System version the adapter serves.
    fn system_version(&self) -> SystemVersion;

    /// Event types the adapter consumes.
    fn handled_types(&self) -> Vec<String>;

    /// Applies one event to the adapter's read model.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the update fails.
    fn apply(&self, event: &Event) -> Result<(), AdapterError>;
}
