// crates/chronicle-runtime/src/replay.rs
// ============================================================================
// Module: Replay Engine
// Description: Deterministic state reconstruction from an event stream.
// Purpose: Page events, detect gaps, resume from checkpoints and snapshots.
// Dependencies: chronicle-core
// ============================================================================

//! ## Overview
//! Replay rebuilds aggregate state by folding a campaign's events in order.
//! A snapshot, when present, seeds state with a deep copy and skips past its
//! sequence; the checkpoint advances the starting cursor; events are fetched
//! in pages strictly after the cursor; a sequence gap is fatal. The
//! checkpoint is saved after each successful fold, cancellation is checked
//! between store calls and pages, and every completed pass reports its
//! folded-event count through the metrics sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use chronicle_core::AggregateState;
use chronicle_core::CampaignId;
use chronicle_core::Cancellation;
use chronicle_core::Checkpoint;
use chronicle_core::SessionState;
use chronicle_core::core::time::Clock;
use chronicle_core::interfaces::Applier;
use chronicle_core::interfaces::CheckpointStore;
use chronicle_core::interfaces::Journal;
use chronicle_core::interfaces::LoadError;
use chronicle_core::interfaces::SessionStateLoader;
use chronicle_core::interfaces::SnapshotStore;
use chronicle_core::interfaces::StateLoader;

use crate::telemetry::NoopMetrics;
use crate::telemetry::PipelineMetrics;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Default number of events fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Replay window and paging options.
///
/// # Invariants
/// - `until_seq` of zero means "no upper bound".
/// - `page_size` of zero falls back to [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    /// Replay strictly after this sequence.
    pub after_seq: u64,
    /// Stop after this sequence; zero means unbounded.
    pub until_seq: u64,
    /// Events fetched per journal page.
    pub page_size: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            after_seq: 0,
            until_seq: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

// ============================================================================
// SECTION: Replay
// ============================================================================

/// Outcome of a replay pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    /// Reconstructed aggregate state.
    pub state: AggregateState,
    /// Last sequence folded into the state.
    pub last_seq: u64,
    /// Number of events folded during this pass.
    pub folded: u64,
}

/// Replays a campaign's events into state.
///
/// The snapshot store, when provided, is consulted before replay: an
/// existing snapshot replaces the initial state and advances the cursor past
/// its sequence. The checkpoint store then advances the cursor further when
/// its recorded sequence is higher. The checkpoint is saved again after each
/// successful fold, and `metrics.on_replay` is called once with the folded
/// count when the pass completes.
///
/// # Errors
///
/// Returns [`LoadError`] on store failures, fold failures, sequence gaps,
/// or cancellation.
#[allow(clippy::too_many_arguments, reason = "Replay wires every store the pipeline owns.")]
pub fn replay(
    journal: &dyn Journal,
    checkpoints: Option<&dyn CheckpointStore>,
    snapshots: Option<&dyn SnapshotStore>,
    applier: &dyn Applier,
    clock: &dyn Clock,
    metrics: &dyn PipelineMetrics,
    campaign_id: &CampaignId,
    initial: AggregateState,
    options: ReplayOptions,
    cancel: &Cancellation,
) -> Result<ReplayOutcome, LoadError> {
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    let page_size = if options.page_size == 0 { DEFAULT_PAGE_SIZE } else { options.page_size };
    let mut state = initial;
    let mut last_seq = options.after_seq;

    if let Some(snapshots) = snapshots
        && let Some(record) = snapshots.get_state(campaign_id, cancel)?
        && record.last_seq > last_seq
    {
        state = record.state;
        last_seq = record.last_seq;
    }
    if let Some(checkpoints) = checkpoints
        && let Some(checkpoint) = checkpoints.get(campaign_id, cancel)?
        && checkpoint.last_seq > last_seq
    {
        last_seq = checkpoint.last_seq;
    }

    let mut folded = 0_u64;
    loop {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let page = journal.list_events(campaign_id, last_seq, page_size, cancel)?;
        if page.is_empty() {
            break;
        }
        for event in page {
            if options.until_seq > 0 && event.seq > options.until_seq {
                metrics.on_replay(campaign_id, folded);
                return Ok(ReplayOutcome {
                    state,
                    last_seq,
                    folded,
                });
            }
            if event.seq != last_seq + 1 {
                return Err(LoadError::SequenceGap {
                    campaign_id: campaign_id.clone(),
                    expected: last_seq + 1,
                    actual: event.seq,
                });
            }
            state = applier.apply(state, &event)?;
            last_seq = event.seq;
            folded += 1;
            if let Some(checkpoints) = checkpoints {
                checkpoints.save(
                    &Checkpoint {
                        campaign_id: campaign_id.clone(),
                        last_seq,
                        updated_at: clock.now(),
                    },
                    cancel,
                )?;
            }
        }
    }
    metrics.on_replay(campaign_id, folded);
    Ok(ReplayOutcome {
        state,
        last_seq,
        folded,
    })
}

// ============================================================================
// SECTION: Replay-Backed Loaders
// ============================================================================

/// Replay-backed state loader the pipeline uses for step three.
///
/// # Invariants
/// - Every load starts from an empty aggregate (plus snapshot seed) so
///   callers never observe state from a previous command.
pub struct ReplayStateLoader {
    /// Journal to page events from.
    journal: Arc<dyn Journal>,
    /// Optional checkpoint store for cursor resume.
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    /// Optional snapshot store for warm starts.
    snapshots: Option<Arc<dyn SnapshotStore>>,
    /// Applier folding events into state.
    applier: Arc<dyn Applier>,
    /// Clock for checkpoint timestamps.
    clock: Arc<dyn Clock + Send + Sync>,
    /// Metrics sink observing completed replay passes.
    metrics: Arc<dyn PipelineMetrics>,
    /// Page size for journal listing.
    page_size: usize,
}

impl ReplayStateLoader {
    /// Creates a loader over the provided stores.
    #[must_use]
    pub fn new(
        journal: Arc<dyn Journal>,
        checkpoints: Option<Arc<dyn CheckpointStore>>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
        applier: Arc<dyn Applier>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            journal,
            checkpoints,
            snapshots,
            applier,
            clock,
            metrics: Arc::new(NoopMetrics),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Overrides the journal page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl StateLoader for ReplayStateLoader {
    fn load(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<AggregateState, LoadError> {
        let outcome = replay(
            self.journal.as_ref(),
            self.checkpoints.as_deref(),
            self.snapshots.as_deref(),
            self.applier.as_ref(),
            self.clock.as_ref(),
            self.metrics.as_ref(),
            campaign_id,
            AggregateState::for_campaign(campaign_id.clone()),
            ReplayOptions {
                page_size: self.page_size,
                ..ReplayOptions::default()
            },
            cancel,
        )?;
        Ok(outcome.state)
    }
}

impl SessionStateLoader for ReplayStateLoader {
    fn load_session(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<SessionState, LoadError> {
        self.load(campaign_id, cancel).map(|state| state.session)
    }
}
