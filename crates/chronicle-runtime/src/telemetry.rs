// crates/chronicle-runtime/src/telemetry.rs
// ============================================================================
// Module: Runtime Telemetry
// Description: Observability hooks for the command pipeline and replay engine.
// Purpose: Provide metric events without hard observability dependencies.
// Dependencies: chronicle-core
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for command counters and
//! replay progress. It is intentionally dependency-light so downstream
//! deployments can plug in Prometheus or OpenTelemetry without redesign.
//! Labels are stable strings; hosts must not key behavior off them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chronicle_core::CampaignId;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Command handling outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Decision accepted; events were persisted and applied.
    Accepted,
    /// Decision rejected by a decider rule.
    Rejected,
    /// Command refused by the session gate before the decider ran.
    GateRejected,
    /// Pipeline failed with an error.
    Failed,
}

impl CommandOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::GateRejected => "gate_rejected",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// SECTION: Metrics Interface
// ============================================================================

/// Observability hooks invoked by the pipeline and replay engine.
///
/// Implementations must be cheap and must not fail; the pipeline ignores
/// nothing they return because they return nothing.
pub trait PipelineMetrics: Send + Sync {
    /// Records the outcome of one handled command.
    fn on_command(&self, command_type: &str, outcome: CommandOutcome, persisted_events: usize);

    /// Records one completed replay pass.
    fn on_replay(&self, campaign_id: &CampaignId, folded_events: u64);
}

/// Metrics sink that discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl PipelineMetrics for NoopMetrics {
    fn on_command(&self, _command_type: &str, _outcome: CommandOutcome, _persisted_events: usize) {}

    fn on_replay(&self, _campaign_id: &CampaignId, _folded_events: u64) {}
}
