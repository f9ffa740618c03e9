// crates/chronicle-store-memory/src/checkpoint.rs
// ============================================================================
// Module: In-Memory Checkpoint Store
// Description: Reference per-campaign cursor store plus a no-op variant.
// Purpose: Persist replay cursors for resumable state reconstruction.
// Dependencies: chronicle-core
// ============================================================================

//! ## Overview
//! The memory checkpoint store keeps one cursor per campaign behind a
//! mutex. The no-op variant always reports "not found" and accepts every
//! save, for deployments that prefer pure from-zero replay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use chronicle_core::CampaignId;
use chronicle_core::Cancellation;
use chronicle_core::Checkpoint;
use chronicle_core::interfaces::CheckpointStore;
use chronicle_core::interfaces::StoreError;

// ============================================================================
// SECTION: Memory Checkpoint Store
// ============================================================================

/// In-memory checkpoint store keyed by campaign.
///
/// # Invariants
/// - Saves replace the prior checkpoint for the campaign.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    /// Checkpoints keyed by campaign identifier.
    checkpoints: Mutex<BTreeMap<CampaignId, Checkpoint>>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the checkpoint map, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<CampaignId, Checkpoint>> {
        match self.checkpoints.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<Option<Checkpoint>, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(self.lock().get(campaign_id).cloned())
    }

    fn save(&self, checkpoint: &Checkpoint, cancel: &Cancellation) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        self.lock().insert(checkpoint.campaign_id.clone(), checkpoint.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: No-Op Checkpoint Store
// ============================================================================

/// Checkpoint store that never resumes: every get misses, every save
/// succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCheckpointStore;

impl CheckpointStore for NoopCheckpointStore {
    fn get(
        &self,
        _campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<Option<Checkpoint>, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(None)
    }

    fn save(&self, _checkpoint: &Checkpoint, cancel: &Cancellation) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }
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

    use chronicle_core::CampaignId;
    use chronicle_core::Cancellation;
    use chronicle_core::Checkpoint;
    use chronicle_core::Timestamp;
    use chronicle_core::interfaces::CheckpointStore;

    use super::MemoryCheckpointStore;
    use super::NoopCheckpointStore;

    fn checkpoint(seq: u64) -> Checkpoint {
        Checkpoint {
            campaign_id: CampaignId::new("camp-1"),
            last_seq: seq,
            updated_at: Timestamp::from_unix_nanos(1_700_000_000_000_000_000).expect("timestamp"),
        }
    }

    #[test]
    fn save_then_get_round_trips() {
        let store = MemoryCheckpointStore::new();
        let cancel = Cancellation::new();
        store.save(&checkpoint(10), &cancel).expect("save");
        let loaded = store.get(&CampaignId::new("camp-1"), &cancel).expect("get").expect("some");
        assert_eq!(loaded.last_seq, 10);
        store.save(&checkpoint(12), &cancel).expect("save again");
        let loaded = store.get(&CampaignId::new("camp-1"), &cancel).expect("get").expect("some");
        assert_eq!(loaded.last_seq, 12);
    }

    #[test]
    fn noop_store_always_misses() {
        let store = NoopCheckpointStore;
        let cancel = Cancellation::new();
        store.save(&checkpoint(10), &cancel).expect("save");
        assert!(store.get(&CampaignId::new("camp-1"), &cancel).expect("get").is_none());
    }
}
