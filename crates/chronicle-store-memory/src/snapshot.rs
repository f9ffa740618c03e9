// crates/chronicle-store-memory/src/snapshot.rs
// ============================================================================
// Module: In-Memory Snapshot Store
// Description: Reference aggregate state cache with deep-copy isolation.
// Purpose: Enable warm-start replay from a cached state plus sequence.
// Dependencies: chronicle-core
// ============================================================================

//! ## Overview
//! The memory snapshot store caches one aggregate per campaign. Saves and
//! gets clone the state tree, so stored state is isolated from caller
//! mutation in both directions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use chronicle_core::AggregateState;
use chronicle_core::CampaignId;
use chronicle_core::Cancellation;
use chronicle_core::SnapshotRecord;
use chronicle_core::interfaces::SnapshotStore;
use chronicle_core::interfaces::StoreError;

// ============================================================================
// SECTION: Memory Snapshot Store
// ============================================================================

/// In-memory snapshot store keyed by campaign.
///
/// # Invariants
/// - Stored state is a deep copy; callers never share memory with it.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    /// Snapshot records keyed by campaign identifier.
    snapshots: Mutex<BTreeMap<CampaignId, SnapshotRecord>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the snapshot map, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<CampaignId, SnapshotRecord>> {
        match self.snapshots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get_state(
        &self,
        campaign_id: &CampaignId,
        cancel: &Cancellation,
    ) -> Result<Option<SnapshotRecord>, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(self.lock().get(campaign_id).cloned())
    }

    fn save_state(
        &self,
        campaign_id: &CampaignId,
        last_seq: u64,
        state: &AggregateState,
        cancel: &Cancellation,
    ) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        self.lock().insert(campaign_id.clone(), SnapshotRecord {
            state: state.clone(),
            last_seq,
        });
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

    use chronicle_core::AggregateState;
    use chronicle_core::CampaignId;
    use chronicle_core::Cancellation;
    use chronicle_core::CharacterId;
    use chronicle_core::CharacterState;
    use chronicle_core::interfaces::SnapshotStore;

    use super::MemorySnapshotStore;

    #[test]
    fn stored_state_is_isolated_from_caller_mutation() {
        let store = MemorySnapshotStore::new();
        let cancel = Cancellation::new();
        let mut state = AggregateState::default();
        state.characters.insert(CharacterId::new("char-1"), CharacterState {
            name: "Vex".to_string(),
            participant_id: None,
            retired: false,
        });
        store.save_state(&CampaignId::new("camp-1"), 5, &state, &cancel).expect("save");

        // Mutating the caller's copy must not corrupt the stored snapshot.
        state.characters.clear();

        let record = store
            .get_state(&CampaignId::new("camp-1"), &cancel)
            .expect("get")
            .expect("record");
        assert_eq!(record.last_seq, 5);
        assert!(record.state.characters.contains_key(&CharacterId::new("char-1")));

        // Mutating the returned copy must not corrupt the store either.
        let mut returned = record.state;
        returned.characters.clear();
        let record = store
            .get_state(&CampaignId::new("camp-1"), &cancel)
            .expect("get again")
            .expect("record again");
        assert!(record.state.characters.contains_key(&CharacterId::new("char-1")));
    }

    #[test]
    fn missing_campaign_returns_none() {
        let store = MemorySnapshotStore::new();
        let cancel = Cancellation::new();
        assert!(store.get_state(&CampaignId::new("camp-9"), &cancel).expect("get").is_none());
    }
}
