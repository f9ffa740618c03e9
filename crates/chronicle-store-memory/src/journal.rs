// crates/chronicle-store-memory/src/journal.rs
// ============================================================================
// Module: In-Memory Journal
// Description: Reference journal with per-campaign ordering and hash chains.
// Purpose: Assign sequences and chain hashes under one serialization point.
// Dependencies: chronicle-core
// ============================================================================

//! ## Overview
//! The in-memory journal is the reference implementation of the journal
//! contract: a single mutex over the stream map serializes every append and
//! sequence allocation, batches persist all-or-nothing, and each stored
//! event carries its content hash, the previous event's chain hash, and its
//! own chain hash. Production implementations must provide the same
//! per-stream linearization by other means.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use chronicle_core::CampaignId;
use chronicle_core::Cancellation;
use chronicle_core::Event;
use chronicle_core::chain_hash;
use chronicle_core::content_hash;
use chronicle_core::interfaces::Journal;
use chronicle_core::interfaces::JournalError;

// ============================================================================
// SECTION: Memory Journal
// ============================================================================

/// In-memory journal keyed by campaign.
///
/// # Invariants
/// - Sequences are contiguous per campaign, starting at 1.
/// - `events[i+1].prev_hash == events[i].chain_hash` within a stream.
/// - A batch either persists entirely or not at all.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    /// Event streams keyed by campaign identifier.
    streams: Mutex<BTreeMap<CampaignId, Vec<Event>>>,
}

impl MemoryJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the stream map, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<CampaignId, Vec<Event>>> {
        match self.streams.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Journal for MemoryJournal {
    fn append(&self, event: Event, cancel: &Cancellation) -> Result<Event, JournalError> {
        let mut stored = self.batch_append(vec![event], cancel)?;
        stored.pop().ok_or_else(|| JournalError::Io("batch append returned no event".to_string()))
    }

    fn batch_append(
        &self,
        events: Vec<Event>,
        cancel: &Cancellation,
    ) -> Result<Vec<Event>, JournalError> {
        if cancel.is_cancelled() {
            return Err(JournalError::Cancelled);
        }
        let Some(first) = events.first() else {
            return Err(JournalError::EmptyBatch);
        };
        let campaign_id = first.campaign_id.clone();
        if events.iter().any(|event| event.campaign_id != campaign_id) {
            return Err(JournalError::MixedCampaignBatch);
        }

        let mut streams = self.lock();
        let stream = streams.entry(campaign_id).or_default();
        let mut next_seq = stream.last().map_or(0, |event| event.seq) + 1;
        let mut prev_chain =
            stream.last().map_or_else(String::new, |event| event.chain_hash.clone());

        // Compute every envelope before touching the stream so a hashing
        // failure cannot leave a partial batch behind.
        let mut stored = Vec::with_capacity(events.len());
        for mut event in events {
            let content = content_hash(&event)?;
            let chain = chain_hash(&event, next_seq, &content, &prev_chain)?;
            event.seq = next_seq;
            event.hash = content.value;
            event.prev_hash = prev_chain.clone();
            event.chain_hash = chain.value.clone();
            prev_chain = chain.value;
            next_seq += 1;
            stored.push(event);
        }
        stream.extend(stored.iter().cloned());
        Ok(stored)
    }

    fn list_events(
        &self,
        campaign_id: &CampaignId,
        after_seq: u64,
        limit: usize,
        cancel: &Cancellation,
    ) -> Result<Vec<Event>, JournalError> {
        if cancel.is_cancelled() {
            return Err(JournalError::Cancelled);
        }
        let streams = self.lock();
        let Some(stream) = streams.get(campaign_id) else {
            return Ok(Vec::new());
        };
        Ok(stream.iter().filter(|event| event.seq > after_seq).take(limit).cloned().collect())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
