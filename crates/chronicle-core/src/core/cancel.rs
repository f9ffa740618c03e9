// crates/chronicle-core/src/core/cancel.rs
// ============================================================================
// Module: Chronicle Cancellation
// Description: Cooperative cancellation handle for store-facing operations.
// Purpose: Let hosts abort blocking store calls without partial persistence.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Store-facing operations accept a [`Cancellation`] handle and check it on
//! entry and between replay pages. Cancellation is cooperative: a batch
//! append that has begun either completes or rejects as a whole, never
//! partially. Deciders and folders are CPU-bound and do not observe the
//! handle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

// ============================================================================
// SECTION: Cancellation Handle
// ============================================================================

/// Cooperative cancellation token shared between a host and the pipeline.
///
/// # Invariants
/// - Once cancelled, the token never resets.
/// - Clones observe the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Creates a new, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token as cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true when the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
