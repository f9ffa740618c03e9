// crates/chronicle-core/src/core/decision.rs
// ============================================================================
// Module: Chronicle Decisions
// Description: Decider output carrying accepted events or rejections.
// Purpose: Give the pipeline one stable shape for accept and reject outcomes.
// Dependencies: crate::core::envelope, serde
// ============================================================================

//! ## Overview
//! A decision is the sole output of a decider: zero or more events to
//! persist, or one or more rejections with stable codes. A decision with
//! neither is a programming error the pipeline surfaces as
//! `COMMAND_MUST_MUTATE`; it is never silently accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::envelope::Event;

// ============================================================================
// SECTION: Rejections
// ============================================================================

/// Policy- or rule-level refusal of a command.
///
/// # Invariants
/// - `code` is a stable uppercase snake-case string; messages are not a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Stable rejection code.
    pub code: String,
    /// Human-readable message with context.
    pub message: String,
}

impl Rejection {
    /// Creates a rejection from a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Decider output: events to persist or rejections to surface.
///
/// # Invariants
/// - Events are ordered; the journal persists them in this order.
/// - A decision carrying neither events nor rejections is a programming error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Events to persist, in order.
    pub events: Vec<Event>,
    /// Rejections to surface.
    pub rejections: Vec<Rejection>,
}

impl Decision {
    /// Creates an empty decision.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an accepting decision from ordered events.
    #[must_use]
    pub fn accept(events: Vec<Event>) -> Self {
        Self {
            events,
            rejections: Vec::new(),
        }
    }

    /// Creates a rejecting decision with a single rejection.
    #[must_use]
    pub fn reject(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            events: Vec::new(),
            rejections: vec![Rejection::new(code, message)],
        }
    }

    /// Appends an event to the decision.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Appends a rejection to the decision.
    pub fn push_rejection(&mut self, rejection: Rejection) {
        self.rejections.push(rejection);
    }

    /// Returns true when the decision carries at least one rejection.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        !self.rejections.is_empty()
    }

    /// Returns true when the decision carries neither events nor rejections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.rejections.is_empty()
    }
}
