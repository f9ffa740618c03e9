// crates/chronicle-runtime/src/gate.rs
// ============================================================================
// Module: Gate Policy Evaluation
// Description: Centralized session-gate check for gated command classes.
// Purpose: Give every session-scoped command identical gate semantics.
// Dependencies: chronicle-core
// ============================================================================

//! ## Overview
//! Gates let a GM pause specific command classes while they adjudicate a
//! consequence. Evaluation is centralized here so every domain's
//! session-scoped command uses identical policy: scope `session`,
//! `allow_when_open = false`, and an open gate yield exactly one
//! `SESSION_GATE_OPEN` rejection naming the gate; anything else yields an
//! empty decision and the pipeline proceeds. The decider is never invoked on
//! a gate rejection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chronicle_core::CommandDefinition;
use chronicle_core::Decision;
use chronicle_core::GateId;
use chronicle_core::GateScope;
use chronicle_core::SessionState;
use chronicle_core::codes;
use chronicle_core::interfaces::GateEvaluator;

// ============================================================================
// SECTION: Policy Evaluator
// ============================================================================

/// Gate evaluator applying the session-gate policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyGateEvaluator;

impl GateEvaluator for PolicyGateEvaluator {
    fn evaluate(&self, definition: &CommandDefinition, session: &SessionState) -> Decision {
        if definition.gate.scope == GateScope::Session
            && !definition.gate.allow_when_open
            && session.gate_open
        {
            let gate_id = session.gate_id.as_ref().map_or("<unknown>", GateId::as_str);
            return Decision::reject(
                codes::SESSION_GATE_OPEN,
                format!("session gate {gate_id} is open; {} is paused", definition.command_type),
            );
        }
        Decision::empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
