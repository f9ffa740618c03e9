// crates/chronicle-runtime/tests/common/mod.rs
// ============================================================================
// Module: Runtime Test Fixtures
// Description: Configurable test module and adapter for startup and routing tests.
// Purpose: Exercise module registration, routing, and validator failure paths.
// Dependencies: chronicle-core, chronicle-runtime, serde, serde_json
// ============================================================================

//! ## Overview
//! `TestModule` is a small dice-check game system whose misbehaviors are
//! switchable: wrong type prefix, undeclared commands, nondeterministic
//! factories, fold handlers for non-emittable types. The default
//! configuration is fully consistent and passes every startup validator.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only fixtures; not every test uses every knob."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use chronicle_core::AggregateState;
use chronicle_core::CharacterId;
use chronicle_core::Command;
use chronicle_core::CommandDefinition;
use chronicle_core::CommandRegistry;
use chronicle_core::Decision;
use chronicle_core::EntityId;
use chronicle_core::EntityType;
use chronicle_core::Event;
use chronicle_core::EventDefinition;
use chronicle_core::EventRegistry;
use chronicle_core::FoldError;
use chronicle_core::Intent;
use chronicle_core::Owner;
use chronicle_core::RegistryError;
use chronicle_core::SystemId;
use chronicle_core::SystemVersion;
use chronicle_core::codes;
use chronicle_core::core::registry::AddressingPolicy;
use chronicle_core::core::time::Clock;
use chronicle_core::interfaces::AdapterError;
use chronicle_core::interfaces::GameModule;
use chronicle_core::interfaces::ProjectionAdapter;
use chronicle_core::typed_validator;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Type Constants
// ============================================================================

/// System command the test module registers.
pub const SYS_CMD_CHECK: &str = "sys.d20.check";
/// System event the test module emits.
pub const SYS_EVT_CHECK_RESOLVED: &str = "sys.d20.check_resolved";

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Payload for the dice-check command and its resolution event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPayload {
    /// Identifier of the check.
    pub check_id: String,
    /// Character performing the check.
    #[serde(default)]
    pub character_id: String,
    /// Resolved result value.
    #[serde(default)]
    pub result: i64,
}

// ============================================================================
// SECTION: Test Module
// ============================================================================

/// Configurable dice-check game system for validator tests.
pub struct TestModule {
    /// Module identifier.
    pub id: String,
    /// Module version.
    pub version: String,
    /// Intent for the resolution event.
    pub event_intent: Intent,
    /// Register the command without the `sys.` prefix.
    pub bad_prefix: bool,
    /// Omit the registered command from `command_types`.
    pub omit_command_claim: bool,
    /// Omit the resolution event from `fold_handled_types`.
    pub omit_fold: bool,
    /// Declare a fold handler for a type the module does not emit.
    pub fold_undeclared_type: bool,
    /// Make the state factory nondeterministic.
    pub nondeterministic_state: bool,
    /// Counter feeding the nondeterministic factory.
    pub counter: AtomicU64,
}

impl TestModule {
    /// Creates a fully consistent module.
    pub fn consistent() -> Self {
        Self {
            id: "d20".to_string(),
            version: "1".to_string(),
            event_intent: Intent::ReplayOnly,
            bad_prefix: false,
            omit_command_claim: false,
            omit_fold: false,
            fold_undeclared_type: false,
            nondeterministic_state: false,
            counter: AtomicU64::new(0),
        }
    }

    /// Creates a consistent module whose event carries projection intent.
    pub fn with_projection_intent() -> Self {
        Self {
            event_intent: Intent::ProjectionAndReplay,
            ..Self::consistent()
        }
    }
}

impl GameModule for TestModule {
    fn id(&self) -> SystemId {
        SystemId::new(self.id.as_str())
    }

    fn version(&self) -> SystemVersion {
        SystemVersion::new(self.version.as_str())
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        let command_type = if self.bad_prefix { "d20.check" } else { SYS_CMD_CHECK };
        registry.register(
            CommandDefinition::new(command_type, Owner::System)
                .with_validator(typed_validator::<CheckPayload>()),
        )
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        registry.register(
            EventDefinition::new(SYS_EVT_CHECK_RESOLVED, Owner::System)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<CheckPayload>())
                .with_intent(self.event_intent),
        )
    }

    fn emittable_event_types(&self) -> Vec<String> {
        vec![SYS_EVT_CHECK_RESOLVED.to_string()]
    }

    fn command_types(&self) -> Vec<String> {
        if self.omit_command_claim {
            return Vec::new();
        }
        let command_type = if self.bad_prefix { "d20.check" } else { SYS_CMD_CHECK };
        vec![command_type.to_string()]
    }

    fn fold_handled_types(&self) -> Vec<String> {
        let mut handled = Vec::new();
        if !self.omit_fold {
            handled.push(SYS_EVT_CHECK_RESOLVED.to_string());
        }
        if self.fold_undeclared_type {
            handled.push("sys.d20.phantom".to_string());
        }
        handled
    }

    fn decide(&self, _state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        let payload: CheckPayload = match serde_json::from_str(&command.payload) {
            Ok(payload) => payload,
            Err(err) => {
                return Decision::reject(codes::PAYLOAD_DECODE_FAILED, err.to_string());
            }
        };
        let encoded = match serde_json::to_string(&payload) {
            Ok(encoded) => encoded,
            Err(err) => {
                return Decision::reject(codes::PAYLOAD_ENCODE_FAILED, err.to_string());
            }
        };
        Decision::accept(vec![
            Event::from_command(command, SYS_EVT_CHECK_RESOLVED, clock.now())
                .with_entity(
                    EntityType::new("character"),
                    EntityId::new(payload.character_id.as_str()),
                )
                .with_system(self.id(), self.version())
                .with_payload(encoded),
        ])
    }

    fn fold(&self, slot: Value, event: &Event) -> Result<Value, FoldError> {
        let payload: CheckPayload =
            serde_json::from_str(&event.payload).map_err(|err| FoldError::Decode {
                event_type: event.event_type.clone(),
                message: err.to_string(),
            })?;
        let mut slot = slot;
        if let Some(resolved) = slot.get_mut("resolved").and_then(Value::as_object_mut) {
            resolved.insert(payload.check_id, json!(payload.result));
        }
        Ok(slot)
    }

    fn state_factory(&self) -> Value {
        if self.nondeterministic_state {
            let tick = self.counter.fetch_add(1, Ordering::SeqCst);
            return json!({ "resolved": {}, "tick": tick });
        }
        json!({ "resolved": {} })
    }

    fn character_factory(&self, character_id: &CharacterId) -> Value {
        json!({ "character_id": character_id.as_str(), "modifiers": {} })
    }
}

// ============================================================================
// SECTION: Test Adapter
// ============================================================================

/// Recording projection adapter for the test module.
#[derive(Default)]
pub struct TestAdapter {
    /// Event types observed by the adapter.
    pub seen: Mutex<Vec<String>>,
    /// Declare a type the module does not emit.
    pub handle_undeclared_type: bool,
}

impl TestAdapter {
    /// Creates an adapter handling exactly the module's resolution event.
    pub fn consistent() -> Self {
        Self::default()
    }
}

impl ProjectionAdapter for TestAdapter {
    fn system_id(&self) -> SystemId {
        SystemId::new("d20")
    }

    fn system_version(&self) -> SystemVersion {
        SystemVersion::new("1")
    }

    fn handled_types(&self) -> Vec<String> {
        let mut handled = vec![SYS_EVT_CHECK_RESOLVED.to_string()];
        if self.handle_undeclared_type {
            handled.push("sys.d20.phantom".to_string());
        }
        handled
    }

    fn apply(&self, event: &Event) -> Result<(), AdapterError> {
        match self.seen.lock() {
            Ok(mut seen) => {
                seen.push(event.event_type.clone());
                Ok(())
            }
            Err(_) => Err(AdapterError::Projection("adapter mutex poisoned".to_string())),
        }
    }
}
