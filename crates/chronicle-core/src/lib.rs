// crates/chronicle-core/src/lib.rs
// ============================================================================
// Module: Chronicle Core Library
// Description: Event-sourced domain core types for campaign aggregates.
// Purpose: Define envelopes, registries, state, and interface contracts.
// Dependencies: serde, serde_json, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! Chronicle Core is the data model of the event-sourced campaign backend:
//! tamper-evident event envelopes, command and event registries with
//! per-type payload validators, the aggregate state tree, and the interface
//! contracts (journal, checkpoint and snapshot stores, deciders, appliers,
//! modules, adapters) the runtime composes.
//! Invariants:
//! - Events are immutable after persistence; sequences are contiguous per
//!   campaign starting at 1.
//! - One canonicalization routine feeds both registry normalization and
//!   hashing.
//! - Registries are constructed at startup, cross-validated, then frozen.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::ActionState;
pub use crate::core::ActorId;
pub use crate::core::ActorType;
pub use crate::core::AddressingPolicy;
pub use crate::core::AggregateState;
pub use crate::core::CampaignId;
pub use crate::core::CampaignMeta;
pub use crate::core::CampaignStatus;
pub use crate::core::Cancellation;
pub use crate::core::CausationId;
pub use crate::core::CharacterId;
pub use crate::core::CharacterState;
pub use crate::core::Checkpoint;
pub use crate::core::Clock;
pub use crate::core::Command;
pub use crate::core::CommandDefinition;
pub use crate::core::CommandRegistry;
pub use crate::core::CorrelationId;
pub use crate::core::Decision;
pub use crate::core::EntityId;
pub use crate::core::EntityType;
pub use crate::core::EnvelopeError;
pub use crate::core::Event;
pub use crate::core::EventDefinition;
pub use crate::core::EventRegistry;
pub use crate::core::FixedClock;
pub use crate::core::GateId;
pub use crate::core::GatePolicy;
pub use crate::core::GateScope;
pub use crate::core::Intent;
pub use crate::core::InviteId;
pub use crate::core::InviteState;
pub use crate::core::InviteStatus;
pub use crate::core::InvocationId;
pub use crate::core::Owner;
pub use crate::core::ParticipantId;
pub use crate::core::ParticipantState;
pub use crate::core::PayloadValidator;
pub use crate::core::PayloadViolation;
pub use crate::core::RegistryError;
pub use crate::core::Rejection;
pub use crate::core::RequestId;
pub use crate::core::SessionId;
pub use crate::core::SessionState;
pub use crate::core::SnapshotRecord;
pub use crate::core::SystemClock;
pub use crate::core::SystemId;
pub use crate::core::SystemKey;
pub use crate::core::SystemVersion;
pub use crate::core::TimeError;
pub use crate::core::Timestamp;
pub use crate::core::chain_hash;
pub use crate::core::codes;
pub use crate::core::content_hash;
pub use crate::core::hashing;
pub use crate::core::typed_validator;
pub use crate::interfaces::AdapterError;
pub use crate::interfaces::Applier;
pub use crate::interfaces::CheckpointStore;
pub use crate::interfaces::Decider;
pub use crate::interfaces::FoldError;
pub use crate::interfaces::GameModule;
pub use crate::interfaces::GateEvaluator;
pub use crate::interfaces::Journal;
pub use crate::interfaces::JournalError;
pub use crate::interfaces::LoadError;
pub use crate::interfaces::ProjectionAdapter;
pub use crate::interfaces::SessionStateLoader;
pub use crate::interfaces::SnapshotStore;
pub use crate::interfaces::StateLoader;
pub use crate::interfaces::StoreError;
