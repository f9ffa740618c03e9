// crates/chronicle-domains/src/lib.rs
// ============================================================================
// Module: Chronicle Domains Library
// Description: Core domain packages for campaign, session, and entity commands.
// Purpose: Provide deciders, folders, and registration hooks per core domain.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each core domain (campaign, session, participant, character, invite,
//! action) is one package: payload structs, registration hooks for its
//! command and event definitions, a pure decider, a pure folder, and the
//! closed type lists the startup validators cross-check. Domains never touch
//! storage; the runtime composes them behind the [`DomainPackage`] trait.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod action;
pub mod campaign;
pub mod character;
pub mod invite;
pub mod participant;
pub mod session;
mod support;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use chronicle_core::AggregateState;
use chronicle_core::Command;
use chronicle_core::CommandRegistry;
use chronicle_core::Decision;
use chronicle_core::Event;
use chronicle_core::EventRegistry;
use chronicle_core::FoldError;
use chronicle_core::RegistryError;
use chronicle_core::core::time::Clock;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use action::ActionDomain;
pub use campaign::CampaignDomain;
pub use character::CharacterDomain;
pub use invite::InviteDomain;
pub use participant::ParticipantDomain;
pub use session::SessionDomain;

// ============================================================================
// SECTION: Domain Package Contract
// ============================================================================

/// Capability surface of one core domain package.
///
/// The closed type lists (`emittable_event_types`,
/// `decider_handled_commands`, `fold_handled_types`,
/// `projection_handled_types`) are the contract the startup validators
/// cross-check against the registries; a type missing from its list is a
/// startup error, not a runtime surprise.
pub trait DomainPackage: Send + Sync {
    /// Stable domain name for diagnostics.
    fn name(&self) -> &'static str;

    /// Registers the domain's command definitions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a definition is rejected.
    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError>;

    /// Registers the domain's event definitions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a definition is rejected.
    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError>;

    /// Event types the domain's decider may emit.
    fn emittable_event_types(&self) -> Vec<String>;

    /// Command types the domain's decider handles.
    fn decider_handled_commands(&self) -> Vec<String>;

    /// Event types the domain's folder processes.
    fn fold_handled_types(&self) -> Vec<String>;

    /// Event types the domain's projections consume.
    fn projection_handled_types(&self) -> Vec<String>;

    /// Decides a command against replayed state.
    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision;

    /// Folds an event into state; unknown types are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`FoldError`] when a handled event cannot be applied.
    fn fold(&self, state: AggregateState, event: &Event) -> Result<AggregateState, FoldError>;
}

// ============================================================================
// SECTION: Domain Catalog
// ============================================================================

/// Returns the core domain packages in registration order.
#[must_use]
pub fn core_domains() -> Vec<Arc<dyn DomainPackage>> {
    vec![
        Arc::new(CampaignDomain),
        Arc::new(SessionDomain),
        Arc::new(ParticipantDomain),
        Arc::new(CharacterDomain),
        Arc::new(InviteDomain),
        Arc::new(ActionDomain),
    ]
}
