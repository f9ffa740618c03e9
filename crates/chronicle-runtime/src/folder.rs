// crates/chronicle-runtime/src/folder.rs
// ============================================================================
// Module: Aggregate Folder
// Description: Routes persisted events into the right sub-state.
// Purpose: Compose domain folders and module folders behind one applier.
// Dependencies: chronicle-core, chronicle-domains
// ============================================================================

//! ## Overview
//! The aggregate folder is the single applier the pipeline and replay engine
//! use. Core events dispatch to the owning domain's fold by a routing table
//! built from each domain's declared fold-handled types; system events
//! resolve their module by `(system id, system version)`, lazily seed the
//! per-system slot from the module's state factory on first use, then
//! delegate to the module folder. Audit-only events short-circuit and are
//! never folded. Unknown core types are no-ops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chronicle_core::AggregateState;
use chronicle_core::Event;
use chronicle_core::EventRegistry;
use chronicle_core::FoldError;
use chronicle_core::Intent;
use chronicle_core::Owner;
use chronicle_core::SystemKey;
use chronicle_core::interfaces::Applier;
use chronicle_domains::DomainPackage;

use crate::modules::ModuleRegistry;

// ============================================================================
// SECTION: Aggregate Folder
// ============================================================================

/// Composite applier routing events to domain and module folders.
///
/// # Invariants
/// - The routing table covers exactly the domains' declared fold-handled
///   types; startup validators verify the table against those declarations.
/// - Audit-only events are never folded.
pub struct AggregateFolder {
    /// Core routing table from event type to owning domain.
    routes: BTreeMap<String, Arc<dyn DomainPackage>>,
    /// Event definitions for intent and ownership lookups.
    event_registry: Arc<EventRegistry>,
    /// Module registry for system event dispatch.
    modules: Arc<ModuleRegistry>,
}

impl AggregateFolder {
    /// Builds the folder's routing table from the domain packages.
    #[must_use]
    pub fn new(
        domains: &[Arc<dyn DomainPackage>],
        event_registry: Arc<EventRegistry>,
        modules: Arc<ModuleRegistry>,
    ) -> Self {
        let mut routes: BTreeMap<String, Arc<dyn DomainPackage>> = BTreeMap::new();
        for domain in domains {
            for event_type in domain.fold_handled_types() {
                routes.insert(event_type, Arc::clone(domain));
            }
        }
        Self {
            routes,
            event_registry,
            modules,
        }
    }

    /// Returns true when the folder routes the core event type.
    #[must_use]
    pub fn routes_type(&self, event_type: &str) -> bool {
        self.routes.contains_key(event_type)
    }
}

impl Applier for AggregateFolder {
    fn apply(&self, mut state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
        let definition = self.event_registry.definition(&event.event_type);
        if definition.is_some_and(|definition| definition.intent == Intent::AuditOnly) {
            return Ok(state);
        }
        let system_owned = definition.map_or_else(
            || event.is_system_owned(),
            |definition| definition.owner == Owner::System,
        );
        if system_owned {
            let (Some(system_id), Some(system_version)) = (&event.system_id, &event.system_version)
            else {
                return Err(FoldError::MissingSystemMetadata {
                    event_type: event.event_type.clone(),
                });
            };
            let key = SystemKey::new(system_id.clone(), system_version.clone());
            let slot = match state.systems.remove(&key) {
                Some(slot) => slot,
                None => {
                    let Some(module) = self.modules.get(system_id, system_version) else {
                        return Err(FoldError::UnknownSystem {
                            system_id: system_id.clone(),
                            system_version: system_version.clone(),
                        });
                    };
                    module.state_factory()
                }
            };
            let folded = self.modules.route_event(slot, event)?;
            state.systems.insert(key, folded);
            return Ok(state);
        }
        match self.routes.get(&event.event_type) {
            Some(domain) => domain.fold(state, event),
            None => Ok(state),
        }
    }
}
