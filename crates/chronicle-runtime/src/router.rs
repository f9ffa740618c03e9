// crates/chronicle-runtime/src/router.rs
// ============================================================================
// Module: Command Router
// Description: Routes validated commands to domain or module deciders.
// Purpose: Compose the core deciders and module deciders behind one decider.
// Dependencies: chronicle-core, chronicle-domains
// ============================================================================

//! ## Overview
//! The command router is the decider the pipeline calls. Core-owned commands
//! dispatch through a routing table built from each domain's declared
//! handled commands; system-owned commands resolve their module by the
//! command's system metadata. A command no decider claims yields a
//! `COMMAND_TYPE_UNSUPPORTED` rejection; startup validators make that
//! unreachable for registered types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chronicle_core::AggregateState;
use chronicle_core::Command;
use chronicle_core::CommandRegistry;
use chronicle_core::Decision;
use chronicle_core::Owner;
use chronicle_core::codes;
use chronicle_core::core::time::Clock;
use chronicle_core::interfaces::Decider;
use chronicle_domains::DomainPackage;

use crate::modules::ModuleRegistry;

// ============================================================================
// SECTION: Command Router
// ============================================================================

/// Composite decider routing commands to domains and modules.
///
/// # Invariants
/// - The routing table covers exactly the domains' declared handled
///   commands; startup validators verify both directions.
pub struct CommandRouter {
    /// Command definitions for ownership lookups.
    command_registry: Arc<CommandRegistry>,
    /// Core routing table from command type to owning domain.
    routes: BTreeMap<String, Arc<dyn DomainPackage>>,
    /// Module registry for system command dispatch.
    modules: Arc<ModuleRegistry>,
}

impl CommandRouter {
    /// Builds the router's table from the domain packages.
    #[must_use]
    pub fn new(
        domains: &[Arc<dyn DomainPackage>],
        command_registry: Arc<CommandRegistry>,
        modules: Arc<ModuleRegistry>,
    ) -> Self {
        let mut routes: BTreeMap<String, Arc<dyn DomainPackage>> = BTreeMap::new();
        for domain in domains {
            for command_type in domain.decider_handled_commands() {
                routes.insert(command_type, Arc::clone(domain));
            }
        }
        Self {
            command_registry,
            routes,
            modules,
        }
    }

    /// Returns true when the router dispatches the core command type.
    #[must_use]
    pub fn routes_type(&self, command_type: &str) -> bool {
        self.routes.contains_key(command_type)
    }
}

impl Decider for CommandRouter {
    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        let system_owned = self
            .command_registry
            .definition(&command.command_type)
            .is_some_and(|definition| definition.owner == Owner::System);
        if system_owned {
            return self.modules.route_command(state, command, clock);
        }
        match self.routes.get(&command.command_type) {
            Some(domain) => domain.decide(state, command, clock),
            None => Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("no decider handles {}", command.command_type),
            ),
        }
    }
}
