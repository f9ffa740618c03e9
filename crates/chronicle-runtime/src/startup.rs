// crates/chronicle-runtime/src/startup.rs
// ============================================================================
// Module: Startup Validation
// Description: Registry construction and cross-registry consistency checks.
// Purpose: Refuse to start unless every handler, decider, and validator lines up.
// Dependencies: chronicle-core, chronicle-domains
// ============================================================================

//! ## Overview
//! `build_registries` registers the core domains, then each module and
//! adapter, then runs every cross-registry consistency check: emittable
//! coverage, fold coverage, dispatch parity, addressing consistency, audit
//! and projection rules, decider command coverage in both directions,
//! adapter coverage, state factory determinism, and payload validator
//! presence. The philosophy is to fail at start, not at the first
//! production command; any failure here means the process must not come up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chronicle_core::CharacterId;
use chronicle_core::CommandRegistry;
use chronicle_core::EventRegistry;
use chronicle_core::Intent;
use chronicle_core::Owner;
use chronicle_core::RegistryError;
use chronicle_core::SystemKey;
use chronicle_core::interfaces::GameModule;
use chronicle_core::interfaces::ProjectionAdapter;
use chronicle_domains::DomainPackage;
use chronicle_domains::core_domains;
use thiserror::Error;

use crate::folder::AggregateFolder;
use crate::modules::AdapterRegistry;
use crate::modules::ModuleRegistry;
use crate::modules::ModuleRegistryError;
use crate::modules::system_type_prefix;
use crate::router::CommandRouter;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Startup validation errors; any of these prevents the process from
/// starting.
///
/// # Invariants
/// - Variants are stable and name the offending type or module.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A definition was rejected during registration.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A module or adapter registration was rejected.
    #[error(transparent)]
    Module(#[from] ModuleRegistryError),
    /// A module registered a type outside its `sys.<namespace>.` prefix.
    #[error("module {module} registered {type_name} outside its prefix {expected_prefix}")]
    SystemPrefixViolation {
        /// Offending module key.
        module: SystemKey,
        /// Offending type string.
        type_name: String,
        /// Required prefix.
        expected_prefix: String,
    },
    /// A core decider claims to emit an unregistered event type.
    #[error("domain {domain} emits unregistered event type {type_name}")]
    CoreEmittableUnregistered {
        /// Domain name.
        domain: &'static str,
        /// Offending type string.
        type_name: String,
    },
    /// A module claims to emit an unregistered event type.
    #[error("module {module} emits unregistered event type {type_name}")]
    SystemEmittableUnregistered {
        /// Offending module key.
        module: SystemKey,
        /// Offending type string.
        type_name: String,
    },
    /// A registered core event with replay intent has no fold handler.
    #[error("core event {type_name} requires a fold handler but none is declared")]
    CoreFoldMissing {
        /// Offending type string.
        type_name: String,
    },
    /// A system-emittable event with replay intent is not folded by its
    /// module.
    #[error("module {module} emits {type_name} but does not fold it")]
    SystemFoldMissing {
        /// Offending module key.
        module: SystemKey,
        /// Offending type string.
        type_name: String,
    },
    /// An alias target with replay intent has no fold handler.
    #[error("alias {from} -> {to} targets a type without a fold handler")]
    AliasFoldMissing {
        /// Alias source type.
        from: String,
        /// Alias target type.
        to: String,
    },
    /// A declared fold-handled type is not routed by the aggregate folder.
    #[error("domain {domain} fold-handles {type_name} but the aggregate folder does not route it")]
    FoldDispatchMissing {
        /// Domain name.
        domain: &'static str,
        /// Offending type string.
        type_name: String,
    },
    /// A domain mixes entity-addressed and unaddressed fold-handled types.
    #[error("domain {domain} mixes addressed and unaddressed fold-handled types ({type_name} is unaddressed)")]
    AddressingInconsistent {
        /// Domain name.
        domain: &'static str,
        /// Offending unaddressed type.
        type_name: String,
    },
    /// A fold handler exists for an audit-only event.
    #[error("{owner} declares a fold handler for audit-only event {type_name}")]
    FoldForAudit {
        /// Declaring domain or module label.
        owner: String,
        /// Offending type string.
        type_name: String,
    },
    /// A fold handler references an unregistered event type.
    #[error("{owner} declares a fold handler for unregistered event {type_name}")]
    StaleFoldHandler {
        /// Declaring domain or module label.
        owner: String,
        /// Offending type string.
        type_name: String,
    },
    /// A projection-and-replay core event has no projection handler.
    #[error("core event {type_name} requires a projection handler but none is declared")]
    ProjectionMissing {
        /// Offending type string.
        type_name: String,
    },
    /// A projection handler exists for a replay-only or audit-only event.
    #[error("{owner} declares a projection handler for non-projection event {type_name}")]
    ProjectionForNonProjection {
        /// Declaring domain or adapter label.
        owner: String,
        /// Offending type string.
        type_name: String,
    },
    /// A projection handler references a type that is no longer registered.
    #[error("{owner} declares a projection handler for unregistered event {type_name}")]
    StaleProjection {
        /// Declaring domain or adapter label.
        owner: String,
        /// Offending type string.
        type_name: String,
    },
    /// A registered core command is not claimed by any domain decider.
    #[error("core command {type_name} is not claimed by any domain decider")]
    DeciderCommandUnclaimed {
        /// Offending command type.
        type_name: String,
    },
    /// A domain decider claims an unregistered command.
    #[error("domain {domain} claims unregistered command {type_name}")]
    DeciderCommandUnregistered {
        /// Domain name.
        domain: &'static str,
        /// Offending command type.
        type_name: String,
    },
    /// A module-registered command is not handled by the module's decider.
    #[error("module {module} registered command {type_name} but its decider does not handle it")]
    ModuleCommandUnclaimed {
        /// Offending module key.
        module: SystemKey,
        /// Offending command type.
        type_name: String,
    },
    /// A module decider claims an unregistered command.
    #[error("module {module} claims unregistered command {type_name}")]
    ModuleCommandUnregistered {
        /// Offending module key.
        module: SystemKey,
        /// Offending command type.
        type_name: String,
    },
    /// A projection-intent system event has no adapter handler.
    #[error("module {module} emits projection event {type_name} but no adapter handles it")]
    AdapterCoverageMissing {
        /// Offending module key.
        module: SystemKey,
        /// Offending type string.
        type_name: String,
    },
    /// An adapter is registered for a system with no module.
    #[error("adapter {key} has no matching module")]
    AdapterWithoutModule {
        /// Offending adapter key.
        key: SystemKey,
    },
    /// A module folds or projects a type it does not declare emittable.
    #[error("{owner} handles {type_name} which module {module} does not declare emittable")]
    RouterParity {
        /// Declaring module or adapter label.
        owner: String,
        /// Offending module key.
        module: SystemKey,
        /// Offending type string.
        type_name: String,
    },
    /// A module state factory returned different values on repeated calls.
    #[error("module {module} {factory} factory is nondeterministic")]
    StateFactoryNondeterministic {
        /// Offending module key.
        module: SystemKey,
        /// Factory label (`state` or `character`).
        factory: &'static str,
    },
    /// A non-audit event type has no payload validator.
    #[error("event {type_name} has no payload validator")]
    PayloadValidatorMissing {
        /// Offending type string.
        type_name: String,
    },
}

// ============================================================================
// SECTION: Built Registries
// ============================================================================

/// Frozen registries and routers produced by a successful startup pass.
pub struct BuiltRegistries {
    /// Command registry.
    pub command_registry: Arc<CommandRegistry>,
    /// Event registry.
    pub event_registry: Arc<EventRegistry>,
    /// Module registry.
    pub modules: Arc<ModuleRegistry>,
    /// Adapter registry.
    pub adapters: Arc<AdapterRegistry>,
    /// Core domain packages in registration order.
    pub domains: Vec<Arc<dyn DomainPackage>>,
    /// Aggregate folder routing every fold-handled type.
    pub folder: Arc<AggregateFolder>,
    /// Command router covering every registered command.
    pub router: Arc<CommandRouter>,
}

impl std::fmt::Debug for BuiltRegistries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltRegistries").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Build
// ============================================================================

/// Builds and validates the default registries: core domains, no modules.
///
/// # Errors
///
/// Returns [`StartupError`] when any consistency check fails.
pub fn build_default_registries() -> Result<BuiltRegistries, StartupError> {
    build_registries(core_domains(), Vec::new(), Vec::new())
}

/// Builds the registries from domains, modules, and adapters, then runs
/// every startup validator.
///
/// # Errors
///
/// Returns [`StartupError`] naming the first failed check; the process must
/// not start on error.
pub fn build_registries(
    domains: Vec<Arc<dyn DomainPackage>>,
    game_modules: Vec<Arc<dyn GameModule>>,
    projection_adapters: Vec<Arc<dyn ProjectionAdapter>>,
) -> Result<BuiltRegistries, StartupError> {
    let mut command_registry = CommandRegistry::new();
    let mut event_registry = EventRegistry::new();

    for domain in &domains {
        domain.register_commands(&mut command_registry)?;
        domain.register_events(&mut event_registry)?;
    }

    let modules = Arc::new(ModuleRegistry::new());
    let mut module_commands: Vec<(SystemKey, BTreeSet<String>)> = Vec::new();
    for module in &game_modules {
        let key = SystemKey::new(module.id(), module.version());
        let prefix = system_type_prefix(&module.id());

        let commands_before = command_type_set(&command_registry);
        let events_before = event_type_set(&event_registry);
        module.register_commands(&mut command_registry)?;
        module.register_events(&mut event_registry)?;
        let new_commands: BTreeSet<String> =
            command_type_set(&command_registry).difference(&commands_before).cloned().collect();
        let new_events: BTreeSet<String> =
            event_type_set(&event_registry).difference(&events_before).cloned().collect();

        for type_name in new_commands.iter().chain(new_events.iter()) {
            if !type_name.starts_with(&prefix) {
                return Err(StartupError::SystemPrefixViolation {
                    module: key.clone(),
                    type_name: type_name.clone(),
                    expected_prefix: prefix,
                });
            }
        }

        modules.register(Arc::clone(module))?;
        module_commands.push((key, new_commands));
    }

    let adapters = Arc::new(AdapterRegistry::new());
    for adapter in &projection_adapters {
        adapters.register(Arc::clone(adapter))?;
    }

    let command_registry = Arc::new(command_registry);
    let event_registry = Arc::new(event_registry);
    let folder =
        Arc::new(AggregateFolder::new(&domains, Arc::clone(&event_registry), Arc::clone(&modules)));
    let router = Arc::new(CommandRouter::new(
        &domains,
        Arc::clone(&command_registry),
        Arc::clone(&modules),
    ));

    validate_core_emittable(&domains, &event_registry)?;
    validate_system_emittable(&game_modules, &event_registry)?;
    validate_core_fold_coverage(&domains, &event_registry)?;
    validate_system_fold_coverage(&game_modules, &event_registry)?;
    validate_alias_fold_coverage(&domains, &game_modules, &event_registry)?;
    validate_fold_dispatch(&domains, &folder)?;
    validate_entity_addressing(&domains, &event_registry)?;
    validate_fold_handlers(&domains, &game_modules, &event_registry)?;
    validate_projection_coverage(&domains, &event_registry)?;
    validate_projection_handlers(&domains, &projection_adapters, &event_registry)?;
    validate_core_decider_coverage(&domains, &command_registry)?;
    validate_module_decider_coverage(&module_commands, &game_modules, &command_registry)?;
    validate_adapter_coverage(&game_modules, &projection_adapters, &event_registry)?;
    validate_router_parity(&game_modules, &projection_adapters, &modules)?;
    validate_state_factories(&game_modules)?;
    validate_payload_validators(&event_registry)?;

    Ok(BuiltRegistries {
        command_registry,
        event_registry,
        modules,
        adapters,
        domains,
        folder,
        router,
    })
}

// ============================================================================
// SECTION: Snapshot Helpers
// ============================================================================

/// Returns the set of registered command types.
fn command_type_set(registry: &CommandRegistry) -> BTreeSet<String> {
    registry
        .list_definitions()
        .into_iter()
        .map(|definition| definition.command_type.clone())
        .collect()
}

/// Returns the set of registered event types.
fn event_type_set(registry: &EventRegistry) -> BTreeSet<String> {
    registry
        .list_definitions()
        .into_iter()
        .map(|definition| definition.event_type.clone())
        .collect()
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Every type a core decider claims to emit is registered.
fn validate_core_emittable(
    domains: &[Arc<dyn DomainPackage>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    for domain in domains {
        for type_name in domain.emittable_event_types() {
            if events.definition(&type_name).is_none() {
                return Err(StartupError::CoreEmittableUnregistered {
                    domain: domain.name(),
                    type_name,
                });
            }
        }
    }
    Ok(())
}

/// Every type a module claims to emit is registered.
fn validate_system_emittable(
    modules: &[Arc<dyn GameModule>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    for module in modules {
        let key = SystemKey::new(module.id(), module.version());
        for type_name in module.emittable_event_types() {
            if events.definition(&type_name).is_none() {
                return Err(StartupError::SystemEmittableUnregistered {
                    module: key.clone(),
                    type_name,
                });
            }
        }
    }
    Ok(())
}

/// Every registered core event with replay intent has a fold handler.
fn validate_core_fold_coverage(
    domains: &[Arc<dyn DomainPackage>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    let fold_handled: BTreeSet<String> =
        domains.iter().flat_map(|domain| domain.fold_handled_types()).collect();
    for definition in events.list_definitions() {
        if definition.owner == Owner::Core
            && definition.intent.requires_fold()
            && !fold_handled.contains(&definition.event_type)
        {
            return Err(StartupError::CoreFoldMissing {
                type_name: definition.event_type.clone(),
            });
        }
    }
    Ok(())
}

/// Every system-emittable event with replay intent is folded by its module.
fn validate_system_fold_coverage(
    modules: &[Arc<dyn GameModule>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    for module in modules {
        let key = SystemKey::new(module.id(), module.version());
        let fold_handled: BTreeSet<String> = module.fold_handled_types().into_iter().collect();
        for type_name in module.emittable_event_types() {
            let requires_fold = events
                .definition(&type_name)
                .is_some_and(|definition| definition.intent.requires_fold());
            if requires_fold && !fold_handled.contains(&type_name) {
                return Err(StartupError::SystemFoldMissing {
                    module: key.clone(),
                    type_name,
                });
            }
        }
    }
    Ok(())
}

/// Every alias target with replay intent has a fold handler.
fn validate_alias_fold_coverage(
    domains: &[Arc<dyn DomainPackage>],
    modules: &[Arc<dyn GameModule>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    let mut fold_handled: BTreeSet<String> =
        domains.iter().flat_map(|domain| domain.fold_handled_types()).collect();
    fold_handled.extend(modules.iter().flat_map(|module| module.fold_handled_types()));
    for (from, to) in events.list_aliases() {
        let requires_fold =
            events.definition(to).is_some_and(|definition| definition.intent.requires_fold());
        if requires_fold && !fold_handled.contains(to) {
            return Err(StartupError::AliasFoldMissing {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
    }
    Ok(())
}

/// Every declared fold-handled type is routed by the aggregate folder.
fn validate_fold_dispatch(
    domains: &[Arc<dyn DomainPackage>],
    folder: &AggregateFolder,
) -> Result<(), StartupError> {
    for domain in domains {
        for type_name in domain.fold_handled_types() {
            if !folder.routes_type(&type_name) {
                return Err(StartupError::FoldDispatchMissing {
                    domain: domain.name(),
                    type_name,
                });
            }
        }
    }
    Ok(())
}

/// A domain's fold-handled types use entity addressing all-or-nothing.
fn validate_entity_addressing(
    domains: &[Arc<dyn DomainPackage>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    use chronicle_core::AddressingPolicy;

    for domain in domains {
        let mut any_addressed = false;
        let mut unaddressed: Option<String> = None;
        for type_name in domain.fold_handled_types() {
            let Some(definition) = events.definition(&type_name) else {
                continue;
            };
            if definition.addressing == AddressingPolicy::None {
                unaddressed.get_or_insert(type_name);
            } else {
                any_addressed = true;
            }
        }
        if any_addressed && let Some(type_name) = unaddressed {
            return Err(StartupError::AddressingInconsistent {
                domain: domain.name(),
                type_name,
            });
        }
    }
    Ok(())
}

/// Fold handlers reference registered, non-audit event types.
fn validate_fold_handlers(
    domains: &[Arc<dyn DomainPackage>],
    modules: &[Arc<dyn GameModule>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    let mut handlers: Vec<(String, Vec<String>)> = domains
        .iter()
        .map(|domain| (format!("domain {}", domain.name()), domain.fold_handled_types()))
        .collect();
    handlers.extend(modules.iter().map(|module| {
        (
            format!("module {}", SystemKey::new(module.id(), module.version())),
            module.fold_handled_types(),
        )
    }));
    for (owner, types) in handlers {
        for type_name in types {
            match events.definition(&type_name) {
                None => {
                    return Err(StartupError::StaleFoldHandler {
                        owner,
                        type_name,
                    });
                }
                Some(definition) if definition.intent == Intent::AuditOnly => {
                    return Err(StartupError::FoldForAudit {
                        owner,
                        type_name,
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Every projection-and-replay core event has a projection handler.
fn validate_projection_coverage(
    domains: &[Arc<dyn DomainPackage>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    let projection_handled: BTreeSet<String> =
        domains.iter().flat_map(|domain| domain.projection_handled_types()).collect();
    for definition in events.list_definitions() {
        if definition.owner == Owner::Core
            && definition.intent.requires_projection()
            && !projection_handled.contains(&definition.event_type)
        {
            return Err(StartupError::ProjectionMissing {
                type_name: definition.event_type.clone(),
            });
        }
    }
    Ok(())
}

/// Projection handlers reference registered, projection-intent types.
fn validate_projection_handlers(
    domains: &[Arc<dyn DomainPackage>],
    adapters: &[Arc<dyn ProjectionAdapter>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    let mut handlers: Vec<(String, Vec<String>)> = domains
        .iter()
        .map(|domain| (format!("domain {}", domain.name()), domain.projection_handled_types()))
        .collect();
    handlers.extend(adapters.iter().map(|adapter| {
        (
            format!("adapter {}", SystemKey::new(adapter.system_id(), adapter.system_version())),
            adapter.handled_types(),
        )
    }));
    for (owner, types) in handlers {
        for type_name in types {
            match events.definition(&type_name) {
                None => {
                    return Err(StartupError::StaleProjection {
                        owner,
                        type_name,
                    });
                }
                Some(definition) if !definition.intent.requires_projection() => {
                    return Err(StartupError::ProjectionForNonProjection {
                        owner,
                        type_name,
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Registered core commands and domain decider claims match both ways.
fn validate_core_decider_coverage(
    domains: &[Arc<dyn DomainPackage>],
    commands: &CommandRegistry,
) -> Result<(), StartupError> {
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    for domain in domains {
        for command_type in domain.decider_handled_commands() {
            if commands.definition(&command_type).is_none() {
                return Err(StartupError::DeciderCommandUnregistered {
                    domain: domain.name(),
                    type_name: command_type,
                });
            }
            claimed.insert(command_type);
        }
    }
    for definition in commands.list_definitions() {
        if definition.owner == Owner::Core && !claimed.contains(&definition.command_type) {
            return Err(StartupError::DeciderCommandUnclaimed {
                type_name: definition.command_type.clone(),
            });
        }
    }
    Ok(())
}

/// Module-registered commands and module decider claims match both ways.
fn validate_module_decider_coverage(
    module_commands: &[(SystemKey, BTreeSet<String>)],
    modules: &[Arc<dyn GameModule>],
    commands: &CommandRegistry,
) -> Result<(), StartupError> {
    for ((key, registered), module) in module_commands.iter().zip(modules.iter()) {
        let handled: BTreeSet<String> = module.command_types().into_iter().collect();
        for type_name in registered {
            if !handled.contains(type_name) {
                return Err(StartupError::ModuleCommandUnclaimed {
                    module: key.clone(),
                    type_name: type_name.clone(),
                });
            }
        }
        for type_name in handled {
            if commands.definition(&type_name).is_none() {
                return Err(StartupError::ModuleCommandUnregistered {
                    module: key.clone(),
                    type_name,
                });
            }
        }
    }
    Ok(())
}

/// Every projection-intent system-emittable event has an adapter handler.
fn validate_adapter_coverage(
    modules: &[Arc<dyn GameModule>],
    adapters: &[Arc<dyn ProjectionAdapter>],
    events: &EventRegistry,
) -> Result<(), StartupError> {
    for module in modules {
        let key = SystemKey::new(module.id(), module.version());
        let handled: BTreeSet<String> = adapters
            .iter()
            .filter(|adapter| {
                SystemKey::new(adapter.system_id(), adapter.system_version()) == key
            })
            .flat_map(|adapter| adapter.handled_types())
            .collect();
        for type_name in module.emittable_event_types() {
            let requires_projection = events
                .definition(&type_name)
                .is_some_and(|definition| definition.intent.requires_projection());
            if requires_projection && !handled.contains(&type_name) {
                return Err(StartupError::AdapterCoverageMissing {
                    module: key.clone(),
                    type_name,
                });
            }
        }
    }
    Ok(())
}

/// Fold and adapter handlers exist only for declared emittable types.
fn validate_router_parity(
    modules: &[Arc<dyn GameModule>],
    adapters: &[Arc<dyn ProjectionAdapter>],
    registry: &ModuleRegistry,
) -> Result<(), StartupError> {
    for module in modules {
        let key = SystemKey::new(module.id(), module.version());
        let emittable: BTreeSet<String> = module.emittable_event_types().into_iter().collect();
        for type_name in module.fold_handled_types() {
            if !emittable.contains(&type_name) {
                return Err(StartupError::RouterParity {
                    owner: format!("module {key}"),
                    module: key.clone(),
                    type_name,
                });
            }
        }
    }
    for adapter in adapters {
        let key = SystemKey::new(adapter.system_id(), adapter.system_version());
        let Some(module) = registry.get(&adapter.system_id(), &adapter.system_version()) else {
            return Err(StartupError::AdapterWithoutModule {
                key,
            });
        };
        let emittable: BTreeSet<String> = module.emittable_event_types().into_iter().collect();
        for type_name in adapter.handled_types() {
            if !emittable.contains(&type_name) {
                return Err(StartupError::RouterParity {
                    owner: format!("adapter {key}"),
                    module: key.clone(),
                    type_name,
                });
            }
        }
    }
    Ok(())
}

/// Module state and character factories are deterministic.
fn validate_state_factories(modules: &[Arc<dyn GameModule>]) -> Result<(), StartupError> {
    for module in modules {
        let key = SystemKey::new(module.id(), module.version());
        if module.state_factory() != module.state_factory() {
            return Err(StartupError::StateFactoryNondeterministic {
                module: key,
                factory: "state",
            });
        }
        let probe = CharacterId::new("startup-determinism-probe");
        if module.character_factory(&probe) != module.character_factory(&probe) {
            return Err(StartupError::StateFactoryNondeterministic {
                module: key,
                factory: "character",
            });
        }
    }
    Ok(())
}

/// Every non-audit event type carries a payload validator.
fn validate_payload_validators(events: &EventRegistry) -> Result<(), StartupError> {
    if let Some(type_name) = events.missing_payload_validators().into_iter().next() {
        return Err(StartupError::PayloadValidatorMissing {
            type_name,
        });
    }
    Ok(())
}
