// crates/chronicle-runtime/src/modules.rs
// ============================================================================
// Module: Module and Adapter Registries
// Description: Registration and routing for pluggable game-system modules.
// Purpose: Resolve modules and adapters by system id and version.
// Dependencies: chronicle-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Modules register under `(id, version)`; the first version registered for
//! an id becomes the default and resolves for an empty version string.
//! Registration is startup-only; lookups take a read lock and are safe for
//! concurrent use. Every system-owned type a module registers must carry the
//! `sys.<namespace>.` prefix derived from its id; the startup pass enforces
//! this by diffing registry contents around each module's registration hooks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use chronicle_core::Command;
use chronicle_core::Decision;
use chronicle_core::Event;
use chronicle_core::FoldError;
use chronicle_core::SystemId;
use chronicle_core::SystemKey;
use chronicle_core::SystemVersion;
use chronicle_core::codes;
use chronicle_core::core::time::Clock;
use chronicle_core::interfaces::AdapterError;
use chronicle_core::interfaces::GameModule;
use chronicle_core::interfaces::ProjectionAdapter;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Namespace Normalization
// ============================================================================

/// Normalizes a module identifier into its type namespace.
///
/// Lower-cases the identifier and collapses every run of non-alphanumeric
/// characters into a single underscore, trimming underscores at the ends.
#[must_use]
pub fn normalize_namespace(system_id: &SystemId) -> String {
    let mut namespace = String::with_capacity(system_id.as_str().len());
    let mut pending_separator = false;
    for ch in system_id.as_str().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !namespace.is_empty() {
                namespace.push('_');
            }
            pending_separator = false;
            namespace.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    namespace
}

/// Returns the required type prefix for a module's commands and events.
#[must_use]
pub fn system_type_prefix(system_id: &SystemId) -> String {
    format!("sys.{}.", normalize_namespace(system_id))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Module and adapter registration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ModuleRegistryError {
    /// Module or adapter identifier is empty.
    #[error("system id is required")]
    EmptyId,
    /// Module or adapter version is empty.
    #[error("system version is required")]
    EmptyVersion,
    /// A module is already registered under the key.
    #[error("module already registered: {key}")]
    DuplicateModule {
        /// Offending system key.
        key: SystemKey,
    },
    /// An adapter is already registered under the key.
    #[error("adapter already registered: {key}")]
    DuplicateAdapter {
        /// Offending system key.
        key: SystemKey,
    },
}

// ============================================================================
// SECTION: Module Registry
// ============================================================================

/// Registry of game-system modules keyed by `(id, version)`.
///
/// # Invariants
/// - Keys are unique; the first version registered per id is the default.
/// - Registration is startup-only; reads are lock-shared.
#[derive(Default)]
pub struct ModuleRegistry {
    /// Modules keyed by system id and version.
    modules: RwLock<BTreeMap<SystemKey, Arc<dyn GameModule>>>,
    /// Default version per system id (first registered).
    defaults: RwLock<BTreeMap<SystemId, SystemVersion>>,
}

/// Acquires a read guard, recovering from poisoning.
fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Acquires a write guard, recovering from poisoning.
fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleRegistryError`] for empty identifiers or duplicates.
    pub fn register(&self, module: Arc<dyn GameModule>) -> Result<(), ModuleRegistryError> {
        let id = module.id();
        let version = module.version();
        if id.is_empty() {
            return Err(ModuleRegistryError::EmptyId);
        }
        if version.is_empty() {
            return Err(ModuleRegistryError::EmptyVersion);
        }
        let key = SystemKey::new(id.clone(), version.clone());
        let mut modules = write_guard(&self.modules);
        if modules.contains_key(&key) {
            return Err(ModuleRegistryError::DuplicateModule {
                key,
            });
        }
        modules.insert(key, module);
        let mut defaults = write_guard(&self.defaults);
        defaults.entry(id).or_insert(version);
        Ok(())
    }

    /// Resolves a module; an empty version resolves the default.
    #[must_use]
    pub fn get(&self, id: &SystemId, version: &SystemVersion) -> Option<Arc<dyn GameModule>> {
        let resolved = if version.is_empty() {
            read_guard(&self.defaults).get(id).cloned()?
        } else {
            version.clone()
        };
        read_guard(&self.modules).get(&SystemKey::new(id.clone(), resolved)).cloned()
    }

    /// Returns all registered modules in stable key order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<dyn GameModule>> {
        read_guard(&self.modules).values().cloned().collect()
    }

    /// Routes a system-owned command to its module's decider.
    ///
    /// Missing metadata or an unknown module yields a
    /// `COMMAND_TYPE_UNSUPPORTED` rejection, never an error.
    #[must_use]
    pub fn route_command(
        &self,
        state: &chronicle_core::AggregateState,
        command: &Command,
        clock: &dyn Clock,
    ) -> Decision {
        let (Some(system_id), Some(system_version)) = (&command.system_id, &command.system_version)
        else {
            return Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("command {} carries no system metadata", command.command_type),
            );
        };
        let Some(module) = self.get(system_id, system_version) else {
            return Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("no module registered for system {system_id}@{system_version}"),
            );
        };
        module.decide(state, command, clock)
    }

    /// Routes a system-owned event to its module's folder.
    ///
    /// # Errors
    ///
    /// Returns [`FoldError`] when metadata is missing or no module matches.
    pub fn route_event(&self, slot: Value, event: &Event) -> Result<Value, FoldError> {
        let (Some(system_id), Some(system_version)) = (&event.system_id, &event.system_version)
        else {
            return Err(FoldError::MissingSystemMetadata {
                event_type: event.event_type.clone(),
            });
        };
        let Some(module) = self.get(system_id, system_version) else {
            return Err(FoldError::UnknownSystem {
                system_id: system_id.clone(),
                system_version: system_version.clone(),
            });
        };
        module.fold(slot, event)
    }
}

// ============================================================================
// SECTION: Adapter Registry
// ============================================================================

/// Registry of projection adapters keyed by `(id, version)`.
///
/// # Invariants
/// - Keys are unique; registration is startup-only.
#[derive(Default)]
pub struct AdapterRegistry {
    /// Adapters keyed by system id and version.
    adapters: RwLock<BTreeMap<SystemKey, Arc<dyn ProjectionAdapter>>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleRegistryError`] for empty identifiers or duplicates.
    pub fn register(&self, adapter: Arc<dyn ProjectionAdapter>) -> Result<(), ModuleRegistryError> {
        let id = adapter.system_id();
        let version = adapter.system_version();
        if id.is_empty() {
            return Err(ModuleRegistryError::EmptyId);
        }
        if version.is_empty() {
            return Err(ModuleRegistryError::EmptyVersion);
        }
        let key = SystemKey::new(id, version);
        let mut adapters = write_guard(&self.adapters);
        if adapters.contains_key(&key) {
            return Err(ModuleRegistryError::DuplicateAdapter {
                key,
            });
        }
        adapters.insert(key, adapter);
        Ok(())
    }

    /// Resolves an adapter by exact key.
    #[must_use]
    pub fn get(&self, id: &SystemId, version: &SystemVersion) -> Option<Arc<dyn ProjectionAdapter>> {
        read_guard(&self.adapters).get(&SystemKey::new(id.clone(), version.clone())).cloned()
    }

    /// Returns all registered adapters in stable key order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<dyn ProjectionAdapter>> {
        read_guard(&self.adapters).values().cloned().collect()
    }

    /// Routes a system-owned event to its adapter, when one is registered
    /// and declares the type.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the adapter's update fails.
    pub fn route_event(&self, event: &Event) -> Result<(), AdapterError> {
        let (Some(system_id), Some(system_version)) = (&event.system_id, &event.system_version)
        else {
            return Ok(());
        };
        let Some(adapter) = self.get(system_id, system_version) else {
            return Ok(());
        };
        if adapter.handled_types().iter().any(|handled| handled == &event.event_type) {
            return adapter.apply(event);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
