// system-tests/src/lib.rs
// ============================================================================
// Module: System Test Harness
// Description: Shared wiring for end-to-end Chronicle scenarios.
// Purpose: Build a full pipeline over the in-memory stores with a fixed clock.
// Dependencies: chronicle-core, chronicle-domains, chronicle-runtime, chronicle-store-memory
// ============================================================================

//! ## Overview
//! The harness wires the default registries (or registries extended with
//! modules and adapters) to the in-memory journal, checkpoint, and snapshot
//! stores behind a command handler with a fixed clock, so every scenario is
//! deterministic end to end.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use chronicle_core::FixedClock;
use chronicle_core::Timestamp;
use chronicle_core::interfaces::GameModule;
use chronicle_core::interfaces::ProjectionAdapter;
use chronicle_runtime::BuiltRegistries;
use chronicle_runtime::CommandHandler;
use chronicle_runtime::ReplayStateLoader;
use chronicle_runtime::build_registries;
use chronicle_store_memory::MemoryCheckpointStore;
use chronicle_store_memory::MemoryJournal;
use chronicle_store_memory::MemorySnapshotStore;

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Fixed timestamp used by every scenario clock.
pub const HARNESS_UNIX_NANOS: i128 = 1_700_000_000_000_000_000;

/// Fully wired pipeline over in-memory stores.
pub struct Harness {
    /// Handler under test.
    pub handler: CommandHandler,
    /// Shared journal.
    pub journal: Arc<MemoryJournal>,
    /// Shared checkpoint store.
    pub checkpoints: Arc<MemoryCheckpointStore>,
    /// Shared snapshot store.
    pub snapshots: Arc<MemorySnapshotStore>,
    /// Frozen registries.
    pub built: BuiltRegistries,
    /// Scenario clock.
    pub clock: Arc<FixedClock>,
}

impl Harness {
    /// Builds a harness over the default (core-only) registries.
    ///
    /// # Panics
    ///
    /// Panics when startup validation fails; scenarios treat that as a
    /// broken build.
    #[must_use]
    pub fn new() -> Self {
        Self::with_extensions(Vec::new(), Vec::new())
    }

    /// Builds a harness with modules and adapters registered.
    ///
    /// # Panics
    ///
    /// Panics when startup validation fails; scenarios treat that as a
    /// broken build.
    #[must_use]
    #[allow(clippy::expect_used, reason = "Harness construction failure is a broken test build.")]
    pub fn with_extensions(
        modules: Vec<Arc<dyn GameModule>>,
        adapters: Vec<Arc<dyn ProjectionAdapter>>,
    ) -> Self {
        let built = build_registries(chronicle_domains::core_domains(), modules, adapters)
            .expect("startup validators");
        let journal = Arc::new(MemoryJournal::new());
        let checkpoints = Arc::new(MemoryCheckpointStore::new());
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let clock = Arc::new(FixedClock::new(
            Timestamp::from_unix_nanos(HARNESS_UNIX_NANOS).expect("harness timestamp"),
        ));
        let loader = Arc::new(ReplayStateLoader::new(
            Arc::clone(&journal) as _,
            Some(Arc::clone(&checkpoints) as _),
            Some(Arc::clone(&snapshots) as _),
            Arc::clone(&built.folder) as _,
            Arc::clone(&clock) as _,
        ));
        let handler = CommandHandler::builder()
            .command_registry(Arc::clone(&built.command_registry))
            .event_registry(Arc::clone(&built.event_registry))
            .journal(Arc::clone(&journal) as _)
            .checkpoints(Arc::clone(&checkpoints) as _)
            .snapshots(Arc::clone(&snapshots) as _)
            .decider(Arc::clone(&built.router) as _)
            .applier(Arc::clone(&built.folder) as _)
            .state_loader(Arc::clone(&loader) as _)
            .gate_loader(loader as _)
            .clock(Arc::clone(&clock) as _)
            .build()
            .expect("handler build");
        Self {
            handler,
            journal,
            checkpoints,
            snapshots,
            built,
            clock,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
