// crates/chronicle-runtime/src/lib.rs
// ============================================================================
// Module: Chronicle Runtime Library
// Description: Pipeline, replay, routing, and startup validation.
// Purpose: Compose core interfaces and domain packages into the write path.
// Dependencies: chronicle-core, chronicle-domains
// ============================================================================

//! ## Overview
//! Chronicle Runtime composes the domain core into the uniform write path:
//! the command handler pipeline, the centralized gate evaluator, the
//! aggregate folder, the command router, the replay engine, module and
//! adapter registries, and the startup validation pass that refuses to
//! bring the process up unless every cross-registry contract holds.
//! Invariants:
//! - Registries are frozen after a successful startup pass.
//! - Errors raised after a successful batch append are non-retryable.
//! - Deciders and folders perform no I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod folder;
pub mod gate;
pub mod modules;
pub mod pipeline;
pub mod replay;
pub mod router;
pub mod startup;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use folder::AggregateFolder;
pub use gate::PolicyGateEvaluator;
pub use modules::AdapterRegistry;
pub use modules::ModuleRegistry;
pub use modules::ModuleRegistryError;
pub use modules::normalize_namespace;
pub use modules::system_type_prefix;
pub use pipeline::CommandHandler;
pub use pipeline::CommandHandlerBuilder;
pub use pipeline::HandlerBuildError;
pub use pipeline::HandlerError;
pub use pipeline::HandlerOutcome;
pub use pipeline::is_non_retryable;
pub use replay::DEFAULT_PAGE_SIZE;
pub use replay::ReplayOptions;
pub use replay::ReplayOutcome;
pub use replay::ReplayStateLoader;
pub use replay::replay;
pub use router::CommandRouter;
pub use startup::BuiltRegistries;
pub use startup::StartupError;
pub use startup::build_default_registries;
pub use startup::build_registries;
pub use telemetry::CommandOutcome;
pub use telemetry::NoopMetrics;
pub use telemetry::PipelineMetrics;
