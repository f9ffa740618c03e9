// crates/chronicle-runtime/tests/startup.rs
// ============================================================================
// Module: Startup Validator Tests
// Description: Every cross-registry consistency check trips on the right defect.
// Purpose: Prove the process refuses to start on misconfigured registries.
// ============================================================================

//! ## Overview
//! Each test builds registries with one deliberate defect (a missing fold
//! handler, a stale projection, an undeclared module command, a bad type
//! prefix, a nondeterministic factory) and asserts startup fails with the
//! matching error naming the offender. The consistent fixture passes.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

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
use chronicle_core::interfaces::GameModule;
use chronicle_core::interfaces::ProjectionAdapter;
use chronicle_domains::DomainPackage;
use chronicle_domains::core_domains;
use chronicle_runtime::StartupError;
use chronicle_runtime::build_default_registries;
use chronicle_runtime::build_registries;

use common::TestAdapter;
use common::TestModule;

// ============================================================================
// SECTION: Happy Path
// ============================================================================

#[test]
fn default_registries_pass_every_validator() {
    let built = build_default_registries().expect("startup");
    assert!(built.command_registry.definition("session.start").is_some());
    assert!(built.event_registry.definition("session.started").is_some());
    assert_eq!(built.domains.len(), 6);
}

#[test]
fn consistent_module_and_adapter_pass() {
    let module: Arc<dyn GameModule> = Arc::new(TestModule::with_projection_intent());
    let adapter: Arc<dyn ProjectionAdapter> = Arc::new(TestAdapter::consistent());
    let built = build_registries(core_domains(), vec![module], vec![adapter]).expect("startup");
    assert!(built.command_registry.definition(common::SYS_CMD_CHECK).is_some());
}

// ============================================================================
// SECTION: Module Validators
// ============================================================================

#[test]
fn bad_prefix_fails_startup() {
    let module: Arc<dyn GameModule> = Arc::new(TestModule {
        bad_prefix: true,
        ..TestModule::consistent()
    });
    let err = build_registries(core_domains(), vec![module], Vec::new()).unwrap_err();
    match err {
        StartupError::SystemPrefixViolation {
            type_name, ..
        } => assert_eq!(type_name, "d20.check"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn module_omitting_registered_command_fails_startup() {
    let module: Arc<dyn GameModule> = Arc::new(TestModule {
        omit_command_claim: true,
        ..TestModule::consistent()
    });
    let err = build_registries(core_domains(), vec![module], Vec::new()).unwrap_err();
    match err {
        StartupError::ModuleCommandUnclaimed {
            type_name, ..
        } => assert_eq!(type_name, common::SYS_CMD_CHECK),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn module_not_folding_replay_event_fails_startup() {
    let module: Arc<dyn GameModule> = Arc::new(TestModule {
        omit_fold: true,
        ..TestModule::consistent()
    });
    let err = build_registries(core_domains(), vec![module], Vec::new()).unwrap_err();
    match err {
        StartupError::SystemFoldMissing {
            type_name, ..
        } => assert_eq!(type_name, common::SYS_EVT_CHECK_RESOLVED),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn fold_handler_for_undeclared_type_fails_startup() {
    let module: Arc<dyn GameModule> = Arc::new(TestModule {
        fold_undeclared_type: true,
        ..TestModule::consistent()
    });
    let err = build_registries(core_domains(), vec![module], Vec::new()).unwrap_err();
    assert!(
        matches!(err, StartupError::StaleFoldHandler { .. } | StartupError::RouterParity { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn nondeterministic_state_factory_fails_startup() {
    let module: Arc<dyn GameModule> = Arc::new(TestModule {
        nondeterministic_state: true,
        ..TestModule::consistent()
    });
    let err = build_registries(core_domains(), vec![module], Vec::new()).unwrap_err();
    match err {
        StartupError::StateFactoryNondeterministic {
            factory, ..
        } => assert_eq!(factory, "state"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn projection_intent_without_adapter_fails_startup() {
    let module: Arc<dyn GameModule> = Arc::new(TestModule::with_projection_intent());
    let err = build_registries(core_domains(), vec![module], Vec::new()).unwrap_err();
    match err {
        StartupError::AdapterCoverageMissing {
            type_name, ..
        } => assert_eq!(type_name, common::SYS_EVT_CHECK_RESOLVED),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn adapter_for_replay_only_event_fails_startup() {
    // The module's event is replay-only, so an adapter for it is dead code.
    let module: Arc<dyn GameModule> = Arc::new(TestModule::consistent());
    let adapter: Arc<dyn ProjectionAdapter> = Arc::new(TestAdapter::consistent());
    let err = build_registries(core_domains(), vec![module], vec![adapter]).unwrap_err();
    assert!(
        matches!(err, StartupError::ProjectionForNonProjection { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn adapter_without_module_fails_startup() {
    let adapter: Arc<dyn ProjectionAdapter> = Arc::new(TestAdapter::consistent());
    let err = build_registries(core_domains(), Vec::new(), vec![adapter]).unwrap_err();
    assert!(
        matches!(
            err,
            StartupError::AdapterWithoutModule { .. } | StartupError::StaleProjection { .. }
        ),
        "unexpected error: {err}"
    );
}

// ============================================================================
// SECTION: Domain Validators
// ============================================================================

/// Domain wrapper that injects defects into an inner core domain's lists.
struct DefectiveDomain {
    /// Wrapped domain.
    inner: Arc<dyn DomainPackage>,
    /// Extra fold-handled types to declare.
    extra_fold: Vec<String>,
    /// Extra projection-handled types to declare.
    extra_projection: Vec<String>,
    /// Extra decider-handled commands to declare.
    extra_commands: Vec<String>,
}

impl DefectiveDomain {
    fn wrap(inner: Arc<dyn DomainPackage>) -> Self {
        Self {
            inner,
            extra_fold: Vec::new(),
            extra_projection: Vec::new(),
            extra_commands: Vec::new(),
        }
    }
}

impl DomainPackage for DefectiveDomain {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        self.inner.register_commands(registry)
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        self.inner.register_events(registry)
    }

    fn emittable_event_types(&self) -> Vec<String> {
        self.inner.emittable_event_types()
    }

    fn decider_handled_commands(&self) -> Vec<String> {
        let mut commands = self.inner.decider_handled_commands();
        commands.extend(self.extra_commands.clone());
        commands
    }

    fn fold_handled_types(&self) -> Vec<String> {
        let mut types = self.inner.fold_handled_types();
        types.extend(self.extra_fold.clone());
        types
    }

    fn projection_handled_types(&self) -> Vec<String> {
        let mut types = self.inner.projection_handled_types();
        types.extend(self.extra_projection.clone());
        types
    }

    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        self.inner.decide(state, command, clock)
    }

    fn fold(&self, state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
        self.inner.fold(state, event)
    }
}

/// Replaces the session domain with a defective wrapper.
fn domains_with_defective_session(defect: DefectiveDomain) -> Vec<Arc<dyn DomainPackage>> {
    let mut domains: Vec<Arc<dyn DomainPackage>> = Vec::new();
    for domain in core_domains() {
        if domain.name() == "session" {
            continue;
        }
        domains.push(domain);
    }
    domains.push(Arc::new(defect));
    domains
}

#[test]
fn fold_handler_for_audit_only_event_fails_startup() {
    let session = core_domains().into_iter().find(|d| d.name() == "session").expect("session");
    let mut defect = DefectiveDomain::wrap(session);
    defect.extra_fold.push("session.note_logged".to_string());
    let err =
        build_registries(domains_with_defective_session(defect), Vec::new(), Vec::new())
            .unwrap_err();
    match err {
        StartupError::FoldForAudit {
            type_name, ..
        } => assert_eq!(type_name, "session.note_logged"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn projection_handler_for_audit_only_event_fails_startup() {
    let session = core_domains().into_iter().find(|d| d.name() == "session").expect("session");
    let mut defect = DefectiveDomain::wrap(session);
    defect.extra_projection.push("session.note_logged".to_string());
    let err =
        build_registries(domains_with_defective_session(defect), Vec::new(), Vec::new())
            .unwrap_err();
    match err {
        StartupError::ProjectionForNonProjection {
            type_name, ..
        } => assert_eq!(type_name, "session.note_logged"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn stale_projection_handler_fails_startup() {
    let session = core_domains().into_iter().find(|d| d.name() == "session").expect("session");
    let mut defect = DefectiveDomain::wrap(session);
    defect.extra_projection.push("session.retired_type".to_string());
    let err =
        build_registries(domains_with_defective_session(defect), Vec::new(), Vec::new())
            .unwrap_err();
    match err {
        StartupError::StaleProjection {
            type_name, ..
        } => assert_eq!(type_name, "session.retired_type"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn decider_claiming_unregistered_command_fails_startup() {
    let session = core_domains().into_iter().find(|d| d.name() == "session").expect("session");
    let mut defect = DefectiveDomain::wrap(session);
    defect.extra_commands.push("session.timewarp".to_string());
    let err =
        build_registries(domains_with_defective_session(defect), Vec::new(), Vec::new())
            .unwrap_err();
    match err {
        StartupError::DeciderCommandUnregistered {
            type_name, ..
        } => assert_eq!(type_name, "session.timewarp"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unclaimed_core_command_fails_startup() {
    /// Domain that registers a command no decider claims.
    struct OrphanCommandDomain;

    impl DomainPackage for OrphanCommandDomain {
        fn name(&self) -> &'static str {
            "orphan"
        }

        fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
            registry.register(chronicle_core::CommandDefinition::new(
                "orphan.noop",
                chronicle_core::Owner::Core,
            ))
        }

        fn register_events(&self, _registry: &mut EventRegistry) -> Result<(), RegistryError> {
            Ok(())
        }

        fn emittable_event_types(&self) -> Vec<String> {
            Vec::new()
        }

        fn decider_handled_commands(&self) -> Vec<String> {
            Vec::new()
        }

        fn fold_handled_types(&self) -> Vec<String> {
            Vec::new()
        }

        fn projection_handled_types(&self) -> Vec<String> {
            Vec::new()
        }

        fn decide(
            &self,
            _state: &AggregateState,
            command: &Command,
            _clock: &dyn Clock,
        ) -> Decision {
            Decision::reject(
                chronicle_core::codes::COMMAND_TYPE_UNSUPPORTED,
                format!("orphan domain does not handle {}", command.command_type),
            )
        }

        fn fold(&self, state: AggregateState, _event: &Event) -> Result<AggregateState, FoldError> {
            Ok(state)
        }
    }

    let mut domains = core_domains();
    domains.push(Arc::new(OrphanCommandDomain));
    let err = build_registries(domains, Vec::new(), Vec::new()).unwrap_err();
    match err {
        StartupError::DeciderCommandUnclaimed {
            type_name,
        } => assert_eq!(type_name, "orphan.noop"),
        other => panic!("unexpected error: {other}"),
    }
}
