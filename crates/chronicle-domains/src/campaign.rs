// crates/chronicle-domains/src/campaign.rs
// ============================================================================
// Module: Campaign Domain
// Description: Campaign creation, activation, theme, and cover metadata.
// Purpose: Decide and fold campaign lifecycle commands and events.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The campaign domain owns campaign metadata: creation, activation, theme,
//! and cover references. Every event addresses the campaign entity itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chronicle_core::AggregateState;
use chronicle_core::CampaignStatus;
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
use chronicle_core::Owner;
use chronicle_core::RegistryError;
use chronicle_core::codes;
use chronicle_core::core::registry::AddressingPolicy;
use chronicle_core::core::time::Clock;
use chronicle_core::typed_validator;
use serde::Deserialize;
use serde::Serialize;

use crate::DomainPackage;
use crate::support::decode_command_payload;
use crate::support::decode_event_payload;
use crate::support::encode_payload;

// ============================================================================
// SECTION: Type Constants
// ============================================================================

/// Command: create the campaign.
pub const CMD_CAMPAIGN_CREATE: &str = "campaign.create";
/// Command: activate the campaign.
pub const CMD_CAMPAIGN_ACTIVATE: &str = "campaign.activate";
/// Command: set the campaign theme.
pub const CMD_CAMPAIGN_SET_THEME: &str = "campaign.set_theme";
/// Command: set the campaign cover reference.
pub const CMD_CAMPAIGN_SET_COVER: &str = "campaign.set_cover";

/// Event: the campaign was created.
pub const EVT_CAMPAIGN_CREATED: &str = "campaign.created";
/// Event: the campaign was activated.
pub const EVT_CAMPAIGN_ACTIVATED: &str = "campaign.activated";
/// Event: the campaign theme changed.
pub const EVT_CAMPAIGN_THEME_SET: &str = "campaign.theme_set";
/// Event: the campaign cover reference changed.
pub const EVT_CAMPAIGN_COVER_SET: &str = "campaign.cover_set";

/// Entity type label for campaign-addressed events.
const ENTITY_CAMPAIGN: &str = "campaign";

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Payload for `campaign.create` and `campaign.created`.
///
/// # Invariants
/// - `name` is required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCreatePayload {
    /// Campaign display name.
    pub name: String,
    /// Narrative theme label.
    #[serde(default)]
    pub theme: String,
}

/// Payload for `campaign.activate` and `campaign.activated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignActivatePayload {}

/// Payload for `campaign.set_theme` and `campaign.theme_set`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePayload {
    /// Narrative theme label; empty clears the theme.
    #[serde(default)]
    pub theme: String,
}

/// Payload for `campaign.set_cover` and `campaign.cover_set`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverPayload {
    /// Cover image reference; empty clears the cover.
    #[serde(default)]
    pub cover_ref: String,
}

// ============================================================================
// SECTION: Domain Package
// ============================================================================

/// Campaign domain package.
pub struct CampaignDomain;

impl DomainPackage for CampaignDomain {
    fn name(&self) -> &'static str {
        "campaign"
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        registry.register(
            CommandDefinition::new(CMD_CAMPAIGN_CREATE, Owner::Core)
                .with_validator(typed_validator::<CampaignCreatePayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_CAMPAIGN_ACTIVATE, Owner::Core)
                .with_validator(typed_validator::<CampaignActivatePayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_CAMPAIGN_SET_THEME, Owner::Core)
                .with_validator(typed_validator::<ThemePayload>()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_CAMPAIGN_SET_COVER, Owner::Core)
                .with_validator(typed_validator::<CoverPayload>()),
        )?;
        Ok(())
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        registry.register(
            EventDefinition::new(EVT_CAMPAIGN_CREATED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<CampaignCreatePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_CAMPAIGN_ACTIVATED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<CampaignActivatePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_CAMPAIGN_THEME_SET, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<ThemePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_CAMPAIGN_COVER_SET, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<CoverPayload>()),
        )?;
        Ok(())
    }

    fn emittable_event_types(&self) -> Vec<String> {
        vec![
            EVT_CAMPAIGN_CREATED.to_string(),
            EVT_CAMPAIGN_ACTIVATED.to_string(),
            EVT_CAMPAIGN_THEME_SET.to_string(),
            EVT_CAMPAIGN_COVER_SET.to_string(),
        ]
    }

    fn decider_handled_commands(&self) -> Vec<String> {
        vec![
            CMD_CAMPAIGN_CREATE.to_string(),
            CMD_CAMPAIGN_ACTIVATE.to_string(),
            CMD_CAMPAIGN_SET_THEME.to_string(),
            CMD_CAMPAIGN_SET_COVER.to_string(),
        ]
    }

    fn fold_handled_types(&self) -> Vec<String> {
        self.emittable_event_types()
    }

    fn projection_handled_types(&self) -> Vec<String> {
        self.emittable_event_types()
    }

    fn decide(&self, state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
        match command.command_type.as_str() {
            CMD_CAMPAIGN_CREATE => decide_create(state, command, clock),
            CMD_CAMPAIGN_ACTIVATE => decide_activate(state, command, clock),
            CMD_CAMPAIGN_SET_THEME => decide_set_theme(state, command, clock),
            CMD_CAMPAIGN_SET_COVER => decide_set_cover(state, command, clock),
            other => Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("campaign domain does not handle {other}"),
            ),
        }
    }

    fn fold(&self, state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
        fold(state, event)
    }
}

// ============================================================================
// SECTION: Deciders
// ============================================================================

/// Returns the campaign's own entity addressing for an event.
fn campaign_entity(command: &Command) -> (EntityType, EntityId) {
    (EntityType::new(ENTITY_CAMPAIGN), EntityId::new(command.campaign_id.as_str()))
}

/// Decides `campaign.create`.
fn decide_create(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if state.campaign.created {
        return Decision::reject(
            codes::CAMPAIGN_ALREADY_CREATED,
            format!("campaign {} is already created", command.campaign_id),
        );
    }
    let payload: CampaignCreatePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Decision::reject(codes::CAMPAIGN_NAME_REQUIRED, "campaign name is required");
    }
    let normalized = CampaignCreatePayload {
        name,
        theme: payload.theme.trim().to_string(),
    };
    let encoded = match encode_payload(CMD_CAMPAIGN_CREATE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    let (entity_type, entity_id) = campaign_entity(command);
    Decision::accept(vec![
        Event::from_command(command, EVT_CAMPAIGN_CREATED, clock.now())
            .with_entity(entity_type, entity_id)
            .with_payload(encoded),
    ])
}

/// Decides `campaign.activate`.
fn decide_activate(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if !state.campaign.created {
        return Decision::reject(
            codes::CAMPAIGN_NOT_CREATED,
            format!("campaign {} has not been created", command.campaign_id),
        );
    }
    if state.campaign.status == CampaignStatus::Active {
        return Decision::reject(
            codes::CAMPAIGN_ALREADY_ACTIVE,
            format!("campaign {} is already active", command.campaign_id),
        );
    }
    let encoded = match encode_payload(CMD_CAMPAIGN_ACTIVATE, &CampaignActivatePayload {}) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    let (entity_type, entity_id) = campaign_entity(command);
    Decision::accept(vec![
        Event::from_command(command, EVT_CAMPAIGN_ACTIVATED, clock.now())
            .with_entity(entity_type, entity_id)
            .with_payload(encoded),
    ])
}

/// Decides `campaign.set_theme`.
fn decide_set_theme(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if !state.campaign.created {
        return Decision::reject(
            codes::CAMPAIGN_NOT_CREATED,
            format!("campaign {} has not been created", command.campaign_id),
        );
    }
    let payload: ThemePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let normalized = ThemePayload {
        theme: payload.theme.trim().to_string(),
    };
    let encoded = match encode_payload(CMD_CAMPAIGN_SET_THEME, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    let (entity_type, entity_id) = campaign_entity(command);
    Decision::accept(vec![
        Event::from_command(command, EVT_CAMPAIGN_THEME_SET, clock.now())
            .with_entity(entity_type, entity_id)
            .with_payload(encoded),
    ])
}

/// Decides `campaign.set_cover`.
fn decide_set_cover(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    if !state.campaign.created {
        return Decision::reject(
            codes::CAMPAIGN_NOT_CREATED,
            format!("campaign {} has not been created", command.campaign_id),
        );
    }
    let payload: CoverPayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let normalized = CoverPayload {
        cover_ref: payload.cover_ref.trim().to_string(),
    };
    let encoded = match encode_payload(CMD_CAMPAIGN_SET_COVER, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    let (entity_type, entity_id) = campaign_entity(command);
    Decision::accept(vec![
        Event::from_command(command, EVT_CAMPAIGN_COVER_SET, clock.now())
            .with_entity(entity_type, entity_id)
            .with_payload(encoded),
    ])
}

// ============================================================================
// SECTION: Folder
// ============================================================================

/// Folds campaign events into campaign metadata.
fn fold(mut state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
    match event.event_type.as_str() {
        EVT_CAMPAIGN_CREATED => {
            let payload: CampaignCreatePayload = decode_event_payload(event)?;
            state.campaign.created = true;
            state.campaign.name = payload.name;
            state.campaign.theme = payload.theme;
            state.campaign.status = CampaignStatus::Draft;
        }
        EVT_CAMPAIGN_ACTIVATED => {
            state.campaign.status = CampaignStatus::Active;
        }
        EVT_CAMPAIGN_THEME_SET => {
            let payload: ThemePayload = decode_event_payload(event)?;
            state.campaign.theme = payload.theme;
        }
        EVT_CAMPAIGN_COVER_SET => {
            let payload: CoverPayload = decode_event_payload(event)?;
            state.campaign.cover_ref = payload.cover_ref;
        }
        _ => {}
    }
    Ok(state)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
