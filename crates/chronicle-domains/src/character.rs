// crates/chronicle-domains/src/character.rs
// ============================================================================
// Module: Character Domain
// Description: Character creation, renaming, and retirement.
// Purpose: Decide and fold character commands and events.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The character domain owns the character map. Character mutation is the
//! command class adjudication gates pause: every command definition here is
//! session-scoped and blocked while a gate is open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chronicle_core::AggregateState;
use chronicle_core::CharacterId;
use chronicle_core::CharacterState;
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
use chronicle_core::GatePolicy;
use chronicle_core::Owner;
use chronicle_core::ParticipantId;
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

/// Command: create a character.
pub const CMD_CHARACTER_CREATE: &str = "character.create";
/// Command: rename a character.
pub const CMD_CHARACTER_RENAME: &str = "character.rename";
/// Command: retire a character.
pub const CMD_CHARACTER_RETIRE: &str = "character.retire";

/// Event: a character was created.
pub const EVT_CHARACTER_CREATED: &str = "character.created";
/// Event: a character was renamed.
pub const EVT_CHARACTER_RENAMED: &str = "character.renamed";
/// Event: a character was retired.
pub const EVT_CHARACTER_RETIRED: &str = "character.retired";

/// Entity type label for character-addressed events.
const ENTITY_CHARACTER: &str = "character";

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Payload for `character.create` and `character.created`.
///
/// # Invariants
/// - `character_id` and `name` are required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCreatePayload {
    /// Identifier of the new character.
    pub character_id: String,
    /// Display name.
    pub name: String,
    /// Owning participant, when the character is player-controlled.
    #[serde(default)]
    pub participant_id: String,
}

/// Payload for `character.rename` and `character.renamed`.
///
/// # Invariants
/// - `character_id` and `name` are required; the decider rejects empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRenamePayload {
    /// Identifier of the character.
    pub character_id: String,
    /// New display name.
    pub name: String,
}

/// Payload for `character.retire` and `character.retired`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRetirePayload {
    /// Identifier of the character.
    pub character_id: String,
}

// ============================================================================
// SECTION: Domain Package
// ============================================================================

/// Character domain package.
pub struct CharacterDomain;

impl DomainPackage for CharacterDomain {
    fn name(&self) -> &'static str {
        "character"
    }

    fn register_commands(&self, registry: &mut CommandRegistry) -> Result<(), RegistryError> {
        registry.register(
            CommandDefinition::new(CMD_CHARACTER_CREATE, Owner::Core)
                .with_validator(typed_validator::<CharacterCreatePayload>())
                .with_gate(GatePolicy::session_blocked()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_CHARACTER_RENAME, Owner::Core)
                .with_validator(typed_validator::<CharacterRenamePayload>())
                .with_gate(GatePolicy::session_blocked()),
        )?;
        registry.register(
            CommandDefinition::new(CMD_CHARACTER_RETIRE, Owner::Core)
                .with_validator(typed_validator::<CharacterRetirePayload>())
                .with_gate(GatePolicy::session_blocked()),
        )?;
        Ok(())
    }

    fn register_events(&self, registry: &mut EventRegistry) -> Result<(), RegistryError> {
        registry.register(
            EventDefinition::new(EVT_CHARACTER_CREATED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<CharacterCreatePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_CHARACTER_RENAMED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<CharacterRenamePayload>()),
        )?;
        registry.register(
            EventDefinition::new(EVT_CHARACTER_RETIRED, Owner::Core)
                .with_addressing(AddressingPolicy::EntityTypeAndId)
                .with_validator(typed_validator::<CharacterRetirePayload>()),
        )?;
        Ok(())
    }

    fn emittable_event_types(&self) -> Vec<String> {
        vec![
            EVT_CHARACTER_CREATED.to_string(),
            EVT_CHARACTER_RENAMED.to_string(),
            EVT_CHARACTER_RETIRED.to_string(),
        ]
    }

    fn decider_handled_commands(&self) -> Vec<String> {
        vec![
            CMD_CHARACTER_CREATE.to_string(),
            CMD_CHARACTER_RENAME.to_string(),
            CMD_CHARACTER_RETIRE.to_string(),
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
            CMD_CHARACTER_CREATE => decide_create(state, command, clock),
            CMD_CHARACTER_RENAME => decide_rename(state, command, clock),
            CMD_CHARACTER_RETIRE => decide_retire(state, command, clock),
            other => Decision::reject(
                codes::COMMAND_TYPE_UNSUPPORTED,
                format!("character domain does not handle {other}"),
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

/// Decides `character.create`.
fn decide_create(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: CharacterCreatePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let character_id = payload.character_id.trim().to_string();
    if character_id.is_empty() {
        return Decision::reject(codes::CHARACTER_ID_REQUIRED, "character id is required");
    }
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Decision::reject(codes::CHARACTER_NAME_REQUIRED, "character name is required");
    }
    if state.characters.contains_key(&CharacterId::new(character_id.as_str())) {
        return Decision::reject(
            codes::CHARACTER_ALREADY_EXISTS,
            format!("character {character_id} already exists"),
        );
    }
    let normalized = CharacterCreatePayload {
        character_id: character_id.clone(),
        name,
        participant_id: payload.participant_id.trim().to_string(),
    };
    let encoded = match encode_payload(CMD_CHARACTER_CREATE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_CHARACTER_CREATED, clock.now())
            .with_entity(EntityType::new(ENTITY_CHARACTER), EntityId::new(character_id))
            .with_payload(encoded),
    ])
}

/// Decides `character.rename`.
fn decide_rename(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: CharacterRenamePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let character_id = payload.character_id.trim().to_string();
    if character_id.is_empty() {
        return Decision::reject(codes::CHARACTER_ID_REQUIRED, "character id is required");
    }
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Decision::reject(codes::CHARACTER_NAME_REQUIRED, "character name is required");
    }
    match state.characters.get(&CharacterId::new(character_id.as_str())) {
        None => {
            return Decision::reject(
                codes::CHARACTER_NOT_FOUND,
                format!("character {character_id} does not exist"),
            );
        }
        Some(character) if character.retired => {
            return Decision::reject(
                codes::CHARACTER_ALREADY_RETIRED,
                format!("character {character_id} is retired"),
            );
        }
        Some(_) => {}
    }
    let normalized = CharacterRenamePayload {
        character_id: character_id.clone(),
        name,
    };
    let encoded = match encode_payload(CMD_CHARACTER_RENAME, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_CHARACTER_RENAMED, clock.now())
            .with_entity(EntityType::new(ENTITY_CHARACTER), EntityId::new(character_id))
            .with_payload(encoded),
    ])
}

/// Decides `character.retire`.
fn decide_retire(state: &AggregateState, command: &Command, clock: &dyn Clock) -> Decision {
    let payload: CharacterRetirePayload = match decode_command_payload(command) {
        Ok(payload) => payload,
        Err(decision) => return *decision,
    };
    let character_id = payload.character_id.trim().to_string();
    if character_id.is_empty() {
        return Decision::reject(codes::CHARACTER_ID_REQUIRED, "character id is required");
    }
    match state.characters.get(&CharacterId::new(character_id.as_str())) {
        None => {
            return Decision::reject(
                codes::CHARACTER_NOT_FOUND,
                format!("character {character_id} does not exist"),
            );
        }
        Some(character) if character.retired => {
            return Decision::reject(
                codes::CHARACTER_ALREADY_RETIRED,
                format!("character {character_id} is retired"),
            );
        }
        Some(_) => {}
    }
    let normalized = CharacterRetirePayload {
        character_id: character_id.clone(),
    };
    let encoded = match encode_payload(CMD_CHARACTER_RETIRE, &normalized) {
        Ok(encoded) => encoded,
        Err(decision) => return *decision,
    };
    Decision::accept(vec![
        Event::from_command(command, EVT_CHARACTER_RETIRED, clock.now())
            .with_entity(EntityType::new(ENTITY_CHARACTER), EntityId::new(character_id))
            .with_payload(encoded),
    ])
}

// ============================================================================
// SECTION: Folder
// ============================================================================

/// Folds character events into the character map.
fn fold(mut state: AggregateState, event: &Event) -> Result<AggregateState, FoldError> {
    match event.event_type.as_str() {
        EVT_CHARACTER_CREATED => {
            let payload: CharacterCreatePayload = decode_event_payload(event)?;
            let key = CharacterId::new(payload.character_id);
            state.characters.insert(key, CharacterState {
                name: payload.name,
                participant_id: if payload.participant_id.is_empty() {
                    None
                } else {
                    Some(ParticipantId::new(payload.participant_id))
                },
                retired: false,
            });
        }
        EVT_CHARACTER_RENAMED => {
            let payload: CharacterRenamePayload = decode_event_payload(event)?;
            let key = CharacterId::new(payload.character_id);
            let Some(character) = state.characters.get_mut(&key) else {
                return Err(FoldError::StateAssert {
                    message: format!("character {key} does not exist to rename"),
                });
            };
            character.name = payload.name;
        }
        EVT_CHARACTER_RETIRED => {
            let payload: CharacterRetirePayload = decode_event_payload(event)?;
            let key = CharacterId::new(payload.character_id);
            let Some(character) = state.characters.get_mut(&key) else {
                return Err(FoldError::StateAssert {
                    message: format!("character {key} does not exist to retire"),
                });
            };
            character.retired = true;
        }
        _ => {}
    }
    Ok(state)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
