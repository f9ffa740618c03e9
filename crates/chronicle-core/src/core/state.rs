// crates/chronicle-core/src/core/state.rs
// ============================================================================
// Module: Chronicle Aggregate State
// Description: Replay target for a campaign's event stream.
// Purpose: Hold the in-memory reconstruction of campaign, session, and entity state.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! Aggregate state is a value tree: campaign metadata, session sub-state,
//! maps of participants, characters, and invites keyed by stable identifier
//! strings, an action sub-state tracking applied outcomes, and opaque
//! per-system slots. Cross-entity references are identifiers, never in-memory
//! pointers, so `Clone` is a deep copy and replay is fully deterministic.
//! Folds mutate by copy-and-replace; callers must not retain state across
//! commands without refreshing via replay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CampaignId;
use crate::core::identifiers::CharacterId;
use crate::core::identifiers::GateId;
use crate::core::identifiers::InviteId;
use crate::core::identifiers::ParticipantId;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::SystemKey;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Campaign Metadata
// ============================================================================

/// Campaign lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Campaign exists but has not been activated.
    #[default]
    Draft,
    /// Campaign is live.
    Active,
    /// Campaign concluded normally.
    Completed,
    /// Campaign was shelved.
    Archived,
}

/// Campaign-level metadata folded from campaign events.
///
/// # Invariants
/// - `created` is set by `campaign.created` and never unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignMeta {
    /// True once the campaign has been created.
    pub created: bool,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Narrative theme label.
    pub theme: String,
    /// Cover image reference.
    pub cover_ref: String,
}

// ============================================================================
// SECTION: Session State
// ============================================================================

/// Session sub-state folded from session events.
///
/// # Invariants
/// - `gate_open` and `gate_id` change together: both set on open, both
///   cleared on close.
/// - `started` and `ended` are monotone within a session's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// True once a session has started.
    pub started: bool,
    /// True once the session has ended.
    pub ended: bool,
    /// Identifier of the current session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Display name of the current session.
    pub name: String,
    /// True while a gate pauses session-scoped commands.
    pub gate_open: bool,
    /// Identifier of the open gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_id: Option<GateId>,
    /// Gate type label of the open gate.
    pub gate_type: String,
    /// Spotlight type label, e.g. `character`.
    pub spotlight_type: String,
    /// Character holding the spotlight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotlight_character_id: Option<CharacterId>,
}

// ============================================================================
// SECTION: Participant State
// ============================================================================

/// Per-participant state folded from participant events.
///
/// # Invariants
/// - Present in the aggregate map only after `participant.joined`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    /// Display name.
    pub name: String,
    /// Seat role label, e.g. `player` or `gm`.
    pub role: String,
    /// True after the participant left the campaign.
    pub left: bool,
    /// Timestamp of the join event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<Timestamp>,
}

// ============================================================================
// SECTION: Character State
// ============================================================================

/// Per-character state folded from character events.
///
/// # Invariants
/// - Present in the aggregate map only after `character.created`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Display name.
    pub name: String,
    /// Owning participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<ParticipantId>,
    /// True after the character was retired.
    pub retired: bool,
}

// ============================================================================
// SECTION: Invite State
// ============================================================================

/// Invite lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    /// Invite issued, not yet answered.
    #[default]
    Pending,
    /// Invite accepted by the recipient.
    Accepted,
    /// Invite revoked by the issuer.
    Revoked,
}

/// Per-invite state folded from invite events.
///
/// # Invariants
/// - Present in the aggregate map only after `invite.created`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InviteState {
    /// Invited recipient reference (opaque to the core).
    pub recipient: String,
    /// Lifecycle status.
    pub status: InviteStatus,
}

// ============================================================================
// SECTION: Action State
// ============================================================================

/// Action sub-state folded from action events.
///
/// # Invariants
/// - `applied_outcomes` only grows; a roll sequence is recorded at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    /// Roll sequences whose outcomes have been applied.
    pub applied_outcomes: BTreeSet<u64>,
}

// ============================================================================
// SECTION: Aggregate State
// ============================================================================

/// In-memory reconstruction of a campaign from its event log.
///
/// # Invariants
/// - A value tree: `Clone` deep-copies every map and slot.
/// - Insertion order of the maps is irrelevant; keys are stable identifiers.
/// - System slots hold opaque JSON owned by their module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateState {
    /// Campaign the state was replayed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    /// Campaign metadata.
    pub campaign: CampaignMeta,
    /// Session sub-state.
    pub session: SessionState,
    /// Participant states keyed by participant identifier.
    pub participants: BTreeMap<ParticipantId, ParticipantState>,
    /// Character states keyed by character identifier.
    pub characters: BTreeMap<CharacterId, CharacterState>,
    /// Invite states keyed by invite identifier.
    pub invites: BTreeMap<InviteId, InviteState>,
    /// Action sub-state.
    pub actions: ActionState,
    /// Opaque per-system slots keyed by system id and version.
    pub systems: BTreeMap<SystemKey, Value>,
}

impl AggregateState {
    /// Creates an empty aggregate for a campaign.
    #[must_use]
    pub fn for_campaign(campaign_id: CampaignId) -> Self {
        Self {
            campaign_id: Some(campaign_id),
            ..Self::default()
        }
    }
}

// ============================================================================
// SECTION: Checkpoints and Snapshots
// ============================================================================

/// Per-campaign cursor marking the last applied sequence.
///
/// # Invariants
/// - `last_seq` never decreases for a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Campaign the checkpoint belongs to.
    pub campaign_id: CampaignId,
    /// Last event sequence applied to state.
    pub last_seq: u64,
    /// Time the checkpoint was written.
    pub updated_at: Timestamp,
}

/// Cached aggregate state plus the sequence it reflects.
///
/// # Invariants
/// - `state` is a deep copy isolated from caller mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Cached aggregate state.
    pub state: AggregateState,
    /// Last event sequence folded into `state`.
    pub last_seq: u64,
}
