// crates/chronicle-core/src/core/codes.rs
// ============================================================================
// Module: Chronicle Rejection Codes
// Description: Stable rejection code strings shared across transport and tests.
// Purpose: Centralize core-reserved codes so branching never matches on messages.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Rejection codes are stable uppercase snake-case strings. Machine handling
//! branches on codes; human-readable messages are not a contract. Domain
//! packages reuse these constants instead of re-declaring string literals.

// ============================================================================
// SECTION: Session Codes
// ============================================================================

/// A session-scoped command was refused because the session gate is open.
pub const SESSION_GATE_OPEN: &str = "SESSION_GATE_OPEN";
/// The session has already been started.
pub const SESSION_ALREADY_STARTED: &str = "SESSION_ALREADY_STARTED";
/// The session has not been started.
pub const SESSION_NOT_STARTED: &str = "SESSION_NOT_STARTED";
/// The payload session identifier is missing or empty.
pub const SESSION_ID_REQUIRED: &str = "SESSION_ID_REQUIRED";
/// The payload gate identifier is missing or empty.
pub const SESSION_GATE_ID_REQUIRED: &str = "SESSION_GATE_ID_REQUIRED";
/// The payload gate type is missing or empty.
pub const SESSION_GATE_TYPE_REQUIRED: &str = "SESSION_GATE_TYPE_REQUIRED";
/// A gate is already open for the session.
pub const SESSION_GATE_ALREADY_OPEN: &str = "SESSION_GATE_ALREADY_OPEN";
/// No gate is open for the session.
pub const SESSION_GATE_NOT_OPEN: &str = "SESSION_GATE_NOT_OPEN";
/// The payload spotlight type is missing or empty.
pub const SESSION_SPOTLIGHT_TYPE_REQUIRED: &str = "SESSION_SPOTLIGHT_TYPE_REQUIRED";
/// The payload note text is missing or empty.
pub const SESSION_NOTE_REQUIRED: &str = "SESSION_NOTE_REQUIRED";

// ============================================================================
// SECTION: Campaign Codes
// ============================================================================

/// The payload campaign name is missing or empty.
pub const CAMPAIGN_NAME_REQUIRED: &str = "CAMPAIGN_NAME_REQUIRED";
/// The campaign has already been created.
pub const CAMPAIGN_ALREADY_CREATED: &str = "CAMPAIGN_ALREADY_CREATED";
/// The campaign has not been created.
pub const CAMPAIGN_NOT_CREATED: &str = "CAMPAIGN_NOT_CREATED";
/// The campaign is already active.
pub const CAMPAIGN_ALREADY_ACTIVE: &str = "CAMPAIGN_ALREADY_ACTIVE";

// ============================================================================
// SECTION: Participant Codes
// ============================================================================

/// The payload participant identifier is missing or empty.
pub const PARTICIPANT_ID_REQUIRED: &str = "PARTICIPANT_ID_REQUIRED";
/// The participant has already joined the campaign.
pub const PARTICIPANT_ALREADY_JOINED: &str = "PARTICIPANT_ALREADY_JOINED";
/// The participant has not joined the campaign.
pub const PARTICIPANT_NOT_JOINED: &str = "PARTICIPANT_NOT_JOINED";
/// The payload participant role is missing or empty.
pub const PARTICIPANT_ROLE_REQUIRED: &str = "PARTICIPANT_ROLE_REQUIRED";

// ============================================================================
// SECTION: Character Codes
// ============================================================================

/// The payload character identifier is missing or empty.
pub const CHARACTER_ID_REQUIRED: &str = "CHARACTER_ID_REQUIRED";
/// The payload character name is missing or empty.
pub const CHARACTER_NAME_REQUIRED: &str = "CHARACTER_NAME_REQUIRED";
/// A character with the payload identifier already exists.
pub const CHARACTER_ALREADY_EXISTS: &str = "CHARACTER_ALREADY_EXISTS";
/// No character with the payload identifier exists.
pub const CHARACTER_NOT_FOUND: &str = "CHARACTER_NOT_FOUND";
/// The character has already been retired.
pub const CHARACTER_ALREADY_RETIRED: &str = "CHARACTER_ALREADY_RETIRED";

// ============================================================================
// SECTION: Invite Codes
// ============================================================================

/// The payload invite identifier is missing or empty.
pub const INVITE_ID_REQUIRED: &str = "INVITE_ID_REQUIRED";
/// An invite with the payload identifier already exists.
pub const INVITE_ALREADY_EXISTS: &str = "INVITE_ALREADY_EXISTS";
/// No invite with the payload identifier exists.
pub const INVITE_NOT_FOUND: &str = "INVITE_NOT_FOUND";
/// The invite is not in the pending state.
pub const INVITE_NOT_PENDING: &str = "INVITE_NOT_PENDING";

// ============================================================================
// SECTION: Action Codes
// ============================================================================

/// The payload request identifier is missing or empty.
pub const REQUEST_ID_REQUIRED: &str = "REQUEST_ID_REQUIRED";
/// The payload roll sequence is missing or zero.
pub const ROLL_SEQ_REQUIRED: &str = "ROLL_SEQ_REQUIRED";
/// The roll sequence has already been applied.
pub const OUTCOME_ALREADY_APPLIED: &str = "OUTCOME_ALREADY_APPLIED";
/// An outcome effect carried system ownership metadata.
pub const OUTCOME_EFFECT_SYSTEM_OWNED_FORBIDDEN: &str = "OUTCOME_EFFECT_SYSTEM_OWNED_FORBIDDEN";
/// An outcome effect type is outside the allow-listed set.
pub const OUTCOME_EFFECT_TYPE_FORBIDDEN: &str = "OUTCOME_EFFECT_TYPE_FORBIDDEN";

// ============================================================================
// SECTION: Pipeline Codes
// ============================================================================

/// The command type is not handled by any decider.
pub const COMMAND_TYPE_UNSUPPORTED: &str = "COMMAND_TYPE_UNSUPPORTED";
/// A decider produced neither events nor rejections.
pub const COMMAND_MUST_MUTATE: &str = "COMMAND_MUST_MUTATE";
/// The payload failed to decode into its typed form.
pub const PAYLOAD_DECODE_FAILED: &str = "PAYLOAD_DECODE_FAILED";
/// The payload failed to encode into canonical form.
pub const PAYLOAD_ENCODE_FAILED: &str = "PAYLOAD_ENCODE_FAILED";
/// A state invariant assertion failed during fold.
pub const STATE_ASSERT_FAILED: &str = "STATE_ASSERT_FAILED";
