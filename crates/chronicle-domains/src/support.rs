// crates/chronicle-domains/src/support.rs
// ============================================================================
// Module: Domain Decider Support
// Description: Shared payload decode and encode helpers for domain packages.
// Purpose: Keep decode failures on the rejection path and fold failures typed.
// Dependencies: chronicle-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Deciders surface payload problems as decision rejections with stable
//! codes, never as errors; folders surface them as typed [`FoldError`]
//! values. These helpers keep that split in one place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chronicle_core::Command;
use chronicle_core::Decision;
use chronicle_core::Event;
use chronicle_core::FoldError;
use chronicle_core::codes;
use serde::Serialize;
use serde::de::DeserializeOwned;

// ============================================================================
// SECTION: Decider Helpers
// ============================================================================

/// Decodes a command payload into its typed form.
///
/// # Errors
///
/// Returns a rejecting [`Decision`] with code `PAYLOAD_DECODE_FAILED` when
/// the payload does not parse.
pub(crate) fn decode_command_payload<T: DeserializeOwned>(
    command: &Command,
) -> Result<T, Box<Decision>> {
    serde_json::from_str(&command.payload).map_err(|err| {
        Box::new(Decision::reject(
            codes::PAYLOAD_DECODE_FAILED,
            format!("payload for {} failed to decode: {err}", command.command_type),
        ))
    })
}

/// Encodes a typed payload into JSON text for an emitted event.
///
/// # Errors
///
/// Returns a rejecting [`Decision`] with code `PAYLOAD_ENCODE_FAILED` when
/// encoding fails.
pub(crate) fn encode_payload<T: Serialize>(
    command_type: &str,
    payload: &T,
) -> Result<String, Box<Decision>> {
    serde_json::to_string(payload).map_err(|err| {
        Box::new(Decision::reject(
            codes::PAYLOAD_ENCODE_FAILED,
            format!("payload for {command_type} failed to encode: {err}"),
        ))
    })
}

// ============================================================================
// SECTION: Folder Helpers
// ============================================================================

/// Decodes an event payload into its typed form for folding.
///
/// # Errors
///
/// Returns [`FoldError::Decode`] when the payload does not parse.
pub(crate) fn decode_event_payload<T: DeserializeOwned>(event: &Event) -> Result<T, FoldError> {
    serde_json::from_str(&event.payload).map_err(|err| FoldError::Decode {
        event_type: event.event_type.clone(),
        message: err.to_string(),
    })
}
