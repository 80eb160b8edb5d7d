//! `gss_display_status` for the loopback mechanism.

use super::minor;
use crate::status::{
    calling_error, routine_error, supplementary_info, Status, StatusKind, GSS_S_BAD_STATUS, GSS_S_COMPLETE,
};

const CALLING_ERRORS: [&str; 3] = [
    "A required input parameter could not be read",
    "A required output parameter could not be written",
    "A parameter was malformed",
];

const ROUTINE_ERRORS: [&str; 18] = [
    "An unsupported mechanism was requested",
    "An invalid name was supplied",
    "A supplied name was of an unsupported type",
    "Incorrect channel bindings were supplied",
    "An invalid status code was supplied",
    "A token had an invalid signature",
    "No credentials were supplied, or the credentials were unavailable or inaccessible",
    "No context has been established",
    "Invalid token was supplied",
    "Invalid credential was supplied",
    "The referenced credential has expired",
    "The referenced context has expired",
    "Unspecified GSS failure.  Minor code may provide more information",
    "The quality-of-protection requested could not be provided",
    "The operation is forbidden by local security policy",
    "The operation or option is not available or unsupported",
    "The requested credential element already exists",
    "The provided name was not mechanism specific (MN)",
];

const SUPPLEMENTARY: [&str; 5] = [
    "The routine must be called again to complete its function",
    "The token was a duplicate of an earlier token",
    "The token's validity period has expired",
    "A later token has already been processed",
    "An expected per-message token was not received",
];

fn bad_status() -> Status {
    Status::new(GSS_S_BAD_STATUS, 0)
}

fn major_fragments(code: u32) -> Result<Vec<&'static str>, Status> {
    if code == GSS_S_COMPLETE {
        return Ok(vec!["The routine completed successfully"]);
    }
    let mut fragments = Vec::new();
    if let Some(index) = calling_error(code).checked_sub(1) {
        fragments.push(*CALLING_ERRORS.get(index as usize).ok_or_else(bad_status)?);
    }
    if let Some(index) = routine_error(code).checked_sub(1) {
        fragments.push(*ROUTINE_ERRORS.get(index as usize).ok_or_else(bad_status)?);
    }
    let info = supplementary_info(code);
    fragments.extend(
        SUPPLEMENTARY
            .iter()
            .enumerate()
            .filter(|(bit, _)| info & (1 << bit) != 0)
            .map(|(_, text)| *text),
    );
    Ok(fragments)
}

/// One round of the cursor protocol: the cursor is the index of the next
/// fragment, and returns to zero with the last one.
pub(super) fn display_status(code: u32, kind: StatusKind, cursor: &mut u32) -> Result<Vec<u8>, Status> {
    let fragment = match kind {
        StatusKind::Gss => {
            let fragments = major_fragments(code)?;
            let index = *cursor as usize;
            let fragment = *fragments.get(index).ok_or_else(bad_status)?;
            *cursor = if index + 1 < fragments.len() { *cursor + 1 } else { 0 };
            fragment.to_owned()
        }
        StatusKind::Mech => {
            *cursor = 0;
            match minor::message(code) {
                Some(text) => text.to_owned(),
                None => format!("Unknown loopback error code {code:#010x}"),
            }
        }
    };
    Ok(fragment.into_bytes())
}
