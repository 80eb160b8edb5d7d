//! GSS-API status words as laid out in RFC 2744, section 3.9.1.
//!
//! A major status packs three fields: the calling error in the top byte,
//! the routine error in the next byte and sixteen supplementary info bits
//! at the bottom. Minor statuses are opaque to everything but the
//! mechanism that produced them.

use std::fmt::{Debug, Display, Formatter};

pub const CALLING_ERROR_OFFSET: u32 = 24;
pub const ROUTINE_ERROR_OFFSET: u32 = 16;
pub const SUPPLEMENTARY_OFFSET: u32 = 0;
pub const CALLING_ERROR_MASK: u32 = 0o377;
pub const ROUTINE_ERROR_MASK: u32 = 0o377;
pub const SUPPLEMENTARY_MASK: u32 = 0o177777;

pub const GSS_S_COMPLETE: u32 = 0;

pub const GSS_S_CALL_INACCESSIBLE_READ: u32 = 1 << CALLING_ERROR_OFFSET;
pub const GSS_S_CALL_INACCESSIBLE_WRITE: u32 = 2 << CALLING_ERROR_OFFSET;
pub const GSS_S_CALL_BAD_STRUCTURE: u32 = 3 << CALLING_ERROR_OFFSET;

pub const GSS_S_BAD_MECH: u32 = 1 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_BAD_NAME: u32 = 2 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_BAD_NAMETYPE: u32 = 3 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_BAD_BINDINGS: u32 = 4 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_BAD_STATUS: u32 = 5 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_BAD_SIG: u32 = 6 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_BAD_MIC: u32 = GSS_S_BAD_SIG;
pub const GSS_S_NO_CRED: u32 = 7 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_NO_CONTEXT: u32 = 8 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_DEFECTIVE_TOKEN: u32 = 9 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_DEFECTIVE_CREDENTIAL: u32 = 10 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_CREDENTIALS_EXPIRED: u32 = 11 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_CONTEXT_EXPIRED: u32 = 12 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_FAILURE: u32 = 13 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_BAD_QOP: u32 = 14 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_UNAUTHORIZED: u32 = 15 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_UNAVAILABLE: u32 = 16 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_DUPLICATE_ELEMENT: u32 = 17 << ROUTINE_ERROR_OFFSET;
pub const GSS_S_NAME_NOT_MN: u32 = 18 << ROUTINE_ERROR_OFFSET;

pub const GSS_S_CONTINUE_NEEDED: u32 = 1 << SUPPLEMENTARY_OFFSET;
pub const GSS_S_DUPLICATE_TOKEN: u32 = 1 << (SUPPLEMENTARY_OFFSET + 1);
pub const GSS_S_OLD_TOKEN: u32 = 1 << (SUPPLEMENTARY_OFFSET + 2);
pub const GSS_S_UNSEQ_TOKEN: u32 = 1 << (SUPPLEMENTARY_OFFSET + 3);
pub const GSS_S_GAP_TOKEN: u32 = 1 << (SUPPLEMENTARY_OFFSET + 4);

/// Same test as the `GSS_ERROR` macro: any calling or routine error bit.
pub const fn is_error(code: u32) -> bool {
    code & ((CALLING_ERROR_MASK << CALLING_ERROR_OFFSET) | (ROUTINE_ERROR_MASK << ROUTINE_ERROR_OFFSET)) != 0
}

pub const fn calling_error(major: u32) -> u32 {
    (major >> CALLING_ERROR_OFFSET) & CALLING_ERROR_MASK
}

pub const fn routine_error(major: u32) -> u32 {
    (major >> ROUTINE_ERROR_OFFSET) & ROUTINE_ERROR_MASK
}

pub const fn supplementary_info(major: u32) -> u32 {
    (major >> SUPPLEMENTARY_OFFSET) & SUPPLEMENTARY_MASK
}

/// Which code space a status value belongs to, as passed to `gss_display_status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Gss,
    Mech,
}

/// A (major, minor) pair as returned by every GSS-API call.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    pub major: u32,
    pub minor: u32,
}
impl Status {
    pub const COMPLETE: Status = Status { major: GSS_S_COMPLETE, minor: 0 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
    pub const fn is_error(&self) -> bool {
        is_error(self.major)
    }
    pub const fn continue_needed(&self) -> bool {
        !self.is_error() && self.major & GSS_S_CONTINUE_NEEDED != 0
    }
    /// Supplementary bits other than `CONTINUE_NEEDED`.
    pub const fn token_info(&self) -> u32 {
        supplementary_info(self.major) & !GSS_S_CONTINUE_NEEDED
    }
    pub const fn routine_error(&self) -> u32 {
        routine_error(self.major)
    }
}
impl Debug for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Status {{ major: {:#010x}, minor: {:#010x} }}", self.major, self.minor)
    }
}
impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "major {:#010x}, minor {:#010x}", self.major, self.minor)
    }
}
