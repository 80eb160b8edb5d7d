//! Minor status codes of the loopback mechanism.
//!
//! The base puts a nonzero value in both the calling and routine fields so
//! every code counts as an error when tested with the major-status mask.

pub const BASE: u32 = 0x4C42_0000;

pub const MALFORMED_TOKEN: u32 = BASE + 1;
pub const BAD_INTEGRITY: u32 = BASE + 2;
pub const NO_ACCEPTOR_KEYTAB: u32 = BASE + 3;
pub const KEY_NOT_FOUND: u32 = BASE + 4;
pub const PRINCIPAL_UNKNOWN: u32 = BASE + 5;
pub const NO_CLIENT_PRINCIPAL: u32 = BASE + 6;
pub const MUTUAL_FAILED: u32 = BASE + 7;
pub const TICKET_EXPIRED: u32 = BASE + 8;
pub const KEYTAB_UNREADABLE: u32 = BASE + 9;
pub const BAD_NAME: u32 = BASE + 10;
pub const REFLECTED: u32 = BASE + 11;
pub const INVALID_STATE: u32 = BASE + 12;

const TABLE: [(u32, &str); 12] = [
    (MALFORMED_TOKEN, "Loopback token is malformed"),
    (BAD_INTEGRITY, "Loopback token failed its integrity check"),
    (NO_ACCEPTOR_KEYTAB, "No acceptor keytab has been registered"),
    (KEY_NOT_FOUND, "No key for the requested service in the acceptor keytab"),
    (PRINCIPAL_UNKNOWN, "Server not found in loopback realm database"),
    (NO_CLIENT_PRINCIPAL, "No client principal configured in loopback realm database"),
    (MUTUAL_FAILED, "Mutual authentication reply did not match the request"),
    (TICKET_EXPIRED, "Ticket expired"),
    (KEYTAB_UNREADABLE, "Keytab file could not be read or parsed"),
    (BAD_NAME, "Malformed principal name"),
    (REFLECTED, "Token was sent by this side of the context"),
    (INVALID_STATE, "Context is not in a state that accepts this token"),
];

pub fn message(code: u32) -> Option<&'static str> {
    TABLE.iter().find(|(c, _)| *c == code).map(|(_, m)| *m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::is_error;

    #[test]
    fn every_code_is_an_error_with_a_message() {
        for (code, _) in TABLE {
            assert!(is_error(code), "{code:#x}");
            assert!(message(code).is_some());
        }
        assert_eq!(message(BASE), None);
    }
}
