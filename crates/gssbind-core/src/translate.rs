use std::fmt::{Display, Formatter};

use crate::{
    mech::Mechanism,
    status::{self, Status, StatusKind},
};

/// The fragments `gss_display_status` produces for one status value.
///
/// Each call to `next` is one round of the cursor protocol; iteration ends
/// once the mechanism resets the cursor to zero. A mechanism that cannot
/// describe its own status is considered corrupt and the process aborts.
pub struct StatusMessages<'m, M: Mechanism + ?Sized> {
    mech: &'m M,
    code: u32,
    kind: StatusKind,
    cursor: u32,
    done: bool,
}
impl<'m, M: Mechanism + ?Sized> StatusMessages<'m, M> {
    pub fn new(mech: &'m M, code: u32, kind: StatusKind) -> Self {
        Self {
            mech,
            code,
            kind,
            cursor: 0,
            done: false,
        }
    }
}
impl<M: Mechanism + ?Sized> Iterator for StatusMessages<'_, M> {
    type Item = String;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let buffer = match self.mech.display_status(self.code, self.kind, &mut self.cursor) {
            Ok(buffer) => buffer,
            Err(status) => fatal(format_args!(
                "gss_display_status failed for {:?} code {:#010x}: {status}",
                self.kind, self.code
            )),
        };
        self.done = self.cursor == 0;
        Some(String::from_utf8_lossy(buffer.as_ref()).into_owned())
    }
}

/// An error major status with both code spaces decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MechanismError {
    pub status: Status,
    pub major_messages: Vec<String>,
    /// Empty when the minor status is not itself an error.
    pub minor_messages: Vec<String>,
}
impl MechanismError {
    pub fn decode<M: Mechanism + ?Sized>(mech: &M, status: Status) -> Self {
        let major_messages = StatusMessages::new(mech, status.major, StatusKind::Gss).collect();
        let minor_messages = if status::is_error(status.minor) {
            StatusMessages::new(mech, status.minor, StatusKind::Mech).collect()
        } else {
            Vec::new()
        };
        tracing::debug!(%status, "decoded mechanism error");
        Self {
            status,
            major_messages,
            minor_messages,
        }
    }
    /// `Ok` for any non-error major, otherwise the decoded error.
    pub fn check<M: Mechanism + ?Sized>(mech: &M, status: Status) -> Result<Status, Self> {
        if status.is_error() {
            Err(Self::decode(mech, status))
        } else {
            Ok(status)
        }
    }
}
impl std::error::Error for MechanismError {}
impl Display for MechanismError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.major_messages.join("; "))?;
        if !self.minor_messages.is_empty() {
            write!(f, " ({})", self.minor_messages.join("; "))?;
        }
        Ok(())
    }
}

/// Mechanism invariant violated: log and abort, never unwind into the host.
pub(crate) fn fatal(message: std::fmt::Arguments<'_>) -> ! {
    tracing::error!("{message}");
    eprintln!("gssbind: {message}");
    std::process::abort()
}
