//! The seam between the negotiation engine and a GSS-API mechanism.
//!
//! Every method maps onto one GSS-API call. A method returns `Err` exactly
//! when the call's major status is an error (`GSS_ERROR`); successful calls
//! still hand back their status so continuation and supplementary bits
//! survive. Handles are owned values whose `Drop` performs the matching
//! release call.

use std::path::Path;

use crate::{
    flags::FlagSet,
    name::NameType,
    status::{Status, StatusKind},
};

pub trait Mechanism {
    /// An internal name. Dropping it releases the mechanism resource.
    type Name: 'static;
    /// A security context. Dropping it deletes the context.
    type Context: 'static;
    /// A mechanism-allocated output buffer, released on drop.
    type Buffer: AsRef<[u8]>;

    fn import_name(&self, text: &[u8], name_type: NameType) -> Result<Self::Name, Status>;
    fn display_name(&self, name: &Self::Name) -> Result<Self::Buffer, Status>;

    /// One initiator round. `context` is `None` on the first call; the
    /// mechanism fills it in when it creates a context.
    fn init_sec_context(
        &self,
        context: &mut Option<Self::Context>,
        target: &Self::Name,
        flags: FlagSet,
        time_req: u32,
        input: &[u8],
    ) -> Result<InitOutput<Self::Buffer>, Status>;

    /// One acceptor round using the default acceptor credential.
    fn accept_sec_context(
        &self,
        context: &mut Option<Self::Context>,
        input: &[u8],
    ) -> Result<AcceptOutput<Self::Name, Self::Buffer>, Status>;

    fn wrap(
        &self,
        context: &mut Self::Context,
        conf_req: bool,
        message: &[u8],
    ) -> Result<Protected<Self::Buffer>, Status>;
    fn unwrap(&self, context: &mut Self::Context, message: &[u8]) -> Result<Protected<Self::Buffer>, Status>;

    /// One step of the `gss_display_status` protocol. `cursor` starts at zero
    /// and is zero again after the last fragment.
    fn display_status(&self, code: u32, kind: StatusKind, cursor: &mut u32) -> Result<Self::Buffer, Status>;

    /// Sets the process-wide keytab used by the default acceptor credential.
    fn register_acceptor_identity(&self, path: &Path) -> Result<(), Status>;
}

pub struct InitOutput<B> {
    pub status: Status,
    pub token: B,
    pub flags: FlagSet,
    pub time_rec: u32,
}

pub struct AcceptOutput<N, B> {
    pub status: Status,
    /// Mechanisms may leave this unset until the final round.
    pub source_name: Option<N>,
    pub token: B,
    pub flags: FlagSet,
    pub time_rec: u32,
}

/// Output of wrap or unwrap; `conf_state` reports whether the payload was sealed.
pub struct Protected<B> {
    pub status: Status,
    pub buffer: B,
    pub conf_state: bool,
}
