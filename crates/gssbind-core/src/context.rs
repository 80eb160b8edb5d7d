//! One negotiation round at a time, for either side of the handshake.
//!
//! The engine never loops: each call consumes the peer's latest token and
//! reports whether another round is needed. Moving the context through
//! the engine by value keeps it owned by exactly one caller; a round that
//! fails drops it, which deletes the mechanism context.

use std::{fmt::Debug, path::Path};

use crate::{
    flags::FlagSet,
    mech::Mechanism,
    name::{NameType, PrincipalName},
    status::{Status, GSS_S_FAILURE},
    token::{encode_output, InputToken},
    translate::MechanismError,
    Error,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Acceptor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// The peer still owes a token.
    Partial,
    Established,
}

pub struct SecurityContext<M: Mechanism> {
    handle: M::Context,
    role: Role,
    state: ContextState,
    flags: FlagSet,
}
impl<M: Mechanism> SecurityContext<M> {
    fn new(handle: M::Context, role: Role, continue_needed: bool, flags: FlagSet) -> Self {
        let state = if continue_needed {
            ContextState::Partial
        } else {
            ContextState::Established
        };
        Self {
            handle,
            role,
            state,
            flags,
        }
    }
    pub fn role(&self) -> Role {
        self.role
    }
    pub fn state(&self) -> ContextState {
        self.state
    }
    pub fn is_established(&self) -> bool {
        self.state == ContextState::Established
    }
    /// Flags granted by the most recent round.
    pub fn flags(&self) -> FlagSet {
        self.flags
    }
    pub(crate) fn handle_mut(&mut self) -> &mut M::Context {
        &mut self.handle
    }
    /// Whether another `role` round may be run on this context.
    pub fn ensure_steppable(&self, role: Role) -> Result<(), Error> {
        if self.role != role {
            return Err(Error::WrongRole { expected: role });
        }
        if self.is_established() {
            return Err(Error::ContextEstablished);
        }
        Ok(())
    }
    fn into_partial_handle(self, role: Role) -> Result<M::Context, Error> {
        self.ensure_steppable(role)?;
        Ok(self.handle)
    }
}
impl<M: Mechanism> Debug for SecurityContext<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityContext")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

pub struct InitStep<M: Mechanism> {
    pub continue_needed: bool,
    pub context: Option<SecurityContext<M>>,
    pub token: Option<Vec<u8>>,
    pub flags: FlagSet,
}

pub struct AcceptStep<M: Mechanism> {
    pub continue_needed: bool,
    pub context: Option<SecurityContext<M>>,
    /// The initiator's name; only guaranteed once the context is established.
    pub source_name: Option<PrincipalName<M>>,
    pub token: Option<Vec<u8>>,
    pub flags: FlagSet,
    pub time_rec: u32,
}

impl<M: Mechanism> Debug for InitStep<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitStep")
            .field("continue_needed", &self.continue_needed)
            .field("context", &self.context)
            .field("token", &self.token.as_ref().map(Vec::len))
            .field("flags", &self.flags)
            .finish()
    }
}
impl<M: Mechanism> Debug for AcceptStep<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptStep")
            .field("continue_needed", &self.continue_needed)
            .field("context", &self.context)
            .field("source_name", &self.source_name)
            .field("token", &self.token.as_ref().map(Vec::len))
            .field("flags", &self.flags)
            .field("time_rec", &self.time_rec)
            .finish()
    }
}

pub fn initiate<M: Mechanism>(
    mech: &M,
    target: &PrincipalName<M>,
    flags: FlagSet,
    context: Option<SecurityContext<M>>,
    time_req: u32,
    input: &InputToken,
) -> Result<InitStep<M>, Error> {
    let mut handle = context.map(|c| c.into_partial_handle(Role::Initiator)).transpose()?;
    let first_round = handle.is_none();
    let out = mech
        .init_sec_context(&mut handle, target.handle(), flags, time_req, input)
        .map_err(|status| MechanismError::decode(mech, status))?;
    let continue_needed = out.status.continue_needed();
    tracing::debug!(
        first_round,
        continue_needed,
        requested = ?flags,
        granted = ?out.flags,
        time_req,
        time_rec = out.time_rec,
        "initiator round"
    );
    tracing::trace!(input = input.len(), output = out.token.as_ref().len(), "initiator token sizes");
    Ok(InitStep {
        continue_needed,
        context: handle.map(|h| SecurityContext::new(h, Role::Initiator, continue_needed, out.flags)),
        token: encode_output(out.token.as_ref()),
        flags: out.flags,
    })
}

pub fn accept<M: Mechanism>(
    mech: &M,
    input: &InputToken,
    context: Option<SecurityContext<M>>,
) -> Result<AcceptStep<M>, Error> {
    let mut handle = context.map(|c| c.into_partial_handle(Role::Acceptor)).transpose()?;
    let out = mech
        .accept_sec_context(&mut handle, input)
        .map_err(|status| MechanismError::decode(mech, status))?;
    let continue_needed = out.status.continue_needed();
    if !continue_needed && out.source_name.is_none() {
        tracing::warn!("acceptor completed without naming the initiator");
        return Err(MechanismError::decode(mech, Status::new(GSS_S_FAILURE, 0)).into());
    }
    tracing::debug!(
        continue_needed,
        named = out.source_name.is_some(),
        granted = ?out.flags,
        time_rec = out.time_rec,
        "acceptor round"
    );
    tracing::trace!(input = input.len(), output = out.token.as_ref().len(), "acceptor token sizes");
    Ok(AcceptStep {
        continue_needed,
        context: handle.map(|h| SecurityContext::new(h, Role::Acceptor, continue_needed, out.flags)),
        source_name: out.source_name.map(|n| PrincipalName::from_handle(n, NameType::UserName)),
        token: encode_output(out.token.as_ref()),
        flags: out.flags,
        time_rec: out.time_rec,
    })
}

/// Installs the keytab used for every later acceptor round.
pub fn register_acceptor_identity<M: Mechanism>(mech: &M, path: &Path) -> Result<(), Error> {
    mech.register_acceptor_identity(path).map_err(|status| {
        tracing::warn!(path = %path.display(), %status, "failed to register acceptor identity");
        Error::CredentialLoad {
            path: path.to_owned(),
            status,
        }
    })?;
    tracing::info!(path = %path.display(), "registered acceptor identity");
    Ok(())
}
