//! An in-process, Kerberos-shaped mechanism for exercising the engine
//! without a KDC. Only built for tests or with the `loopback` feature.
//!
//! The realm database stands in for the KDC: an initiator looks up the
//! target's long-term key there and seals a ticket for it directly. The
//! acceptor opens tickets with the keys from its registered keytab. Two
//! instances sharing a realm file and keytab can authenticate to each
//! other without any network service.

use std::{
    cell::RefCell,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    context::Role,
    flags::{Flag, FlagSet},
    mech::{AcceptOutput, InitOutput, Mechanism, Protected},
    name::NameType,
    status::{
        Status, StatusKind, GSS_S_BAD_NAME, GSS_S_BAD_SIG, GSS_S_COMPLETE, GSS_S_CONTINUE_NEEDED,
        GSS_S_CREDENTIALS_EXPIRED, GSS_S_DEFECTIVE_TOKEN, GSS_S_FAILURE, GSS_S_NO_CONTEXT, GSS_S_NO_CRED,
    },
};

mod config;
mod crypto;
mod display;
pub mod minor;
mod sequence;
mod wire;

pub use config::{ConfigError, Key, Keytab, KeytabEntry, PrincipalEntry, RealmConfig};
use crypto::{CryptoError, Keys, ACCEPTOR_LABEL, AP_REP_LABEL, INITIATOR_LABEL, TICKET_LABEL};
use sequence::SequenceWindow;
use wire::{ApReq, Ticket, WrapToken, WRAP_SEALED, WRAP_SENT_BY_ACCEPTOR};

/// Flags a ticket can carry. Delegation is further limited per target.
const GRANTABLE: [Flag; 6] = [
    Flag::Deleg,
    Flag::Mutual,
    Flag::Replay,
    Flag::Sequence,
    Flag::Conf,
    Flag::Integ,
];

fn fail(major: u32, minor: u32) -> Status {
    Status::new(major, minor)
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn remaining(expires_at: u64) -> u32 {
    u32::try_from(expires_at.saturating_sub(now())).unwrap_or(u32::MAX)
}

#[derive(Debug, Default)]
pub struct Loopback {
    realm: RealmConfig,
    acceptor_keytab: RefCell<Option<Keytab>>,
}

impl Loopback {
    pub fn with_realm(realm: RealmConfig) -> Self {
        Self {
            realm,
            acceptor_keytab: RefCell::new(None),
        }
    }
    pub fn from_realm_file(path: &Path) -> Result<Self, ConfigError> {
        let realm = RealmConfig::load(path)?;
        tracing::debug!(path = %path.display(), principals = realm.principals.len(), "loaded loopback realm");
        Ok(Self::with_realm(realm))
    }
    pub fn realm(&self) -> &RealmConfig {
        &self.realm
    }

    fn qualify(&self, name: String) -> String {
        match &self.realm.realm {
            Some(realm) => format!("{name}@{realm}"),
            None => name,
        }
    }

    fn parse_name(&self, text: &[u8], name_type: NameType) -> Option<LoopbackName> {
        let name = match name_type {
            NameType::MachineUidName => {
                let uid = u32::from_ne_bytes(text.try_into().ok()?);
                LoopbackName {
                    display: uid.to_string(),
                    principal: self.qualify(uid.to_string()),
                }
            }
            NameType::StringUidName => {
                let text = std::str::from_utf8(text).ok()?;
                let uid: u32 = text.parse().ok()?;
                LoopbackName {
                    display: text.to_owned(),
                    principal: self.qualify(uid.to_string()),
                }
            }
            NameType::UserName => {
                let text = std::str::from_utf8(text).ok()?;
                if text.is_empty() || text.starts_with('@') {
                    return None;
                }
                let principal = if text.contains('@') {
                    text.to_owned()
                } else {
                    self.qualify(text.to_owned())
                };
                LoopbackName {
                    display: text.to_owned(),
                    principal,
                }
            }
            NameType::HostbasedService => {
                let text = std::str::from_utf8(text).ok()?;
                let (service, host) = text.split_once('@').unwrap_or((text, "localhost"));
                if service.is_empty() || host.is_empty() || host.contains('@') {
                    return None;
                }
                LoopbackName {
                    display: text.to_owned(),
                    principal: self.qualify(format!("{service}/{host}")),
                }
            }
        };
        Some(name)
    }

    fn first_round(
        &self,
        target: &LoopbackName,
        flags: FlagSet,
        time_req: u32,
    ) -> Result<(LoopbackContext, Vec<u8>, u32), Status> {
        let client = self
            .realm
            .client
            .as_deref()
            .ok_or(fail(GSS_S_NO_CRED, minor::NO_CLIENT_PRINCIPAL))?;
        let service = self
            .realm
            .find(&target.principal)
            .ok_or(fail(GSS_S_FAILURE, minor::PRINCIPAL_UNKNOWN))?;

        let mut granted = flags.intersection(GRANTABLE.into_iter().collect());
        if !service.ok_as_delegate {
            granted = granted.without(Flag::Deleg);
        }
        let lifetime = match time_req {
            0 => service.max_life,
            t => t.min(service.max_life),
        };
        let ticket = Ticket {
            flags: granted.bits(),
            nonce: crypto::random_u64(),
            start: now(),
            lifetime,
            session_key: crypto::random_key(),
            client: client.to_owned(),
        };
        let token = ApReq::encode(&target.principal, &ticket, &Keys::derive(&service.key.0, TICKET_LABEL))
            .map_err(|_| fail(GSS_S_BAD_NAME, minor::BAD_NAME))?;
        tracing::trace!(service = %target.principal, client, lifetime, "issued loopback ticket");
        let context = LoopbackContext::new(Role::Initiator, &ticket, !granted.contains(Flag::Mutual));
        Ok((context, token, lifetime))
    }

    fn complete_mutual(&self, context: &mut LoopbackContext, input: &[u8]) -> Result<(), Status> {
        let (header, sealed) = wire::parse_ap_rep(input).map_err(|_| fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN))?;
        let plain = Keys::derive(&context.session_key, AP_REP_LABEL)
            .open(header, sealed)
            .map_err(|e| match e {
                CryptoError::BadMac => fail(GSS_S_BAD_SIG, minor::MUTUAL_FAILED),
                _ => fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN),
            })?;
        let nonce = wire::decode_nonce(&plain).map_err(|_| fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN))?;
        if nonce != context.nonce {
            return Err(fail(GSS_S_DEFECTIVE_TOKEN, minor::MUTUAL_FAILED));
        }
        context.establish();
        Ok(())
    }

    fn open_ticket(&self, input: &[u8]) -> Result<Ticket, Status> {
        let keytab = self.acceptor_keytab.borrow();
        let keytab = keytab.as_ref().ok_or(fail(GSS_S_NO_CRED, minor::NO_ACCEPTOR_KEYTAB))?;
        let req = ApReq::parse(input).map_err(|_| fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN))?;
        let key = keytab
            .find(&req.service)
            .ok_or(fail(GSS_S_FAILURE, minor::KEY_NOT_FOUND))?;
        let plain = Keys::derive(&key.0, TICKET_LABEL)
            .open(req.header(), req.sealed())
            .map_err(|e| match e {
                CryptoError::BadMac => fail(GSS_S_BAD_SIG, minor::BAD_INTEGRITY),
                _ => fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN),
            })?;
        let ticket = ApReq::ticket(&plain).map_err(|_| fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN))?;
        if ticket.expires_at() <= now() {
            return Err(fail(GSS_S_CREDENTIALS_EXPIRED, minor::TICKET_EXPIRED));
        }
        tracing::trace!(service = %req.service, client = %ticket.client, "opened loopback ticket");
        Ok(ticket)
    }
}

/// An imported name: the text as given and the principal it resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopbackName {
    display: String,
    principal: String,
}
impl LoopbackName {
    pub fn principal(&self) -> &str {
        &self.principal
    }
}

pub struct LoopbackContext {
    role: Role,
    established: bool,
    flags: FlagSet,
    nonce: u64,
    session_key: [u8; 32],
    expires_at: u64,
    send: Keys,
    recv: Keys,
    send_seq: u64,
    window: SequenceWindow,
}
impl LoopbackContext {
    fn new(role: Role, ticket: &Ticket, established: bool) -> Self {
        let (send, recv) = match role {
            Role::Initiator => (INITIATOR_LABEL, ACCEPTOR_LABEL),
            Role::Acceptor => (ACCEPTOR_LABEL, INITIATOR_LABEL),
        };
        let flags = FlagSet::from_bits(ticket.flags);
        let mut context = Self {
            role,
            established: false,
            flags,
            nonce: ticket.nonce,
            session_key: ticket.session_key,
            expires_at: ticket.expires_at(),
            send: Keys::derive(&ticket.session_key, send),
            recv: Keys::derive(&ticket.session_key, recv),
            send_seq: 0,
            window: SequenceWindow::new(flags.contains(Flag::Replay), flags.contains(Flag::Sequence)),
        };
        if established {
            context.establish();
        }
        context
    }
    fn establish(&mut self) {
        self.established = true;
        self.flags = self.flags.with(Flag::ProtReady).with(Flag::Trans);
    }
    fn require_established(&self) -> Result<(), Status> {
        if self.established {
            Ok(())
        } else {
            Err(fail(GSS_S_NO_CONTEXT, minor::INVALID_STATE))
        }
    }
}

impl Mechanism for Loopback {
    type Name = LoopbackName;
    type Context = LoopbackContext;
    type Buffer = Vec<u8>;

    fn import_name(&self, text: &[u8], name_type: NameType) -> Result<Self::Name, Status> {
        self.parse_name(text, name_type).ok_or(fail(GSS_S_BAD_NAME, minor::BAD_NAME))
    }

    fn display_name(&self, name: &Self::Name) -> Result<Self::Buffer, Status> {
        Ok(name.display.clone().into_bytes())
    }

    fn init_sec_context(
        &self,
        context: &mut Option<Self::Context>,
        target: &Self::Name,
        flags: FlagSet,
        time_req: u32,
        input: &[u8],
    ) -> Result<InitOutput<Self::Buffer>, Status> {
        let Some(ctx) = context.as_mut() else {
            let (ctx, token, lifetime) = self.first_round(target, flags, time_req)?;
            let major = if ctx.established {
                GSS_S_COMPLETE
            } else {
                GSS_S_CONTINUE_NEEDED
            };
            let flags = ctx.flags;
            *context = Some(ctx);
            return Ok(InitOutput {
                status: Status::new(major, 0),
                token,
                flags,
                time_rec: lifetime,
            });
        };
        if ctx.established || ctx.role != Role::Initiator {
            return Err(fail(GSS_S_FAILURE, minor::INVALID_STATE));
        }
        self.complete_mutual(ctx, input)?;
        Ok(InitOutput {
            status: Status::COMPLETE,
            token: Vec::new(),
            flags: ctx.flags,
            time_rec: remaining(ctx.expires_at),
        })
    }

    fn accept_sec_context(
        &self,
        context: &mut Option<Self::Context>,
        input: &[u8],
    ) -> Result<AcceptOutput<Self::Name, Self::Buffer>, Status> {
        if context.is_some() {
            // Acceptor contexts complete in their first round.
            return Err(fail(GSS_S_FAILURE, minor::INVALID_STATE));
        }
        let ticket = self.open_ticket(input)?;
        let ctx = LoopbackContext::new(Role::Acceptor, &ticket, true);
        let token = if ctx.flags.contains(Flag::Mutual) {
            wire::encode_ap_rep(ticket.nonce, &Keys::derive(&ticket.session_key, AP_REP_LABEL))
        } else {
            Vec::new()
        };
        let out = AcceptOutput {
            status: Status::COMPLETE,
            source_name: Some(LoopbackName {
                display: ticket.client.clone(),
                principal: ticket.client,
            }),
            token,
            flags: ctx.flags,
            time_rec: remaining(ctx.expires_at),
        };
        *context = Some(ctx);
        Ok(out)
    }

    fn wrap(&self, context: &mut Self::Context, conf_req: bool, message: &[u8]) -> Result<Protected<Self::Buffer>, Status> {
        context.require_established()?;
        let conf = conf_req && context.flags.contains(Flag::Conf);
        let mut token_flags = 0;
        if context.role == Role::Acceptor {
            token_flags |= WRAP_SENT_BY_ACCEPTOR;
        }
        if conf {
            token_flags |= WRAP_SEALED;
        }
        let seq = context.send_seq;
        context.send_seq += 1;
        Ok(Protected {
            status: Status::COMPLETE,
            buffer: WrapToken::encode(token_flags, seq, &context.send, message),
            conf_state: conf,
        })
    }

    fn unwrap(&self, context: &mut Self::Context, message: &[u8]) -> Result<Protected<Self::Buffer>, Status> {
        context.require_established()?;
        let token = WrapToken::parse(message).map_err(|_| fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN))?;
        if token.sent_by_acceptor() == (context.role == Role::Acceptor) {
            return Err(fail(GSS_S_BAD_SIG, minor::REFLECTED));
        }
        let payload = if token.sealed() {
            context.recv.open(token.header(), token.body()).map_err(|e| match e {
                CryptoError::BadMac => fail(GSS_S_BAD_SIG, minor::BAD_INTEGRITY),
                _ => fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN),
            })?
        } else {
            let (payload, tag) = token
                .split_mac()
                .map_err(|_| fail(GSS_S_DEFECTIVE_TOKEN, minor::MALFORMED_TOKEN))?;
            context
                .recv
                .verify(&[token.header(), payload], tag)
                .map_err(|_| fail(GSS_S_BAD_SIG, minor::BAD_INTEGRITY))?;
            payload.to_vec()
        };
        let supplementary = context.window.check(token.seq);
        Ok(Protected {
            status: Status::new(supplementary, 0),
            buffer: payload,
            conf_state: token.sealed(),
        })
    }

    fn display_status(&self, code: u32, kind: StatusKind, cursor: &mut u32) -> Result<Self::Buffer, Status> {
        display::display_status(code, kind, cursor)
    }

    fn register_acceptor_identity(&self, path: &Path) -> Result<(), Status> {
        let keytab = Keytab::load(path).map_err(|e| {
            tracing::debug!(error = %e, "loopback keytab rejected");
            fail(GSS_S_FAILURE, minor::KEYTAB_UNREADABLE)
        })?;
        *self.acceptor_keytab.borrow_mut() = Some(keytab);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::Loopback;
    use crate::mech::Mechanism;

    /// Hostbased name of a service that may not receive delegated credentials.
    pub const SERVICE: &str = "HTTP@www.example.com";
    pub const SERVICE_PRINCIPAL: &str = "HTTP/www.example.com@EXAMPLE.COM";
    /// Hostbased name of an ok-as-delegate service.
    pub const DELEGATE_SERVICE: &str = "host@db.example.com";
    pub const CLIENT: &str = "alice@EXAMPLE.COM";

    const HTTP_KEY: &str = "1111111111111111111111111111111111111111111111111111111111111111";
    const HOST_KEY: &str = "2222222222222222222222222222222222222222222222222222222222222222";

    /// A realm file, with the matching keytab written next to it as `keytab.toml`.
    pub fn realm_file() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let realm = dir.path().join("realm.toml");
        std::fs::write(
            &realm,
            format!(
                r#"realm = "EXAMPLE.COM"
client = "{CLIENT}"

[[principal]]
name = "{SERVICE_PRINCIPAL}"
key = "{HTTP_KEY}"

[[principal]]
name = "host/db.example.com@EXAMPLE.COM"
key = "{HOST_KEY}"
ok_as_delegate = true
max_life = 600
"#
            ),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("keytab.toml"),
            format!(
                r#"[[entry]]
principal = "{SERVICE_PRINCIPAL}"
key = "{HTTP_KEY}"

[[entry]]
principal = "host/db.example.com@EXAMPLE.COM"
key = "{HOST_KEY}"
"#
            ),
        )
        .unwrap();
        (dir, realm)
    }

    /// A mechanism that can play both sides of a handshake.
    pub fn mechanism() -> (TempDir, Loopback) {
        let (dir, realm) = realm_file();
        let mech = Loopback::from_realm_file(&realm).unwrap();
        mech.register_acceptor_identity(&dir.path().join("keytab.toml")).unwrap();
        (dir, mech)
    }
}
