//! Byte layouts of the loopback tokens. All integers are big-endian.
//!
//! ```text
//! AP-REQ  0x0100 | service len: u16 | service | sealed ticket
//! ticket  flags: u32 | nonce: u64 | start: u64 | lifetime: u32 | session key: [u8; 32] | client len: u16 | client
//! AP-REP  0x0200 | sealed(nonce: u64)
//! WRAP    0x0504 | token flags: u8 | seq: u64 | sealed payload, or payload || HMAC
//! ```
//!
//! Everything before the sealed part is authenticated as associated data.

use bytes::{Buf, BufMut, BytesMut};

use super::crypto::{Keys, MAC_LEN};

pub(super) const TOK_AP_REQ: u16 = 0x0100;
pub(super) const TOK_AP_REP: u16 = 0x0200;
pub(super) const TOK_WRAP: u16 = 0x0504;

pub(super) const WRAP_SENT_BY_ACCEPTOR: u8 = 0x01;
pub(super) const WRAP_SEALED: u8 = 0x02;

/// The token does not have the layout its id promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Malformed;

fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], Malformed> {
    if buf.len() < len {
        return Err(Malformed);
    }
    let (head, rest) = buf.split_at(len);
    *buf = rest;
    Ok(head)
}

fn take_string(buf: &mut &[u8]) -> Result<String, Malformed> {
    let len = buf.try_get_u16().map_err(|_| Malformed)?;
    let bytes = take(buf, len.into())?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Malformed)
}

/// Fails rather than truncate a name that does not fit its length prefix.
fn put_string(out: &mut BytesMut, s: &str) -> Result<(), Malformed> {
    let len = u16::try_from(s.len()).map_err(|_| Malformed)?;
    out.put_u16(len);
    out.put_slice(s.as_bytes());
    Ok(())
}

pub(super) fn token_id(token: &[u8]) -> Option<u16> {
    let mut buf = token;
    buf.try_get_u16().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Ticket {
    pub flags: u32,
    pub nonce: u64,
    pub start: u64,
    pub lifetime: u32,
    pub session_key: [u8; 32],
    pub client: String,
}
impl Ticket {
    fn encode(&self) -> Result<BytesMut, Malformed> {
        let mut out = BytesMut::with_capacity(58 + self.client.len());
        out.put_u32(self.flags);
        out.put_u64(self.nonce);
        out.put_u64(self.start);
        out.put_u32(self.lifetime);
        out.put_slice(&self.session_key);
        put_string(&mut out, &self.client)?;
        Ok(out)
    }
    fn decode(mut buf: &[u8]) -> Result<Self, Malformed> {
        let flags = buf.try_get_u32().map_err(|_| Malformed)?;
        let nonce = buf.try_get_u64().map_err(|_| Malformed)?;
        let start = buf.try_get_u64().map_err(|_| Malformed)?;
        let lifetime = buf.try_get_u32().map_err(|_| Malformed)?;
        let session_key = take(&mut buf, 32)?.try_into().map_err(|_| Malformed)?;
        let client = take_string(&mut buf)?;
        if buf.has_remaining() {
            return Err(Malformed);
        }
        Ok(Self {
            flags,
            nonce,
            start,
            lifetime,
            session_key,
            client,
        })
    }
    pub fn expires_at(&self) -> u64 {
        self.start.saturating_add(self.lifetime.into())
    }
}

/// An AP-REQ as received: the service it names and its still-sealed ticket.
pub(super) struct ApReq<'a> {
    header: &'a [u8],
    pub service: String,
    sealed: &'a [u8],
}
impl<'a> ApReq<'a> {
    pub fn encode(service: &str, ticket: &Ticket, service_keys: &Keys) -> Result<Vec<u8>, Malformed> {
        let mut out = BytesMut::new();
        out.put_u16(TOK_AP_REQ);
        put_string(&mut out, service)?;
        let sealed = service_keys.seal(&out, &ticket.encode()?);
        out.put_slice(&sealed);
        Ok(out.to_vec())
    }
    pub fn parse(token: &'a [u8]) -> Result<Self, Malformed> {
        let mut buf = token;
        if buf.try_get_u16().map_err(|_| Malformed)? != TOK_AP_REQ {
            return Err(Malformed);
        }
        let service = take_string(&mut buf)?;
        let header = &token[..token.len() - buf.len()];
        Ok(Self {
            header,
            service,
            sealed: buf,
        })
    }
    pub fn header(&self) -> &'a [u8] {
        self.header
    }
    pub fn sealed(&self) -> &'a [u8] {
        self.sealed
    }
    pub fn ticket(plain: &[u8]) -> Result<Ticket, Malformed> {
        Ticket::decode(plain)
    }
}

pub(super) fn encode_ap_rep(nonce: u64, keys: &Keys) -> Vec<u8> {
    let header = TOK_AP_REP.to_be_bytes();
    let mut out = header.to_vec();
    out.extend_from_slice(&keys.seal(&header, &nonce.to_be_bytes()));
    out
}

/// Splits an AP-REP into its header and sealed body.
pub(super) fn parse_ap_rep(token: &[u8]) -> Result<(&[u8], &[u8]), Malformed> {
    if token_id(token) != Some(TOK_AP_REP) {
        return Err(Malformed);
    }
    Ok(token.split_at(2))
}

pub(super) fn decode_nonce(plain: &[u8]) -> Result<u64, Malformed> {
    let bytes: [u8; 8] = plain.try_into().map_err(|_| Malformed)?;
    Ok(u64::from_be_bytes(bytes))
}

pub(super) struct WrapToken<'a> {
    header: &'a [u8],
    pub token_flags: u8,
    pub seq: u64,
    body: &'a [u8],
}
impl<'a> WrapToken<'a> {
    pub fn encode(token_flags: u8, seq: u64, keys: &Keys, message: &[u8]) -> Vec<u8> {
        let mut out = BytesMut::with_capacity(11 + message.len() + MAC_LEN + 32);
        out.put_u16(TOK_WRAP);
        out.put_u8(token_flags);
        out.put_u64(seq);
        if token_flags & WRAP_SEALED != 0 {
            let sealed = keys.seal(&out, message);
            out.put_slice(&sealed);
        } else {
            let tag = keys.mac(&[&out, message]);
            out.put_slice(message);
            out.put_slice(&tag);
        }
        out.to_vec()
    }
    pub fn parse(token: &'a [u8]) -> Result<Self, Malformed> {
        let mut buf = token;
        if buf.try_get_u16().map_err(|_| Malformed)? != TOK_WRAP {
            return Err(Malformed);
        }
        let token_flags = buf.try_get_u8().map_err(|_| Malformed)?;
        if token_flags & !(WRAP_SENT_BY_ACCEPTOR | WRAP_SEALED) != 0 {
            return Err(Malformed);
        }
        let seq = buf.try_get_u64().map_err(|_| Malformed)?;
        let header = &token[..token.len() - buf.len()];
        Ok(Self {
            header,
            token_flags,
            seq,
            body: buf,
        })
    }
    pub fn sealed(&self) -> bool {
        self.token_flags & WRAP_SEALED != 0
    }
    pub fn sent_by_acceptor(&self) -> bool {
        self.token_flags & WRAP_SENT_BY_ACCEPTOR != 0
    }
    pub fn header(&self) -> &'a [u8] {
        self.header
    }
    pub fn body(&self) -> &'a [u8] {
        self.body
    }
    /// For integrity-only tokens: the payload and its trailing MAC.
    pub fn split_mac(&self) -> Result<(&'a [u8], &'a [u8]), Malformed> {
        if self.body.len() < MAC_LEN {
            return Err(Malformed);
        }
        Ok(self.body.split_at(self.body.len() - MAC_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::crypto::TICKET_LABEL;

    fn ticket() -> Ticket {
        Ticket {
            flags: 0x32,
            nonce: 7,
            start: 1_700_000_000,
            lifetime: 600,
            session_key: [9; 32],
            client: "alice@EXAMPLE.COM".into(),
        }
    }

    #[test]
    fn ap_req_layout() {
        let keys = Keys::derive(&[1; 32], TICKET_LABEL);
        let token = ApReq::encode("HTTP/www@EXAMPLE.COM", &ticket(), &keys).unwrap();
        assert_eq!(token_id(&token), Some(TOK_AP_REQ));
        let req = ApReq::parse(&token).unwrap();
        assert_eq!(req.service, "HTTP/www@EXAMPLE.COM");
        assert_eq!(req.header().len(), 2 + 2 + req.service.len());
        let plain = keys.open(req.header(), req.sealed()).unwrap();
        assert_eq!(ApReq::ticket(&plain).unwrap(), ticket());
        assert_eq!(ticket().expires_at(), 1_700_000_600);
    }

    #[test]
    fn truncated_headers() {
        assert!(ApReq::parse(&[0x01]).is_err());
        assert!(ApReq::parse(&[0x01, 0x00, 0x00, 0x09, b'a']).is_err());
        assert!(ApReq::parse(&[0x02, 0x00]).is_err());
        assert!(WrapToken::parse(&[0x05, 0x04, 0x00, 1, 2]).is_err());
        assert!(WrapToken::parse(&[0x05, 0x04, 0x80, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(parse_ap_rep(&[0x01, 0x00, 0xff]).is_err());
    }

    #[test]
    fn integrity_only_wrap_keeps_payload_visible() {
        let keys = Keys::derive(&[1; 32], TICKET_LABEL);
        let token = WrapToken::encode(WRAP_SENT_BY_ACCEPTOR, 3, &keys, b"visible");
        let wrap = WrapToken::parse(&token).unwrap();
        assert!(wrap.sent_by_acceptor());
        assert!(!wrap.sealed());
        assert_eq!(wrap.seq, 3);
        let (payload, tag) = wrap.split_mac().unwrap();
        assert_eq!(payload, b"visible");
        assert_eq!(tag, keys.mac(&[wrap.header(), payload]));
    }

    #[test]
    fn oversized_names_are_not_truncated() {
        let keys = Keys::derive(&[1; 32], TICKET_LABEL);
        let service = format!("HTTP/{}@EXAMPLE.COM", "a".repeat(usize::from(u16::MAX)));
        assert_eq!(ApReq::encode(&service, &ticket(), &keys).err(), Some(Malformed));
        let long_client = Ticket {
            client: "b".repeat(usize::from(u16::MAX) + 1),
            ..ticket()
        };
        assert_eq!(ApReq::encode("HTTP/www@EXAMPLE.COM", &long_client, &keys).err(), Some(Malformed));
    }
}
