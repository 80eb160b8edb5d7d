//! Conversions between caller-side token values and mechanism buffers.
//!
//! An absent token and a zero-length token both reach the mechanism as a
//! valid empty buffer. In the other direction an empty mechanism buffer is
//! reported as absent, so callers only ever see non-empty tokens.

use std::ops::Deref;

/// A token handed to the mechanism for the duration of a single call.
///
/// Owned by the call; dropped on every exit path once the mechanism returns.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InputToken(Vec<u8>);
impl InputToken {
    pub fn absent() -> Self {
        Self(Vec::new())
    }
    pub fn decode<I: IntoIterator<Item = u8>>(token: Option<I>) -> Self {
        token.map_or_else(Self::absent, |bytes| Self(bytes.into_iter().collect()))
    }
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}
impl Deref for InputToken {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}
impl From<Vec<u8>> for InputToken {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}
impl From<&[u8]> for InputToken {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}
impl std::fmt::Debug for InputToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InputToken({} bytes)", self.0.len())
    }
}

/// Copies a mechanism-produced buffer out, surfacing zero length as `None`.
pub fn encode_output(buffer: &[u8]) -> Option<Vec<u8>> {
    (!buffer.is_empty()).then(|| buffer.to_vec())
}
