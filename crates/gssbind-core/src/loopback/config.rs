//! TOML files read by the loopback mechanism.
//!
//! The realm file plays the KDC: it knows the long-term key of every
//! service an initiator may ask for. A keytab holds only the keys of the
//! services this process accepts for.
//!
//! ```toml
//! realm = "EXAMPLE.COM"
//! client = "alice@EXAMPLE.COM"
//!
//! [[principal]]
//! name = "HTTP/www.example.com@EXAMPLE.COM"
//! key = "<64 hex digits>"
//! ok_as_delegate = false
//! max_life = 36000
//! ```

use std::{
    fmt::{Debug, Formatter},
    path::Path,
};

use serde::Deserialize;

pub const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse { path: display, source })
}

/// A 256-bit long-term key, written as hex.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Key(pub(crate) [u8; KEY_LEN]);
impl TryFrom<String> for Key {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(value.trim()).map_err(|e| format!("key is not hex: {e}"))?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("key must be {KEY_LEN} bytes, got {}", b.len()))?;
        Ok(Self(key))
    }
}
impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Key(..)")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RealmConfig {
    /// Appended to names that carry no realm of their own.
    pub realm: Option<String>,
    /// The principal initiator rounds authenticate as.
    pub client: Option<String>,
    #[serde(default, rename = "principal")]
    pub principals: Vec<PrincipalEntry>,
}
impl RealmConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_toml(path)
    }
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
    pub fn find(&self, principal: &str) -> Option<&PrincipalEntry> {
        self.principals.iter().find(|p| p.name == principal)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalEntry {
    pub name: String,
    pub key: Key,
    #[serde(default)]
    pub ok_as_delegate: bool,
    /// Longest ticket lifetime in seconds.
    #[serde(default = "default_max_life")]
    pub max_life: u32,
}

fn default_max_life() -> u32 {
    10 * 60 * 60
}

#[derive(Debug, Default, Deserialize)]
pub struct Keytab {
    #[serde(default, rename = "entry")]
    pub entries: Vec<KeytabEntry>,
}
impl Keytab {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_toml(path)
    }
    pub fn find(&self, principal: &str) -> Option<&Key> {
        self.entries.iter().find(|e| e.principal == principal).map(|e| &e.key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeytabEntry {
    pub principal: String,
    pub key: Key,
}
