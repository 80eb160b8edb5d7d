use std::{fmt::Debug, str::FromStr};

use crate::{mech::Mechanism, translate::MechanismError, Error};

/// The name-type OIDs a caller can import under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NameType {
    /// `GSS_C_NT_USER_NAME`
    UserName,
    /// `GSS_C_NT_MACHINE_UID_NAME`, the native bytes of a uid
    MachineUidName,
    /// `GSS_C_NT_STRING_UID_NAME`, a uid in decimal
    StringUidName,
    /// `GSS_C_NT_HOSTBASED_SERVICE`, `service@host`
    HostbasedService,
}
impl NameType {
    pub const ALL: [NameType; 4] = [
        NameType::UserName,
        NameType::MachineUidName,
        NameType::StringUidName,
        NameType::HostbasedService,
    ];
    pub const fn symbol(self) -> &'static str {
        match self {
            NameType::UserName => "user-name",
            NameType::MachineUidName => "machine-uid-name",
            NameType::StringUidName => "string-uid-name",
            NameType::HostbasedService => "hostbased-service",
        }
    }
}
impl FromStr for NameType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.symbol() == s)
            .ok_or_else(|| Error::InvalidNameType(s.to_owned()))
    }
}

/// A mechanism name together with the type it was imported as.
///
/// Sole owner of the mechanism handle; dropping it releases the name.
pub struct PrincipalName<M: Mechanism> {
    handle: M::Name,
    name_type: NameType,
}
impl<M: Mechanism> PrincipalName<M> {
    pub fn import(mech: &M, text: &str, name_type: NameType) -> Result<Self, Error> {
        let handle = mech
            .import_name(text.as_bytes(), name_type)
            .map_err(|status| MechanismError::decode(mech, status))?;
        tracing::debug!(name = text, name_type = name_type.symbol(), "imported name");
        Ok(Self { handle, name_type })
    }
    pub(crate) fn from_handle(handle: M::Name, name_type: NameType) -> Self {
        Self { handle, name_type }
    }
    pub fn name_type(&self) -> NameType {
        self.name_type
    }
    pub fn handle(&self) -> &M::Name {
        &self.handle
    }
    pub fn display(&self, mech: &M) -> Result<String, Error> {
        let buffer = mech
            .display_name(&self.handle)
            .map_err(|status| MechanismError::decode(mech, status))?;
        Ok(String::from_utf8_lossy(buffer.as_ref()).into_owned())
    }
}
impl<M: Mechanism> Debug for PrincipalName<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalName").field("name_type", &self.name_type).finish_non_exhaustive()
    }
}
