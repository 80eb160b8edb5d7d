use std::path::PathBuf;

use crate::{context::Role, status::Status, translate::MechanismError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("illegal name type `{0}`")]
    InvalidNameType(String),
    #[error("gss error: {0}")]
    Mechanism(#[from] MechanismError),
    #[error("error loading acceptor identity from {}: {status}", path.display())]
    CredentialLoad { path: PathBuf, status: Status },
    #[error("security context is already established")]
    ContextEstablished,
    #[error("security context does not belong to the {expected:?} side")]
    WrongRole { expected: Role },
}
impl Error {
    /// The decoded mechanism failure, if this is one.
    pub fn mechanism(&self) -> Option<&MechanismError> {
        match self {
            Self::Mechanism(err) => Some(err),
            _ => None,
        }
    }
}
