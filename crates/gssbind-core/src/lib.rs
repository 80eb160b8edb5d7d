pub mod context;
mod error;
pub mod flags;
#[cfg(unix)]
pub mod krb5;
#[cfg(any(test, feature = "loopback"))]
pub mod loopback;
pub mod mech;
pub mod name;
pub mod protect;
pub mod status;
pub mod token;
pub mod translate;

pub use context::{accept, initiate, register_acceptor_identity, AcceptStep, ContextState, InitStep, Role, SecurityContext};
pub use error::Error;
pub use flags::{Flag, FlagSet};
pub use mech::Mechanism;
pub use name::{NameType, PrincipalName};
pub use protect::{protect, unprotect, Unprotected, Wrapped};
pub use status::Status;
pub use token::InputToken;
pub use translate::MechanismError;

/// The address-space-wide default mechanism.
#[cfg(unix)]
pub type DefaultMechanism = krb5::Krb5;
