//! The scripting-host side of gssbind.
//!
//! [`Module`] is the function table the host binds at load time. Values
//! cross the boundary as [`Value`]s; failures come back as [`Signal`]s,
//! with mechanism failures signalled as `gss-error` carrying the decoded
//! major and minor status messages.

mod error;
mod functions;
mod handle;
pub mod logging;
mod module;
mod value;

pub use error::{Error, Signal};
pub use handle::ContextHandle;
pub use module::{Function, Module, Subr, FEATURE};
pub use value::Value;
