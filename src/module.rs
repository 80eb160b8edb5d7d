#[cfg(unix)]
use gssbind_core::DefaultMechanism;
use gssbind_core::Mechanism;

use crate::{functions, logging, Error, Signal, Value};

/// The feature the module provides once loaded.
pub const FEATURE: &str = "gssbind";

pub type Subr<M> = fn(&M, &[Value]) -> Result<Value, Error>;

/// A function exported to the host.
pub struct Function<M> {
    pub name: &'static str,
    pub arity: usize,
    pub doc: &'static str,
    subr: Subr<M>,
}

/// The function table bound to one mechanism.
pub struct Module<M: Mechanism + 'static> {
    mech: M,
    functions: Vec<Function<M>>,
}

#[cfg(unix)]
impl Module<DefaultMechanism> {
    /// Module initialization with the system mechanism.
    pub fn load() -> Self {
        logging::init();
        Self::new(DefaultMechanism::default())
    }
}

impl<M: Mechanism + 'static> Module<M> {
    pub fn new(mech: M) -> Self {
        let functions = vec![
            Function {
                name: "gss--internal-import-name",
                arity: 2,
                doc: "Import NAME as a GSS-API name of TYPE.\n\n(fn NAME TYPE)",
                subr: functions::import_name::<M>,
            },
            Function {
                name: "gss--internal-name-to-string",
                arity: 1,
                doc: "Return the display form of the GSS-API name NAME.\n\n(fn NAME)",
                subr: functions::name_to_string::<M>,
            },
            Function {
                name: "gss--internal-init-sec-context",
                arity: 5,
                doc: "Run one initiator round against TARGET.\n\n(fn TARGET FLAGS CONTEXT TIME-REQ TOKEN)",
                subr: functions::init_sec_context::<M>,
            },
            Function {
                name: "gss--internal-accept-sec-context",
                arity: 2,
                doc: "Run one acceptor round on TOKEN.\n\n(fn TOKEN CONTEXT)",
                subr: functions::accept_sec_context::<M>,
            },
            Function {
                name: "gss--internal-krb5-register-acceptor-identity",
                arity: 1,
                doc: "Use the keytab in FILENAME for accepting contexts.\n\n(fn FILENAME)",
                subr: functions::register_identity::<M>,
            },
            Function {
                name: "gss--internal-wrap",
                arity: 3,
                doc: "Protect MESSAGE for the peer of CONTEXT, sealed if CONF is non-nil.\n\n(fn CONTEXT MESSAGE CONF)",
                subr: functions::wrap::<M>,
            },
            Function {
                name: "gss--internal-unwrap",
                arity: 2,
                doc: "Verify and unseal TOKEN received on CONTEXT.\n\n(fn CONTEXT TOKEN)",
                subr: functions::unwrap::<M>,
            },
        ];
        tracing::info!(feature = FEATURE, functions = functions.len(), "module loaded");
        Self { mech, functions }
    }

    pub fn mechanism(&self) -> &M {
        &self.mech
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function<M>> {
        self.functions.iter()
    }

    pub fn feature(&self) -> &'static str {
        FEATURE
    }

    /// Calls `name` the way the host would, turning any failure into a signal.
    pub fn funcall(&self, name: &str, args: &[Value]) -> Result<Value, Signal> {
        self.dispatch(name, args).map_err(|err| {
            tracing::debug!(function = name, error = %err, "signalling");
            Signal::from(err)
        })
    }

    fn dispatch(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let function = self
            .functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::UnknownFunction(name.to_owned()))?;
        if args.len() != function.arity {
            return Err(Error::Arity {
                name: function.name,
                expected: function.arity,
                got: args.len(),
            });
        }
        (function.subr)(&self.mech, args)
    }
}
