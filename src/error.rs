use crate::Value;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Wrong number of arguments: {name} takes {expected}, got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("unable to copy string")]
    StringCopy,
    #[error("wrong type argument: {expected}, {value:?}")]
    WrongType { expected: &'static str, value: Value },
    #[error("security context has been released")]
    ContextReleased,
    #[error("void function {0}")]
    UnknownFunction(String),
    #[error(transparent)]
    Core(#[from] gssbind_core::Error),
}

/// A non-local exit into the host: the error symbol and its data list.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{symbol}: {data:?}")]
pub struct Signal {
    pub symbol: &'static str,
    pub data: Value,
}

impl From<Error> for Signal {
    fn from(err: Error) -> Self {
        match err {
            Error::Arity { name, got, .. } => Signal {
                symbol: "wrong-number-of-arguments",
                data: Value::list([Value::symbol(name), Value::Integer(got as i64)]),
            },
            Error::WrongType { expected, value } => Signal {
                symbol: "wrong-type-argument",
                data: Value::list([Value::symbol(expected), value]),
            },
            Error::Core(gssbind_core::Error::Mechanism(err)) => Signal {
                symbol: "gss-error",
                data: Value::list([
                    Value::list(err.major_messages.into_iter().map(Value::String)),
                    Value::list(err.minor_messages.into_iter().map(Value::String)),
                ]),
            },
            other => Signal {
                symbol: "error",
                data: Value::list([Value::String(other.to_string())]),
            },
        }
    }
}
