use std::{any::Any, fmt::Debug, rc::Rc};

use gssbind_core::InputToken;

use crate::Error;

/// A value as the scripting host passes it across the module boundary.
#[derive(Clone)]
pub enum Value {
    Nil,
    T,
    Integer(i64),
    String(String),
    /// A symbol by its full name; keywords keep their leading colon.
    Symbol(String),
    Vector(Vec<Value>),
    List(Vec<Value>),
    /// An opaque object owned by the host's garbage collector. The payload
    /// is dropped when the last reference goes away.
    UserPtr(Rc<dyn Any>),
}

impl Value {
    pub fn keyword(name: &str) -> Self {
        Self::Symbol(format!(":{name}"))
    }
    pub fn symbol(name: &str) -> Self {
        Self::Symbol(name.to_owned())
    }
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }
    pub fn bool(b: bool) -> Self {
        if b {
            Self::T
        } else {
            Self::Nil
        }
    }
    /// A vector of integers in `0..=255`.
    pub fn bytes(bytes: &[u8]) -> Self {
        Self::Vector(bytes.iter().map(|&b| Self::Integer(b.into())).collect())
    }
    /// The empty list is `nil`.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        let items: Vec<_> = items.into_iter().collect();
        if items.is_empty() {
            Self::Nil
        } else {
            Self::List(items)
        }
    }
    pub fn user_ptr<T: Any>(payload: T) -> Self {
        Self::UserPtr(Rc::new(payload))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil) || matches!(self, Self::List(items) if items.is_empty())
    }

    /// The keyword's name without its colon.
    pub fn keyword_name(&self) -> Option<&str> {
        match self {
            Self::Symbol(name) => name.strip_prefix(':'),
            _ => None,
        }
    }

    pub(crate) fn wrong_type(&self, expected: &'static str) -> Error {
        Error::WrongType {
            expected,
            value: self.clone(),
        }
    }

    /// The host string's contents. Strings with an embedded NUL cannot be
    /// handed to the mechanism.
    pub(crate) fn string_contents(&self) -> Result<&str, Error> {
        match self {
            Self::String(s) if !s.contains('\0') => Ok(s),
            _ => Err(Error::StringCopy),
        }
    }

    pub(crate) fn to_u32(&self) -> Result<u32, Error> {
        match self {
            Self::Integer(i) => u32::try_from(*i).map_err(|_| self.wrong_type("natnump")),
            _ => Err(self.wrong_type("integerp")),
        }
    }

    pub(crate) fn list_items(&self) -> Result<&[Value], Error> {
        match self {
            Self::Nil => Ok(&[]),
            Self::List(items) => Ok(items),
            _ => Err(self.wrong_type("listp")),
        }
    }

    /// `nil` is an absent token; anything else must be a vector of bytes.
    pub(crate) fn to_token(&self) -> Result<InputToken, Error> {
        let items = match self {
            Self::Nil => return Ok(InputToken::absent()),
            Self::Vector(items) => items,
            _ => return Err(self.wrong_type("vectorp")),
        };
        let bytes = items
            .iter()
            .map(|item| match item {
                Self::Integer(i) => u8::try_from(*i).map_err(|_| item.wrong_type("bytep")),
                _ => Err(item.wrong_type("integerp")),
            })
            .collect::<Result<Vec<u8>, Error>>()?;
        Ok(InputToken::decode(Some(bytes)))
    }

    pub(crate) fn downcast<T: Any>(&self, expected: &'static str) -> Result<&T, Error> {
        match self {
            Self::UserPtr(ptr) => ptr.downcast_ref().ok_or_else(|| self.wrong_type(expected)),
            _ => Err(self.wrong_type(expected)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) | (Self::T, Self::T) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::String(a), Self::String(b)) | (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) | (Self::List(a), Self::List(b)) => a == b,
            (Self::UserPtr(a), Self::UserPtr(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::T => f.write_str("t"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => f.write_str(s),
            Self::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                f.write_str("]")
            }
            Self::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                f.write_str(")")
            }
            Self::UserPtr(ptr) => write!(f, "#<user-ptr {:p}>", Rc::as_ptr(ptr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_must_be_byte_vectors() {
        assert!(Value::Nil.to_token().unwrap().is_empty());
        assert_eq!(Value::bytes(&[0, 127, 255]).to_token().unwrap().as_slice(), &[0, 127, 255]);
        let err = Value::Vector(vec![Value::Integer(256)]).to_token().unwrap_err();
        assert!(matches!(err, Error::WrongType { expected: "bytep", value: Value::Integer(256) }));
        let err = Value::Vector(vec![Value::string("a")]).to_token().unwrap_err();
        assert!(matches!(err, Error::WrongType { expected: "integerp", .. }));
        assert!(Value::string("abc").to_token().is_err());
    }

    #[test]
    fn strings_with_nul_do_not_copy() {
        assert_eq!(Value::string("alice").string_contents().unwrap(), "alice");
        assert!(matches!(Value::string("a\0b").string_contents(), Err(Error::StringCopy)));
        assert!(matches!(Value::Integer(1).string_contents(), Err(Error::StringCopy)));
    }

    #[test]
    fn time_values_fit_u32() {
        assert_eq!(Value::Integer(0).to_u32().unwrap(), 0);
        assert!(Value::Integer(-1).to_u32().is_err());
        assert!(Value::Integer(1 << 40).to_u32().is_err());
    }

    #[test]
    fn user_pointers_compare_by_identity() {
        let a = Value::user_ptr(5u8);
        assert_eq!(a, a.clone());
        assert_ne!(a, Value::user_ptr(5u8));
        assert_eq!(*a.downcast::<u8>("u8").unwrap(), 5);
        assert!(a.downcast::<u16>("u16").is_err());
    }

    #[test]
    fn debug_reads_like_the_host() {
        let v = Value::list([Value::T, Value::bytes(&[1, 2]), Value::keyword("mutual"), Value::string("x")]);
        assert_eq!(format!("{v:?}"), "(t [1 2] :mutual \"x\")");
    }
}
