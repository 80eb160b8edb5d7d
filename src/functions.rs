//! The module's functions. Each takes its arguments already checked for
//! arity and converts them at the boundary before calling into the core.

use std::path::Path;

use gssbind_core::{
    accept, initiate, protect, register_acceptor_identity, unprotect, FlagSet, Mechanism, NameType, PrincipalName,
    Role,
};

use crate::{handle::ContextHandle, Error, Value};

const NAME: &str = "gss-name";
const CONTEXT: &str = "gss-context";

fn flags_value(flags: FlagSet) -> Value {
    Value::list(flags.decode().into_iter().map(|f| Value::keyword(f.symbol())))
}

fn token_value(token: Option<Vec<u8>>) -> Value {
    token.map_or(Value::Nil, |t| Value::bytes(&t))
}

/// Unrecognised entries are ignored, keyword or not.
fn flags_arg(value: &Value) -> Result<FlagSet, Error> {
    Ok(FlagSet::encode(value.list_items()?.iter().filter_map(Value::keyword_name)))
}

fn context_arg<'v, M: Mechanism + 'static>(value: &'v Value) -> Result<Option<&'v ContextHandle<M>>, Error> {
    if value.is_nil() {
        return Ok(None);
    }
    value.downcast(CONTEXT).map(Some)
}

/// `(NAME TYPE)` → name
pub(crate) fn import_name<M: Mechanism + 'static>(mech: &M, args: &[Value]) -> Result<Value, Error> {
    let name_type: NameType = match args[1].keyword_name() {
        Some(symbol) => symbol.parse()?,
        None => return Err(gssbind_core::Error::InvalidNameType(format!("{:?}", args[1])).into()),
    };
    let text = args[0].string_contents()?;
    let name = PrincipalName::import(mech, text, name_type)?;
    Ok(Value::user_ptr(name))
}

/// `(NAME)` → string
pub(crate) fn name_to_string<M: Mechanism + 'static>(mech: &M, args: &[Value]) -> Result<Value, Error> {
    let name: &PrincipalName<M> = args[0].downcast(NAME)?;
    Ok(Value::String(name.display(mech)?))
}

/// `(TARGET FLAGS CONTEXT TIME-REQ TOKEN)` → `(CONTINUE CONTEXT TOKEN FLAGS)`
pub(crate) fn init_sec_context<M: Mechanism + 'static>(mech: &M, args: &[Value]) -> Result<Value, Error> {
    let target: &PrincipalName<M> = args[0].downcast(NAME)?;
    let flags = flags_arg(&args[1])?;
    let handle = context_arg::<M>(&args[2])?;
    let time_req = args[3].to_u32()?;
    let input = args[4].to_token()?;

    let context = handle.map(|h| h.take_for_round(Role::Initiator)).transpose()?;
    let step = initiate(mech, target, flags, context, time_req, &input)?;
    let context = match (step.context, handle) {
        (Some(context), Some(handle)) => {
            handle.restore(context);
            args[2].clone()
        }
        (Some(context), None) => Value::user_ptr(ContextHandle::new(context)),
        (None, _) => Value::Nil,
    };
    Ok(Value::list([
        Value::bool(step.continue_needed),
        context,
        token_value(step.token),
        flags_value(step.flags),
    ]))
}

/// `(TOKEN CONTEXT)` → `(CONTINUE CONTEXT SOURCE-NAME TOKEN FLAGS TIME-REC nil)`
///
/// The last slot would hold delegated credentials, which are never returned.
pub(crate) fn accept_sec_context<M: Mechanism + 'static>(mech: &M, args: &[Value]) -> Result<Value, Error> {
    let input = args[0].to_token()?;
    let handle = context_arg::<M>(&args[1])?;

    let context = handle.map(|h| h.take_for_round(Role::Acceptor)).transpose()?;
    let step = accept(mech, &input, context)?;
    let context = match (step.context, handle) {
        (Some(context), Some(handle)) => {
            handle.restore(context);
            args[1].clone()
        }
        (Some(context), None) => Value::user_ptr(ContextHandle::new(context)),
        (None, _) => Value::Nil,
    };
    Ok(Value::List(vec![
        Value::bool(step.continue_needed),
        context,
        step.source_name.map_or(Value::Nil, Value::user_ptr),
        token_value(step.token),
        flags_value(step.flags),
        Value::Integer(step.time_rec.into()),
        Value::Nil,
    ]))
}

/// `(FILENAME)` → nil
pub(crate) fn register_identity<M: Mechanism + 'static>(mech: &M, args: &[Value]) -> Result<Value, Error> {
    let path = args[0].string_contents()?;
    register_acceptor_identity(mech, Path::new(path))?;
    Ok(Value::Nil)
}

/// `(CONTEXT MESSAGE CONF)` → `(TOKEN CONF-APPLIED)`
pub(crate) fn wrap<M: Mechanism + 'static>(mech: &M, args: &[Value]) -> Result<Value, Error> {
    let handle: &ContextHandle<M> = args[0].downcast(CONTEXT)?;
    let message = args[1].to_token()?;
    let conf_req = !args[2].is_nil();
    let wrapped = handle.with_context(|context| Ok(protect(mech, context, &message, conf_req)?))?;
    Ok(Value::list([Value::bytes(&wrapped.token), Value::bool(wrapped.conf_applied)]))
}

/// `(CONTEXT TOKEN)` → `(MESSAGE CONF-APPLIED)`
pub(crate) fn unwrap<M: Mechanism + 'static>(mech: &M, args: &[Value]) -> Result<Value, Error> {
    let handle: &ContextHandle<M> = args[0].downcast(CONTEXT)?;
    let token = args[1].to_token()?;
    let plain = handle.with_context(|context| Ok(unprotect(mech, context, &token)?))?;
    Ok(Value::list([Value::bytes(&plain.message), Value::bool(plain.conf_applied)]))
}
