use crate::{
    context::SecurityContext, mech::Mechanism, status::Status, token::InputToken, translate::MechanismError, Error,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wrapped {
    pub token: Vec<u8>,
    pub conf_applied: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unprotected {
    pub message: Vec<u8>,
    pub conf_applied: bool,
}

/// Wraps `message` for the peer, sealing it when `conf_req` is set and the
/// context allows it.
///
/// The context is expected to be established. A partial context is handed
/// to the mechanism as is; what happens then is up to the mechanism.
pub fn protect<M: Mechanism>(
    mech: &M,
    context: &mut SecurityContext<M>,
    message: &InputToken,
    conf_req: bool,
) -> Result<Wrapped, Error> {
    let out = mech
        .wrap(context.handle_mut(), conf_req, message)
        .map_err(|status| MechanismError::decode(mech, status))?;
    if conf_req && !out.conf_state {
        tracing::debug!("confidentiality requested but only integrity was applied");
    }
    Ok(Wrapped {
        token: out.buffer.as_ref().to_vec(),
        conf_applied: out.conf_state,
    })
}

/// Verifies and, if sealed, decrypts a message wrapped by the peer.
///
/// The quality of protection is not reported; the default is always requested.
pub fn unprotect<M: Mechanism>(
    mech: &M,
    context: &mut SecurityContext<M>,
    token: &InputToken,
) -> Result<Unprotected, Error> {
    let out = mech
        .unwrap(context.handle_mut(), token)
        .map_err(|status| MechanismError::decode(mech, status))?;
    log_token_info(out.status);
    Ok(Unprotected {
        message: out.buffer.as_ref().to_vec(),
        conf_applied: out.conf_state,
    })
}

fn log_token_info(status: Status) {
    let info = status.token_info();
    if info != 0 {
        tracing::warn!(supplementary = format_args!("{info:#06x}"), "per-message token out of order");
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        context::{accept, initiate},
        flags::FlagSet,
        loopback::{testing, Loopback},
        name::{NameType, PrincipalName},
        status::{GSS_S_BAD_SIG, GSS_S_DEFECTIVE_TOKEN, GSS_S_NO_CONTEXT},
    };

    fn established(
        mech: &Loopback,
        flags: &[&str],
    ) -> (SecurityContext<Loopback>, SecurityContext<Loopback>) {
        let flags = FlagSet::encode(flags);
        let target = PrincipalName::import(mech, testing::SERVICE, NameType::HostbasedService).unwrap();
        let first = initiate(mech, &target, flags, None, 0, &InputToken::absent()).unwrap();
        let accepted = accept(mech, &first.token.unwrap().into(), None).unwrap();
        let client = match accepted.token {
            Some(reply) => initiate(mech, &target, flags, first.context, 0, &reply.into()).unwrap().context,
            None => first.context,
        };
        (client.unwrap(), accepted.context.unwrap())
    }

    #[test]
    fn sealed_round_trip() {
        let (_dir, mech) = testing::mechanism();
        let (mut client, mut server) = established(&mech, &["mutual", "conf", "integ"]);
        let message = InputToken::from(b"Hi, Server!".to_vec());
        let wrapped = protect(&mech, &mut client, &message, true).unwrap();
        assert!(wrapped.conf_applied);
        assert!(!wrapped.token.windows(message.len()).any(|w| w == message.as_slice()));

        let plain = unprotect(&mech, &mut server, &wrapped.token.into()).unwrap();
        assert_eq!(plain.message, b"Hi, Server!");
        assert!(plain.conf_applied);
    }

    #[test]
    fn integrity_only_round_trip() {
        let (_dir, mech) = testing::mechanism();
        let (mut client, mut server) = established(&mech, &["mutual", "conf"]);
        let wrapped = protect(&mech, &mut server, &InputToken::from(b"reply".to_vec()), false).unwrap();
        assert!(!wrapped.conf_applied);
        let plain = unprotect(&mech, &mut client, &wrapped.token.into()).unwrap();
        assert_eq!(plain.message, b"reply");
        assert!(!plain.conf_applied);
    }

    #[test]
    fn confidentiality_needs_the_conf_flag() {
        let (_dir, mech) = testing::mechanism();
        let (mut client, mut server) = established(&mech, &["integ"]);
        let wrapped = protect(&mech, &mut client, &InputToken::from(b"x".to_vec()), true).unwrap();
        assert!(!wrapped.conf_applied);
        assert!(!unprotect(&mech, &mut server, &wrapped.token.into()).unwrap().conf_applied);
    }

    #[test]
    fn empty_messages_round_trip() {
        let (_dir, mech) = testing::mechanism();
        let (mut client, mut server) = established(&mech, &["conf"]);
        let wrapped = protect(&mech, &mut client, &InputToken::absent(), true).unwrap();
        assert!(unprotect(&mech, &mut server, &wrapped.token.into()).unwrap().message.is_empty());
    }

    #[test]
    fn tampering_is_detected() {
        let (_dir, mech) = testing::mechanism();
        let (mut client, mut server) = established(&mech, &["conf"]);
        let mut wrapped = protect(&mech, &mut client, &InputToken::from(b"pay 10".to_vec()), true).unwrap().token;
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0x01;
        let err = unprotect(&mech, &mut server, &wrapped.into()).unwrap_err();
        assert_eq!(err.mechanism().unwrap().status.major, GSS_S_BAD_SIG);
    }

    #[test]
    fn reflected_tokens_are_rejected() {
        let (_dir, mech) = testing::mechanism();
        let (mut client, _server) = established(&mech, &["conf"]);
        let wrapped = protect(&mech, &mut client, &InputToken::from(b"echo".to_vec()), true).unwrap();
        let err = unprotect(&mech, &mut client, &wrapped.token.into()).unwrap_err();
        assert_eq!(err.mechanism().unwrap().status.major, GSS_S_BAD_SIG);
    }

    #[test]
    fn garbage_is_defective() {
        let (_dir, mech) = testing::mechanism();
        let (_client, mut server) = established(&mech, &["conf"]);
        let err = unprotect(&mech, &mut server, &InputToken::from(vec![0xff; 3])).unwrap_err();
        assert_eq!(err.mechanism().unwrap().status.major, GSS_S_DEFECTIVE_TOKEN);
    }

    #[test]
    fn partial_context_is_left_to_the_mechanism() {
        let (_dir, mech) = testing::mechanism();
        let target = PrincipalName::import(&mech, testing::SERVICE, NameType::HostbasedService).unwrap();
        let first = initiate(&mech, &target, FlagSet::encode(["mutual"]), None, 0, &InputToken::absent()).unwrap();
        let mut partial = first.context.unwrap();
        let err = protect(&mech, &mut partial, &InputToken::from(b"early".to_vec()), true).unwrap_err();
        assert_eq!(err.mechanism().unwrap().status.major, GSS_S_NO_CONTEXT);
    }

    #[test]
    #[traced_test]
    fn replays_are_reported_not_rejected() {
        let (_dir, mech) = testing::mechanism();
        let (mut client, mut server) = established(&mech, &["conf", "replay", "sequence"]);
        let wrapped = protect(&mech, &mut client, &InputToken::from(b"once".to_vec()), true).unwrap();
        let token = InputToken::from(wrapped.token);
        unprotect(&mech, &mut server, &token).unwrap();
        let again = unprotect(&mech, &mut server, &token).unwrap();
        assert_eq!(again.message, b"once");
        assert!(logs_contain("per-message token out of order"));
    }
}
