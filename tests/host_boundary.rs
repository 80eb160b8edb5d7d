use std::path::PathBuf;

use gssbind::{logging, ContextHandle, Module, Signal, Value};
use gssbind_core::loopback::Loopback;
use tempfile::TempDir;

const KEY: &str = "0f0e0d0c0b0a09080706050403020100f0e0d0c0b0a090807060504030201000";

struct Fixture {
    _dir: TempDir,
    keytab: PathBuf,
    module: Module<Loopback>,
}

fn fixture() -> Fixture {
    logging::init_for_tests();
    let dir = tempfile::tempdir().unwrap();
    let realm = dir.path().join("realm.toml");
    let keytab = dir.path().join("keytab.toml");
    std::fs::write(
        &realm,
        format!(
            "realm = \"EXAMPLE.COM\"\nclient = \"alice@EXAMPLE.COM\"\n\n[[principal]]\nname = \"HTTP/www.example.com@EXAMPLE.COM\"\nkey = \"{KEY}\"\n"
        ),
    )
    .unwrap();
    std::fs::write(
        &keytab,
        format!("[[entry]]\nprincipal = \"HTTP/www.example.com@EXAMPLE.COM\"\nkey = \"{KEY}\"\n"),
    )
    .unwrap();
    let module = Module::new(Loopback::from_realm_file(&realm).unwrap());
    Fixture {
        _dir: dir,
        keytab,
        module,
    }
}

fn items(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        other => panic!("expected a list, got {other:?}"),
    }
}

fn import(module: &Module<Loopback>, name: &str, name_type: &str) -> Value {
    module
        .funcall("gss--internal-import-name", &[Value::string(name), Value::keyword(name_type)])
        .unwrap()
}

fn keywords(names: &[&str]) -> Value {
    Value::list(names.iter().map(|n| Value::keyword(n)))
}

#[test]
fn all_functions_are_registered() {
    let f = fixture();
    let names: Vec<_> = f.module.functions().map(|f| (f.name, f.arity)).collect();
    assert_eq!(
        names,
        [
            ("gss--internal-import-name", 2),
            ("gss--internal-name-to-string", 1),
            ("gss--internal-init-sec-context", 5),
            ("gss--internal-accept-sec-context", 2),
            ("gss--internal-krb5-register-acceptor-identity", 1),
            ("gss--internal-wrap", 3),
            ("gss--internal-unwrap", 2),
        ]
    );
    assert_eq!(f.module.feature(), "gssbind");
    assert!(f.module.functions().all(|f| !f.doc.is_empty()));
}

#[test]
fn arity_is_checked_before_anything_else() {
    let f = fixture();
    let signal = f.module.funcall("gss--internal-import-name", &[Value::string("alice")]).unwrap_err();
    assert_eq!(signal.symbol, "wrong-number-of-arguments");
    assert_eq!(
        signal.data,
        Value::list([Value::symbol("gss--internal-import-name"), Value::Integer(1)])
    );
    let signal = f.module.funcall("gss--internal-no-such-thing", &[]).unwrap_err();
    assert_eq!(signal.symbol, "error");
}

#[test]
fn name_round_trip() {
    let f = fixture();
    let name = import(&f.module, "alice@EXAMPLE.COM", "user-name");
    let text = f.module.funcall("gss--internal-name-to-string", &[name]).unwrap();
    assert_eq!(text, Value::string("alice@EXAMPLE.COM"));
}

#[test]
fn invalid_name_type() {
    let f = fixture();
    let signal = f
        .module
        .funcall("gss--internal-import-name", &[Value::string("alice"), Value::keyword("kerberos")])
        .unwrap_err();
    assert_eq!(signal.symbol, "error");
    let Value::List(data) = signal.data else { panic!() };
    let [Value::String(message)] = data.as_slice() else { panic!() };
    assert!(message.contains("illegal name type"), "{message}");
}

#[test]
fn mechanism_failures_signal_gss_error() {
    let f = fixture();
    let Signal { symbol, data } = f
        .module
        .funcall("gss--internal-import-name", &[Value::string("root"), Value::keyword("string-uid-name")])
        .unwrap_err();
    assert_eq!(symbol, "gss-error");
    let [major, minor]: [Value; 2] = items(data).try_into().unwrap();
    assert_eq!(items(major), [Value::string("An invalid name was supplied")]);
    assert_eq!(items(minor), [Value::string("Malformed principal name")]);
}

#[test]
fn tokens_must_be_bytes() {
    let f = fixture();
    let signal = f
        .module
        .funcall(
            "gss--internal-accept-sec-context",
            &[Value::Vector(vec![Value::Integer(300)]), Value::Nil],
        )
        .unwrap_err();
    assert_eq!(signal.symbol, "wrong-type-argument");
    assert_eq!(signal.data, Value::list([Value::symbol("bytep"), Value::Integer(300)]));
}

#[test]
fn full_handshake_and_protection() {
    let f = fixture();
    f.module
        .funcall(
            "gss--internal-krb5-register-acceptor-identity",
            &[Value::string(f.keytab.to_str().unwrap())],
        )
        .unwrap();
    let target = import(&f.module, "HTTP@www.example.com", "hostbased-service");
    let flags = keywords(&["mutual", "conf", "integ", "frobnicate"]);

    let [continue_needed, client, token, _flags]: [Value; 4] = items(
        f.module
            .funcall(
                "gss--internal-init-sec-context",
                &[target.clone(), flags.clone(), Value::Nil, Value::Integer(0), Value::Nil],
            )
            .unwrap(),
    )
    .try_into()
    .unwrap();
    assert_eq!(continue_needed, Value::T);
    assert!(matches!(client, Value::UserPtr(_)));

    let accepted = items(
        f.module
            .funcall("gss--internal-accept-sec-context", &[token, Value::Nil])
            .unwrap(),
    );
    assert_eq!(accepted.len(), 7);
    assert_eq!(accepted[0], Value::Nil);
    let server = accepted[1].clone();
    let source = f.module.funcall("gss--internal-name-to-string", &[accepted[2].clone()]).unwrap();
    assert_eq!(source, Value::string("alice@EXAMPLE.COM"));
    let granted = items(accepted[4].clone());
    assert!(granted.contains(&Value::keyword("mutual")));
    assert!(granted.contains(&Value::keyword("prot-ready")));
    assert!(matches!(accepted[5], Value::Integer(t) if t > 0));
    assert_eq!(accepted[6], Value::Nil);

    let [continue_needed, same_client, token, _flags]: [Value; 4] = items(
        f.module
            .funcall(
                "gss--internal-init-sec-context",
                &[target, flags, client.clone(), Value::Integer(0), accepted[3].clone()],
            )
            .unwrap(),
    )
    .try_into()
    .unwrap();
    assert_eq!(continue_needed, Value::Nil);
    assert_eq!(same_client, client, "stepping returns the same handle");
    assert_eq!(token, Value::Nil);

    let [wrapped, conf]: [Value; 2] = items(
        f.module
            .funcall("gss--internal-wrap", &[client, Value::bytes(b"Hi, Server!"), Value::T])
            .unwrap(),
    )
    .try_into()
    .unwrap();
    assert_eq!(conf, Value::T);
    let [message, conf]: [Value; 2] = items(f.module.funcall("gss--internal-unwrap", &[server, wrapped]).unwrap())
        .try_into()
        .unwrap();
    assert_eq!(message, Value::bytes(b"Hi, Server!"));
    assert_eq!(conf, Value::T);
}

#[test]
fn failed_round_releases_the_context() {
    let f = fixture();
    let target = import(&f.module, "HTTP@www.example.com", "hostbased-service");
    let flags = keywords(&["mutual"]);
    let first = items(
        f.module
            .funcall(
                "gss--internal-init-sec-context",
                &[target.clone(), flags.clone(), Value::Nil, Value::Integer(0), Value::Nil],
            )
            .unwrap(),
    );
    let client = first[1].clone();

    let signal = f
        .module
        .funcall(
            "gss--internal-init-sec-context",
            &[target.clone(), flags.clone(), client.clone(), Value::Integer(0), Value::bytes(&[1, 2, 3])],
        )
        .unwrap_err();
    assert_eq!(signal.symbol, "gss-error");

    let Value::UserPtr(ptr) = &client else { panic!() };
    let handle: &ContextHandle<Loopback> = ptr.downcast_ref().unwrap();
    assert!(handle.is_released());

    let signal = f
        .module
        .funcall("gss--internal-wrap", &[client, Value::bytes(b"late"), Value::Nil])
        .unwrap_err();
    assert_eq!(signal.symbol, "error");
    assert_eq!(signal.data, Value::list([Value::string("security context has been released")]));
}

#[test]
fn out_of_range_time_request() {
    let f = fixture();
    let target = import(&f.module, "HTTP@www.example.com", "hostbased-service");
    let signal = f
        .module
        .funcall(
            "gss--internal-init-sec-context",
            &[target, Value::Nil, Value::Nil, Value::Integer(-5), Value::Nil],
        )
        .unwrap_err();
    assert_eq!(signal.symbol, "wrong-type-argument");
}

#[test]
fn missing_keytab_is_an_error() {
    let f = fixture();
    let signal = f
        .module
        .funcall(
            "gss--internal-krb5-register-acceptor-identity",
            &[Value::string("/nonexistent/keytab.toml")],
        )
        .unwrap_err();
    assert_eq!(signal.symbol, "error");
}
