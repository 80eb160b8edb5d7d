#![cfg(unix)]

use gssbind_core::{initiate, krb5::Krb5, FlagSet, InputToken, NameType, PrincipalName};

#[test]
fn main() {
    let Ok(service_principal) = std::env::var("KERBEROS_TEST_SERVICE_PRINCIPAL") else {
        eprintln!("KERBEROS_TEST_SERVICE_PRINCIPAL not set, skipping");
        return;
    };
    let mech = Krb5;
    let target = PrincipalName::import(&mech, &service_principal, NameType::HostbasedService).unwrap();
    let step = match initiate(&mech, &target, FlagSet::encode(["mutual"]), None, 0, &InputToken::absent()) {
        Ok(step) => step,
        Err(err) => {
            eprintln!("Error initiating: {err}");
            panic!()
        }
    };
    assert!(step.token.is_some());
    assert!(step.continue_needed);
}
