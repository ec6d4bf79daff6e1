//! Property tests for envelopes and endpoints

use crate::common::*;
use proptest::prelude::*;
use rivet::{Envelope, Scheme, TypeDescriptor, ValueKind};

fn scheme() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("rpc"), Just("rpcs"), Just("http"), Just("https")]
}

fn host() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,10}(\\.[a-z][a-z0-9]{0,10}){0,3}"
}

proptest! {
    #[test]
    fn canonical_uri_parses_back_to_same_endpoint(
        scheme in scheme(),
        host in host(),
        port in 1u16..=u16::MAX,
    ) {
        let uri = format!("{}://{}:{}/some/path?q=1", scheme, host, port);
        let endpoint = EndpointDescriptor::parse(&uri).unwrap();
        prop_assert_eq!(endpoint.host(), host.as_str());
        prop_assert_eq!(endpoint.port(), port);
        prop_assert_eq!(EndpointDescriptor::parse(&endpoint.to_uri()).unwrap(), endpoint);
    }

    #[test]
    fn host_case_does_not_change_identity(host in host(), port in 1u16..=u16::MAX) {
        let lower = EndpointDescriptor::parse(&format!("rpc://{}:{}", host, port)).unwrap();
        let upper = EndpointDescriptor::parse(&format!("rpc://{}:{}", host.to_uppercase(), port)).unwrap();
        prop_assert_eq!(lower.scheme(), Scheme::Rpc);
        prop_assert_eq!(lower, upper);
    }

    #[test]
    fn subtype_payload_unwraps_as_supertype(n in any::<i64>()) {
        let registry = TypeRegistry::new();
        registry
            .register(TypeDescriptor::new(ty("Account"), Some(ValueKind::Int)))
            .unwrap();
        registry
            .register(TypeDescriptor::new(ty("SavingsAccount"), None).extends(ty("Account")))
            .unwrap();

        let bytes = Envelope::wrap(&ty("SavingsAccount"), Value::Int(n)).to_bytes().unwrap();
        let received = Envelope::from_bytes(&bytes).unwrap();
        prop_assert_eq!(received.type_name().as_str(), "SavingsAccount");
        prop_assert_eq!(received.clone().unwrap(&registry, &ty("Account")).unwrap(), Value::Int(n));
        prop_assert_eq!(received.unwrap(&registry, &ty("any")).unwrap(), Value::Int(n));
    }

    #[test]
    fn supertype_never_unwraps_as_subtype(n in any::<i64>()) {
        let registry = TypeRegistry::new();
        registry
            .register(TypeDescriptor::new(ty("Account"), Some(ValueKind::Int)))
            .unwrap();
        registry
            .register(TypeDescriptor::new(ty("SavingsAccount"), None).extends(ty("Account")))
            .unwrap();

        let envelope = Envelope::wrap(&ty("Account"), Value::Int(n));
        let is_type_mismatch = matches!(
            envelope.unwrap(&registry, &ty("SavingsAccount")),
            Err(Error::TypeMismatch { .. })
        );
        prop_assert!(is_type_mismatch);
    }
}
