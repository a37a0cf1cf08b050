use super::IdentityStore;
use x509_parser::prelude::{FromDer as _, X509Certificate};

fn store_in(dir: &std::path::Path) -> IdentityStore {
    IdentityStore::new(Some(dir), "test-host", "atvremote")
}

#[test]
fn identity_is_stable_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    let first = store_in(dir.path()).get().unwrap();
    // a fresh store simulates a process restart
    let second = store_in(dir.path()).get().unwrap();

    assert_eq!(first.certificate_der(), second.certificate_der());
    assert_eq!(first.public_key_bytes(), second.public_key_bytes());
}

#[test]
fn identity_is_cached_within_a_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    let a = store.get().unwrap();
    let b = store.get().unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn corrupt_store_regenerates() {
    let dir = tempfile::tempdir().unwrap();
    let first = store_in(dir.path()).get().unwrap();

    std::fs::write(dir.path().join("identity.json"), b"not json").unwrap();

    let second = store_in(dir.path()).get().unwrap();
    assert_ne!(first.certificate_der(), second.certificate_der());

    // the regenerated identity must itself persist
    let third = store_in(dir.path()).get().unwrap();
    assert_eq!(second.certificate_der(), third.certificate_der());
}

#[test]
fn certificate_shape() {
    let dir = tempfile::tempdir().unwrap();
    let identity = store_in(dir.path()).get().unwrap();

    let (_, cert) = X509Certificate::from_der(identity.certificate_der()).unwrap();

    // self-signed
    assert_eq!(cert.subject(), cert.issuer());

    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .unwrap()
        .as_str()
        .unwrap();
    assert_eq!(cn, "AndroidTvRemote_test-host");

    let key_usage = cert.key_usage().unwrap().unwrap();
    assert!(key_usage.critical);
    assert!(key_usage.value.digital_signature());
    assert!(key_usage.value.key_encipherment());

    let eku = cert.extended_key_usage().unwrap().unwrap();
    assert!(!eku.critical);
    assert!(eku.value.client_auth);
    assert!(!eku.value.server_auth);

    // ten-year validity
    let lifetime =
        cert.validity().not_after.timestamp() - cert.validity().not_before.timestamp();
    assert_eq!(lifetime, 3650 * 24 * 60 * 60);
}

#[test]
fn safe_device_name_replaces_specials() {
    assert_eq!(super::safe_device_name("Pixel 8 Pro"), "Pixel_8_Pro");
    assert_eq!(super::safe_device_name("tv/room#1"), "tv_room_1");
    assert_eq!(super::safe_device_name("plain-name_9"), "plain-name_9");
}

#[test]
fn public_key_bytes_are_minimal() {
    let dir = tempfile::tempdir().unwrap();
    let identity = store_in(dir.path()).get().unwrap();
    let (modulus, exponent) = identity.public_key_bytes();

    // 2048-bit modulus, no leading zero octet
    assert_eq!(modulus.len(), 256);
    assert_ne!(modulus[0], 0);
    // standard exponent 65537
    assert_eq!(exponent, vec![0x01, 0x00, 0x01]);
}
