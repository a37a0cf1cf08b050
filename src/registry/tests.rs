use super::{FileStore, MemoryStore, PairedRegistry, PairedStore};
use std::net::{IpAddr, Ipv4Addr};

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
}

#[test]
fn add_remove_list() {
    let registry = PairedRegistry::new(Box::new(MemoryStore::new())).unwrap();

    assert!(!registry.is_paired(ip(10)));
    registry.add(ip(10)).unwrap();
    assert!(registry.is_paired(ip(10)));
    assert_eq!(registry.list(), vec!["192.0.2.10".to_string()]);

    assert!(registry.remove(ip(10)).unwrap());
    assert!(!registry.is_paired(ip(10)));
    assert!(!registry.remove(ip(10)).unwrap());
}

#[test]
fn add_is_idempotent() {
    let registry = PairedRegistry::new(Box::new(MemoryStore::new())).unwrap();
    registry.add(ip(10)).unwrap();
    registry.add(ip(10)).unwrap();
    assert_eq!(registry.list().len(), 1);
}

#[test]
fn change_stream_sees_mutations() {
    let registry = PairedRegistry::new(Box::new(MemoryStore::new())).unwrap();
    let mut rx = registry.subscribe();

    registry.add(ip(10)).unwrap();
    assert_eq!(*rx.borrow_and_update(), vec!["192.0.2.10".to_string()]);

    registry.remove(ip(10)).unwrap();
    assert!(rx.borrow_and_update().is_empty());
}

#[test]
fn file_store_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paired.json");

    {
        let registry = PairedRegistry::new(Box::new(FileStore::new(&path))).unwrap();
        registry.add(ip(10)).unwrap();
        registry.add(ip(11)).unwrap();
        registry.remove(ip(11)).unwrap();
    }

    let registry = PairedRegistry::new(Box::new(FileStore::new(&path))).unwrap();
    assert!(registry.is_paired(ip(10)));
    assert!(!registry.is_paired(ip(11)));
}

#[test]
fn file_store_load_missing_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("absent.json"));
    assert!(store.load().unwrap().is_empty());
}
