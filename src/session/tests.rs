use super::{ConnectionState, RemoteState, SessionManager};
use crate::error::RemoteError;
use crate::identity::IdentityStore;
use crate::net::TlsTransport;
use crate::registry::{MemoryStore, PairedRegistry};
use crate::types::RemoteConfig;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

fn test_manager() -> SessionManager {
    let identity = IdentityStore::new(None, "test-host", "atvremote")
        .get()
        .unwrap();
    let transport = Arc::new(TlsTransport::new(&identity).unwrap());
    let registry = Arc::new(PairedRegistry::new(Box::new(MemoryStore::new())).unwrap());
    SessionManager::new(RemoteConfig::default(), transport, registry)
}

#[test]
fn connection_state_helpers() {
    let ip = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));
    let other = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 11));

    assert!(!ConnectionState::Disconnected.is_connected());
    assert!(!ConnectionState::Connecting.is_connected());
    assert!(ConnectionState::Connected(ip).is_connected());
    assert!(ConnectionState::Connected(ip).is_connected_to(ip));
    assert!(!ConnectionState::Connected(ip).is_connected_to(other));
    assert!(!ConnectionState::Error("x".to_string()).is_connected());
}

#[test]
fn remote_state_starts_empty() {
    let state = RemoteState::default();
    assert_eq!(state.volume, None);
    assert_eq!(state.powered, None);
    assert_eq!(state.current_app, None);
}

#[tokio::test]
async fn unpaired_send_key_is_refused() {
    let manager = test_manager();
    let ip = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

    let err = manager.send_key(ip, crate::types::keycode::DPAD_UP).await;
    assert!(matches!(err, Err(RemoteError::NotPaired { .. })));

    // the refusal happens before any socket work: state never left Disconnected
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn unpaired_connect_is_refused() {
    let manager = test_manager();
    let ip = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

    let err = manager.connect(ip).await;
    assert!(matches!(err, Err(RemoteError::NotPaired { .. })));
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn disconnect_when_idle_is_a_no_op() {
    let manager = test_manager();
    manager.disconnect().await;
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}
