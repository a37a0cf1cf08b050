use super::{ConnectError, TlsTransport};
use crate::identity::IdentityStore;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

#[tokio::test]
async fn transport_builds_from_generated_identity() {
    let identity = IdentityStore::new(None, "test-host", "atvremote")
        .get()
        .unwrap();
    assert!(TlsTransport::new(&identity).is_ok());
}

#[tokio::test]
async fn connect_to_closed_port_is_a_tcp_error() {
    let identity = IdentityStore::new(None, "test-host", "atvremote")
        .get()
        .unwrap();
    let transport = TlsTransport::new(&identity).unwrap();

    // bind-then-drop to get a port nothing is listening on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = transport
        .connect(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::Tcp(_) | ConnectError::Timeout));
    assert!(!err.is_certificate_rejected());
}
