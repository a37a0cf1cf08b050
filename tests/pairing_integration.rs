//! Pairing handshake against the mock television.

use atvremote::pairing::PairingState;
use atvremote::testing::{MockTv, MockTvConfig};
use atvremote::{RemoteClient, RemoteConfig, RemoteError, TvDevice};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn localhost() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn tv_for(mock: &MockTv) -> TvDevice {
    let mut tv = TvDevice::from_ip(localhost());
    tv.pairing_port = mock.pairing_addr().port();
    tv
}

fn test_client() -> RemoteClient {
    RemoteClient::new(
        RemoteConfig::builder()
            .client_name("test-host")
            .pairing_connect_timeout(Duration::from_secs(5))
            .build(),
    )
    .expect("client")
}

#[tokio::test]
async fn full_pairing_succeeds_and_records_the_address() {
    init_tracing();
    let mock = MockTv::start(MockTvConfig::default()).await.unwrap();
    let client = test_client();

    let attempt = client.pair(&tv_for(&mock));
    let mut states = attempt.subscribe();

    attempt.start().await.expect("handshake to code display");

    // Idle → Connecting → WaitingForCode
    assert_eq!(*states.borrow_and_update(), PairingState::WaitingForCode);

    let code = mock.displayed_code().expect("television shows a code");
    attempt.submit_code(&code).await.expect("pairing success");

    assert_eq!(*states.borrow_and_update(), PairingState::Success);
    assert!(mock.paired());
    assert!(client.registry().is_paired(localhost()));
    assert_eq!(client.registry().list(), vec!["127.0.0.1".to_string()]);
}

#[tokio::test]
async fn pairing_walks_the_expected_states() {
    init_tracing();
    let mock = MockTv::start(MockTvConfig::default()).await.unwrap();
    let client = test_client();

    let attempt = client.pair(&tv_for(&mock));

    let mut states = attempt.subscribe();
    assert_eq!(*states.borrow_and_update(), PairingState::Idle);
    let collector = tokio::spawn(async move {
        let mut seen = vec![states.borrow_and_update().clone()];
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            let terminal = matches!(state, PairingState::Success | PairingState::Failed(_));
            seen.push(state);
            if terminal {
                break;
            }
        }
        seen
    });

    attempt.start().await.unwrap();
    let code = mock.displayed_code().unwrap();
    attempt.submit_code(&code).await.unwrap();

    let seen = collector.await.unwrap();

    // a watch channel may coalesce rapid updates, so assert the observed
    // states are an ordered subsequence of the canonical chain
    let chain = [
        PairingState::Idle,
        PairingState::Connecting,
        PairingState::WaitingForCode,
        PairingState::SubmittingCode,
        PairingState::Success,
    ];
    let mut cursor = 0;
    for state in &seen {
        let offset = chain[cursor..]
            .iter()
            .position(|expected| expected == state)
            .unwrap_or_else(|| panic!("state {state:?} out of order in {seen:?}"));
        cursor += offset;
    }
    assert!(seen.contains(&PairingState::WaitingForCode));
    assert_eq!(seen.last(), Some(&PairingState::Success));
}

#[tokio::test]
async fn wrong_code_is_rejected_and_nothing_is_recorded() {
    init_tracing();
    let mock = MockTv::start(MockTvConfig::default()).await.unwrap();
    let client = test_client();

    let attempt = client.pair(&tv_for(&mock));
    attempt.start().await.unwrap();

    let err = attempt.submit_code("000000").await.unwrap_err();
    assert!(matches!(err, RemoteError::PairingBadCode));

    assert!(!mock.paired());
    assert!(!client.registry().is_paired(localhost()));
    assert!(matches!(attempt.state(), PairingState::Failed(_)));
}

#[tokio::test]
async fn malformed_code_never_reaches_the_television() {
    init_tracing();
    let mock = MockTv::start(MockTvConfig::default()).await.unwrap();
    let client = test_client();

    let attempt = client.pair(&tv_for(&mock));
    attempt.start().await.unwrap();

    let err = attempt.submit_code("not-a-code").await.unwrap_err();
    assert!(matches!(err, RemoteError::PairingBadCode));
    assert!(!mock.paired());
}

#[tokio::test]
async fn non_ok_status_is_terminal_with_preserved_status() {
    init_tracing();
    let mock = MockTv::start(MockTvConfig {
        pairing_reply_status: Some(401),
        ..MockTvConfig::default()
    })
    .await
    .unwrap();
    let client = test_client();

    let attempt = client.pair(&tv_for(&mock));
    let err = attempt.start().await.unwrap_err();
    assert!(matches!(err, RemoteError::PairingRejected { status: 401 }));
    assert!(matches!(attempt.state(), PairingState::Failed(_)));
}

#[tokio::test]
async fn pairing_connect_failure_is_distinct() {
    init_tracing();
    let client = test_client();

    // bind-then-drop: nothing is listening here
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut tv = TvDevice::from_ip(localhost());
    tv.pairing_port = port;

    let attempt = client.pair(&tv);
    let err = attempt.start().await.unwrap_err();
    assert!(matches!(err, RemoteError::PairingConnectFailed { .. }));
}

#[tokio::test]
async fn cancel_tears_the_attempt_down() {
    init_tracing();
    let mock = MockTv::start(MockTvConfig::default()).await.unwrap();
    let client = test_client();

    let attempt = client.pair(&tv_for(&mock));
    attempt.start().await.unwrap();
    attempt.cancel().await;

    assert!(matches!(attempt.state(), PairingState::Failed(_)));
    // the attempt is consumed; submitting now reports the missing exchange
    let err = attempt.submit_code("6AE4D0").await.unwrap_err();
    assert!(matches!(err, RemoteError::InvalidState { .. }));
}
