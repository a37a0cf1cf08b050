//! A scriptable mock television.
//!
//! Listens on both protocol channels with a real RSA identity and mutual
//! TLS, mirroring what a television does: the pairing channel drives the
//! five-step handshake (with injectable failure statuses), and the command
//! channel opens with the configure/set-active exchange, records every
//! client message, and lets tests push pings and state broadcasts.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::identity::{ClientIdentity, IdentityStore};
use crate::pairing::secret::{pairing_secret, rsa_public_key_from_der};
use crate::wire::{
    self, DeviceConfigure, FEATURE_MASK, PairingMessage, PairingPayload, RemoteMessage,
    STATUS_BAD_CODE, STATUS_OK,
};

/// Configuration for the mock television.
#[derive(Debug, Clone)]
pub struct MockTvConfig {
    /// Low two bytes of the on-screen code; the first byte is derived
    /// from the certificates once a pairing client connects.
    pub code_suffix: [u8; 2],
    /// Reply to the opening pairing request with this status instead of OK.
    pub pairing_reply_status: Option<u32>,
    /// Refuse the client certificate during the TLS handshake.
    pub reject_client_cert: bool,
    /// Name used in the mock's own certificate.
    pub device_name: String,
}

impl Default for MockTvConfig {
    fn default() -> Self {
        Self {
            code_suffix: [0xE4, 0xD0],
            pairing_reply_status: None,
            reject_client_cert: false,
            device_name: "MockTV".to_string(),
        }
    }
}

#[derive(Default)]
struct PairingScript {
    displayed_code: Option<String>,
    expected_secret: Option<Vec<u8>>,
    paired: bool,
}

/// An in-process television.
pub struct MockTv {
    pairing_addr: SocketAddr,
    command_addr: SocketAddr,
    script: Arc<StdMutex<PairingScript>>,
    received: Arc<StdMutex<Vec<RemoteMessage>>>,
    received_tx: broadcast::Sender<RemoteMessage>,
    outbound: Arc<Mutex<Option<mpsc::Sender<RemoteMessage>>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl MockTv {
    /// Start a mock television with both channels listening on ephemeral
    /// localhost ports.
    ///
    /// # Errors
    ///
    /// Returns an error if a listener cannot be bound or the mock's own
    /// identity cannot be generated.
    pub async fn start(config: MockTvConfig) -> std::io::Result<Self> {
        let identity = IdentityStore::new(None, &config.device_name, "mock-tv")
            .get()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let acceptor = tls_acceptor(&identity, config.reject_client_cert)?;

        let pairing_listener = TcpListener::bind("127.0.0.1:0").await?;
        let command_listener = TcpListener::bind("127.0.0.1:0").await?;
        let pairing_addr = pairing_listener.local_addr()?;
        let command_addr = command_listener.local_addr()?;

        let script = Arc::new(StdMutex::new(PairingScript::default()));
        let received = Arc::new(StdMutex::new(Vec::new()));
        let (received_tx, _) = broadcast::channel(256);
        let outbound = Arc::new(Mutex::new(None));

        let mut tasks = Vec::new();

        {
            let acceptor = acceptor.clone();
            let script = script.clone();
            let identity = identity.clone();
            let config = config.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = pairing_listener.accept().await else {
                        break;
                    };
                    let acceptor = acceptor.clone();
                    let script = script.clone();
                    let identity = identity.clone();
                    let config = config.clone();
                    tokio::spawn(async move {
                        if let Ok(tls) = acceptor.accept(stream).await {
                            handle_pairing(tls, &identity, &config, &script).await;
                        }
                    });
                }
            }));
        }

        {
            let received = received.clone();
            let received_tx = received_tx.clone();
            let outbound = outbound.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = command_listener.accept().await else {
                        break;
                    };
                    match acceptor.accept(stream).await {
                        Ok(tls) => {
                            let (tx, rx) = mpsc::channel(64);
                            *outbound.lock().await = Some(tx);
                            handle_command(tls, &received, &received_tx, rx).await;
                        }
                        Err(e) => {
                            tracing::debug!("mock tv rejected handshake: {e}");
                        }
                    }
                }
            }));
        }

        Ok(Self {
            pairing_addr,
            command_addr,
            script,
            received,
            received_tx,
            outbound,
            tasks,
        })
    }

    /// Address of the pairing channel.
    #[must_use]
    pub fn pairing_addr(&self) -> SocketAddr {
        self.pairing_addr
    }

    /// Address of the command channel.
    #[must_use]
    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    /// The code currently "on screen", set once a pairing client reaches
    /// the configuration step.
    #[must_use]
    pub fn displayed_code(&self) -> Option<String> {
        self.script.lock().expect("script poisoned").displayed_code.clone()
    }

    /// Whether a pairing attempt completed successfully.
    #[must_use]
    pub fn paired(&self) -> bool {
        self.script.lock().expect("script poisoned").paired
    }

    /// All command-channel messages received from the client so far.
    #[must_use]
    pub fn received(&self) -> Vec<RemoteMessage> {
        self.received.lock().expect("received poisoned").clone()
    }

    /// Push a message to the connected command-channel client.
    ///
    /// # Panics
    ///
    /// Panics if no command-channel client is connected.
    pub async fn send(&self, message: RemoteMessage) {
        let sender = self
            .outbound
            .lock()
            .await
            .clone()
            .expect("no command client connected");
        sender.send(message).await.expect("command client gone");
    }

    /// Wait until a received message matches `predicate`.
    pub async fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(&RemoteMessage) -> bool,
    ) -> Option<RemoteMessage> {
        let mut rx = self.received_tx.subscribe();

        if let Some(found) = self
            .received
            .lock()
            .expect("received poisoned")
            .iter()
            .find(|m| predicate(m))
        {
            return Some(found.clone());
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let message = tokio::time::timeout_at(deadline, rx.recv()).await.ok()?;
            match message {
                Ok(message) if predicate(&message) => return Some(message),
                Ok(_) => {}
                Err(_) => return None,
            }
        }
    }

    /// Stop the mock and all its connections.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for MockTv {
    fn drop(&mut self) {
        self.stop();
    }
}

type ServerStream = tokio_rustls::server::TlsStream<TcpStream>;

async fn handle_pairing(
    mut stream: ServerStream,
    identity: &ClientIdentity,
    config: &MockTvConfig,
    script: &Arc<StdMutex<PairingScript>>,
) {
    let client_cert = stream
        .get_ref()
        .1
        .peer_certificates()
        .and_then(|certs| certs.first())
        .map(|cert| cert.as_ref().to_vec());

    loop {
        let Ok(frame) = wire::read_frame(&mut stream).await else {
            return;
        };
        let Ok(message) = PairingMessage::decode(&frame) else {
            return;
        };

        let reply = match message.payload {
            Some(PairingPayload::Request { .. }) => {
                let status = config.pairing_reply_status.unwrap_or(STATUS_OK);
                PairingMessage::reply(status, 11)
            }
            Some(PairingPayload::Options) => PairingMessage::reply(STATUS_OK, 21),
            Some(PairingPayload::Configuration) => {
                // Show the code: the first byte is the hash's first byte,
                // exactly how a television derives it.
                if let Some(client_cert) = &client_cert {
                    if let Ok((client_mod, client_exp)) = rsa_public_key_from_der(client_cert) {
                        let (server_mod, server_exp) = identity.public_key_bytes();
                        let [c1, c2] = config.code_suffix;
                        let hash = pairing_secret(
                            &client_mod,
                            &client_exp,
                            &server_mod,
                            &server_exp,
                            [0, c1, c2],
                        );
                        let mut script = script.lock().expect("script poisoned");
                        script.displayed_code =
                            Some(format!("{:02X}{c1:02X}{c2:02X}", hash[0]));
                        script.expected_secret = Some(hash.to_vec());
                    }
                }
                PairingMessage::reply(STATUS_OK, 31)
            }
            Some(PairingPayload::Secret { secret }) => {
                let expected = script
                    .lock()
                    .expect("script poisoned")
                    .expected_secret
                    .clone();
                let ok = expected.as_deref() == Some(secret.as_slice());
                if ok {
                    script.lock().expect("script poisoned").paired = true;
                }
                let status = if ok { STATUS_OK } else { STATUS_BAD_CODE };
                let reply = PairingMessage::reply(status, 41);
                let _ = wire::write_frame(&mut stream, &reply.encode()).await;
                return;
            }
            _ => PairingMessage::reply(STATUS_BAD_CODE, 0),
        };

        if wire::write_frame(&mut stream, &reply.encode()).await.is_err() {
            return;
        }
        if reply.status != STATUS_OK {
            return;
        }
    }
}

async fn handle_command(
    stream: ServerStream,
    received: &Arc<StdMutex<Vec<RemoteMessage>>>,
    received_tx: &broadcast::Sender<RemoteMessage>,
    mut outbound: mpsc::Receiver<RemoteMessage>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    // The television speaks first.
    let configure = RemoteMessage::Configure(DeviceConfigure {
        code1: FEATURE_MASK,
        device_info: None,
    });
    if wire::write_frame(&mut writer, &configure.encode()).await.is_err() {
        return;
    }

    let mut sent_set_active = false;

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { return };
                if wire::write_frame(&mut writer, &message.encode()).await.is_err() {
                    return;
                }
            }
            frame = wire::read_frame(&mut reader) => {
                let Ok(frame) = frame else { return };
                let Ok(message) = RemoteMessage::decode(&frame) else {
                    // a client must never put an unparseable frame on the wire
                    tracing::error!("mock tv received malformed frame");
                    return;
                };

                received.lock().expect("received poisoned").push(message.clone());
                let _ = received_tx.send(message.clone());

                // After the client's configure reply, activate the channel.
                if !sent_set_active && matches!(message, RemoteMessage::Configure(_)) {
                    sent_set_active = true;
                    let set_active = RemoteMessage::SetActive { active: FEATURE_MASK };
                    if wire::write_frame(&mut writer, &set_active.encode()).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

fn tls_acceptor(
    identity: &Arc<ClientIdentity>,
    reject_client_cert: bool,
) -> std::io::Result<TlsAcceptor> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cert = rustls::pki_types::CertificateDer::from(identity.certificate_der().to_vec());
    let key = rustls::pki_types::PrivateKeyDer::try_from(identity.private_key_der().to_vec())
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(Arc::new(MockClientCertVerifier {
            reject: reject_client_cert,
        }))
        .with_single_cert(vec![cert], key)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Accepts (or scriptably rejects) any client certificate, like a
/// television that trusts identities only through the pairing binding.
#[derive(Debug)]
struct MockClientCertVerifier {
    reject: bool,
}

impl rustls::server::danger::ClientCertVerifier for MockClientCertVerifier {
    fn root_hint_subjects(&self) -> &[rustls::DistinguishedName] {
        // televisions advertise no accepted issuers
        &[]
    }

    fn verify_client_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::server::danger::ClientCertVerified, rustls::Error> {
        if self.reject {
            return Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure,
            ));
        }
        Ok(rustls::server::danger::ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
