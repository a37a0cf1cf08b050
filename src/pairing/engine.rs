use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;

use crate::error::RemoteError;
use crate::identity::ClientIdentity;
use crate::net::{ConnectError, TlsStream, TlsTransport};
use crate::registry::PairedRegistry;
use crate::types::{RemoteConfig, TvDevice};
use crate::wire::{self, PairingMessage, STATUS_BAD_CODE, STATUS_OK};

use super::secret;

/// Service name sent in the opening pairing request.
const PAIRING_SERVICE_NAME: &str = "androidtvremote";

/// Settle time after a successful handshake. Televisions finalize
/// certificate pinning in this window; connecting earlier gets the next
/// command connection rejected with an unknown-certificate alert.
const PAIRING_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// State of one pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingState {
    /// Attempt created, not yet started
    Idle,
    /// Opening the TLS connection and driving steps 1–3
    Connecting,
    /// The television is showing the code; waiting for the user
    WaitingForCode,
    /// The secret is on its way to the television
    SubmittingCode,
    /// The television accepted the secret; the address is paired
    Success,
    /// Terminal failure
    Failed(String),
}

struct PairingIo {
    stream: TlsStream,
    server_cert: Vec<u8>,
}

/// One pairing attempt against one television.
///
/// An attempt is consumed by a single handshake: [`start`] drives the
/// exchange to the point where the television shows its code, then
/// [`submit_code`] completes or fails it. State is observable through
/// [`subscribe`].
///
/// [`start`]: PairingSession::start
/// [`submit_code`]: PairingSession::submit_code
/// [`subscribe`]: PairingSession::subscribe
pub struct PairingSession {
    tv: TvDevice,
    config: RemoteConfig,
    transport: Arc<TlsTransport>,
    identity: Arc<ClientIdentity>,
    registry: Arc<PairedRegistry>,
    state_tx: watch::Sender<PairingState>,
    cancel_tx: watch::Sender<bool>,
    io: Mutex<Option<PairingIo>>,
    code_deadline: std::sync::Mutex<Option<Instant>>,
}

impl PairingSession {
    /// Create a pairing attempt for `tv`.
    #[must_use]
    pub fn new(
        tv: TvDevice,
        config: RemoteConfig,
        transport: Arc<TlsTransport>,
        identity: Arc<ClientIdentity>,
        registry: Arc<PairedRegistry>,
    ) -> Self {
        let (state_tx, _) = watch::channel(PairingState::Idle);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            tv,
            config,
            transport,
            identity,
            registry,
            state_tx,
            cancel_tx,
            io: Mutex::new(None),
            code_deadline: std::sync::Mutex::new(None),
        }
    }

    /// Subscribe to state changes of this attempt.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PairingState> {
        self.state_tx.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> PairingState {
        self.state_tx.borrow().clone()
    }

    /// Drive the handshake until the television displays its code.
    ///
    /// On return the attempt is in `WaitingForCode`; the caller collects the
    /// 6-digit code from the user and passes it to
    /// [`PairingSession::submit_code`] within the configured code window.
    ///
    /// # Errors
    ///
    /// Any connection, TLS, status or timeout failure is terminal for the
    /// attempt and also reported through the state channel.
    pub async fn start(&self) -> Result<(), RemoteError> {
        self.set_state(PairingState::Connecting);

        match self.start_inner().await {
            Ok(()) => {
                self.set_state(PairingState::WaitingForCode);
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn start_inner(&self) -> Result<(), RemoteError> {
        let mut stream = self
            .transport
            .connect(
                self.tv.ip,
                self.tv.pairing_port,
                self.config.pairing_connect_timeout,
            )
            .await
            .map_err(|e| match e {
                ConnectError::Tls(io) => RemoteError::PairingHandshakeFailed {
                    message: io.to_string(),
                },
                other => RemoteError::PairingConnectFailed {
                    message: other.to_string(),
                    source: Some(Box::new(other)),
                },
            })?;

        let server_cert = TlsTransport::peer_certificate(&stream).ok_or_else(|| {
            RemoteError::PairingHandshakeFailed {
                message: "television presented no certificate".to_string(),
            }
        })?;

        let client_name = self.config.resolved_client_name();

        // Steps 1–3: request, option, configuration. Each must come back
        // with STATUS_OK before the television shows its code.
        self.exchange(
            &mut stream,
            &PairingMessage::request(PAIRING_SERVICE_NAME, &client_name),
        )
        .await?;
        self.exchange(&mut stream, &PairingMessage::options()).await?;
        self.exchange(&mut stream, &PairingMessage::configuration())
            .await?;

        *self.io.lock().await = Some(PairingIo {
            stream,
            server_cert,
        });
        *self.code_deadline.lock().expect("deadline poisoned") =
            Some(Instant::now() + self.config.pairing_code_timeout);

        Ok(())
    }

    /// Submit the code the television is displaying.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::PairingBadCode`] for malformed input, a first-byte
    ///   mismatch against the derived secret, or a 400 from the television.
    /// - [`RemoteError::PairingRejected`] for any other non-OK status.
    /// - [`RemoteError::PairingTimeout`] when the code window elapsed.
    pub async fn submit_code(&self, code: &str) -> Result<(), RemoteError> {
        // Malformed input never touches the wire.
        let code = match secret::parse_code(code) {
            Ok(code) => code,
            Err(e) => return Err(self.fail(e).await),
        };

        let expired = self
            .code_deadline
            .lock()
            .expect("deadline poisoned")
            .is_some_and(|deadline| Instant::now() > deadline);
        if expired {
            return Err(self.fail(RemoteError::PairingTimeout).await);
        }

        self.set_state(PairingState::SubmittingCode);

        match self.submit_inner(code).await {
            Ok(()) => {
                self.set_state(PairingState::Success);
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn submit_inner(&self, code: [u8; 3]) -> Result<(), RemoteError> {
        let mut io_guard = self.io.lock().await;
        let io = io_guard.as_mut().ok_or_else(|| RemoteError::InvalidState {
            message: "no pairing exchange in progress".to_string(),
        })?;

        let (client_modulus, client_exponent) = self.identity.public_key_bytes();
        let (server_modulus, server_exponent) = secret::rsa_public_key_from_der(&io.server_cert)?;

        let secret = secret::pairing_secret(
            &client_modulus,
            &client_exponent,
            &server_modulus,
            &server_exponent,
            code,
        );

        // The television chose c0 = H[0]; a mismatch means the user mistyped
        // or a certificate is wrong, and submission would be rejected anyway.
        if secret[0] != code[0] {
            return Err(RemoteError::PairingBadCode);
        }

        let stream = &mut io.stream;
        wire::write_frame(stream, &PairingMessage::secret(secret.to_vec()).encode()).await?;
        let reply = self.read_reply(stream).await?;

        match reply.status {
            STATUS_OK => {}
            STATUS_BAD_CODE => return Err(RemoteError::PairingBadCode),
            status => return Err(RemoteError::PairingRejected { status }),
        }

        self.registry.add(self.tv.ip)?;
        tracing::info!("paired with {}", self.tv.ip);

        // Give the television time to finalize certificate pinning before
        // anyone dials the command channel.
        tokio::time::sleep(PAIRING_SETTLE_DELAY).await;

        *io_guard = None;
        Ok(())
    }

    /// Cancel the attempt, closing its connection.
    ///
    /// An in-flight `start` or `submit_code` returns
    /// [`RemoteError::PairingCancelled`]; an idle wait is torn down directly.
    pub async fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
        if let Ok(mut io) = self.io.try_lock() {
            *io = None;
        }
        self.set_state(PairingState::Failed(
            RemoteError::PairingCancelled.to_string(),
        ));
    }

    /// Send one message and require an OK reply.
    async fn exchange(
        &self,
        stream: &mut TlsStream,
        message: &PairingMessage,
    ) -> Result<(), RemoteError> {
        wire::write_frame(stream, &message.encode()).await?;
        let reply = self.read_reply(stream).await?;
        match reply.status {
            STATUS_OK => Ok(()),
            status => Err(RemoteError::PairingRejected { status }),
        }
    }

    async fn read_reply(&self, stream: &mut TlsStream) -> Result<PairingMessage, RemoteError> {
        let mut cancelled = self.cancel_tx.subscribe();

        let frame = tokio::select! {
            frame = tokio::time::timeout(
                self.config.pairing_connect_timeout,
                wire::read_frame(stream),
            ) => frame.map_err(|_| RemoteError::PairingTimeout)??,
            _ = cancelled.wait_for(|cancelled| *cancelled) => {
                return Err(RemoteError::PairingCancelled);
            }
        };

        PairingMessage::decode(&frame).map_err(|e| RemoteError::PairingHandshakeFailed {
            message: format!("unparseable reply: {e}"),
        })
    }

    /// Record a terminal failure, tearing down the connection.
    async fn fail(&self, error: RemoteError) -> RemoteError {
        *self.io.lock().await = None;
        self.set_state(PairingState::Failed(error.to_string()));
        error
    }

    fn set_state(&self, state: PairingState) {
        let _ = self.state_tx.send(state);
    }
}
