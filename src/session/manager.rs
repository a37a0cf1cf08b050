//! Command-channel session engine.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::io::ReadHalf;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::state::{ConnectionEvent, ConnectionState, DisconnectReason, RemoteState};
use crate::error::RemoteError;
use crate::net::{TlsStream, TlsTransport, io_is_certificate_rejected};
use crate::registry::PairedRegistry;
use crate::types::RemoteConfig;
use crate::wire::{
    self, DeviceConfigure, DeviceInfo, EditInfo, FEATURE_MASK, ImeBatchEdit, KeyDirection,
    RemoteMessage, TextFieldStatus, WireError,
};

const CLIENT_PACKAGE_NAME: &str = "atvremote";
const CLIENT_APP_VERSION: &str = "1.0.0";

/// Shared half of the session: everything both the caller-facing writer
/// side and the reader task touch. The reader answers pings and configures
/// through the same output mutex the caller's sends use, and the caller
/// reads the IME counters the reader last stored.
struct SessionCore {
    state: RwLock<ConnectionState>,
    writer: Mutex<Option<tokio::io::WriteHalf<TlsStream>>>,
    ime_counter: AtomicU32,
    ime_field_counter: AtomicU32,
    remote_state_tx: watch::Sender<RemoteState>,
    event_tx: broadcast::Sender<ConnectionEvent>,
    client_name: String,
}

impl SessionCore {
    async fn set_state(&self, new: ConnectionState) {
        let old = {
            let mut state = self.state.write().await;
            let old = state.clone();
            *state = new.clone();
            old
        };
        if old != new {
            self.send_event(ConnectionEvent::StateChanged { old, new });
        }
    }

    fn send_event(&self, event: ConnectionEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Write one message under the output mutex.
    ///
    /// All outbound traffic, caller sends and reader responses alike -
    /// goes through here, so frames never interleave.
    async fn write_message(&self, message: &RemoteMessage) -> Result<(), WireError> {
        let mut writer = self.writer.lock().await;
        let Some(stream) = writer.as_mut() else {
            return Err(WireError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "command channel is not connected",
            )));
        };
        wire::write_frame(stream, &message.encode()).await
    }

    /// Answer the television; a failed response is logged, the reader's next
    /// read surfaces the broken connection.
    async fn reply(&self, message: &RemoteMessage) {
        if let Err(e) = self.write_message(message).await {
            tracing::warn!("failed to answer television: {e}");
        }
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            model: self.client_name.clone(),
            vendor: CLIENT_PACKAGE_NAME.to_string(),
            unknown1: 1,
            unknown2: "1".to_string(),
            package_name: CLIENT_PACKAGE_NAME.to_string(),
            app_version: CLIENT_APP_VERSION.to_string(),
        }
    }

    /// Dispatch one inbound frame. Malformed messages are logged and
    /// skipped, never fatal.
    async fn handle_frame(&self, frame: &[u8]) {
        let message = match RemoteMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("skipping malformed message: {e}");
                return;
            }
        };

        match message {
            RemoteMessage::Configure(configure) => {
                tracing::debug!("television announced capabilities (code1={})", configure.code1);
                self.reply(&RemoteMessage::Configure(DeviceConfigure {
                    code1: FEATURE_MASK,
                    device_info: Some(self.device_info()),
                }))
                .await;
            }
            RemoteMessage::SetActive { .. } => {
                self.reply(&RemoteMessage::SetActive {
                    active: FEATURE_MASK,
                })
                .await;
            }
            RemoteMessage::PingRequest { val1 } => {
                self.reply(&RemoteMessage::PingResponse { val1 }).await;
            }
            RemoteMessage::ImeKeyInject { app_package } => {
                if let Some(package) = app_package {
                    self.remote_state_tx
                        .send_modify(|state| state.current_app = Some(package));
                }
            }
            RemoteMessage::ImeBatchEdit(edit) => {
                self.ime_counter.store(edit.ime_counter, Ordering::SeqCst);
                self.ime_field_counter
                    .store(edit.field_counter, Ordering::SeqCst);
            }
            RemoteMessage::Start { started } => {
                self.remote_state_tx
                    .send_modify(|state| state.powered = Some(started));
            }
            RemoteMessage::SetVolume(volume) => {
                self.remote_state_tx
                    .send_modify(|state| state.volume = Some(volume));
            }
            other => {
                tracing::trace!("ignoring inbound message: {other:?}");
            }
        }
    }

    /// The reader observed EOF or an I/O error.
    async fn connection_lost(&self, message: &str) {
        tracing::warn!("command channel lost: {message}");
        *self.writer.lock().await = None;

        let previous = self.state.read().await.clone();
        self.set_state(ConnectionState::Error("Connection lost".to_string()))
            .await;
        if let ConnectionState::Connected(ip) = previous {
            self.send_event(ConnectionEvent::Disconnected {
                ip,
                reason: DisconnectReason::ConnectionLost(message.to_string()),
            });
        }
        self.send_event(ConnectionEvent::Error {
            message: message.to_string(),
            recoverable: true,
        });
    }
}

/// Reader task: consumes frames until shutdown or a connection fault.
/// Cancellation and socket close both end in a clean exit.
async fn reader_loop(
    core: Arc<SessionCore>,
    mut reader: ReadHalf<TlsStream>,
    mut shutdown: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            frame = wire::read_frame(&mut reader) => match frame {
                Ok(frame) => core.handle_frame(&frame).await,
                Err(e) => {
                    core.connection_lost(&e.to_string()).await;
                    break;
                }
            }
        }
    }
}

struct ReaderHandle {
    ip: IpAddr,
    shutdown: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// The persistent command channel to a paired television.
///
/// One session exists per client; connecting to a second television tears
/// down the first. The engine answers the television's configure, activate
/// and keep-alive traffic on its own, and exposes volume/power/foreground
/// state through [`SessionManager::watch_state`].
pub struct SessionManager {
    config: RemoteConfig,
    transport: Arc<TlsTransport>,
    registry: Arc<PairedRegistry>,
    core: Arc<SessionCore>,
    reader: Mutex<Option<ReaderHandle>>,
}

impl SessionManager {
    /// Create a session engine.
    #[must_use]
    pub fn new(
        config: RemoteConfig,
        transport: Arc<TlsTransport>,
        registry: Arc<PairedRegistry>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (remote_state_tx, _) = watch::channel(RemoteState::default());
        let client_name = config.resolved_client_name();

        Self {
            config,
            transport,
            registry,
            core: Arc::new(SessionCore {
                state: RwLock::new(ConnectionState::Disconnected),
                writer: Mutex::new(None),
                ime_counter: AtomicU32::new(0),
                ime_field_counter: AtomicU32::new(0),
                remote_state_tx,
                event_tx,
                client_name,
            }),
            reader: Mutex::new(None),
        }
    }

    /// Get the current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.core.state.read().await.clone()
    }

    /// Subscribe to connection events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.core.event_tx.subscribe()
    }

    /// Watch the television state (volume, power, foreground app).
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<RemoteState> {
        self.core.remote_state_tx.subscribe()
    }

    /// Connect the command channel to a paired television.
    ///
    /// Up to the configured number of attempts are made with linear
    /// backoff. A certificate rejection unpairs the address and aborts
    /// immediately; retrying cannot help until the user pairs again.
    ///
    /// # Errors
    ///
    /// [`RemoteError::NotPaired`] without opening a socket,
    /// [`RemoteError::CertificateRejected`] on an unknown-certificate TLS
    /// alert, [`RemoteError::ConnectionLost`] when all attempts fail.
    pub async fn connect(&self, ip: IpAddr) -> Result<(), RemoteError> {
        if !self.registry.is_paired(ip) {
            return Err(RemoteError::NotPaired { ip: ip.to_string() });
        }

        // Only one command session exists at a time.
        self.teardown(DisconnectReason::Replaced).await;
        self.core.set_state(ConnectionState::Connecting).await;

        let mut last_error = None;
        for attempt in 0..self.config.connect_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.connect_backoff * attempt).await;
            }

            match self
                .transport
                .connect(ip, self.config.command_port, self.config.connect_timeout)
                .await
            {
                Ok(stream) => return self.bring_up(ip, stream).await,
                Err(e) if e.is_certificate_rejected() => {
                    return Err(self.certificate_rejected(ip).await);
                }
                Err(e) => {
                    tracing::warn!("connect attempt {} to {ip} failed: {e}", attempt + 1);
                    last_error = Some(e);
                }
            }
        }

        let message = last_error.map_or_else(
            || "no connect attempts configured".to_string(),
            |e| e.to_string(),
        );
        self.core
            .set_state(ConnectionState::Error(message.clone()))
            .await;
        self.core.send_event(ConnectionEvent::Error {
            message: message.clone(),
            recoverable: true,
        });
        Err(RemoteError::ConnectionLost { message })
    }

    async fn bring_up(&self, ip: IpAddr, stream: TlsStream) -> Result<(), RemoteError> {
        let (mut read_half, write_half) = tokio::io::split(stream);
        *self.core.writer.lock().await = Some(write_half);

        // The television speaks first (remote_configure). Handling the first
        // frame inline lets a certificate rejection surface from connect
        // itself: under TLS 1.3 the server only evaluates the client
        // certificate after our handshake has already returned.
        match tokio::time::timeout(
            self.config.connect_timeout,
            wire::read_frame(&mut read_half),
        )
        .await
        {
            Ok(Ok(frame)) => self.core.handle_frame(&frame).await,
            Ok(Err(WireError::Io(io))) if io_is_certificate_rejected(&io) => {
                *self.core.writer.lock().await = None;
                return Err(self.certificate_rejected(ip).await);
            }
            Ok(Err(e)) => {
                *self.core.writer.lock().await = None;
                let message = e.to_string();
                self.core
                    .set_state(ConnectionState::Error(message.clone()))
                    .await;
                return Err(RemoteError::ConnectionLost { message });
            }
            Err(_) => {
                // television said nothing yet; the reader picks it up
            }
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(reader_loop(self.core.clone(), read_half, shutdown_rx));
        *self.reader.lock().await = Some(ReaderHandle {
            ip,
            shutdown: shutdown_tx,
            task,
        });

        self.core.set_state(ConnectionState::Connected(ip)).await;
        self.core.send_event(ConnectionEvent::Connected { ip });
        Ok(())
    }

    /// Unpair an address the television rejected and report the terminal
    /// error.
    async fn certificate_rejected(&self, ip: IpAddr) -> RemoteError {
        if let Err(e) = self.registry.remove(ip) {
            tracing::error!("failed to unpair {ip}: {e}");
        }
        let message = format!("television {ip} rejected the client certificate");
        tracing::warn!("{message}; re-pairing required");
        self.core
            .set_state(ConnectionState::Error(message.clone()))
            .await;
        self.core.send_event(ConnectionEvent::Error {
            message,
            recoverable: false,
        });
        RemoteError::CertificateRejected { ip: ip.to_string() }
    }

    /// Disconnect and return to `Disconnected`.
    pub async fn disconnect(&self) {
        self.teardown(DisconnectReason::UserRequested).await;
        self.core.set_state(ConnectionState::Disconnected).await;
    }

    /// Disconnect, pause briefly, and dial again.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SessionManager::connect`].
    pub async fn reconnect(&self, ip: IpAddr) -> Result<(), RemoteError> {
        self.disconnect().await;
        tokio::time::sleep(self.config.reconnect_delay).await;
        self.connect(ip).await
    }

    async fn teardown(&self, reason: DisconnectReason) {
        let handle = self.reader.lock().await.take();
        *self.core.writer.lock().await = None;
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(()).await;
            let _ = handle.task.await;
            // a session the reader already reported lost gets no second
            // Disconnected event
            if self.core.state.read().await.is_connected() {
                self.core.send_event(ConnectionEvent::Disconnected {
                    ip: handle.ip,
                    reason,
                });
            }
        }
    }

    /// Send a key press (press and release in one message).
    ///
    /// Connects first when not already connected to `ip`. A send that hits
    /// a broken connection tears down, reconnects, and retries exactly once.
    ///
    /// # Errors
    ///
    /// [`RemoteError::NotPaired`] without opening a socket, the connect
    /// errors of [`SessionManager::connect`], or
    /// [`RemoteError::SendFailed`] after the retry.
    pub async fn send_key(&self, ip: IpAddr, key_code: u32) -> Result<(), RemoteError> {
        self.ensure_connected(ip).await?;
        self.send_with_retry(
            ip,
            &RemoteMessage::KeyInject {
                key_code,
                direction: KeyDirection::Short,
            },
        )
        .await
    }

    /// Type text into the focused field on the television.
    ///
    /// Requires a focused text field; the message echoes the IME counters
    /// the television last sent, which the television uses to validate the
    /// edit. A trailing space may be appended by the caller to commit.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SessionManager::send_key`].
    pub async fn send_text(&self, ip: IpAddr, text: &str) -> Result<(), RemoteError> {
        self.ensure_connected(ip).await?;

        let position = u32::try_from(text.len())
            .unwrap_or(u32::MAX)
            .saturating_sub(1);
        let message = RemoteMessage::ImeBatchEdit(ImeBatchEdit {
            ime_counter: self.core.ime_counter.load(Ordering::SeqCst),
            field_counter: self.core.ime_field_counter.load(Ordering::SeqCst),
            edit_info: Some(EditInfo {
                insert: 1,
                text_field_status: Some(TextFieldStatus {
                    start: position,
                    end: position,
                    value: text.to_string(),
                }),
            }),
        });
        self.send_with_retry(ip, &message).await
    }

    async fn ensure_connected(&self, ip: IpAddr) -> Result<(), RemoteError> {
        if !self.registry.is_paired(ip) {
            return Err(RemoteError::NotPaired { ip: ip.to_string() });
        }
        if !self.core.state.read().await.is_connected_to(ip) {
            self.connect(ip).await?;
        }
        Ok(())
    }

    async fn send_with_retry(
        &self,
        ip: IpAddr,
        message: &RemoteMessage,
    ) -> Result<(), RemoteError> {
        let Err(first) = self.core.write_message(message).await else {
            return Ok(());
        };

        tracing::warn!("send to {ip} failed ({first}); reconnecting for one retry");
        self.reconnect(ip).await?;

        self.core
            .write_message(message)
            .await
            .map_err(|e| RemoteError::SendFailed {
                message: e.to_string(),
                source: Some(Box::new(e)),
            })
    }
}
