//! The top-level remote-control client.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::discovery::{self, DeviceBrowser, DiscoveryEvent};
use crate::error::RemoteError;
use crate::identity::{ClientIdentity, IdentityStore};
use crate::net::TlsTransport;
use crate::pairing::PairingSession;
use crate::registry::{FileStore, MemoryStore, PairedRegistry, PairedStore};
use crate::session::SessionManager;
use crate::types::{RemoteConfig, TvDevice};

use futures::StreamExt;

const PAIRED_DEVICES_FILE: &str = "paired_devices.json";

/// Client for discovering, pairing with, and controlling Android TVs.
///
/// One instance owns the client identity, the paired-device registry, the
/// shared TLS context and the single command session; create it at
/// application start and pass it by reference.
///
/// # Example
///
/// ```rust,no_run
/// use atvremote::{RemoteClient, RemoteConfig, keycode};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), atvremote::RemoteError> {
/// let client = RemoteClient::new(RemoteConfig::default())?;
///
/// // Discover televisions
/// let devices = client.scan(Duration::from_secs(5)).await?;
///
/// if let Some(tv) = devices.first() {
///     // Pair (the television shows a 6-digit code)
///     let attempt = client.pair(tv);
///     attempt.start().await?;
///     attempt.submit_code("6AE4D0").await?;
///
///     // Send a key
///     client.session().send_key(tv.ip, keycode::DPAD_UP).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct RemoteClient {
    config: RemoteConfig,
    identity: Arc<ClientIdentity>,
    transport: Arc<TlsTransport>,
    registry: Arc<PairedRegistry>,
    session: SessionManager,
    devices_tx: watch::Sender<Vec<TvDevice>>,
    discovery_task: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteClient {
    /// Create a client, loading (or generating on first run) the persistent
    /// identity and paired-device set.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be generated or the stores
    /// cannot be read.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client_name = config.resolved_client_name();

        let identity_store =
            IdentityStore::new(config.storage_dir.as_deref(), &client_name, &config.app_id);
        let identity = identity_store.get()?;

        let transport = Arc::new(TlsTransport::new(&identity)?);

        let store: Box<dyn PairedStore> = match &config.storage_dir {
            Some(dir) => Box::new(FileStore::new(dir.join(PAIRED_DEVICES_FILE))),
            None => Box::new(MemoryStore::new()),
        };
        let registry = Arc::new(PairedRegistry::new(store)?);

        let session = SessionManager::new(config.clone(), transport.clone(), registry.clone());

        let (devices_tx, _) = watch::channel(Vec::new());

        Ok(Self {
            config,
            identity,
            transport,
            registry,
            session,
            devices_tx,
            discovery_task: Mutex::new(None),
        })
    }

    /// The command-channel engine.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The paired-device registry.
    #[must_use]
    pub fn registry(&self) -> &PairedRegistry {
        &self.registry
    }

    /// Scan for televisions for `timeout` and return the final list,
    /// with already-paired televisions flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be started.
    pub async fn scan(&self, timeout: Duration) -> Result<Vec<TvDevice>, RemoteError> {
        discovery::scan(
            DeviceBrowser::new(self.config.clone())
                .with_registry(self.registry.clone())
                .timeout(timeout),
        )
        .await
    }

    /// Start continuous background discovery feeding
    /// [`RemoteClient::watch_devices`]. A second call replaces the running
    /// browse.
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be started.
    pub async fn start_discovery(&self) -> Result<(), RemoteError> {
        let stream = DeviceBrowser::new(self.config.clone())
            .with_registry(self.registry.clone())
            .continuous()
            .browse()?;

        let devices_tx = self.devices_tx.clone();
        let task = tokio::spawn(async move {
            futures::pin_mut!(stream);
            let mut devices: Vec<TvDevice> = Vec::new();
            while let Some(event) = stream.next().await {
                match event {
                    DiscoveryEvent::Added(device) | DiscoveryEvent::Updated(device) => {
                        if let Some(existing) = devices.iter_mut().find(|d| **d == device) {
                            *existing = device;
                        } else {
                            devices.push(device);
                        }
                    }
                    DiscoveryEvent::Removed(ip) => devices.retain(|d| d.ip != ip),
                }
                let _ = devices_tx.send(devices.clone());
            }
        });

        if let Some(previous) = self.discovery_task.lock().await.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Stop background discovery; the last device list stays observable.
    pub async fn stop_discovery(&self) {
        if let Some(task) = self.discovery_task.lock().await.take() {
            task.abort();
        }
    }

    /// Watch the live device list maintained by background discovery.
    #[must_use]
    pub fn watch_devices(&self) -> watch::Receiver<Vec<TvDevice>> {
        self.devices_tx.subscribe()
    }

    /// Create a pairing attempt for `tv`.
    #[must_use]
    pub fn pair(&self, tv: &TvDevice) -> PairingSession {
        PairingSession::new(
            tv.clone(),
            self.config.clone(),
            self.transport.clone(),
            self.identity.clone(),
            self.registry.clone(),
        )
    }

    /// Forget a paired television, disconnecting first when it is the
    /// active session. Returns whether the address was paired.
    ///
    /// # Errors
    ///
    /// Returns an error if the paired set cannot be persisted.
    pub async fn unpair(&self, ip: IpAddr) -> Result<bool, RemoteError> {
        if self.session.state().await.is_connected_to(ip) {
            self.session.disconnect().await;
        }
        Ok(self.registry.remove(ip)?)
    }
}
