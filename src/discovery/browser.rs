use crate::error::RemoteError;
use crate::registry::PairedRegistry;
use crate::types::{PAIRING_PORT, RemoteConfig, TvDevice};
use futures::Stream;
use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Discovery events
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A new television was discovered
    Added(TvDevice),
    /// A known television re-resolved with new details
    Updated(TvDevice),
    /// A television's service disappeared
    Removed(IpAddr),
}

/// mDNS browser for discovering televisions
pub struct DeviceBrowser {
    registry: Option<Arc<PairedRegistry>>,
    timeout: Option<Duration>,
}

impl DeviceBrowser {
    /// Create a new browser; browsing stops after the configured discovery
    /// timeout unless [`DeviceBrowser::continuous`] is set.
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            registry: None,
            timeout: Some(config.discovery_timeout),
        }
    }

    /// Mark already-paired televisions using the registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<PairedRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the auto-stop timeout for this browse.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Browse until dropped instead of auto-stopping.
    #[must_use]
    pub fn continuous(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Start browsing for televisions.
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be initialized.
    pub fn browse(self) -> Result<impl Stream<Item = DiscoveryEvent>, RemoteError> {
        DeviceBrowserStream::new(self.registry, self.timeout)
    }
}

/// Stream implementation for television discovery
struct DeviceBrowserStream {
    mdns: mdns_sd::ServiceDaemon,
    stream: Box<dyn Stream<Item = mdns_sd::ServiceEvent> + Send + Unpin>,
    known_devices: HashMap<IpAddr, TvDevice>,
    fullname_map: HashMap<String, IpAddr>,
    registry: Option<Arc<PairedRegistry>>,
    deadline: Option<Pin<Box<tokio::time::Sleep>>>,
}

impl DeviceBrowserStream {
    fn new(
        registry: Option<Arc<PairedRegistry>>,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let mdns = mdns_sd::ServiceDaemon::new().map_err(|e| RemoteError::DiscoveryFailed {
            message: format!("Failed to create mDNS daemon: {e}"),
        })?;

        let receiver =
            mdns.browse(super::SERVICE_TYPE)
                .map_err(|e| RemoteError::DiscoveryFailed {
                    message: format!("Failed to browse: {e}"),
                })?;

        // mdns-sd resolves services one at a time on its own daemon thread,
        // which also satisfies the no-parallel-resolve constraint of the
        // host APIs this protocol was designed against.
        let stream = Box::new(receiver.into_stream());

        Ok(Self {
            mdns,
            stream,
            known_devices: HashMap::new(),
            fullname_map: HashMap::new(),
            registry,
            deadline: timeout.map(|t| Box::pin(tokio::time::sleep(t))),
        })
    }

    fn process_event(&mut self, event: mdns_sd::ServiceEvent) -> Option<DiscoveryEvent> {
        match event {
            mdns_sd::ServiceEvent::ServiceResolved(info) => self.handle_resolved(&info),
            mdns_sd::ServiceEvent::ServiceRemoved(_, fullname) => self.handle_removed(&fullname),
            _ => None,
        }
    }

    fn handle_resolved(&mut self, info: &mdns_sd::ServiceInfo) -> Option<DiscoveryEvent> {
        let device = resolve_device(info, self.registry.as_deref())?;
        let ip = device.ip;

        self.fullname_map
            .insert(info.get_fullname().to_string(), ip);

        let event = if self.known_devices.contains_key(&ip) {
            DiscoveryEvent::Updated(device.clone())
        } else {
            DiscoveryEvent::Added(device.clone())
        };
        self.known_devices.insert(ip, device);

        Some(event)
    }

    fn handle_removed(&mut self, fullname: &str) -> Option<DiscoveryEvent> {
        let ip = self.fullname_map.remove(fullname)?;
        self.known_devices.remove(&ip);
        Some(DiscoveryEvent::Removed(ip))
    }
}

impl Stream for DeviceBrowserStream {
    type Item = DiscoveryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(deadline) = &mut self.deadline {
            if deadline.as_mut().poll(cx).is_ready() {
                return Poll::Ready(None);
            }
        }

        loop {
            let event = match Pin::new(&mut self.stream).poll_next(cx) {
                Poll::Ready(Some(event)) => event,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };

            if let Some(discovery_event) = self.process_event(event) {
                return Poll::Ready(Some(discovery_event));
            }
        }
    }
}

impl Drop for DeviceBrowserStream {
    fn drop(&mut self) {
        let _ = self.mdns.stop_browse(super::SERVICE_TYPE);
        let _ = self.mdns.shutdown();
    }
}

/// Build a [`TvDevice`] from a resolved service.
///
/// Returns `None` when the service resolved without any address.
pub(super) fn resolve_device(
    info: &mdns_sd::ServiceInfo,
    registry: Option<&PairedRegistry>,
) -> Option<TvDevice> {
    let fullname = info.get_fullname();

    // Prefer IPv4; link-local IPv6 routinely fails to route back.
    let addresses = info.get_addresses();
    let ip = addresses
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addresses.iter().next())
        .copied()?;

    let txt_records: HashMap<String, String> = info
        .get_properties()
        .iter()
        .map(|prop| (prop.key().to_string(), prop.val_str().to_string()))
        .collect();

    // Instance name is the fullname up to the service type.
    let name = fullname
        .split('.')
        .next()
        .map_or_else(|| fullname.to_string(), ToString::to_string);

    let paired = registry.is_some_and(|registry| registry.is_paired(ip));

    Some(TvDevice {
        name,
        ip,
        pairing_port: PAIRING_PORT,
        command_port: info.get_port(),
        model_name: txt_records.get(super::TXT_MODEL_NAME).cloned(),
        manufacturer: txt_records.get(super::TXT_MANUFACTURER).cloned(),
        paired,
        txt_records,
    })
}
