//! Television discovery over multicast DNS.

mod browser;

pub use browser::{DeviceBrowser, DiscoveryEvent};

use crate::error::RemoteError;
use crate::types::TvDevice;
use futures::StreamExt;

/// mDNS service type advertised by Android TV Remote v2 televisions.
pub const SERVICE_TYPE: &str = "_androidtvremote2._tcp.local.";

/// TXT key carrying the model name.
pub const TXT_MODEL_NAME: &str = "mn";

/// TXT key carrying the manufacturer.
pub const TXT_MANUFACTURER: &str = "md";

/// Run a browse to completion and return the final list.
///
/// The browser's timeout bounds the scan; a continuous browser makes this
/// return only when the mDNS daemon shuts down.
///
/// # Errors
///
/// Returns an error if the mDNS daemon cannot be started.
pub async fn scan(browser: DeviceBrowser) -> Result<Vec<TvDevice>, RemoteError> {
    let mut stream = browser.browse()?;

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
            DiscoveryEvent::Removed(ip) => {
                devices.retain(|d| d.ip != ip);
            }
        }
    }

    Ok(devices)
}

#[cfg(test)]
mod tests;
