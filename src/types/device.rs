use std::collections::HashMap;
use std::net::IpAddr;

/// TCP port of the pairing channel.
pub const PAIRING_PORT: u16 = 6467;

/// TCP port of the command channel.
pub const COMMAND_PORT: u16 = 6466;

/// A television discovered on the local network.
#[derive(Debug, Clone)]
pub struct TvDevice {
    /// mDNS instance name (e.g. "Living Room TV")
    pub name: String,

    /// Resolved IP address; the identity of the device
    pub ip: IpAddr,

    /// Port of the pairing channel (6467)
    pub pairing_port: u16,

    /// Port of the command channel, from the resolved service (6466)
    pub command_port: u16,

    /// Model name from the `mn` TXT key, if present
    pub model_name: Option<String>,

    /// Manufacturer from the `md` TXT key, if present
    pub manufacturer: Option<String>,

    /// Whether this address is in the paired-device set
    pub paired: bool,

    /// Raw TXT record data
    pub txt_records: HashMap<String, String>,
}

impl TvDevice {
    /// Create a device record for a known address.
    ///
    /// Useful for connecting to a television whose address is already known
    /// without running discovery.
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        Self {
            name: ip.to_string(),
            ip,
            pairing_port: PAIRING_PORT,
            command_port: COMMAND_PORT,
            model_name: None,
            manufacturer: None,
            paired: false,
            txt_records: HashMap::new(),
        }
    }

    /// Human-readable label: model name when known, instance name otherwise
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(&self.name)
    }
}

// A television is identified by its address; records from re-resolves of
// the same device compare equal.
impl PartialEq for TvDevice {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip
    }
}

impl Eq for TvDevice {}
