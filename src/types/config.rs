use std::path::PathBuf;
use std::time::Duration;

/// Configuration for client behavior
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Directory for the identity keystore and paired-device set
    /// (None = in-memory only, nothing survives the process)
    pub storage_dir: Option<PathBuf>,

    /// Client name shown on the television during pairing
    /// (None = local hostname)
    pub client_name: Option<String>,

    /// Organization written into the identity certificate subject
    pub app_id: String,

    /// Timeout for a discovery browse before it stops on its own
    /// (default: 20 seconds)
    pub discovery_timeout: Duration,

    /// Timeout for opening the pairing connection (default: 10 seconds)
    pub pairing_connect_timeout: Duration,

    /// How long the user has to read and type the on-screen code
    /// (default: 5 minutes)
    pub pairing_code_timeout: Duration,

    /// Timeout per command-channel connect attempt (default: 5 seconds)
    pub connect_timeout: Duration,

    /// Number of command-channel connect attempts (default: 3)
    pub connect_attempts: u32,

    /// Base delay between connect attempts, growing linearly
    /// (default: 1 second, so 1s then 2s)
    pub connect_backoff: Duration,

    /// Pause between disconnect and redial on `reconnect`
    /// (default: 500ms)
    pub reconnect_delay: Duration,

    /// Command-channel port (default: 6466; overridable for
    /// port-forwarded setups and tests)
    pub command_port: u16,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            client_name: None,
            app_id: "atvremote".to_string(),
            discovery_timeout: Duration::from_secs(20),
            pairing_connect_timeout: Duration::from_secs(10),
            pairing_code_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(5),
            connect_attempts: 3,
            connect_backoff: Duration::from_secs(1),
            reconnect_delay: Duration::from_millis(500),
            command_port: super::device::COMMAND_PORT,
        }
    }
}

impl RemoteConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> RemoteConfigBuilder {
        RemoteConfigBuilder::default()
    }

    /// Resolve the advertised client name, falling back to the hostname
    #[must_use]
    pub fn resolved_client_name(&self) -> String {
        if let Some(name) = &self.client_name {
            return name.clone();
        }
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "atvremote".to_string())
    }
}

/// Builder for [`RemoteConfig`]
#[derive(Debug, Clone, Default)]
pub struct RemoteConfigBuilder {
    config: RemoteConfig,
}

impl RemoteConfigBuilder {
    /// Set the storage directory for persistent state
    #[must_use]
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = Some(dir.into());
        self
    }

    /// Set the client name shown on the television
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = Some(name.into());
        self
    }

    /// Set the organization in the certificate subject
    #[must_use]
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = app_id.into();
        self
    }

    /// Set the discovery auto-stop timeout
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery_timeout = timeout;
        self
    }

    /// Set the pairing connect timeout
    #[must_use]
    pub fn pairing_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.pairing_connect_timeout = timeout;
        self
    }

    /// Set the code-entry window
    #[must_use]
    pub fn pairing_code_timeout(mut self, timeout: Duration) -> Self {
        self.config.pairing_code_timeout = timeout;
        self
    }

    /// Set the per-attempt command connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the number of connect attempts
    #[must_use]
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.config.connect_attempts = attempts;
        self
    }

    /// Override the command-channel port
    #[must_use]
    pub fn command_port(mut self, port: u16) -> Self {
        self.config.command_port = port;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> RemoteConfig {
        self.config
    }
}
