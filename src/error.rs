//! Error types

use crate::registry::StorageError;
use crate::wire::WireError;

/// Main error type for remote-control operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// mDNS browsing could not be started.
    #[error("discovery failed: {message}")]
    DiscoveryFailed {
        /// What went wrong
        message: String,
    },

    /// A discovered service could not be resolved.
    #[error("failed to resolve service {service}: {message}")]
    ResolveFailed {
        /// The mDNS service instance that failed to resolve
        service: String,
        /// What went wrong
        message: String,
    },

    /// The TCP/TLS connection for a pairing attempt could not be opened.
    #[error("pairing connection failed: {message}")]
    PairingConnectFailed {
        /// What went wrong
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The pairing exchange broke down mid-handshake.
    #[error("pairing handshake failed: {message}")]
    PairingHandshakeFailed {
        /// What went wrong
        message: String,
    },

    /// The television answered a pairing step with a non-OK status.
    #[error("pairing rejected by television (status {status})")]
    PairingRejected {
        /// The status carried in the television's reply
        status: u32,
    },

    /// The submitted on-screen code was wrong.
    #[error("pairing code rejected")]
    PairingBadCode,

    /// The pairing attempt was cancelled by the caller.
    #[error("pairing cancelled")]
    PairingCancelled,

    /// The pairing attempt timed out waiting for the television or the user.
    #[error("pairing timed out")]
    PairingTimeout,

    /// The command channel refuses to dial an unpaired television.
    #[error("television {ip} is not paired")]
    NotPaired {
        /// The target ip address
        ip: String,
    },

    /// The television no longer trusts the stored client identity.
    ///
    /// The ip has already been removed from the paired set; the user must
    /// pair again.
    #[error("television {ip} rejected the client certificate")]
    CertificateRejected {
        /// The target ip address
        ip: String,
    },

    /// The background reader observed EOF or an I/O error.
    #[error("connection lost: {message}")]
    ConnectionLost {
        /// What went wrong
        message: String,
    },

    /// An outbound send failed after the one allowed retry.
    #[error("send failed: {message}")]
    SendFailed {
        /// What went wrong
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation was attempted in the wrong state.
    #[error("invalid state: {message}")]
    InvalidState {
        /// What went wrong
        message: String,
    },

    /// The client identity could not be generated or used.
    #[error("identity error: {message}")]
    Identity {
        /// What went wrong
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Building the TLS configuration failed.
    #[error("TLS configuration error: {message}")]
    Tls {
        /// What went wrong
        message: String,
    },

    /// Persistent storage failed.
    #[error("storage error")]
    Storage(#[from] StorageError),

    /// A wire message could not be encoded or decoded.
    #[error("wire error")]
    Wire(#[from] WireError),

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// Check if the operation can be retried without user intervention.
    ///
    /// Certificate rejection and bad codes need the user (re-pair, re-type);
    /// lost connections and failed sends can simply be tried again.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RemoteError::DiscoveryFailed { .. }
                | RemoteError::ResolveFailed { .. }
                | RemoteError::ConnectionLost { .. }
                | RemoteError::SendFailed { .. }
                | RemoteError::PairingConnectFailed { .. }
                | RemoteError::PairingTimeout
                | RemoteError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RemoteError;

    #[test]
    fn recoverable_classification() {
        assert!(
            RemoteError::ConnectionLost {
                message: "eof".to_string()
            }
            .is_recoverable()
        );
        assert!(
            !RemoteError::CertificateRejected {
                ip: "192.0.2.10".to_string()
            }
            .is_recoverable()
        );
        assert!(!RemoteError::PairingBadCode.is_recoverable());
        assert!(
            !RemoteError::NotPaired {
                ip: "192.0.2.10".to_string()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn display_names_the_target() {
        let err = RemoteError::NotPaired {
            ip: "192.0.2.10".to_string(),
        };
        assert_eq!(err.to_string(), "television 192.0.2.10 is not paired");
    }
}
