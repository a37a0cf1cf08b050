use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::error::RemoteError;
use crate::identity::ClientIdentity;

/// The client side of an established television connection.
pub type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Connection failures, split by phase so callers can classify.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The attempt did not complete within its deadline.
    #[error("connect timed out")]
    Timeout,

    /// TCP connect failed.
    #[error("TCP connect failed: {0}")]
    Tcp(#[source] std::io::Error),

    /// The TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Tls(#[source] std::io::Error),
}

impl ConnectError {
    /// Whether the failure is the television refusing our certificate.
    ///
    /// This is the signal that the television no longer trusts the stored
    /// identity and the address must be re-paired.
    #[must_use]
    pub fn is_certificate_rejected(&self) -> bool {
        match self {
            ConnectError::Tls(io) => io_is_certificate_rejected(io),
            _ => false,
        }
    }
}

/// Classify an I/O error as a certificate-rejection TLS alert.
pub(crate) fn io_is_certificate_rejected(err: &std::io::Error) -> bool {
    use rustls::AlertDescription;

    let Some(inner) = err.get_ref() else {
        return false;
    };
    let Some(tls) = inner.downcast_ref::<rustls::Error>() else {
        return false;
    };
    matches!(
        tls,
        rustls::Error::AlertReceived(
            AlertDescription::BadCertificate
                | AlertDescription::CertificateUnknown
                | AlertDescription::UnknownCA
                | AlertDescription::CertificateExpired
                | AlertDescription::CertificateRevoked
                | AlertDescription::AccessDenied
        )
    )
}

/// TLS connector bound to the client identity.
pub struct TlsTransport {
    connector: TlsConnector,
}

impl TlsTransport {
    /// Build the shared TLS context from the client identity.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Tls`] if the identity's key or certificate is
    /// rejected by the TLS stack.
    pub fn new(identity: &ClientIdentity) -> Result<Self, RemoteError> {
        // Install the ring crypto provider as the process-level default.
        // `install_default` fails if already installed; that error is ignored.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let certs = vec![CertificateDer::from(identity.certificate_der().to_vec())];
        let key = PrivateKeyDer::try_from(identity.private_key_der().to_vec()).map_err(|e| {
            RemoteError::Tls {
                message: format!("invalid private key: {e}"),
            }
        })?;

        // rustls presents the configured certificate on every client-auth
        // request regardless of the server's accepted-issuers list, which is
        // exactly what televisions need; they do not advertise any.
        let config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
            .with_client_auth_cert(certs, key)
            .map_err(|e| RemoteError::Tls {
                message: e.to_string(),
            })?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    /// Open a TLS connection to `ip:port` within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectError`] naming the phase that failed.
    pub async fn connect(
        &self,
        ip: IpAddr,
        port: u16,
        timeout: Duration,
    ) -> Result<TlsStream, ConnectError> {
        let addr = SocketAddr::new(ip, port);
        tracing::debug!("connecting to {addr}");

        let attempt = async {
            let tcp = TcpStream::connect(addr).await.map_err(ConnectError::Tcp)?;
            self.connector
                .connect(ServerName::from(ip), tcp)
                .await
                .map_err(ConnectError::Tls)
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Timeout),
        }
    }

    /// The server's leaf certificate from an established stream.
    #[must_use]
    pub fn peer_certificate(stream: &TlsStream) -> Option<Vec<u8>> {
        let (_, session) = stream.get_ref();
        session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| cert.as_ref().to_vec())
    }
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport").finish_non_exhaustive()
    }
}

/// Certificate verifier that accepts any server.
///
/// Televisions are self-signed; trust is established by the mutual-auth
/// binding made during pairing, not by PKI.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA1,
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
