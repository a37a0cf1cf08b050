//! Long-lived client identity.
//!
//! Televisions pin the TLS identity a client paired with, so exactly one
//! key pair and certificate exist per installation: generated lazily on
//! first need, persisted, and reused for every pairing and command session
//! afterwards. Losing the store means every television must be re-paired.

use rsa::RsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RemoteError;
use crate::fs_utils::write_atomic;

const IDENTITY_FILE: &str = "identity.json";
const RSA_BITS: usize = 2048;
const VALIDITY_DAYS: i64 = 3650;

/// The client's key pair and self-signed certificate.
///
/// The certificate is RSA-2048/SHA-256 with a ten-year validity, key usage
/// digitalSignature|keyEncipherment (critical) and extended key usage
/// clientAuth only; adding serverAuth breaks command-channel acceptance on
/// some televisions.
pub struct ClientIdentity {
    private_key: RsaPrivateKey,
    key_pkcs8_der: Vec<u8>,
    certificate_der: Vec<u8>,
}

impl ClientIdentity {
    /// The certificate in DER form
    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The private key as PKCS#8 DER
    #[must_use]
    pub fn private_key_der(&self) -> &[u8] {
        &self.key_pkcs8_der
    }

    /// The RSA public key's big-endian magnitude bytes: `(modulus, exponent)`
    #[must_use]
    pub fn public_key_bytes(&self) -> (Vec<u8>, Vec<u8>) {
        let public = self.private_key.to_public_key();
        (public.n().to_bytes_be(), public.e().to_bytes_be())
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("certificate_der_len", &self.certificate_der.len())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct IdentityRecord {
    key_pkcs8_der: Vec<u8>,
    certificate_der: Vec<u8>,
}

/// Loads or generates the single client identity.
pub struct IdentityStore {
    path: Option<PathBuf>,
    client_name: String,
    app_id: String,
    cached: Mutex<Option<Arc<ClientIdentity>>>,
}

impl IdentityStore {
    /// Create a store rooted at `storage_dir` (None = never persisted).
    #[must_use]
    pub fn new(storage_dir: Option<&Path>, client_name: &str, app_id: &str) -> Self {
        Self {
            path: storage_dir.map(|dir| dir.join(IDENTITY_FILE)),
            client_name: client_name.to_string(),
            app_id: app_id.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Get the identity, loading or generating it on first call.
    ///
    /// A corrupt store is not fatal: the old identity is unrecoverable, so a
    /// fresh one is generated (and a warning emitted); every television
    /// must then be paired again.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Identity`] if generation itself fails.
    pub fn get(&self) -> Result<Arc<ClientIdentity>, RemoteError> {
        let mut cached = self.cached.lock().expect("identity cache poisoned");
        if let Some(identity) = cached.as_ref() {
            return Ok(identity.clone());
        }

        let identity = Arc::new(self.load_or_generate()?);
        *cached = Some(identity.clone());
        Ok(identity)
    }

    fn load_or_generate(&self) -> Result<ClientIdentity, RemoteError> {
        if let Some(path) = &self.path {
            if path.exists() {
                match Self::load(path) {
                    Ok(identity) => return Ok(identity),
                    Err(e) => {
                        tracing::warn!(
                            "stored identity unreadable ({e}); generating a new one; \
                             paired televisions will require re-pairing"
                        );
                    }
                }
            }
        }

        let identity = generate(&self.client_name, &self.app_id)?;

        if let Some(path) = &self.path {
            let record = IdentityRecord {
                key_pkcs8_der: identity.key_pkcs8_der.clone(),
                certificate_der: identity.certificate_der.clone(),
            };
            let json = serde_json::to_vec(&record).map_err(|e| RemoteError::Identity {
                message: "failed to serialize identity".to_string(),
                source: Some(Box::new(e)),
            })?;
            write_atomic(path, &json).map_err(|e| RemoteError::Identity {
                message: format!("failed to persist identity to {}", path.display()),
                source: Some(Box::new(e)),
            })?;
        }

        Ok(identity)
    }

    fn load(path: &Path) -> Result<ClientIdentity, RemoteError> {
        let json = std::fs::read(path).map_err(|e| RemoteError::Identity {
            message: format!("failed to read {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        let record: IdentityRecord =
            serde_json::from_slice(&json).map_err(|e| RemoteError::Identity {
                message: "stored identity is corrupt".to_string(),
                source: Some(Box::new(e)),
            })?;
        let private_key =
            RsaPrivateKey::from_pkcs8_der(&record.key_pkcs8_der).map_err(|e| {
                RemoteError::Identity {
                    message: "stored private key is corrupt".to_string(),
                    source: Some(Box::new(e)),
                }
            })?;
        Ok(ClientIdentity {
            private_key,
            key_pkcs8_der: record.key_pkcs8_der,
            certificate_der: record.certificate_der,
        })
    }
}

/// Generate a fresh RSA-2048 identity with a self-signed certificate.
fn generate(client_name: &str, app_id: &str) -> Result<ClientIdentity, RemoteError> {
    tracing::debug!("generating RSA-{RSA_BITS} client identity");

    let private_key =
        RsaPrivateKey::new(&mut rand::thread_rng(), RSA_BITS).map_err(|e| {
            RemoteError::Identity {
                message: "RSA key generation failed".to_string(),
                source: Some(Box::new(e)),
            }
        })?;

    let key_pkcs8_der = private_key
        .to_pkcs8_der()
        .map_err(|e| RemoteError::Identity {
            message: "PKCS#8 encoding failed".to_string(),
            source: Some(Box::new(e)),
        })?
        .as_bytes()
        .to_vec();

    let certificate_der = self_signed_certificate(&key_pkcs8_der, client_name, app_id)?;

    Ok(ClientIdentity {
        private_key,
        key_pkcs8_der,
        certificate_der,
    })
}

fn self_signed_certificate(
    key_pkcs8_der: &[u8],
    client_name: &str,
    app_id: &str,
) -> Result<Vec<u8>, RemoteError> {
    let identity_err = |message: &str| {
        let message = message.to_string();
        move |e: rcgen::Error| RemoteError::Identity {
            message,
            source: Some(Box::new(e)),
        }
    };

    let key_der = rustls::pki_types::PrivateKeyDer::Pkcs8(
        rustls::pki_types::PrivatePkcs8KeyDer::from(key_pkcs8_der),
    );
    let key_pair = rcgen::KeyPair::from_der_and_sign_algo(&key_der, &rcgen::PKCS_RSA_SHA256)
        .map_err(identity_err("key pair rejected by certificate builder"))?;

    let mut params = rcgen::CertificateParams::new(Vec::<String>::new())
        .map_err(identity_err("invalid certificate parameters"))?;

    let mut dn = rcgen::DistinguishedName::new();
    dn.push(
        rcgen::DnType::CommonName,
        format!("AndroidTvRemote_{}", safe_device_name(client_name)),
    );
    dn.push(rcgen::DnType::OrganizationName, app_id);
    dn.push(rcgen::DnType::CountryName, "US");
    params.distinguished_name = dn;

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(VALIDITY_DAYS);

    #[allow(clippy::cast_possible_truncation)]
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    params.serial_number = Some(rcgen::SerialNumber::from(millis.to_be_bytes().to_vec()));

    params.key_usages = vec![
        rcgen::KeyUsagePurpose::DigitalSignature,
        rcgen::KeyUsagePurpose::KeyEncipherment,
    ];
    // clientAuth only: serverAuth here breaks command-channel acceptance on
    // some televisions.
    params.extended_key_usages = vec![rcgen::ExtendedKeyUsagePurpose::ClientAuth];

    let certificate = params
        .self_signed(&key_pair)
        .map_err(identity_err("certificate signing failed"))?;

    Ok(certificate.der().to_vec())
}

/// Restrict a device name to characters safe inside a certificate CN.
fn safe_device_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
