//! Pairing-secret derivation.
//!
//! The secret binds both TLS identities to the code the television shows:
//!
//! ```text
//! H = SHA-256(client_mod || client_exp || server_mod || server_exp || c1 || c2)
//! ```
//!
//! where each RSA integer is rendered the way the reference client does -
//! big-endian magnitude, uppercase hex, left-padded to an even number of
//! digits, re-parsed to bytes, and `c0 c1 c2` are the three bytes of the
//! 6-hex-digit code. The television picks `c0 = H[0]`, so a mismatched
//! first byte means a mistyped code or a wrong certificate.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use x509_parser::prelude::{FromDer as _, X509Certificate};

use crate::error::RemoteError;

/// Parse a user-entered code into its three bytes.
///
/// # Errors
///
/// Returns [`RemoteError::PairingBadCode`] unless the input is exactly six
/// hex digits (case-insensitive).
pub(crate) fn parse_code(code: &str) -> Result<[u8; 3], RemoteError> {
    let trimmed = code.trim();
    if trimmed.len() != 6 {
        return Err(RemoteError::PairingBadCode);
    }
    let bytes = hex::decode(trimmed).map_err(|_| RemoteError::PairingBadCode)?;
    Ok([bytes[0], bytes[1], bytes[2]])
}

/// Render an RSA integer through the reference client's hex round trip.
///
/// Equivalent to stripping leading zero octets (a DER sign byte included),
/// which is what `BigInteger.toString(16)` followed by an even-length pad
/// and re-parse produces.
fn hex_roundtrip(bytes: &[u8]) -> Vec<u8> {
    let mut hex_digits = BigUint::from_bytes_be(bytes).to_str_radix(16).to_uppercase();
    if hex_digits.len() % 2 == 1 {
        hex_digits.insert(0, '0');
    }
    hex::decode(&hex_digits).expect("even-length hex")
}

/// Compute the 32-byte pairing secret.
pub(crate) fn pairing_secret(
    client_modulus: &[u8],
    client_exponent: &[u8],
    server_modulus: &[u8],
    server_exponent: &[u8],
    code: [u8; 3],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(hex_roundtrip(client_modulus));
    hasher.update(hex_roundtrip(client_exponent));
    hasher.update(hex_roundtrip(server_modulus));
    hasher.update(hex_roundtrip(server_exponent));
    hasher.update([code[1]]);
    hasher.update([code[2]]);
    hasher.finalize().into()
}

/// Extract the RSA public key `(modulus, exponent)` from a certificate.
///
/// # Errors
///
/// Returns [`RemoteError::PairingHandshakeFailed`] if the certificate does
/// not parse or does not carry an RSA key.
pub(crate) fn rsa_public_key_from_der(cert_der: &[u8]) -> Result<(Vec<u8>, Vec<u8>), RemoteError> {
    let (_, cert) =
        X509Certificate::from_der(cert_der).map_err(|e| RemoteError::PairingHandshakeFailed {
            message: format!("unparseable server certificate: {e}"),
        })?;

    match cert.public_key().parsed() {
        Ok(x509_parser::public_key::PublicKey::RSA(rsa)) => {
            Ok((rsa.modulus.to_vec(), rsa.exponent.to_vec()))
        }
        Ok(_) => Err(RemoteError::PairingHandshakeFailed {
            message: "server certificate does not carry an RSA key".to_string(),
        }),
        Err(e) => Err(RemoteError::PairingHandshakeFailed {
            message: format!("unparseable server public key: {e}"),
        }),
    }
}
