//! TLS transport shared by the pairing and command channels.
//!
//! Televisions present self-signed certificates and pin the client identity
//! from pairing, so the transport trusts any server certificate and always
//! presents the stored client certificate. One `ClientConfig` is built per
//! client and reused for every connection; some televisions pin the
//! precise TLS identity used during pairing and reject a structurally
//! identical but freshly-built context.

mod tls;

pub use tls::{ConnectError, TlsStream, TlsTransport};

pub(crate) use tls::io_is_certificate_rejected;

#[cfg(test)]
mod tests;
