//! The pairing handshake (tcp/6467).
//!
//! Pairing is a linear five-step exchange over one TLS connection: request,
//! option, configuration, a human reading the on-screen code, and a secret
//! that proves both certificates and the code. A successful attempt records
//! the television's address in the paired-device registry.

mod engine;
pub(crate) mod secret;

pub use engine::{PairingSession, PairingState};

#[cfg(test)]
mod tests;
