//! # atvremote
//!
//! A pure Rust client library for the Android TV Remote v2 protocol.
//!
//! ## Features
//!
//! - Television discovery via mDNS (`_androidtvremote2._tcp.`)
//! - Mutual-TLS pairing bound to a persistent RSA client identity
//! - Persistent command channel: key events, text input, and live
//!   television state (volume, power, foreground application)
//! - Automatic keep-alive handling and reconnect-on-send
//!
//! ## Example
//!
//! ```rust,no_run
//! use atvremote::{RemoteClient, RemoteConfig, keycode};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), atvremote::RemoteError> {
//! let client = RemoteClient::new(RemoteConfig::default())?;
//!
//! // Discover televisions
//! let devices = client.scan(Duration::from_secs(5)).await?;
//!
//! if let Some(tv) = devices.first() {
//!     // Pair once; the television displays a 6-digit code
//!     let attempt = client.pair(tv);
//!     attempt.start().await?;
//!     attempt.submit_code("6AE4D0").await?;
//!
//!     // Control it
//!     client.session().send_key(tv.ip, keycode::DPAD_CENTER).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

// Protocol layers
mod client;
pub mod discovery;
pub mod identity;
pub mod net;
pub mod pairing;
pub mod registry;
pub mod session;
pub mod testing;
pub mod wire;

mod fs_utils;

// Re-exports
pub use client::RemoteClient;
pub use error::RemoteError;
pub use types::keycode;
pub use types::{RemoteConfig, TvDevice};
