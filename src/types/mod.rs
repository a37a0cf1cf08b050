//! Core types

mod config;
mod device;
/// Android `KeyEvent` codes used on the command channel
pub mod keycode;

pub use config::{RemoteConfig, RemoteConfigBuilder};
pub use device::{COMMAND_PORT, PAIRING_PORT, TvDevice};

#[cfg(test)]
mod tests;
