//! The command channel (tcp/6466).

mod manager;
mod state;

pub use manager::SessionManager;
pub use state::{ConnectionEvent, ConnectionState, DisconnectReason, RemoteState, VolumeLevel};

#[cfg(test)]
mod tests;
