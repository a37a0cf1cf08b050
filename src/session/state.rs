//! Command-channel state and events.

use std::net::IpAddr;

pub use crate::wire::VolumeLevel;

/// Connection state of the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Dialing and bringing up the channel
    Connecting,
    /// Connected to the given television
    Connected(IpAddr),
    /// The channel failed; the reason is terminal until the next connect
    Error(String),
}

impl ConnectionState {
    /// Check if fully connected (to any television)
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    /// Check if connected to a specific television
    #[must_use]
    pub fn is_connected_to(&self, ip: IpAddr) -> bool {
        matches!(self, ConnectionState::Connected(connected) if *connected == ip)
    }
}

/// Reason for a session ending.
#[derive(Debug, Clone)]
pub enum DisconnectReason {
    /// The caller asked for the disconnect
    UserRequested,
    /// A new connect replaced this session
    Replaced,
    /// The reader observed EOF or an I/O error
    ConnectionLost(String),
}

/// Connection events broadcast to observers.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// State changed
    StateChanged {
        /// The previous state
        old: ConnectionState,
        /// The new state
        new: ConnectionState,
    },
    /// The command channel came up
    Connected {
        /// The connected television
        ip: IpAddr,
    },
    /// The command channel went down
    Disconnected {
        /// The television the session was bound to
        ip: IpAddr,
        /// Why the session ended
        reason: DisconnectReason,
    },
    /// An error occurred
    Error {
        /// The error message
        message: String,
        /// Whether retrying can help without user action
        recoverable: bool,
    },
}

/// Television state observed on the command channel.
///
/// Fields are `None` until the television first broadcasts them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteState {
    /// Volume as last announced (envelope field 50)
    pub volume: Option<VolumeLevel>,
    /// Power state as last announced (envelope field 40)
    pub powered: Option<bool>,
    /// Foreground application package (envelope field 20)
    pub current_app: Option<String>,
}
