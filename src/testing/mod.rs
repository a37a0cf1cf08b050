//! Mock television for testing purposes.
//!
//! Provides an in-process television speaking both protocol channels over
//! real TLS sockets, so client functionality can be tested without
//! hardware.

mod mock_tv;

pub use mock_tv::{MockTv, MockTvConfig};
