//! Binary wire format shared by the pairing and command channels.
//!
//! Both channels speak the same framing: every message is prefixed by an
//! unsigned varint length, and message bodies are sequences of
//! `(tag, value)` fields where `tag = (field_number << 3) | wire_type`.
//! Only the varint (0) and length-delimited (2) wire types carry data the
//! protocol uses; everything else is skipped. The field numbers are part of
//! the protocol contract and are kept explicit in [`messages`].

mod codec;
mod messages;
mod varint;

pub use codec::{FieldReader, FieldValue, MAX_FRAME_LEN, MessageBuilder, read_frame, write_frame};
pub use messages::{
    DeviceConfigure, DeviceInfo, EditInfo, FEATURE_MASK, ImeBatchEdit, KeyDirection,
    PROTOCOL_VERSION, PairingMessage, PairingPayload, RemoteMessage, STATUS_BAD_CODE, STATUS_OK,
    TextFieldStatus, VolumeLevel,
};

/// Wire-format errors
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A varint ran past the end of the buffer.
    #[error("truncated varint")]
    TruncatedVarint,

    /// A varint did not terminate within 64 bits.
    #[error("varint exceeds 64 bits")]
    VarintOverflow,

    /// A frame length exceeded the sanity bound.
    #[error("frame length {len} exceeds limit {limit}")]
    FrameTooLarge {
        /// The declared length
        len: u64,
        /// The enforced bound
        limit: usize,
    },

    /// A field value ran past the end of the message.
    #[error("message truncated")]
    Truncated,

    /// A tag carried a wire type the codec cannot skip.
    #[error("unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType {
        /// The field number carrying the bad wire type
        field: u32,
        /// The wire type
        wire_type: u8,
    },

    /// A field held a value of the wrong shape for its message.
    #[error("invalid value for {what}")]
    InvalidValue {
        /// Which value was malformed
        what: &'static str,
    },

    /// I/O failure while reading or writing a frame.
    #[error("I/O error on framed stream")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests;
