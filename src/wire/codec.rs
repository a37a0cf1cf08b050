//! Field-level codec and message framing.

use super::{WireError, varint};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a framed message body.
///
/// Every message defined by the protocol fits comfortably; anything larger
/// is a corrupt length prefix.
pub const MAX_FRAME_LEN: usize = 10_000;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_BYTES: u8 = 2;
const WIRE_FIXED32: u8 = 5;

fn tag(field: u32, wire_type: u8) -> u64 {
    (u64::from(field) << 3) | u64::from(wire_type)
}

/// Builder for an encoded message body.
///
/// Fields are appended in call order; nested messages are built with their
/// own builder and attached with [`MessageBuilder::message`].
#[derive(Debug, Default)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a varint field
    #[must_use]
    pub fn varint(mut self, field: u32, value: u64) -> Self {
        varint::encode(tag(field, WIRE_VARINT), &mut self.buf);
        varint::encode(value, &mut self.buf);
        self
    }

    /// Append a length-delimited bytes field
    #[must_use]
    pub fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        varint::encode(tag(field, WIRE_BYTES), &mut self.buf);
        varint::encode(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
        self
    }

    /// Append a UTF-8 string field
    #[must_use]
    pub fn string(self, field: u32, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    /// Append a nested message field
    #[must_use]
    pub fn message(self, field: u32, inner: MessageBuilder) -> Self {
        let body = inner.finish();
        self.bytes(field, &body)
    }

    /// Finish and return the encoded body
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Finish and return the body prefixed with its varint length
    #[must_use]
    pub fn into_frame(self) -> Vec<u8> {
        let mut framed = Vec::with_capacity(self.buf.len() + 2);
        varint::encode(self.buf.len() as u64, &mut framed);
        framed.extend_from_slice(&self.buf);
        framed
    }
}

/// A decoded field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Wire type 0
    Varint(u64),
    /// Wire type 2
    Bytes(&'a [u8]),
}

impl<'a> FieldValue<'a> {
    /// Interpret as an unsigned integer
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidValue`] naming `what` on a wire-type
    /// mismatch.
    pub fn as_u64(self, what: &'static str) -> Result<u64, WireError> {
        match self {
            FieldValue::Varint(v) => Ok(v),
            FieldValue::Bytes(_) => Err(WireError::InvalidValue { what }),
        }
    }

    /// Interpret as a `u32`, rejecting out-of-range values
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidValue`] on a wire-type mismatch or an
    /// out-of-range value.
    pub fn as_u32(self, what: &'static str) -> Result<u32, WireError> {
        u32::try_from(self.as_u64(what)?).map_err(|_| WireError::InvalidValue { what })
    }

    /// Interpret as raw bytes
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidValue`] naming `what` on a wire-type
    /// mismatch.
    pub fn as_bytes(self, what: &'static str) -> Result<&'a [u8], WireError> {
        match self {
            FieldValue::Bytes(b) => Ok(b),
            FieldValue::Varint(_) => Err(WireError::InvalidValue { what }),
        }
    }

    /// Interpret as a UTF-8 string
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidValue`] on a wire-type mismatch or
    /// invalid UTF-8.
    pub fn as_str(self, what: &'static str) -> Result<&'a str, WireError> {
        std::str::from_utf8(self.as_bytes(what)?).map_err(|_| WireError::InvalidValue { what })
    }
}

/// Cursor over the fields of one encoded message body.
///
/// Fixed-width fields (wire types 1 and 5) are skipped transparently; the
/// protocol never carries data in them. Group wire types are rejected.
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    /// Create a reader over a message body
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Decode the next field, or `None` at end of message.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] on truncated or structurally invalid input.
    /// The reader never reads past the end of the buffer it was given.
    pub fn next_field(&mut self) -> Result<Option<(u32, FieldValue<'a>)>, WireError> {
        loop {
            if self.buf.is_empty() {
                return Ok(None);
            }

            let (tag, used) = varint::decode(self.buf)?;
            self.buf = &self.buf[used..];

            let field = u32::try_from(tag >> 3).map_err(|_| WireError::InvalidValue {
                what: "field number",
            })?;
            let wire_type = (tag & 0x07) as u8;

            match wire_type {
                WIRE_VARINT => {
                    let (value, used) = varint::decode(self.buf)?;
                    self.buf = &self.buf[used..];
                    return Ok(Some((field, FieldValue::Varint(value))));
                }
                WIRE_BYTES => {
                    let (len, used) = varint::decode(self.buf)?;
                    self.buf = &self.buf[used..];
                    let len = usize::try_from(len).map_err(|_| WireError::Truncated)?;
                    if len > self.buf.len() {
                        return Err(WireError::Truncated);
                    }
                    let (value, rest) = self.buf.split_at(len);
                    self.buf = rest;
                    return Ok(Some((field, FieldValue::Bytes(value))));
                }
                WIRE_FIXED64 => self.skip(8)?,
                WIRE_FIXED32 => self.skip(4)?,
                other => {
                    return Err(WireError::UnsupportedWireType {
                        field,
                        wire_type: other,
                    });
                }
            }
        }
    }

    fn skip(&mut self, n: usize) -> Result<(), WireError> {
        if n > self.buf.len() {
            return Err(WireError::Truncated);
        }
        self.buf = &self.buf[n..];
        Ok(())
    }
}

/// Read one varint-length-delimited frame from `reader`.
///
/// # Errors
///
/// Returns [`WireError::FrameTooLarge`] for lengths over [`MAX_FRAME_LEN`],
/// and I/O errors (including EOF mid-frame) as [`WireError::Io`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut len: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_u8().await?;
        len |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(WireError::VarintOverflow);
        }
    }

    if len > MAX_FRAME_LEN as u64 {
        return Err(WireError::FrameTooLarge {
            len,
            limit: MAX_FRAME_LEN,
        });
    }

    #[allow(clippy::cast_possible_truncation)]
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Write `body` to `writer` as one length-delimited frame and flush.
///
/// # Errors
///
/// Returns [`WireError::FrameTooLarge`] for oversized bodies, and I/O
/// errors as [`WireError::Io`].
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge {
            len: body.len() as u64,
            limit: MAX_FRAME_LEN,
        });
    }

    let mut framed = Vec::with_capacity(body.len() + 2);
    varint::encode(body.len() as u64, &mut framed);
    framed.extend_from_slice(body);
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}
