//! Typed messages for the pairing and command channels.
//!
//! The message shapes are defined here as plain records with explicit
//! encode/decode against the field numbers of the protocol, the wire
//! surface is small and the numbers are part of the contract, so no
//! schema-generated code is involved. Decoding is partial: fields the
//! client does not consume are skipped, and whole messages it does not
//! know dispatch to an `Unknown` variant the caller ignores.

use super::codec::{FieldReader, FieldValue, MessageBuilder};
use super::WireError;

/// Pairing protocol version carried in every envelope.
pub const PROTOCOL_VERSION: u32 = 2;

/// Status signalling success.
pub const STATUS_OK: u32 = 200;

/// Status the television sends when the submitted secret was wrong.
pub const STATUS_BAD_CODE: u32 = 400;

/// Feature bitmask advertised in `RemoteConfigure` and `RemoteSetActive`.
///
/// Covers KEY + APP_LINK + IME. The value is part of the observed protocol;
/// its bit-level meaning is not fully documented.
pub const FEATURE_MASK: u32 = 622;

const ENCODING_HEXADECIMAL: u64 = 3;
const PAIRING_SYMBOL_LENGTH: u64 = 6;
const ROLE_INPUT: u64 = 1;

/// Envelope field numbers on the pairing channel.
mod pairing_field {
    pub const PROTOCOL_VERSION: u32 = 1;
    pub const STATUS: u32 = 2;
    pub const REQUEST: u32 = 10;
    pub const OPTIONS: u32 = 20;
    pub const CONFIGURATION: u32 = 30;
    pub const SECRET: u32 = 40;
}

/// Envelope field numbers on the command channel.
mod remote_field {
    pub const CONFIGURE: u32 = 1;
    pub const SET_ACTIVE: u32 = 2;
    pub const PING_REQUEST: u32 = 8;
    pub const PING_RESPONSE: u32 = 9;
    pub const KEY_INJECT: u32 = 10;
    pub const IME_KEY_INJECT: u32 = 20;
    pub const IME_BATCH_EDIT: u32 = 21;
    pub const START: u32 = 40;
    pub const SET_VOLUME: u32 = 50;
}

/// One message on the pairing channel.
///
/// Every message carries the protocol version and a status; the inner
/// payload field selects the handshake phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingMessage {
    /// Always [`PROTOCOL_VERSION`] on the wire
    pub protocol_version: u32,
    /// [`STATUS_OK`] on every client message; gates each server reply
    pub status: u32,
    /// The phase payload, absent on bare status replies
    pub payload: Option<PairingPayload>,
}

/// Phase payloads of the pairing handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingPayload {
    /// Field 10: opens the handshake
    Request {
        /// Always `"androidtvremote"`
        service_name: String,
        /// Client device name shown on the television
        client_name: String,
    },
    /// Field 20: advertises the hex/6 input encoding
    Options,
    /// Field 30: commits to the hex/6 encoding as input role
    Configuration,
    /// Field 40: the 32-byte pairing secret
    Secret {
        /// SHA-256 over both public keys and the code
        secret: Vec<u8>,
    },
    /// Any other payload field (server acknowledgements)
    Other {
        /// The envelope field number observed
        field: u32,
    },
}

impl PairingMessage {
    fn with_payload(payload: PairingPayload) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            status: STATUS_OK,
            payload: Some(payload),
        }
    }

    /// Step 1a message
    #[must_use]
    pub fn request(service_name: &str, client_name: &str) -> Self {
        Self::with_payload(PairingPayload::Request {
            service_name: service_name.to_string(),
            client_name: client_name.to_string(),
        })
    }

    /// Step 2a message
    #[must_use]
    pub fn options() -> Self {
        Self::with_payload(PairingPayload::Options)
    }

    /// Step 3a message
    #[must_use]
    pub fn configuration() -> Self {
        Self::with_payload(PairingPayload::Configuration)
    }

    /// Step 5a message
    #[must_use]
    pub fn secret(secret: Vec<u8>) -> Self {
        Self::with_payload(PairingPayload::Secret { secret })
    }

    /// A reply with the given status acknowledging `field`
    #[must_use]
    pub fn reply(status: u32, field: u32) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            status,
            payload: Some(PairingPayload::Other { field }),
        }
    }

    /// Encode to a message body (no length prefix)
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut builder = MessageBuilder::new()
            .varint(pairing_field::PROTOCOL_VERSION, u64::from(self.protocol_version))
            .varint(pairing_field::STATUS, u64::from(self.status));

        match &self.payload {
            Some(PairingPayload::Request {
                service_name,
                client_name,
            }) => {
                builder = builder.message(
                    pairing_field::REQUEST,
                    MessageBuilder::new()
                        .string(1, service_name)
                        .string(2, client_name),
                );
            }
            Some(PairingPayload::Options) => {
                let encoding = MessageBuilder::new()
                    .varint(1, ENCODING_HEXADECIMAL)
                    .varint(2, PAIRING_SYMBOL_LENGTH);
                builder = builder.message(
                    pairing_field::OPTIONS,
                    MessageBuilder::new()
                        .message(1, encoding)
                        .varint(3, ROLE_INPUT),
                );
            }
            Some(PairingPayload::Configuration) => {
                let encoding = MessageBuilder::new()
                    .varint(1, ENCODING_HEXADECIMAL)
                    .varint(2, PAIRING_SYMBOL_LENGTH);
                builder = builder.message(
                    pairing_field::CONFIGURATION,
                    MessageBuilder::new()
                        .message(1, encoding)
                        .varint(2, ROLE_INPUT),
                );
            }
            Some(PairingPayload::Secret { secret }) => {
                builder = builder.message(
                    pairing_field::SECRET,
                    MessageBuilder::new().bytes(1, secret),
                );
            }
            Some(PairingPayload::Other { field }) => {
                builder = builder.bytes(*field, &[]);
            }
            None => {}
        }

        builder.finish()
    }

    /// Encode with the varint length prefix
    #[must_use]
    pub fn encode_frame(&self) -> Vec<u8> {
        let body = self.encode();
        let mut framed = Vec::with_capacity(body.len() + 2);
        super::varint::encode(body.len() as u64, &mut framed);
        framed.extend_from_slice(&body);
        framed
    }

    /// Decode from a message body.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] on structurally invalid input.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut protocol_version = 0;
        let mut status = 0;
        let mut payload = None;

        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                pairing_field::PROTOCOL_VERSION => {
                    protocol_version = value.as_u32("protocol_version")?;
                }
                pairing_field::STATUS => {
                    status = value.as_u32("status")?;
                }
                pairing_field::REQUEST => {
                    let body = value.as_bytes("pairing_request")?;
                    payload = Some(Self::decode_request(body)?);
                }
                pairing_field::OPTIONS => {
                    value.as_bytes("pairing_option")?;
                    payload = Some(PairingPayload::Options);
                }
                pairing_field::CONFIGURATION => {
                    value.as_bytes("pairing_configuration")?;
                    payload = Some(PairingPayload::Configuration);
                }
                pairing_field::SECRET => {
                    let body = value.as_bytes("pairing_secret")?;
                    payload = Some(Self::decode_secret(body)?);
                }
                other => {
                    if payload.is_none() && matches!(value, FieldValue::Bytes(_)) {
                        payload = Some(PairingPayload::Other { field: other });
                    }
                }
            }
        }

        Ok(Self {
            protocol_version,
            status,
            payload,
        })
    }

    fn decode_request(buf: &[u8]) -> Result<PairingPayload, WireError> {
        let mut service_name = String::new();
        let mut client_name = String::new();
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => service_name = value.as_str("service_name")?.to_string(),
                2 => client_name = value.as_str("client_name")?.to_string(),
                _ => {}
            }
        }
        Ok(PairingPayload::Request {
            service_name,
            client_name,
        })
    }

    fn decode_secret(buf: &[u8]) -> Result<PairingPayload, WireError> {
        let mut secret = Vec::new();
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            if field == 1 {
                secret = value.as_bytes("secret")?.to_vec();
            }
        }
        Ok(PairingPayload::Secret { secret })
    }
}

/// Press semantics on a key-inject message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    /// Begin a long press
    StartLong,
    /// End a long press
    EndLong,
    /// A full press and release in one message
    Short,
}

impl KeyDirection {
    fn as_u64(self) -> u64 {
        match self {
            KeyDirection::StartLong => 1,
            KeyDirection::EndLong => 2,
            KeyDirection::Short => 3,
        }
    }

    fn from_u64(value: u64) -> Result<Self, WireError> {
        match value {
            1 => Ok(KeyDirection::StartLong),
            2 => Ok(KeyDirection::EndLong),
            3 => Ok(KeyDirection::Short),
            _ => Err(WireError::InvalidValue { what: "direction" }),
        }
    }
}

/// The client half of the configure exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfigure {
    /// Feature bitmask ([`FEATURE_MASK`] on outgoing messages)
    pub code1: u32,
    /// Client description, absent on television-originated configures
    pub device_info: Option<DeviceInfo>,
}

/// Client description inside a configure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device model shown in the television's paired-device list
    pub model: String,
    /// Device vendor
    pub vendor: String,
    /// Observed as 1 on reference clients
    pub unknown1: u32,
    /// Observed as "1" on reference clients
    pub unknown2: String,
    /// Client package name
    pub package_name: String,
    /// Client version string
    pub app_version: String,
}

/// Volume broadcast from the television (envelope field 50).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeLevel {
    /// Maximum volume step
    pub max: u32,
    /// Current volume step
    pub level: u32,
    /// Whether the television is muted
    pub muted: bool,
}

/// Text-field snapshot inside an IME batch edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFieldStatus {
    /// Selection start
    pub start: u32,
    /// Selection end
    pub end: u32,
    /// Field contents
    pub value: String,
}

/// One edit operation inside an IME batch edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditInfo {
    /// Insert opcode (1 on outgoing edits)
    pub insert: u32,
    /// The text payload
    pub text_field_status: Option<TextFieldStatus>,
}

/// IME batch edit (envelope field 21), both directions.
///
/// The television sends counter-only edits on focus changes; the client
/// echoes the last observed counters on every text send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImeBatchEdit {
    /// IME session counter
    pub ime_counter: u32,
    /// Focused-field counter
    pub field_counter: u32,
    /// The edit payload, absent on counter-only messages
    pub edit_info: Option<EditInfo>,
}

/// One message on the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMessage {
    /// Field 1: capability exchange
    Configure(DeviceConfigure),
    /// Field 2: activation exchange
    SetActive {
        /// Feature bitmask
        active: u32,
    },
    /// Field 8: keep-alive from the television
    PingRequest {
        /// Echo token
        val1: u32,
    },
    /// Field 9: keep-alive reply
    PingResponse {
        /// Echo token copied from the request
        val1: u32,
    },
    /// Field 10: key event
    KeyInject {
        /// Android `KeyEvent` code
        key_code: u32,
        /// Press semantics
        direction: KeyDirection,
    },
    /// Field 20: foreground-application broadcast
    ImeKeyInject {
        /// Package name of the foreground application
        app_package: Option<String>,
    },
    /// Field 21: IME counters and text edits
    ImeBatchEdit(ImeBatchEdit),
    /// Field 40: television power state
    Start {
        /// Whether the television is on
        started: bool,
    },
    /// Field 50: volume broadcast
    SetVolume(VolumeLevel),
    /// Any envelope field the client does not consume
    Unknown {
        /// The envelope field number observed
        field: u32,
    },
}

impl RemoteMessage {
    /// Encode to a message body (no length prefix).
    ///
    /// `Unknown` encodes to an empty body; it exists only as a decode
    /// result and is never sent.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let builder = MessageBuilder::new();
        match self {
            RemoteMessage::Configure(configure) => {
                let mut inner = MessageBuilder::new().varint(1, u64::from(configure.code1));
                if let Some(info) = &configure.device_info {
                    inner = inner.message(
                        2,
                        MessageBuilder::new()
                            .string(1, &info.model)
                            .string(2, &info.vendor)
                            .varint(3, u64::from(info.unknown1))
                            .string(4, &info.unknown2)
                            .string(5, &info.package_name)
                            .string(6, &info.app_version),
                    );
                }
                builder.message(remote_field::CONFIGURE, inner).finish()
            }
            RemoteMessage::SetActive { active } => builder
                .message(
                    remote_field::SET_ACTIVE,
                    MessageBuilder::new().varint(1, u64::from(*active)),
                )
                .finish(),
            RemoteMessage::PingRequest { val1 } => builder
                .message(
                    remote_field::PING_REQUEST,
                    MessageBuilder::new().varint(1, u64::from(*val1)),
                )
                .finish(),
            RemoteMessage::PingResponse { val1 } => builder
                .message(
                    remote_field::PING_RESPONSE,
                    MessageBuilder::new().varint(1, u64::from(*val1)),
                )
                .finish(),
            RemoteMessage::KeyInject {
                key_code,
                direction,
            } => builder
                .message(
                    remote_field::KEY_INJECT,
                    MessageBuilder::new()
                        .varint(1, u64::from(*key_code))
                        .varint(2, direction.as_u64()),
                )
                .finish(),
            RemoteMessage::ImeKeyInject { app_package } => {
                let mut inner = MessageBuilder::new();
                if let Some(package) = app_package {
                    inner = inner.string(12, package);
                }
                builder
                    .message(remote_field::IME_KEY_INJECT, inner)
                    .finish()
            }
            RemoteMessage::ImeBatchEdit(edit) => {
                let mut inner = MessageBuilder::new()
                    .varint(1, u64::from(edit.ime_counter))
                    .varint(2, u64::from(edit.field_counter));
                if let Some(info) = &edit.edit_info {
                    let mut edit_builder = MessageBuilder::new().varint(1, u64::from(info.insert));
                    if let Some(status) = &info.text_field_status {
                        edit_builder = edit_builder.message(
                            2,
                            MessageBuilder::new()
                                .varint(1, u64::from(status.start))
                                .varint(2, u64::from(status.end))
                                .string(3, &status.value),
                        );
                    }
                    inner = inner.message(3, edit_builder);
                }
                builder
                    .message(remote_field::IME_BATCH_EDIT, inner)
                    .finish()
            }
            RemoteMessage::Start { started } => builder
                .message(
                    remote_field::START,
                    MessageBuilder::new().varint(1, u64::from(*started)),
                )
                .finish(),
            RemoteMessage::SetVolume(volume) => builder
                .message(
                    remote_field::SET_VOLUME,
                    MessageBuilder::new()
                        .varint(6, u64::from(volume.max))
                        .varint(7, u64::from(volume.level))
                        .varint(8, u64::from(volume.muted)),
                )
                .finish(),
            RemoteMessage::Unknown { .. } => Vec::new(),
        }
    }

    /// Encode with the varint length prefix
    #[must_use]
    pub fn encode_frame(&self) -> Vec<u8> {
        let body = self.encode();
        let mut framed = Vec::with_capacity(body.len() + 2);
        super::varint::encode(body.len() as u64, &mut framed);
        framed.extend_from_slice(&body);
        framed
    }

    /// Decode from a message body.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] on structurally invalid input. Envelope
    /// fields outside the consumed set decode to [`RemoteMessage::Unknown`].
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut reader = FieldReader::new(buf);
        let mut unknown = 0;

        while let Some((field, value)) = reader.next_field()? {
            match field {
                remote_field::CONFIGURE => {
                    let body = value.as_bytes("remote_configure")?;
                    return Ok(RemoteMessage::Configure(Self::decode_configure(body)?));
                }
                remote_field::SET_ACTIVE => {
                    let body = value.as_bytes("remote_set_active")?;
                    return Ok(RemoteMessage::SetActive {
                        active: Self::decode_single_u32(body)?,
                    });
                }
                remote_field::PING_REQUEST => {
                    let body = value.as_bytes("remote_ping_request")?;
                    return Ok(RemoteMessage::PingRequest {
                        val1: Self::decode_single_u32(body)?,
                    });
                }
                remote_field::PING_RESPONSE => {
                    let body = value.as_bytes("remote_ping_response")?;
                    return Ok(RemoteMessage::PingResponse {
                        val1: Self::decode_single_u32(body)?,
                    });
                }
                remote_field::KEY_INJECT => {
                    let body = value.as_bytes("remote_key_inject")?;
                    return Self::decode_key_inject(body);
                }
                remote_field::IME_KEY_INJECT => {
                    let body = value.as_bytes("remote_ime_key_inject")?;
                    return Self::decode_ime_key_inject(body);
                }
                remote_field::IME_BATCH_EDIT => {
                    let body = value.as_bytes("remote_ime_batch_edit")?;
                    return Ok(RemoteMessage::ImeBatchEdit(Self::decode_batch_edit(body)?));
                }
                remote_field::START => {
                    let body = value.as_bytes("remote_start")?;
                    return Ok(RemoteMessage::Start {
                        started: Self::decode_single_u32(body)? != 0,
                    });
                }
                remote_field::SET_VOLUME => {
                    let body = value.as_bytes("remote_set_volume_level")?;
                    return Ok(RemoteMessage::SetVolume(Self::decode_volume(body)?));
                }
                other => {
                    if unknown == 0 {
                        unknown = other;
                    }
                }
            }
        }

        Ok(RemoteMessage::Unknown { field: unknown })
    }

    fn decode_single_u32(buf: &[u8]) -> Result<u32, WireError> {
        let mut result = 0;
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            if field == 1 {
                result = value.as_u32("field 1")?;
            }
        }
        Ok(result)
    }

    fn decode_configure(buf: &[u8]) -> Result<DeviceConfigure, WireError> {
        let mut code1 = 0;
        let mut device_info = None;
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => code1 = value.as_u32("code1")?,
                2 => device_info = Some(Self::decode_device_info(value.as_bytes("device_info")?)?),
                _ => {}
            }
        }
        Ok(DeviceConfigure { code1, device_info })
    }

    fn decode_device_info(buf: &[u8]) -> Result<DeviceInfo, WireError> {
        let mut info = DeviceInfo {
            model: String::new(),
            vendor: String::new(),
            unknown1: 0,
            unknown2: String::new(),
            package_name: String::new(),
            app_version: String::new(),
        };
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => info.model = value.as_str("model")?.to_string(),
                2 => info.vendor = value.as_str("vendor")?.to_string(),
                3 => info.unknown1 = value.as_u32("unknown1")?,
                4 => info.unknown2 = value.as_str("unknown2")?.to_string(),
                5 => info.package_name = value.as_str("package_name")?.to_string(),
                6 => info.app_version = value.as_str("app_version")?.to_string(),
                _ => {}
            }
        }
        Ok(info)
    }

    fn decode_key_inject(buf: &[u8]) -> Result<RemoteMessage, WireError> {
        let mut key_code = 0;
        let mut direction = KeyDirection::Short;
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => key_code = value.as_u32("key_code")?,
                2 => direction = KeyDirection::from_u64(value.as_u64("direction")?)?,
                _ => {}
            }
        }
        Ok(RemoteMessage::KeyInject {
            key_code,
            direction,
        })
    }

    fn decode_ime_key_inject(buf: &[u8]) -> Result<RemoteMessage, WireError> {
        let mut app_package = None;
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            if field == 12 {
                app_package = Some(value.as_str("app_package")?.to_string());
            }
        }
        Ok(RemoteMessage::ImeKeyInject { app_package })
    }

    fn decode_batch_edit(buf: &[u8]) -> Result<ImeBatchEdit, WireError> {
        let mut edit = ImeBatchEdit {
            ime_counter: 0,
            field_counter: 0,
            edit_info: None,
        };
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => edit.ime_counter = value.as_u32("ime_counter")?,
                2 => edit.field_counter = value.as_u32("field_counter")?,
                3 => edit.edit_info = Some(Self::decode_edit_info(value.as_bytes("edit_info")?)?),
                _ => {}
            }
        }
        Ok(edit)
    }

    fn decode_edit_info(buf: &[u8]) -> Result<EditInfo, WireError> {
        let mut info = EditInfo {
            insert: 0,
            text_field_status: None,
        };
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => info.insert = value.as_u32("insert")?,
                2 => {
                    info.text_field_status =
                        Some(Self::decode_text_field(value.as_bytes("text_field_status")?)?);
                }
                _ => {}
            }
        }
        Ok(info)
    }

    fn decode_text_field(buf: &[u8]) -> Result<TextFieldStatus, WireError> {
        let mut status = TextFieldStatus {
            start: 0,
            end: 0,
            value: String::new(),
        };
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => status.start = value.as_u32("start")?,
                2 => status.end = value.as_u32("end")?,
                3 => status.value = value.as_str("value")?.to_string(),
                _ => {}
            }
        }
        Ok(status)
    }

    fn decode_volume(buf: &[u8]) -> Result<VolumeLevel, WireError> {
        let mut volume = VolumeLevel {
            max: 0,
            level: 0,
            muted: false,
        };
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                6 => volume.max = value.as_u32("volume max")?,
                7 => volume.level = value.as_u32("volume level")?,
                8 => volume.muted = value.as_u64("volume muted")? != 0,
                _ => {}
            }
        }
        Ok(volume)
    }
}
