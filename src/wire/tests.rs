use super::codec::{FieldReader, FieldValue, MAX_FRAME_LEN, MessageBuilder, read_frame, write_frame};
use super::messages::{
    DeviceConfigure, DeviceInfo, EditInfo, ImeBatchEdit, KeyDirection, PairingMessage,
    PairingPayload, RemoteMessage, STATUS_OK, TextFieldStatus, VolumeLevel,
};
use super::{WireError, varint};
use proptest::prelude::*;

#[test]
fn varint_boundary_round_trips() {
    for value in [0u64, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152] {
        let mut buf = Vec::new();
        varint::encode(value, &mut buf);
        let (decoded, used) = varint::decode(&buf).unwrap();
        assert_eq!(decoded, value, "value {value}");
        assert_eq!(used, buf.len(), "value {value}");
    }
}

#[test]
fn varint_max_value() {
    let mut buf = Vec::new();
    varint::encode(u64::MAX, &mut buf);
    assert_eq!(buf.len(), 10);
    let (decoded, _) = varint::decode(&buf).unwrap();
    assert_eq!(decoded, u64::MAX);
}

#[test]
fn varint_truncated() {
    assert!(matches!(
        varint::decode(&[0x80]),
        Err(WireError::TruncatedVarint)
    ));
    assert!(matches!(varint::decode(&[]), Err(WireError::TruncatedVarint)));
}

#[test]
fn varint_overflow() {
    let buf = [0xff; 11];
    assert!(matches!(
        varint::decode(&buf),
        Err(WireError::VarintOverflow)
    ));
}

#[test]
fn multi_byte_tags_match_protocol() {
    // Fields >= 16 need two tag bytes; the constants here are part of the
    // wire contract for the pairing channel.
    let body = MessageBuilder::new().bytes(20, &[]).finish();
    assert_eq!(&body[..2], &[0xA2, 0x01]);

    let body = MessageBuilder::new().bytes(21, &[]).finish();
    assert_eq!(&body[..2], &[0xAA, 0x01]);

    let body = MessageBuilder::new().bytes(30, &[]).finish();
    assert_eq!(&body[..2], &[0xF2, 0x01]);
}

#[test]
fn reader_skips_unknown_fields_by_wire_type() {
    // varint field 99, fixed64 field 3, fixed32 field 4, then a known field
    let mut body = MessageBuilder::new().varint(99, 7).finish();
    body.extend_from_slice(&[(3 << 3) | 1]); // fixed64 tag
    body.extend_from_slice(&[0u8; 8]);
    body.extend_from_slice(&[(4 << 3) | 5]); // fixed32 tag
    body.extend_from_slice(&[0u8; 4]);
    let mut tail = MessageBuilder::new().string(2, "ok").finish();
    body.append(&mut tail);

    let mut reader = FieldReader::new(&body);
    let (field, value) = reader.next_field().unwrap().unwrap();
    assert_eq!(field, 99);
    assert_eq!(value, FieldValue::Varint(7));

    // fixed-width fields are skipped transparently
    let (field, value) = reader.next_field().unwrap().unwrap();
    assert_eq!(field, 2);
    assert_eq!(value.as_str("tail").unwrap(), "ok");

    assert!(reader.next_field().unwrap().is_none());
}

#[test]
fn reader_rejects_group_wire_types() {
    let body = [(1 << 3) | 3u8];
    let mut reader = FieldReader::new(&body);
    assert!(matches!(
        reader.next_field(),
        Err(WireError::UnsupportedWireType { field: 1, wire_type: 3 })
    ));
}

#[test]
fn reader_rejects_length_past_end() {
    // bytes field claiming 100 bytes with only 2 present
    let body = [(1 << 3) | 2u8, 100, 0xAA, 0xBB];
    let mut reader = FieldReader::new(&body);
    assert!(matches!(reader.next_field(), Err(WireError::Truncated)));
}

#[test]
fn pairing_messages_round_trip() {
    let messages = [
        PairingMessage::request("androidtvremote", "test-host"),
        PairingMessage::options(),
        PairingMessage::configuration(),
        PairingMessage::secret(vec![0x6A; 32]),
        PairingMessage::reply(STATUS_OK, 11),
    ];
    for message in messages {
        let decoded = PairingMessage::decode(&message.encode()).unwrap();
        assert_eq!(decoded, message);
    }
}

#[test]
fn pairing_decode_reads_status() {
    let reply = PairingMessage::reply(400, 41);
    let decoded = PairingMessage::decode(&reply.encode()).unwrap();
    assert_eq!(decoded.status, 400);
    assert_eq!(decoded.payload, Some(PairingPayload::Other { field: 41 }));
}

#[test]
fn remote_messages_round_trip() {
    let messages = [
        RemoteMessage::Configure(DeviceConfigure {
            code1: 622,
            device_info: Some(DeviceInfo {
                model: "test-host".to_string(),
                vendor: "atvremote".to_string(),
                unknown1: 1,
                unknown2: "1".to_string(),
                package_name: "atvremote".to_string(),
                app_version: "1.0.0".to_string(),
            }),
        }),
        RemoteMessage::SetActive { active: 622 },
        RemoteMessage::PingRequest { val1: 42 },
        RemoteMessage::PingResponse { val1: 42 },
        RemoteMessage::KeyInject {
            key_code: 19,
            direction: KeyDirection::Short,
        },
        RemoteMessage::ImeKeyInject {
            app_package: Some("com.example.app".to_string()),
        },
        RemoteMessage::ImeBatchEdit(ImeBatchEdit {
            ime_counter: 7,
            field_counter: 3,
            edit_info: Some(EditInfo {
                insert: 1,
                text_field_status: Some(TextFieldStatus {
                    start: 1,
                    end: 1,
                    value: "hi".to_string(),
                }),
            }),
        }),
        RemoteMessage::Start { started: true },
        RemoteMessage::SetVolume(VolumeLevel {
            max: 100,
            level: 25,
            muted: false,
        }),
    ];
    for message in messages {
        let decoded = RemoteMessage::decode(&message.encode()).unwrap();
        assert_eq!(decoded, message);
    }
}

#[test]
fn remote_decode_unconsumed_field_is_unknown() {
    let body = MessageBuilder::new()
        .bytes(33, &MessageBuilder::new().varint(1, 5).finish())
        .finish();
    let decoded = RemoteMessage::decode(&body).unwrap();
    assert_eq!(decoded, RemoteMessage::Unknown { field: 33 });
}

#[test]
fn key_inject_rejects_bad_direction() {
    let body = MessageBuilder::new()
        .bytes(
            10,
            &MessageBuilder::new().varint(1, 19).varint(2, 9).finish(),
        )
        .finish();
    assert!(RemoteMessage::decode(&body).is_err());
}

#[tokio::test]
async fn frames_round_trip_over_a_stream() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    let body = RemoteMessage::PingRequest { val1: 3 }.encode();
    write_frame(&mut client, &body).await.unwrap();
    let read = read_frame(&mut server).await.unwrap();
    assert_eq!(read, body);
}

#[tokio::test]
async fn oversized_frame_is_rejected_without_reading_body() {
    let (mut client, mut server) = tokio::io::duplex(64);
    // length prefix claiming 1 MiB
    let mut prefix = Vec::new();
    varint::encode(1_048_576, &mut prefix);
    tokio::io::AsyncWriteExt::write_all(&mut client, &prefix)
        .await
        .unwrap();
    let err = read_frame(&mut server).await.unwrap_err();
    assert!(matches!(err, WireError::FrameTooLarge { .. }));
}

#[tokio::test]
async fn write_frame_rejects_oversized_body() {
    let (mut client, _server) = tokio::io::duplex(64);
    let body = vec![0u8; MAX_FRAME_LEN + 1];
    let err = write_frame(&mut client, &body).await.unwrap_err();
    assert!(matches!(err, WireError::FrameTooLarge { .. }));
}

proptest! {
    // Decoding arbitrary bytes must return a value or a structured error,
    // never panic or read past the buffer.
    #[test]
    fn decode_any_bytes_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..MAX_FRAME_LEN)) {
        let _ = RemoteMessage::decode(&bytes);
        let _ = PairingMessage::decode(&bytes);
        let mut reader = FieldReader::new(&bytes);
        while let Ok(Some(_)) = reader.next_field() {}
    }

    #[test]
    fn varint_round_trips(value in any::<u64>()) {
        let mut buf = Vec::new();
        varint::encode(value, &mut buf);
        let (decoded, used) = varint::decode(&buf).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(used, buf.len());
    }
}
