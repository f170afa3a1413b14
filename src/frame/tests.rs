//! Tests for frame encoding, validation and stream decoding.

use bytes::{BufMut, BytesMut};
use proptest::{
    collection::vec,
    prelude::{Strategy, any},
    prop_assert,
    prop_assert_eq,
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner},
};
use rstest::rstest;
use tokio_util::codec::{Decoder, Encoder};

use super::{
    Decoded,
    Frame,
    FrameError,
    FrameShape,
    GatewayCodec,
    MAX_PAYLOAD_LEN,
    START_MARKER,
    checksum,
    codes::{self, ErrorReason, FrameCode},
};

fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

fn frame_strategy() -> impl Strategy<Value = Frame> {
    (any::<u8>(), vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN))
        .prop_map(|(code, payload)| Frame::new(FrameCode::new(code), payload))
}

#[test]
fn encodes_marker_length_type_payload_and_checksum() {
    let frame = Frame::new(codes::GET_STATE_REQ, vec![0x01, 0x02]);
    let bytes = frame.encode().expect("frame fits");
    assert_eq!(bytes[0], START_MARKER);
    assert_eq!(usize::from(bytes[1]), bytes.len());
    assert_eq!(bytes[2], codes::GET_STATE_REQ.as_u8());
    assert_eq!(&bytes[3..5], &[0x01, 0x02]);
    let total: u32 = bytes.iter().map(|b| u32::from(*b)).sum();
    assert_eq!(total % 256, 0, "checksum should zero the byte sum");
}

#[test]
fn checksum_matches_modular_definition() {
    let body = [START_MARKER, 0x06, 0x31, 0x00, 0x07];
    let sum: u32 = body.iter().map(|b| u32::from(*b)).sum();
    let expected = ((256 - (sum % 256)) % 256) as u8;
    assert_eq!(checksum(&body), expected);
}

#[rstest]
#[case::confirm_short(Frame::confirm(codes::GET_STATE_CFM, 0), FrameShape::Confirm)]
#[case::confirm_long(Frame::new(codes::GET_STATE_CFM, vec![0, 1]), FrameShape::Confirm)]
#[case::ack(Frame::ack(codes::PASSWORD_ENTER_CFM, 0, 3, 0), FrameShape::Ack)]
#[case::empty(Frame::new(codes::ERROR_NTF, Vec::new()), FrameShape::Data)]
#[case::data(Frame::new(codes::NODE_STATE_POSITION_CHANGED_NTF, vec![0; 8]), FrameShape::Data)]
fn frame_shape_follows_length(#[case] frame: Frame, #[case] shape: FrameShape) {
    assert_eq!(frame.shape(), shape);
}

#[test]
fn ack_exposes_node() {
    let ack = Frame::ack(codes::PASSWORD_ENTER_CFM, 0, 9, 1);
    assert_eq!(ack.node(), Some(9));
    assert_eq!(ack.status(), Some(0));
    assert_eq!(Frame::confirm(codes::GET_STATE_CFM, 0).node(), None);
}

#[test]
fn oversized_payload_is_refused() {
    let frame = Frame::new(codes::GET_STATE_REQ, vec![0; MAX_PAYLOAD_LEN + 1]);
    assert_eq!(
        frame.encode(),
        Err(FrameError::PayloadTooLong {
            len: MAX_PAYLOAD_LEN + 1,
            max: MAX_PAYLOAD_LEN,
        })
    );
}

#[rstest]
#[case::empty(&[], FrameError::Truncated { have: 0, need: 4 })]
#[case::marker(&[0x00, 0x04, 0x0C, 0xF0], FrameError::BadStartMarker { found: 0x00 })]
#[case::short(&[START_MARKER, 0x03, 0x53], FrameError::Truncated { have: 3, need: 4 })]
#[case::length(
    &[START_MARKER, 0x05, 0x0C, 0x4A],
    FrameError::LengthMismatch { declared: 5, actual: 4 }
)]
fn decode_rejects_malformed_input(#[case] bytes: &[u8], #[case] expected: FrameError) {
    assert_eq!(Frame::decode(bytes), Err(expected));
}

#[test]
fn decode_rejects_bad_checksum() {
    let mut bytes = Frame::confirm(codes::GET_STATE_CFM, 0)
        .encode()
        .expect("frame fits")
        .to_vec();
    let last = bytes.len() - 1;
    bytes[last] = bytes[last].wrapping_add(1);
    assert!(matches!(
        Frame::decode(&bytes),
        Err(FrameError::ChecksumMismatch { .. })
    ));
}

#[test]
fn generated_frames_round_trip() {
    let mut runner = deterministic_runner(256);
    runner
        .run(&frame_strategy(), |frame| {
            let bytes = frame
                .encode()
                .map_err(|err| TestCaseError::fail(format!("encode failed: {err}")))?;
            let decoded = Frame::decode(&bytes)
                .map_err(|err| TestCaseError::fail(format!("decode failed: {err}")))?;
            prop_assert_eq!(decoded, frame);
            Ok(())
        })
        .expect("generated frames should round-trip");
}

#[test]
fn any_single_corrupted_byte_is_rejected() {
    let mut runner = deterministic_runner(256);
    let strategy = frame_strategy().prop_flat_map(|frame| {
        let len = frame.encoded_len();
        (
            proptest::strategy::Just(frame),
            0..len,
            1u8..=u8::MAX,
        )
    });
    runner
        .run(&strategy, |(frame, index, delta)| {
            let mut bytes = frame
                .encode()
                .map_err(|err| TestCaseError::fail(format!("encode failed: {err}")))?
                .to_vec();
            bytes[index] = bytes[index].wrapping_add(delta);
            prop_assert!(
                Frame::decode(&bytes).is_err(),
                "corrupting byte {} by {} was accepted",
                index,
                delta
            );
            Ok(())
        })
        .expect("corrupted frames should be rejected");
}

#[test]
fn codec_decodes_back_to_back_frames() {
    let mut codec = GatewayCodec::new();
    let mut wire = BytesMut::new();
    let first = Frame::confirm(codes::GET_STATE_CFM, 0);
    let second = Frame::ack(codes::PASSWORD_ENTER_CFM, 0, 0, 0);
    codec.encode(first.clone(), &mut wire).expect("encode first");
    codec.encode(second.clone(), &mut wire).expect("encode second");

    assert_eq!(codec.decode(&mut wire).expect("decode"), Some(Decoded::Frame(first)));
    assert_eq!(codec.decode(&mut wire).expect("decode"), Some(Decoded::Frame(second)));
    assert_eq!(codec.decode(&mut wire).expect("decode"), None);
}

#[test]
fn codec_waits_for_partial_frames() {
    let mut codec = GatewayCodec::new();
    let bytes = Frame::ack(codes::PASSWORD_ENTER_CFM, 0, 1, 0)
        .encode()
        .expect("frame fits");
    let mut wire = BytesMut::from(&bytes[..4]);
    assert_eq!(codec.decode(&mut wire).expect("decode"), None);
    wire.put_slice(&bytes[4..]);
    assert!(matches!(
        codec.decode(&mut wire).expect("decode"),
        Some(Decoded::Frame(_))
    ));
}

#[test]
fn codec_resynchronises_after_garbage() {
    let mut codec = GatewayCodec::new();
    let frame = Frame::confirm(codes::GET_STATE_CFM, 0);
    let mut wire = BytesMut::from(&[0x01, 0x02, 0x03][..]);
    wire.put_slice(&frame.encode().expect("frame fits"));

    assert_eq!(
        codec.decode(&mut wire).expect("decode"),
        Some(Decoded::Rejected(FrameError::Resynchronised { skipped: 3 }))
    );
    assert_eq!(codec.decode(&mut wire).expect("decode"), Some(Decoded::Frame(frame)));
}

#[test]
fn codec_reports_checksum_failures_and_continues() {
    let mut codec = GatewayCodec::new();
    let mut corrupt = Frame::confirm(codes::GET_STATE_CFM, 0)
        .encode()
        .expect("frame fits")
        .to_vec();
    corrupt[3] ^= 0xFF;
    let good = Frame::confirm(codes::GET_STATE_CFM, 1);
    let mut wire = BytesMut::from(&corrupt[..]);
    wire.put_slice(&good.encode().expect("frame fits"));

    assert!(matches!(
        codec.decode(&mut wire).expect("decode"),
        Some(Decoded::Rejected(FrameError::ChecksumMismatch { .. }))
    ));
    // Only the marker was consumed; the rest of the bad frame is skipped next.
    assert_eq!(
        codec.decode(&mut wire).expect("decode"),
        Some(Decoded::Rejected(FrameError::Resynchronised { skipped: 4 }))
    );
    assert_eq!(codec.decode(&mut wire).expect("decode"), Some(Decoded::Frame(good)));
}

#[test]
fn codec_recovers_frame_hidden_behind_inflated_length() {
    let mut codec = GatewayCodec::new();
    let mut inflated = Frame::confirm(codes::GET_STATE_CFM, 0)
        .encode()
        .expect("frame fits")
        .to_vec();
    inflated[1] = 0x40;
    let good = Frame::confirm(codes::GET_STATE_CFM, 3);
    let mut wire = BytesMut::from(&inflated[..]);
    wire.put_slice(&good.encode().expect("frame fits"));

    assert_eq!(
        codec.decode(&mut wire).expect("decode"),
        Some(Decoded::Rejected(FrameError::Resynchronised { skipped: 5 }))
    );
    assert_eq!(codec.decode(&mut wire).expect("decode"), Some(Decoded::Frame(good)));
    assert_eq!(codec.decode(&mut wire).expect("decode"), None);
}

#[test]
fn codec_failed_span_does_not_swallow_later_frames() {
    let mut codec = GatewayCodec::new();
    // Declares 12 bytes, covering the ack that follows, so the whole span is
    // buffered and fails validation.
    let mut inflated = Frame::confirm(codes::GET_STATE_CFM, 0)
        .encode()
        .expect("frame fits")
        .to_vec();
    inflated[1] = 12;
    let good = Frame::ack(codes::PASSWORD_ENTER_CFM, 0, 2, 0);
    let mut wire = BytesMut::from(&inflated[..]);
    wire.put_slice(&good.encode().expect("frame fits"));

    let mut decoded = Vec::new();
    while let Some(item) = codec.decode(&mut wire).expect("decode") {
        decoded.push(item);
    }
    assert!(decoded.contains(&Decoded::Frame(good)), "decoded: {decoded:?}");
    assert!(wire.is_empty());
}

#[test]
fn codec_skips_marker_with_impossible_length() {
    let mut codec = GatewayCodec::new();
    let mut wire = BytesMut::from(&[START_MARKER, 0x02][..]);
    assert_eq!(
        codec.decode(&mut wire).expect("decode"),
        Some(Decoded::Rejected(FrameError::LengthOutOfRange { declared: 2 }))
    );
    assert_eq!(wire.len(), 1);
}

#[test]
fn codec_reports_truncated_frame_at_eof() {
    let mut codec = GatewayCodec::new();
    let mut wire = BytesMut::from(&[START_MARKER, 0x07, 0x31][..]);
    assert_eq!(
        codec.decode_eof(&mut wire).expect("decode"),
        Some(Decoded::Rejected(FrameError::Truncated { have: 3, need: 7 }))
    );
    assert_eq!(codec.decode_eof(&mut wire).expect("decode"), None);
}

#[rstest]
#[case(0, ErrorReason::Undefined)]
#[case(1, ErrorReason::UnknownCommand)]
#[case(2, ErrorReason::FrameStructure)]
#[case(7, ErrorReason::Busy)]
#[case(8, ErrorReason::BadSystemTableIndex)]
#[case(12, ErrorReason::NotAuthenticated)]
#[case(99, ErrorReason::Unknown(99))]
fn error_reason_decodes_known_codes(#[case] raw: u8, #[case] reason: ErrorReason) {
    assert_eq!(ErrorReason::from_payload(&[raw]), reason);
}

#[test]
fn frame_code_display_uses_registry() {
    assert_eq!(codes::ERROR_NTF.to_string(), "ERROR_NTF(0x00)");
    assert_eq!(FrameCode::new(0xEE).to_string(), "0xEE");
}
