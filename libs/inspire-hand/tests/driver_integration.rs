//! End-to-end driver tests against the in-memory transport
//!
//! Hardware tests are ignored by default and need a hand on the serial port
//! named by `INSPIRE_HAND_PORT` (default `/dev/ttyUSB0`).
//!
//! Run them with: `cargo test --package inspire-hand --test driver_integration -- --ignored`

// Allow unwrap() in tests for cleaner test code
#![allow(clippy::disallowed_methods)]

use std::time::Duration;

use inspire_hand::modbus::{crc16, FrameCodec, MockReply, FC_WRITE_MULTIPLE_REGISTERS};
use inspire_hand::registers::{ANGLE_SET, STATUS};
use inspire_hand::{
    DriverOptions, FingerId, FingerStatus, FrameError, HandConfig, HandDriver, HandError,
    MockTransport, Quantity, SerialTransport, TransportError,
};

fn options() -> DriverOptions {
    DriverOptions {
        response_timeout: Duration::from_millis(50),
        calibration_settle: Duration::ZERO,
        gesture_settle: Duration::ZERO,
    }
}

async fn connected(slave_id: u8) -> HandDriver<MockTransport> {
    let mut hand = HandDriver::with_options(MockTransport::new(), slave_id, options());
    hand.connect().await.unwrap();
    hand
}

// ============================================================================
// Range enforcement
// ============================================================================

#[tokio::test]
async fn test_angle_range_enforced_before_io() {
    let mut hand = connected(1).await;

    assert!(hand
        .set_finger_angle(FingerId::Index, 1001)
        .await
        .unwrap_err()
        .is_validation());
    assert!(hand
        .set_finger_angle(FingerId::All, 500)
        .await
        .unwrap_err()
        .is_validation());
    assert!(hand.transport().sent_frames().is_empty());

    hand.set_finger_angle(FingerId::Index, 0).await.unwrap();
    hand.set_finger_angle(FingerId::Index, 1000).await.unwrap();
    assert_eq!(hand.transport().sent_frames().len(), 2);
}

#[test]
fn test_finger_id_parsing_rejects_out_of_range() {
    assert!(FingerId::try_from(7u8).is_err());
    assert_eq!("thumb-bend".parse::<FingerId>().unwrap(), FingerId::ThumbBend);
    assert_eq!(FingerId::try_from(6u8).unwrap(), FingerId::All);
}

// ============================================================================
// Packed registers
// ============================================================================

#[tokio::test]
async fn test_packed_status_unpack() {
    let mut hand = connected(1).await;
    hand.transport_mut()
        .set_registers(STATUS, &[0x0700, 0x0203, 0x0005]);

    let raw = hand.read_quantity(Quantity::Status).await.unwrap();
    assert_eq!(raw, [0x00, 0x07, 0x03, 0x02, 0x05, 0x00]);

    let statuses = hand.read_statuses().await.unwrap();
    assert_eq!(
        statuses,
        [
            FingerStatus::Unclenching,
            FingerStatus::Fault,
            FingerStatus::ReachedForce,
            FingerStatus::ReachedTarget,
            FingerStatus::CurrentProtection,
            FingerStatus::Unclenching,
        ]
    );

    // Only three registers go over the wire for a packed block
    let request = hand.transport().last_frame().unwrap();
    assert_eq!(&request.as_bytes()[2..6], &[0x06, 0x4C, 0x00, 0x03]);
}

#[tokio::test]
async fn test_reserved_status_code_is_not_an_error() {
    let mut hand = connected(1).await;
    hand.transport_mut().set_registers(STATUS, &[0x0004, 0, 0]);

    let statuses = hand.read_statuses().await.unwrap();
    assert_eq!(statuses[0], FingerStatus::Other(4));
}

// ============================================================================
// Idempotence and session handling
// ============================================================================

#[tokio::test]
async fn test_open_all_is_idempotent() {
    let mut hand = connected(1).await;

    hand.open_all_fingers().await.unwrap();
    let after_first = hand.transport().registers(ANGLE_SET, 6);
    hand.open_all_fingers().await.unwrap();
    let after_second = hand.transport().registers(ANGLE_SET, 6);

    let sent = hand.transport().sent_frames();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    assert_eq!(after_first, vec![1000; 6]);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_timeout_leaves_session_open() {
    let mut hand = connected(1).await;
    hand.transport_mut().push_reply(MockReply::Silence);

    let err = hand.read_angles().await.unwrap_err();
    assert_eq!(
        err,
        HandError::Transport(TransportError::NoResponse(Duration::from_millis(50)))
    );
    assert!(hand.is_connected());

    // Next exchange works without reconnecting
    hand.read_angles().await.unwrap();
    assert_eq!(hand.transport().connect_count(), 1);
}

#[tokio::test]
async fn test_operations_require_session() {
    let mut hand = HandDriver::with_options(MockTransport::new(), 1, options());
    assert_eq!(
        hand.read_temperatures().await.unwrap_err(),
        HandError::Transport(TransportError::NotConnected)
    );
    assert_eq!(
        hand.reset().await.unwrap_err(),
        HandError::Transport(TransportError::NotConnected)
    );
}

#[tokio::test]
async fn test_corrupted_reply_is_crc_mismatch() {
    let mut hand = connected(1).await;
    let mut reply = vec![0x01, 0x03, 0x0C];
    reply.extend_from_slice(&[0u8; 12]);
    let crc = crc16(&reply);
    reply.extend_from_slice(&crc.to_le_bytes());
    reply[5] ^= 0x40;
    hand.transport_mut().push_reply(MockReply::Bytes(reply));

    let err = hand.read_angles().await.unwrap_err();
    assert!(matches!(err, HandError::Frame(FrameError::CrcMismatch { .. })));
    assert!(hand.is_connected());
}

// ============================================================================
// Wire format
// ============================================================================

#[tokio::test]
async fn test_set_all_angles_zero_end_to_end() {
    let mut hand = connected(1).await;
    hand.set_all(Quantity::AngleSet, 0).await.unwrap();

    let frame = hand.transport().last_frame().unwrap().as_bytes().to_vec();
    assert_eq!(frame.len(), 7 + 12 + 2);
    assert_eq!(
        &frame[..7],
        &[0x01, FC_WRITE_MULTIPLE_REGISTERS, 0x05, 0xCE, 0x00, 0x06, 12]
    );
    assert!(frame[7..19].iter().all(|&b| b == 0));
    assert_eq!(
        u16::from_le_bytes([frame[19], frame[20]]),
        crc16(&frame[..19])
    );
}

#[tokio::test]
async fn test_multi_write_ack_with_unexpected_echo_is_accepted() {
    let mut hand = connected(1).await;
    // Ack echoes a different address and count than requested
    let mut ack = vec![0x01, 0x10, 0x00, 0x00, 0x00, 0x01];
    let crc = crc16(&ack);
    ack.extend_from_slice(&crc.to_le_bytes());
    hand.transport_mut().push_reply(MockReply::Bytes(ack));

    hand.close_all_fingers().await.unwrap();
}

#[tokio::test]
async fn test_device_exception_surfaces() {
    let mut hand = connected(1).await;
    let mut reply = vec![0x01, 0x86, 0x02];
    let crc = crc16(&reply);
    reply.extend_from_slice(&crc.to_le_bytes());
    hand.transport_mut().push_reply(MockReply::Bytes(reply));

    let err = hand.save_settings().await.unwrap_err();
    assert_eq!(
        err,
        HandError::Frame(FrameError::Exception {
            function: 0x06,
            code: 0x02
        })
    );
}

#[tokio::test]
async fn test_independent_instances() {
    let mut left = connected(1).await;
    let mut right = connected(2).await;

    left.set_finger_angle(FingerId::Little, 100).await.unwrap();
    right.set_finger_angle(FingerId::Little, 900).await.unwrap();

    assert_eq!(left.transport().register(ANGLE_SET), 100);
    assert_eq!(right.transport().register(ANGLE_SET), 900);
    assert_eq!(left.transport().last_frame().unwrap().slave_id(), 1);
    assert_eq!(right.transport().last_frame().unwrap().slave_id(), 2);

    left.disconnect().await;
    assert!(!left.is_connected());
    assert!(right.is_connected());
}

#[tokio::test]
async fn test_snapshot_serializes() {
    let mut hand = connected(1).await;
    hand.transport_mut().set_registers(STATUS, &[0x0002, 0, 0]);

    let snapshot = hand.snapshot().await.unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["statuses"][0], "reached_target");
    assert_eq!(json["angles"].as_array().unwrap().len(), 6);
    // angles, forces, statuses, errors, temperatures
    assert_eq!(hand.transport().sent_frames().len(), 5);
}

#[tokio::test]
async fn test_codec_matches_driver_requests() {
    let mut hand = connected(3).await;
    hand.read_forces().await.unwrap();

    let expected = FrameCodec::new(3).encode_read(1582, 6).unwrap();
    assert_eq!(hand.transport().last_frame(), Some(&expected));
}

// ============================================================================
// Hardware
// ============================================================================

#[tokio::test]
#[ignore = "requires an Inspire hand on a serial port"]
async fn test_hardware_read_angles() {
    let config = HandConfig::load(None).unwrap();
    let transport = SerialTransport::new(config.serial_params());
    let mut hand = HandDriver::with_options(transport, config.slave_id, config.driver_options());

    hand.connect().await.unwrap();
    let angles = hand.read_angles().await.unwrap();
    assert!(angles.iter().all(|&a| a <= 1000));
    hand.disconnect().await;
}
