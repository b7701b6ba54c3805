//! Modbus RTU frame codec
//!
//! An RTU frame is `[slave_id, function_code, payload..., crc_lo, crc_hi]`
//! where the CRC16/Modbus of all preceding bytes is appended little-endian.

use std::fmt;

use tracing::{debug, warn};

use super::constants::{
    CRC_LEN, EXCEPTION_FLAG, EXCEPTION_RESPONSE_LEN, FC_READ_HOLDING_REGISTERS,
    FC_WRITE_SINGLE_REGISTER, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS, MIN_READ_RESPONSE_LEN,
    WRITE_ACK_LEN,
};
use super::pdu::{ModbusPdu, PduBuilder};
use crate::error::FrameError;
use crate::registers::ADDRESS_SPACE_END;

type Result<T> = std::result::Result<T, FrameError>;

/// CRC16/Modbus: reflected polynomial 0xA001, initial value 0xFFFF
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Space-separated upper-case hex, e.g. `01 03 05 CE`
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A sealed RTU frame (slave id + PDU + CRC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    fn seal(slave_id: u8, pdu: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + pdu.len() + CRC_LEN);
        bytes.push(slave_id);
        bytes.extend_from_slice(pdu);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        Frame(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slave_id(&self) -> u8 {
        self.0[0]
    }

    pub fn function_code(&self) -> u8 {
        self.0[1]
    }

    /// Register address field shared by FC03/FC06/FC16 requests
    pub fn address(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    /// The CRC carried in the trailing two bytes
    pub fn crc(&self) -> u16 {
        let n = self.0.len();
        u16::from_le_bytes([self.0[n - 2], self.0[n - 1]])
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_dump(&self.0))
    }
}

/// Builds requests for and parses replies from one slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    slave_id: u8,
}

impl FrameCodec {
    pub fn new(slave_id: u8) -> Self {
        Self { slave_id }
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    /// FC03 Read Holding Registers
    pub fn encode_read(&self, address: u16, count: u16) -> Result<Frame> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(FrameError::InvalidRange(format!(
                "read count {} outside 1..={}",
                count, MAX_READ_REGISTERS
            )));
        }
        let end = u32::from(address) + u32::from(count);
        if end > u32::from(ADDRESS_SPACE_END) {
            return Err(FrameError::InvalidRange(format!(
                "read of {} registers at {} ends past register space ({})",
                count, address, ADDRESS_SPACE_END
            )));
        }

        let pdu = PduBuilder::read_holding(address, count)?;
        Ok(self.seal(pdu.as_slice()))
    }

    /// FC06 Write Single Register
    pub fn encode_write_single(&self, address: u16, value: u16) -> Frame {
        let [addr_hi, addr_lo] = address.to_be_bytes();
        let [value_hi, value_lo] = value.to_be_bytes();
        self.seal(&[FC_WRITE_SINGLE_REGISTER, addr_hi, addr_lo, value_hi, value_lo])
    }

    /// FC16 Write Multiple Registers
    pub fn encode_write_multiple(&self, address: u16, values: &[u16]) -> Result<Frame> {
        if values.is_empty() || values.len() > usize::from(MAX_WRITE_REGISTERS) {
            return Err(FrameError::InvalidRange(format!(
                "write count {} outside 1..={}",
                values.len(),
                MAX_WRITE_REGISTERS
            )));
        }

        let pdu = PduBuilder::write_multiple(address, values)?;
        Ok(self.seal(pdu.as_slice()))
    }

    fn seal(&self, pdu: &[u8]) -> Frame {
        let frame = Frame::seal(self.slave_id, pdu);
        debug!(
            "Building RTU frame: slave={}, FC={:02X} ({}), PDU_len={}, CRC={:04X}",
            self.slave_id,
            frame.function_code(),
            ModbusPdu::function_code_description(frame.function_code()),
            pdu.len(),
            frame.crc()
        );
        frame
    }

    /// Parse an FC03 response into big-endian register values
    pub fn decode_read_response(bytes: &[u8], expected_slave_id: u8) -> Result<Vec<u16>> {
        if bytes.len() < MIN_READ_RESPONSE_LEN {
            return Err(FrameError::ShortFrame {
                len: bytes.len(),
                min: MIN_READ_RESPONSE_LEN,
            });
        }
        verify_crc(bytes)?;
        check_header(bytes, expected_slave_id, FC_READ_HOLDING_REGISTERS)?;

        let byte_count = usize::from(bytes[2]);
        let payload = &bytes[3..bytes.len() - CRC_LEN];
        if byte_count != payload.len() || byte_count % 2 != 0 {
            return Err(FrameError::ByteCountMismatch {
                declared: byte_count,
                actual: payload.len(),
            });
        }

        Ok(payload
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Check an FC06/FC16 acknowledgement
    ///
    /// Only slave id and function code are compared; the echoed address,
    /// value or count is not, since some firmware revisions do not echo
    /// exact values.
    pub fn decode_write_ack(
        bytes: &[u8],
        expected_slave_id: u8,
        expected_function: u8,
    ) -> Result<()> {
        if bytes.len() < EXCEPTION_RESPONSE_LEN {
            return Err(FrameError::ShortFrame {
                len: bytes.len(),
                min: WRITE_ACK_LEN,
            });
        }
        verify_crc(bytes)?;
        check_header(bytes, expected_slave_id, expected_function)?;
        if bytes.len() < WRITE_ACK_LEN {
            return Err(FrameError::ShortFrame {
                len: bytes.len(),
                min: WRITE_ACK_LEN,
            });
        }

        if bytes.len() > WRITE_ACK_LEN {
            debug!("Write ack longer than expected: {} bytes", bytes.len());
        }
        Ok(())
    }
}

fn verify_crc(bytes: &[u8]) -> Result<()> {
    let split = bytes.len() - CRC_LEN;
    let expected = crc16(&bytes[..split]);
    let actual = u16::from_le_bytes([bytes[split], bytes[split + 1]]);
    if expected != actual {
        warn!("CRC mismatch on [{}]", hex_dump(bytes));
        return Err(FrameError::CrcMismatch { expected, actual });
    }
    Ok(())
}

fn check_exception(bytes: &[u8], expected_function: u8) -> Result<()> {
    if bytes[1] == expected_function | EXCEPTION_FLAG {
        return Err(FrameError::Exception {
            function: expected_function,
            code: bytes[2],
        });
    }
    Ok(())
}

fn check_header(bytes: &[u8], expected_slave_id: u8, expected_function: u8) -> Result<()> {
    if bytes[0] != expected_slave_id {
        return Err(FrameError::SlaveMismatch {
            expected: expected_slave_id,
            actual: bytes[0],
        });
    }
    check_exception(bytes, expected_function)?;
    if bytes[1] != expected_function {
        return Err(FrameError::FunctionMismatch {
            expected: expected_function,
            actual: bytes[1],
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::modbus::constants::FC_WRITE_MULTIPLE_REGISTERS;

    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc16(body).to_le_bytes());
        frame
    }

    #[test]
    fn test_crc16_known_vectors() {
        // Standard check value for CRC-16/MODBUS
        assert_eq!(crc16(b"123456789"), 0x4B37);
        assert_eq!(crc16(&[]), 0xFFFF);
        // Read 1 holding register at 0 from slave 1
        let frame = with_crc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(&frame[6..], &[0x84, 0x0A]);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x01, 0x03, 0xAB]), "01 03 AB");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_encode_read() {
        let codec = FrameCodec::new(1);
        let frame = codec.encode_read(1546, 6).unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(&bytes[..6], &[0x01, 0x03, 0x06, 0x0A, 0x00, 0x06]);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.slave_id(), 1);
        assert_eq!(frame.function_code(), FC_READ_HOLDING_REGISTERS);
        assert_eq!(frame.address(), 1546);
        assert_eq!(frame.crc(), crc16(&bytes[..6]));
    }

    #[test]
    fn test_encode_read_invalid_range() {
        let codec = FrameCodec::new(1);
        assert!(matches!(
            codec.encode_read(1546, 0),
            Err(FrameError::InvalidRange(_))
        ));
        assert!(matches!(
            codec.encode_read(1618, 4),
            Err(FrameError::InvalidRange(_))
        ));
        assert!(matches!(
            codec.encode_read(0, 126),
            Err(FrameError::InvalidRange(_))
        ));
        assert!(codec.encode_read(1618, 3).is_ok());
    }

    #[test]
    fn test_encode_write_single() {
        let frame = FrameCodec::new(1).encode_write_single(1486, 1000);
        let bytes = frame.as_bytes();
        assert_eq!(&bytes[..6], &[0x01, 0x06, 0x05, 0xCE, 0x03, 0xE8]);
        assert_eq!(frame.crc(), crc16(&bytes[..6]));
    }

    #[test]
    fn test_encode_write_multiple_layout() {
        let frame = FrameCodec::new(2)
            .encode_write_multiple(1522, &[0x0102, 0x0304])
            .unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(
            &bytes[..11],
            &[0x02, 0x10, 0x05, 0xF2, 0x00, 0x02, 0x04, 0x01, 0x02, 0x03, 0x04]
        );
        assert_eq!(bytes.len(), 13);
        assert_eq!(frame.crc(), crc16(&bytes[..11]));
    }

    #[test]
    fn test_encode_write_multiple_empty() {
        assert!(matches!(
            FrameCodec::new(1).encode_write_multiple(1486, &[]),
            Err(FrameError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_crc_round_trip_over_encoded_frames() {
        let codec = FrameCodec::new(0x11);
        let frames = vec![
            codec.encode_read(1000, 1).unwrap(),
            codec.encode_read(1612, 3).unwrap(),
            codec.encode_write_single(1009, 1),
            codec.encode_write_multiple(1498, &[0, 250, 500, 750, 1000, 1]).unwrap(),
        ];
        for frame in frames {
            let bytes = frame.as_bytes();
            let independent = crc16(&bytes[..bytes.len() - 2]);
            assert_eq!(frame.crc(), independent, "frame [{}]", frame);
        }
    }

    #[test]
    fn test_decode_read_response() {
        let response = with_crc(&[0x01, 0x03, 0x04, 0x03, 0xE8, 0x00, 0x00]);
        let values = FrameCodec::decode_read_response(&response, 1).unwrap();
        assert_eq!(values, vec![1000, 0]);
    }

    #[test]
    fn test_decode_read_response_short() {
        assert_eq!(
            FrameCodec::decode_read_response(&[0x01, 0x03, 0x00, 0x00], 1),
            Err(FrameError::ShortFrame { len: 4, min: 5 })
        );
    }

    #[test]
    fn test_decode_read_response_slave_mismatch() {
        let response = with_crc(&[0x02, 0x03, 0x02, 0x00, 0x01]);
        assert_eq!(
            FrameCodec::decode_read_response(&response, 1),
            Err(FrameError::SlaveMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_decode_read_response_function_mismatch() {
        let response = with_crc(&[0x01, 0x04, 0x02, 0x00, 0x01]);
        assert_eq!(
            FrameCodec::decode_read_response(&response, 1),
            Err(FrameError::FunctionMismatch {
                expected: 0x03,
                actual: 0x04
            })
        );
    }

    #[test]
    fn test_decode_read_response_byte_count_mismatch() {
        let response = with_crc(&[0x01, 0x03, 0x04, 0x00, 0x01]);
        assert_eq!(
            FrameCodec::decode_read_response(&response, 1),
            Err(FrameError::ByteCountMismatch {
                declared: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_decode_exception_response() {
        let response = with_crc(&[0x01, 0x83, 0x02]);
        assert_eq!(
            FrameCodec::decode_read_response(&response, 1),
            Err(FrameError::Exception {
                function: 0x03,
                code: 0x02
            })
        );

        let response = with_crc(&[0x01, 0x90, 0x03]);
        assert_eq!(
            FrameCodec::decode_write_ack(&response, 1, FC_WRITE_MULTIPLE_REGISTERS),
            Err(FrameError::Exception {
                function: 0x10,
                code: 0x03
            })
        );
    }

    #[test]
    fn test_single_byte_corruption_is_crc_mismatch() {
        let valid = with_crc(&[0x01, 0x03, 0x06, 0x07, 0x00, 0x02, 0x03, 0x00, 0x05]);
        assert!(FrameCodec::decode_read_response(&valid, 1).is_ok());

        for index in 0..valid.len() {
            for flip in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = valid.clone();
                corrupted[index] ^= flip;
                let result = FrameCodec::decode_read_response(&corrupted, 1);
                assert!(
                    matches!(result, Err(FrameError::CrcMismatch { .. })),
                    "byte {} ^ {:02X} gave {:?}",
                    index,
                    flip,
                    result
                );
            }
        }
    }

    #[test]
    fn test_decode_write_ack_single() {
        let request = FrameCodec::new(1).encode_write_single(1004, 1);
        // FC06 reply echoes the request
        let ack = FrameCodec::decode_write_ack(request.as_bytes(), 1, FC_WRITE_SINGLE_REGISTER);
        assert!(ack.is_ok());
    }

    #[test]
    fn test_decode_write_ack_ignores_echoed_fields() {
        // Echo carries a different address/count than what was written
        let ack = with_crc(&[0x01, 0x10, 0x00, 0x00, 0x00, 0x01]);
        assert!(FrameCodec::decode_write_ack(&ack, 1, FC_WRITE_MULTIPLE_REGISTERS).is_ok());
    }

    #[test]
    fn test_decode_write_ack_errors() {
        let ack = with_crc(&[0x01, 0x10, 0x05, 0xCE, 0x00, 0x06]);
        assert_eq!(
            FrameCodec::decode_write_ack(&ack, 2, FC_WRITE_MULTIPLE_REGISTERS),
            Err(FrameError::SlaveMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            FrameCodec::decode_write_ack(&ack, 1, FC_WRITE_SINGLE_REGISTER),
            Err(FrameError::FunctionMismatch {
                expected: 0x06,
                actual: 0x10
            })
        );
        assert!(matches!(
            FrameCodec::decode_write_ack(&ack[..4], 1, FC_WRITE_MULTIPLE_REGISTERS),
            Err(FrameError::ShortFrame { len: 4, .. })
        ));

        let short = with_crc(&[0x01, 0x10, 0x05, 0xCE]);
        assert!(matches!(
            FrameCodec::decode_write_ack(&short, 1, FC_WRITE_MULTIPLE_REGISTERS),
            Err(FrameError::ShortFrame { len: 6, min: 8 })
        ));
    }

    #[test]
    fn test_decode_write_ack_foreign_exception() {
        // Exception from another slave on the bus is not ours to report
        let reply = with_crc(&[0x02, 0x90, 0x02]);
        assert_eq!(
            FrameCodec::decode_write_ack(&reply, 1, FC_WRITE_MULTIPLE_REGISTERS),
            Err(FrameError::SlaveMismatch {
                expected: 1,
                actual: 2
            })
        );

        let reply = with_crc(&[0x02, 0x86, 0x04]);
        assert_eq!(
            FrameCodec::decode_write_ack(&reply, 1, FC_WRITE_SINGLE_REGISTER),
            Err(FrameError::SlaveMismatch {
                expected: 1,
                actual: 2
            })
        );
    }
}
