//! Modbus RTU constants

use std::time::Duration;

/// Read Holding Registers
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
/// Write Single Register
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
/// Write Multiple Registers
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Maximum PDU size (function code + data)
pub const MAX_PDU_SIZE: usize = 253;

/// Max registers per FC03 request
pub const MAX_READ_REGISTERS: u16 = 125;
/// Max registers per FC16 request
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// `[slave, fc, byte_count, crc_lo, crc_hi]`
pub const MIN_READ_RESPONSE_LEN: usize = 5;
/// `[slave, fc, code, crc_lo, crc_hi]`
pub const EXCEPTION_RESPONSE_LEN: usize = 5;
/// FC06 echo and FC16 header acknowledgement
pub const WRITE_ACK_LEN: usize = 8;
pub const CRC_LEN: usize = 2;

/// Receive buffer: max RTU ADU (256) plus slack to detect oversize replies
pub const RTU_BUFFER_SIZE: usize = 260;

/// Line-idle gap that terminates a response frame
pub const DEFAULT_INTER_BYTE_TIMEOUT: Duration = Duration::from_millis(50);
