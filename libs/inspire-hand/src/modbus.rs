//! Modbus RTU Protocol Layer
//!
//! This module provides the wire-level pieces the hand driver is built on:
//! - Function codes FC03 (read holding), FC06 (write single), FC16 (write multiple)
//! - RTU frame encoding/decoding with CRC16
//! - Serial transport over tokio-serial
//!
//! # Architecture
//!
//! ```text
//! inspire-hand/modbus
//!     ├── PduBuilder / ModbusPdu (function code + payload)
//!     ├── FrameCodec (slave id + PDU + CRC)
//!     ├── Transport (send one frame, receive one reply)
//!     │     ├── SerialTransport (tokio-serial)
//!     │     └── MockTransport (in-memory, feature "mock")
//!     └── constants
//! ```

mod connection;
mod constants;
mod frame;
#[cfg(feature = "mock")]
mod mock;
mod pdu;
mod transport;

pub use connection::{SerialParams, SerialTransport};
pub use constants::{
    DEFAULT_INTER_BYTE_TIMEOUT, FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS,
    FC_WRITE_SINGLE_REGISTER, MAX_PDU_SIZE, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS,
    MIN_READ_RESPONSE_LEN, RTU_BUFFER_SIZE, WRITE_ACK_LEN,
};
pub use frame::{crc16, hex_dump, Frame, FrameCodec};
#[cfg(feature = "mock")]
pub use mock::{MockReply, MockTransport};
pub use pdu::{ModbusPdu, PduBuilder};
pub use transport::{receive_frame, send_frame, Transport};
