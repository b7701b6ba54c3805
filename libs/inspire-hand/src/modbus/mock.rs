//! In-memory transport for tests and dry runs
//!
//! Answers FC03/FC06/FC16 requests from a simulated register image, unless a
//! scripted reply is queued, in which case the script wins.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::constants::{
    CRC_LEN, EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS,
    FC_WRITE_SINGLE_REGISTER,
};
use super::frame::{crc16, hex_dump, Frame};
use super::transport::Transport;
use crate::error::TransportError;

type Result<T> = std::result::Result<T, TransportError>;

/// Modbus exception code for an unsupported function
const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// One scripted reaction to the next request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Reply with exactly these bytes
    Bytes(Vec<u8>),
    /// Say nothing; the exchange times out
    Silence,
    /// Fail the link; the transport disconnects
    IoError(String),
}

#[derive(Debug, Default)]
pub struct MockTransport {
    connected: bool,
    connect_count: usize,
    fail_connect: bool,
    sent: Vec<Frame>,
    script: VecDeque<MockReply>,
    registers: BTreeMap<u16, u16>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next unanswered request
    pub fn push_reply(&mut self, reply: MockReply) {
        self.script.push_back(reply);
    }

    /// Make subsequent `connect` calls fail
    pub fn fail_connect(&mut self, fail: bool) {
        self.fail_connect = fail;
    }

    /// Seed consecutive registers starting at `address`
    pub fn set_registers(&mut self, address: u16, values: &[u16]) {
        for (offset, &value) in values.iter().enumerate() {
            self.registers.insert(address + offset as u16, value);
        }
    }

    pub fn register(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    pub fn registers(&self, address: u16, count: u16) -> Vec<u16> {
        (address..address + count).map(|a| self.register(a)).collect()
    }

    pub fn sent_frames(&self) -> &[Frame] {
        &self.sent
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.sent.last()
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count
    }

    fn simulate(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        if request.len() < 4 + CRC_LEN {
            return None;
        }
        let body = &request[..request.len() - CRC_LEN];
        let slave = body[0];
        let function = body[1];
        let address = u16::from_be_bytes([body[2], body[3]]);
        let field = |i: usize| u16::from_be_bytes([body[i], body[i + 1]]);

        let reply = match function {
            FC_READ_HOLDING_REGISTERS if body.len() >= 6 => {
                let values = self.registers(address, field(4));
                let mut reply = vec![slave, function, (values.len() * 2) as u8];
                for value in values {
                    reply.extend_from_slice(&value.to_be_bytes());
                }
                reply
            },
            FC_WRITE_SINGLE_REGISTER if body.len() >= 6 => {
                self.registers.insert(address, field(4));
                body.to_vec()
            },
            FC_WRITE_MULTIPLE_REGISTERS if body.len() >= 7 => {
                let count = field(4);
                for i in 0..count {
                    let offset = 7 + usize::from(i) * 2;
                    if offset + 1 < body.len() {
                        self.registers.insert(address + i, field(offset));
                    }
                }
                body[..6].to_vec()
            },
            _ => vec![slave, function | EXCEPTION_FLAG, EXCEPTION_ILLEGAL_FUNCTION],
        };
        Some(seal(reply))
    }
}

fn seal(mut body: Vec<u8>) -> Vec<u8> {
    let crc = crc16(&body);
    body.extend_from_slice(&crc.to_le_bytes());
    body
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        if self.fail_connect {
            return Err(TransportError::Open {
                device: self.endpoint(),
                reason: "simulated open failure".to_string(),
            });
        }
        self.connected = true;
        self.connect_count += 1;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }

    async fn send_and_receive(&mut self, frame: &Frame, timeout: Duration) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.sent.push(frame.clone());
        debug!("[mock] TX: [{}]", frame);

        match self.script.pop_front() {
            Some(MockReply::Bytes(bytes)) => Ok(bytes),
            Some(MockReply::Silence) => Err(TransportError::NoResponse(timeout)),
            Some(MockReply::IoError(reason)) => {
                self.connected = false;
                Err(TransportError::Io(reason))
            },
            None => match self.simulate(frame.as_bytes()) {
                Some(reply) => {
                    debug!("[mock] RX: [{}]", hex_dump(&reply));
                    Ok(reply)
                },
                None => Err(TransportError::NoResponse(timeout)),
            },
        }
    }
}
