//! Serial RTU transport

use std::time::Duration;

use async_trait::async_trait;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, warn};

use super::constants::{DEFAULT_INTER_BYTE_TIMEOUT, RTU_BUFFER_SIZE};
use super::frame::{hex_dump, Frame};
use super::transport::{receive_frame, send_frame, Transport};
use crate::error::TransportError;

type Result<T> = std::result::Result<T, TransportError>;

/// Serial line settings; the hand always runs 8-N-1 without flow control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialParams {
    pub device: String,
    pub baud_rate: u32,
    pub inter_byte_timeout: Duration,
}

impl SerialParams {
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            inter_byte_timeout: DEFAULT_INTER_BYTE_TIMEOUT,
        }
    }
}

/// Owns the serial port while a session is open
pub struct SerialTransport {
    params: SerialParams,
    port: Option<SerialStream>,
    buffer: [u8; RTU_BUFFER_SIZE],
}

impl SerialTransport {
    pub fn new(params: SerialParams) -> Self {
        Self {
            params,
            port: None,
            buffer: [0; RTU_BUFFER_SIZE],
        }
    }

    pub fn params(&self) -> &SerialParams {
        &self.params
    }

    async fn exchange(
        port: &mut SerialStream,
        buffer: &mut [u8],
        frame: &Frame,
        response_timeout: Duration,
        inter_byte_timeout: Duration,
    ) -> Result<Vec<u8>> {
        // Leftovers from an earlier timed-out exchange would corrupt this reply
        if let Err(e) = port.clear(tokio_serial::ClearBuffer::Input) {
            warn!("RTU clear input: {}", e);
        }

        send_frame(port, frame).await?;
        receive_frame(port, buffer, response_timeout, inter_byte_timeout).await
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let SerialParams {
            device, baud_rate, ..
        } = &self.params;
        debug!("RTU: {} @{}baud", device, baud_rate);

        match tokio_serial::new(device.as_str(), *baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
        {
            Ok(port) => {
                info!("RTU opened: {}", device);
                self.port = Some(port);
                Ok(())
            },
            Err(e) => {
                error!("RTU err: {} - {}", device, e);
                Err(TransportError::Open {
                    device: device.clone(),
                    reason: e.to_string(),
                })
            },
        }
    }

    async fn disconnect(&mut self) {
        if self.port.take().is_some() {
            info!("RTU closed: {}", self.params.device);
        }
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn endpoint(&self) -> String {
        self.params.device.clone()
    }

    async fn send_and_receive(&mut self, frame: &Frame, timeout: Duration) -> Result<Vec<u8>> {
        let inter_byte_timeout = self.params.inter_byte_timeout;
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;

        debug!("[{}] TX: [{}]", self.params.device, frame);
        let result =
            Self::exchange(port, &mut self.buffer, frame, timeout, inter_byte_timeout).await;

        match &result {
            Ok(reply) => debug!("[{}] RX: [{}]", self.params.device, hex_dump(reply)),
            Err(e) if e.closes_session() => {
                warn!("RTU dropping port {}: {}", self.params.device, e);
                self.port = None;
            },
            Err(_) => {},
        }
        result
    }
}
