//! Transport abstraction
//!
//! A transport owns one link to one device and performs strictly one
//! request/response exchange at a time. Retry policy is left to callers.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, error};

use super::frame::Frame;
use crate::error::TransportError;

type Result<T> = std::result::Result<T, TransportError>;

#[async_trait]
pub trait Transport: Send {
    /// Open the link; no-op when already open
    async fn connect(&mut self) -> Result<()>;

    /// Close the link; idempotent
    async fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Human-readable endpoint for logs (e.g. the serial device path)
    fn endpoint(&self) -> String;

    /// Write one frame, then receive one reply
    ///
    /// Fails with `NoResponse` when nothing arrives within `timeout`; the link
    /// stays open in that case.
    async fn send_and_receive(&mut self, frame: &Frame, timeout: Duration) -> Result<Vec<u8>>;
}

/// Write a complete frame and flush it onto the line
pub async fn send_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(frame.as_bytes()).await.map_err(|e| {
        error!("RTU TX: {}", e);
        TransportError::Io(format!("Serial send error: {e}"))
    })?;
    writer.flush().await.map_err(|e| {
        error!("RTU flush: {}", e);
        TransportError::Io(format!("Serial flush error: {e}"))
    })?;
    debug!("RTU TX: {}B", frame.len());
    Ok(())
}

/// Receive one RTU frame
///
/// Waits up to `response_timeout` for the first bytes, then keeps reading
/// until the line stays idle for `inter_byte_timeout`.
pub async fn receive_frame<R>(
    reader: &mut R,
    buffer: &mut [u8],
    response_timeout: Duration,
    inter_byte_timeout: Duration,
) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut total_bytes = match timeout(response_timeout, reader.read(buffer)).await {
        Ok(Ok(0)) => {
            error!("RTU closed");
            return Err(TransportError::Closed);
        },
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            error!("RTU RX: {}", e);
            return Err(TransportError::Io(format!("Serial read error: {e}")));
        },
        Err(_) => {
            debug!("RTU timeout: no response in {:?}", response_timeout);
            return Err(TransportError::NoResponse(response_timeout));
        },
    };

    loop {
        if total_bytes >= buffer.len() {
            error!("RTU overflow: {}B", total_bytes);
            return Err(TransportError::Overflow(total_bytes));
        }

        match timeout(inter_byte_timeout, reader.read(&mut buffer[total_bytes..])).await {
            // End of stream after data: hand back what arrived
            Ok(Ok(0)) => break,
            Ok(Ok(bytes)) => total_bytes += bytes,
            Ok(Err(e)) => {
                error!("RTU RX: {}", e);
                return Err(TransportError::Io(format!("Serial read error: {e}")));
            },
            // Line idle - frame complete
            Err(_) => break,
        }
    }

    debug!("RTU RX: {}B", total_bytes);
    Ok(buffer[..total_bytes].to_vec())
}
