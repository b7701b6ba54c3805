//! Inspire Hand Driver
//!
//! Modbus RTU driver for the Inspire RH56 six-actuator robotic hand.
//!
//! # Layers
//!
//! - [`modbus`]: RTU frame codec, CRC16 and the serial [`Transport`]
//! - [`registers`]: the hand's register map
//! - [`HandDriver`]: typed finger, block and system-command operations
//! - [`Finger`] / [`Gesture`]: per-actuator view and canned gestures
//! - [`HandConfig`]: layered configuration (defaults, file, environment)
//!
//! # Example
//!
//! ```no_run
//! use inspire_hand::{FingerId, HandConfig, HandDriver, SerialTransport};
//!
//! # async fn run() -> inspire_hand::Result<()> {
//! let config = HandConfig::load(None)?;
//! let transport = SerialTransport::new(config.serial_params());
//! let mut hand = HandDriver::with_options(transport, config.slave_id, config.driver_options());
//!
//! hand.connect().await?;
//! hand.open_all_fingers().await?;
//! hand.set_finger_angle(FingerId::Index, 250).await?;
//! let angles = hand.read_angles().await?;
//! hand.disconnect().await;
//! # let _ = angles;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod finger;
pub mod gesture;
pub mod modbus;
pub mod registers;
pub mod types;

pub use config::HandConfig;
pub use driver::{DriverOptions, HandDriver};
pub use error::{FrameError, HandError, Result, TransportError, ValidationError};
pub use finger::Finger;
pub use gesture::Gesture;
#[cfg(feature = "mock")]
pub use modbus::MockTransport;
pub use modbus::{SerialParams, SerialTransport, Transport};
pub use registers::{Quantity, SystemCommand};
pub use types::{ErrorFlags, FingerId, FingerStatus, HandSnapshot, FINGER_COUNT};
