//! Hand Device Driver
//!
//! Maps typed hand operations onto register reads and writes. Every
//! operation validates its input before touching the wire, then requires an
//! open session. Exactly one request is outstanding at a time, enforced by
//! `&mut self`.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{FrameError, Result, TransportError, ValidationError};
use crate::modbus::{
    Frame, FrameCodec, Transport, FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER,
};
use crate::registers::{
    Layout, Quantity, RegisterBlock, SystemCommand, COMMAND_TRIGGER, HAND_ID, MAX_VALUE,
};
use crate::types::{ErrorFlags, FingerId, FingerStatus, HandSnapshot, FINGER_COUNT};

/// Angle of a fully opened finger
pub const OPEN_ANGLE: u16 = 1000;
/// Angle of a fully closed finger
pub const CLOSED_ANGLE: u16 = 0;

/// Timing knobs for one driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// How long to wait for the first reply byte
    pub response_timeout: Duration,
    /// Pause after triggering force sensor calibration
    pub calibration_settle: Duration,
    /// Pause between the stages of a gesture
    pub gesture_settle: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(1000),
            calibration_settle: Duration::from_secs(6),
            gesture_settle: Duration::from_millis(500),
        }
    }
}

/// Driver for one hand on one transport
pub struct HandDriver<T: Transport> {
    transport: T,
    codec: FrameCodec,
    options: DriverOptions,
}

impl<T: Transport> HandDriver<T> {
    /// Create a closed driver; call [`connect`](Self::connect) before any I/O
    pub fn new(transport: T, slave_id: u8) -> Self {
        Self::with_options(transport, slave_id, DriverOptions::default())
    }

    pub fn with_options(transport: T, slave_id: u8, options: DriverOptions) -> Self {
        Self {
            transport,
            codec: FrameCodec::new(slave_id),
            options,
        }
    }

    pub fn slave_id(&self) -> u8 {
        self.codec.slave_id()
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Open the session; no-op when already open
    pub async fn connect(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        self.transport.connect().await?;
        info!(
            "Hand connected: {} (slave {})",
            self.transport.endpoint(),
            self.slave_id()
        );
        Ok(())
    }

    /// Close the session; idempotent
    pub async fn disconnect(&mut self) {
        if self.transport.is_connected() {
            self.transport.disconnect().await;
            info!("Hand disconnected: {}", self.transport.endpoint());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Move one finger to `angle` (0 closed, 1000 open)
    pub async fn set_finger_angle(&mut self, finger: FingerId, angle: u16) -> Result<()> {
        self.set_finger_value(Quantity::AngleSet, finger, angle).await
    }

    pub async fn set_finger_speed(&mut self, finger: FingerId, speed: u16) -> Result<()> {
        self.set_finger_value(Quantity::SpeedSet, finger, speed).await
    }

    /// Set one finger's force threshold
    pub async fn set_finger_force(&mut self, finger: FingerId, force: u16) -> Result<()> {
        self.set_finger_value(Quantity::ForceSet, finger, force).await
    }

    pub async fn set_finger_position(&mut self, finger: FingerId, position: u16) -> Result<()> {
        self.set_finger_value(Quantity::PositionSet, finger, position).await
    }

    /// Write one finger's slot of a writable quantity
    ///
    /// The slot lives at `base + finger * 2`.
    pub async fn set_finger_value(
        &mut self,
        quantity: Quantity,
        finger: FingerId,
        value: u16,
    ) -> Result<()> {
        let block = writable_block(quantity)?;
        finger.single()?;
        check_value(value)?;
        let address = block
            .finger_address(finger)
            .ok_or(ValidationError::AllFingersNotAllowed)?;

        debug!("Set {} {} = {}", finger, quantity, value);
        self.write_register(address, value).await
    }

    /// Write the same value to every finger of a writable quantity
    pub async fn set_all(&mut self, quantity: Quantity, value: u16) -> Result<()> {
        self.set_all_values(quantity, [value; FINGER_COUNT]).await
    }

    /// Write six per-finger values of a writable quantity in one request
    pub async fn set_all_values(
        &mut self,
        quantity: Quantity,
        values: [u16; FINGER_COUNT],
    ) -> Result<()> {
        let block = writable_block(quantity)?;
        for &value in &values {
            check_value(value)?;
        }

        debug!("Set all {} = {:?}", quantity, values);
        self.write_registers(block.address, &values).await
    }

    pub async fn open_all_fingers(&mut self) -> Result<()> {
        self.set_all(Quantity::AngleSet, OPEN_ANGLE).await
    }

    pub async fn close_all_fingers(&mut self) -> Result<()> {
        self.set_all(Quantity::AngleSet, CLOSED_ANGLE).await
    }

    pub async fn set_all_speeds(&mut self, speed: u16) -> Result<()> {
        self.set_all(Quantity::SpeedSet, speed).await
    }

    pub async fn set_all_forces(&mut self, force: u16) -> Result<()> {
        self.set_all(Quantity::ForceSet, force).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read all six values of a quantity
    ///
    /// Packed quantities come back as three registers, low byte first.
    pub async fn read_quantity(&mut self, quantity: Quantity) -> Result<[u16; FINGER_COUNT]> {
        let block = quantity.block();
        let registers = self
            .read_registers(block.address, block.register_count())
            .await?;
        Ok(unpack(&block, &registers))
    }

    /// Actual finger angles
    pub async fn read_angles(&mut self) -> Result<[u16; FINGER_COUNT]> {
        self.read_quantity(Quantity::AngleActual).await
    }

    /// Actual actuator positions
    pub async fn read_positions(&mut self) -> Result<[u16; FINGER_COUNT]> {
        self.read_quantity(Quantity::PositionActual).await
    }

    /// Force sensor readings
    pub async fn read_forces(&mut self) -> Result<[u16; FINGER_COUNT]> {
        self.read_quantity(Quantity::ForceActual).await
    }

    pub async fn read_currents(&mut self) -> Result<[u16; FINGER_COUNT]> {
        self.read_quantity(Quantity::Current).await
    }

    pub async fn read_errors(&mut self) -> Result<[ErrorFlags; FINGER_COUNT]> {
        let raw = self.read_quantity(Quantity::Error).await?;
        Ok(raw.map(|v| ErrorFlags::from(v as u8)))
    }

    pub async fn read_statuses(&mut self) -> Result<[FingerStatus; FINGER_COUNT]> {
        let raw = self.read_quantity(Quantity::Status).await?;
        Ok(raw.map(|v| FingerStatus::from(v as u8)))
    }

    /// Actuator temperatures in degrees Celsius
    pub async fn read_temperatures(&mut self) -> Result<[u8; FINGER_COUNT]> {
        let raw = self.read_quantity(Quantity::Temperature).await?;
        Ok(raw.map(|v| v as u8))
    }

    pub async fn read_hand_id(&mut self) -> Result<u16> {
        let values = self.read_registers(HAND_ID, 1).await?;
        Ok(values[0])
    }

    /// Capture angles, forces, statuses, errors and temperatures
    pub async fn snapshot(&mut self) -> Result<HandSnapshot> {
        Ok(HandSnapshot {
            angles: self.read_angles().await?,
            forces: self.read_forces().await?,
            statuses: self.read_statuses().await?,
            errors: self.read_errors().await?,
            temperatures: self.read_temperatures().await?,
        })
    }

    // ========================================================================
    // System commands
    // ========================================================================

    /// Clear actuator errors
    pub async fn reset(&mut self) -> Result<()> {
        self.send_command(SystemCommand::ClearError).await
    }

    /// Persist the current parameters to the hand's flash
    pub async fn save_settings(&mut self) -> Result<()> {
        self.send_command(SystemCommand::Save).await
    }

    pub async fn restore_factory_defaults(&mut self) -> Result<()> {
        self.send_command(SystemCommand::RestoreDefaults).await
    }

    /// Calibrate the force sensors and wait for the hand to finish
    ///
    /// The fingers must not touch anything while this runs; nothing checks it.
    pub async fn calibrate_force_sensors(&mut self) -> Result<()> {
        self.send_command(SystemCommand::ForceSensorCalibrate).await?;
        info!(
            "Force sensor calibration started, waiting {:?}",
            self.options.calibration_settle
        );
        tokio::time::sleep(self.options.calibration_settle).await;
        Ok(())
    }

    async fn send_command(&mut self, command: SystemCommand) -> Result<()> {
        info!("Command: {}", command);
        self.write_register(command.address(), COMMAND_TRIGGER).await
    }

    pub(crate) async fn settle(&self) {
        tokio::time::sleep(self.options.gesture_settle).await;
    }

    // ========================================================================
    // Register access
    // ========================================================================

    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let request = self.codec.encode_read(address, count)?;
        let reply = self.exchange(&request).await?;
        let values = FrameCodec::decode_read_response(&reply, self.slave_id())?;

        if values.len() != usize::from(count) {
            return Err(FrameError::ByteCountMismatch {
                declared: usize::from(count) * 2,
                actual: values.len() * 2,
            }
            .into());
        }
        Ok(values)
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        let request = self.codec.encode_write_single(address, value);
        let reply = self.exchange(&request).await?;
        FrameCodec::decode_write_ack(&reply, self.slave_id(), FC_WRITE_SINGLE_REGISTER)?;
        Ok(())
    }

    async fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        let request = self.codec.encode_write_multiple(address, values)?;
        let reply = self.exchange(&request).await?;
        FrameCodec::decode_write_ack(&reply, self.slave_id(), FC_WRITE_MULTIPLE_REGISTERS)?;
        Ok(())
    }

    async fn exchange(&mut self, request: &Frame) -> Result<Vec<u8>> {
        if !self.transport.is_connected() {
            return Err(TransportError::NotConnected.into());
        }

        match self
            .transport
            .send_and_receive(request, self.options.response_timeout)
            .await
        {
            Ok(reply) => Ok(reply),
            Err(e) => {
                if e.closes_session() {
                    warn!("Session lost on {}: {}", self.transport.endpoint(), e);
                    self.transport.disconnect().await;
                } else if matches!(e, TransportError::NoResponse(_)) {
                    warn!(
                        "No response from slave {} (FC={:02X} @{})",
                        self.slave_id(),
                        request.function_code(),
                        request.address()
                    );
                }
                Err(e.into())
            },
        }
    }
}

fn check_value(value: u16) -> std::result::Result<(), ValidationError> {
    if value > MAX_VALUE {
        return Err(ValidationError::ValueOutOfRange {
            value,
            max: MAX_VALUE,
        });
    }
    Ok(())
}

fn writable_block(quantity: Quantity) -> std::result::Result<RegisterBlock, ValidationError> {
    let block = quantity.block();
    if !block.is_writable() {
        return Err(ValidationError::ReadOnly(quantity));
    }
    Ok(block)
}

/// Spread raw registers over six finger slots
fn unpack(block: &RegisterBlock, registers: &[u16]) -> [u16; FINGER_COUNT] {
    let mut values = [0u16; FINGER_COUNT];
    match block.layout {
        Layout::Wide => {
            for (slot, &register) in values.iter_mut().zip(registers) {
                *slot = register;
            }
        },
        // Even finger in the low byte, odd finger in the high byte
        Layout::Packed => {
            for (pair, &register) in values.chunks_exact_mut(2).zip(registers) {
                pair[0] = register & 0x00FF;
                pair[1] = register >> 8;
            }
        },
    }
    values
}
