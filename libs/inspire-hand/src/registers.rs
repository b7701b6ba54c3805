//! Register map of the Inspire hand
//!
//! Addresses are the device's documented holding-register addresses and must be
//! reproduced exactly. No other module hardcodes an address.

use std::fmt;

use crate::types::{FingerId, FINGER_COUNT};

/// Dexterous hand ID (read-only, single register)
pub const HAND_ID: u16 = 1000;
/// Error clearance
pub const CLEAR_ERROR: u16 = 1004;
/// Save parameters to flash
pub const SAVE: u16 = 1005;
/// Restore factory defaults
pub const RESET_PARA: u16 = 1006;
/// Force sensor calibration
pub const FORCE_SENSOR_CALIB: u16 = 1009;

pub const DEFAULT_SPEED_SET: u16 = 1032;
pub const DEFAULT_FORCE_SET: u16 = 1044;

pub const POS_SET: u16 = 1474;
pub const ANGLE_SET: u16 = 1486;
pub const FORCE_SET: u16 = 1498;
pub const SPEED_SET: u16 = 1522;

pub const POS_ACT: u16 = 1534;
pub const ANGLE_ACT: u16 = 1546;
pub const FORCE_ACT: u16 = 1582;
pub const CURRENT: u16 = 1594;
pub const ERROR: u16 = 1606;
pub const STATUS: u16 = 1612;
pub const TEMP: u16 = 1618;

/// Registers a wide block spans (one per finger)
pub const WIDE_REGISTERS: u16 = FINGER_COUNT as u16;
/// Registers a packed block spans (two fingers per register)
pub const PACKED_REGISTERS: u16 = (FINGER_COUNT / 2) as u16;

/// First address past the hand's register space
pub const ADDRESS_SPACE_END: u16 = TEMP + PACKED_REGISTERS;

/// Command value written to system command registers
pub const COMMAND_TRIGGER: u16 = 1;

/// Upper bound of every writable per-finger value
pub const MAX_VALUE: u16 = 1000;

/// Per-finger addressing of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One 16-bit register per finger, single writes at `base + finger * 2`
    Wide,
    /// One byte per finger, two fingers per register (low byte = even finger)
    Packed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Static description of one register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBlock {
    pub address: u16,
    pub layout: Layout,
    pub access: Access,
}

impl RegisterBlock {
    const fn wide(address: u16, access: Access) -> Self {
        Self {
            address,
            layout: Layout::Wide,
            access,
        }
    }

    const fn packed(address: u16) -> Self {
        Self {
            address,
            layout: Layout::Packed,
            access: Access::ReadOnly,
        }
    }

    /// Number of registers covering all six fingers
    pub fn register_count(&self) -> u16 {
        match self.layout {
            Layout::Wide => WIDE_REGISTERS,
            Layout::Packed => PACKED_REGISTERS,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    /// Address of a single finger's slot; `None` for packed blocks and for ALL
    pub fn finger_address(&self, finger: FingerId) -> Option<u16> {
        match self.layout {
            Layout::Wide => finger.index().map(|i| self.address + (i as u16) * 2),
            Layout::Packed => None,
        }
    }
}

/// Logical per-finger quantities exposed by the hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    PositionSet,
    AngleSet,
    ForceSet,
    SpeedSet,
    DefaultSpeedSet,
    DefaultForceSet,
    PositionActual,
    AngleActual,
    ForceActual,
    Current,
    Error,
    Status,
    Temperature,
}

impl Quantity {
    pub const ALL: [Quantity; 13] = [
        Quantity::PositionSet,
        Quantity::AngleSet,
        Quantity::ForceSet,
        Quantity::SpeedSet,
        Quantity::DefaultSpeedSet,
        Quantity::DefaultForceSet,
        Quantity::PositionActual,
        Quantity::AngleActual,
        Quantity::ForceActual,
        Quantity::Current,
        Quantity::Error,
        Quantity::Status,
        Quantity::Temperature,
    ];

    pub fn block(self) -> RegisterBlock {
        use Access::{ReadOnly, ReadWrite};
        match self {
            Quantity::PositionSet => RegisterBlock::wide(POS_SET, ReadWrite),
            Quantity::AngleSet => RegisterBlock::wide(ANGLE_SET, ReadWrite),
            Quantity::ForceSet => RegisterBlock::wide(FORCE_SET, ReadWrite),
            Quantity::SpeedSet => RegisterBlock::wide(SPEED_SET, ReadWrite),
            Quantity::DefaultSpeedSet => RegisterBlock::wide(DEFAULT_SPEED_SET, ReadWrite),
            Quantity::DefaultForceSet => RegisterBlock::wide(DEFAULT_FORCE_SET, ReadWrite),
            Quantity::PositionActual => RegisterBlock::wide(POS_ACT, ReadOnly),
            Quantity::AngleActual => RegisterBlock::wide(ANGLE_ACT, ReadOnly),
            Quantity::ForceActual => RegisterBlock::wide(FORCE_ACT, ReadOnly),
            Quantity::Current => RegisterBlock::wide(CURRENT, ReadOnly),
            Quantity::Error => RegisterBlock::packed(ERROR),
            Quantity::Status => RegisterBlock::packed(STATUS),
            Quantity::Temperature => RegisterBlock::packed(TEMP),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Quantity::PositionSet => "POS_SET",
            Quantity::AngleSet => "ANGLE_SET",
            Quantity::ForceSet => "FORCE_SET",
            Quantity::SpeedSet => "SPEED_SET",
            Quantity::DefaultSpeedSet => "DEFAULT_SPEED_SET",
            Quantity::DefaultForceSet => "DEFAULT_FORCE_SET",
            Quantity::PositionActual => "POS_ACT",
            Quantity::AngleActual => "ANGLE_ACT",
            Quantity::ForceActual => "FORCE_ACT",
            Quantity::Current => "CURRENT",
            Quantity::Error => "ERROR",
            Quantity::Status => "STATUS",
            Quantity::Temperature => "TEMP",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Single-register system commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommand {
    ClearError,
    Save,
    RestoreDefaults,
    ForceSensorCalibrate,
}

impl SystemCommand {
    pub fn address(self) -> u16 {
        match self {
            SystemCommand::ClearError => CLEAR_ERROR,
            SystemCommand::Save => SAVE,
            SystemCommand::RestoreDefaults => RESET_PARA,
            SystemCommand::ForceSensorCalibrate => FORCE_SENSOR_CALIB,
        }
    }
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemCommand::ClearError => "CLEAR_ERROR",
            SystemCommand::Save => "SAVE",
            SystemCommand::RestoreDefaults => "RESET_PARA",
            SystemCommand::ForceSensorCalibrate => "FORCE_SENSOR_CALIB",
        };
        f.write_str(name)
    }
}
