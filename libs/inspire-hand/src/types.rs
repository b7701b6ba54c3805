//! Hand domain types: finger ids, status codes, error flags

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ValidationError;

/// Number of actuators on the hand
pub const FINGER_COUNT: usize = 6;

/// Actuator identifier
///
/// `All` is a sentinel meaning "every finger" and never maps to a register
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerId {
    Little = 0,
    Ring = 1,
    Middle = 2,
    Index = 3,
    ThumbBend = 4,
    ThumbRotate = 5,
    All = 6,
}

impl FingerId {
    /// The six physical fingers in register order
    pub const FINGERS: [FingerId; FINGER_COUNT] = [
        FingerId::Little,
        FingerId::Ring,
        FingerId::Middle,
        FingerId::Index,
        FingerId::ThumbBend,
        FingerId::ThumbRotate,
    ];

    /// Register index of a physical finger, `None` for `All`
    pub fn index(self) -> Option<usize> {
        match self {
            FingerId::All => None,
            finger => Some(finger as usize),
        }
    }

    /// Register index, rejecting the `All` sentinel
    pub fn single(self) -> Result<usize, ValidationError> {
        self.index().ok_or(ValidationError::AllFingersNotAllowed)
    }

    /// Lower-case display name, e.g. "thumb bend"
    pub fn name(self) -> &'static str {
        match self {
            FingerId::Little => "little",
            FingerId::Ring => "ring",
            FingerId::Middle => "middle",
            FingerId::Index => "index",
            FingerId::ThumbBend => "thumb bend",
            FingerId::ThumbRotate => "thumb rotate",
            FingerId::All => "all",
        }
    }
}

impl TryFrom<u8> for FingerId {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FingerId::Little),
            1 => Ok(FingerId::Ring),
            2 => Ok(FingerId::Middle),
            3 => Ok(FingerId::Index),
            4 => Ok(FingerId::ThumbBend),
            5 => Ok(FingerId::ThumbRotate),
            6 => Ok(FingerId::All),
            other => Err(ValidationError::FingerOutOfRange(other)),
        }
    }
}

impl FromStr for FingerId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "little" => Ok(FingerId::Little),
            "ring" => Ok(FingerId::Ring),
            "middle" => Ok(FingerId::Middle),
            "index" => Ok(FingerId::Index),
            "thumb_bend" => Ok(FingerId::ThumbBend),
            "thumb_rotate" => Ok(FingerId::ThumbRotate),
            "all" => Ok(FingerId::All),
            _ => match normalized.parse::<u8>() {
                Ok(id) => FingerId::try_from(id),
                Err(_) => Err(ValidationError::UnknownFinger(s.to_string())),
            },
        }
    }
}

impl fmt::Display for FingerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-finger motion status
///
/// Code 4 is not documented; it and any other unknown code decode to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerStatus {
    Unclenching,
    Grasping,
    ReachedTarget,
    ReachedForce,
    CurrentProtection,
    LockedRotor,
    Fault,
    Other(u8),
}

impl FingerStatus {
    pub fn code(self) -> u8 {
        match self {
            FingerStatus::Unclenching => 0,
            FingerStatus::Grasping => 1,
            FingerStatus::ReachedTarget => 2,
            FingerStatus::ReachedForce => 3,
            FingerStatus::CurrentProtection => 5,
            FingerStatus::LockedRotor => 6,
            FingerStatus::Fault => 7,
            FingerStatus::Other(code) => code,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, FingerStatus::Other(_))
    }
}

impl From<u8> for FingerStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => FingerStatus::Unclenching,
            1 => FingerStatus::Grasping,
            2 => FingerStatus::ReachedTarget,
            3 => FingerStatus::ReachedForce,
            5 => FingerStatus::CurrentProtection,
            6 => FingerStatus::LockedRotor,
            7 => FingerStatus::Fault,
            other => FingerStatus::Other(other),
        }
    }
}

impl fmt::Display for FingerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerStatus::Unclenching => f.write_str("UNCLENCHING"),
            FingerStatus::Grasping => f.write_str("GRASPING"),
            FingerStatus::ReachedTarget => f.write_str("REACHED_TARGET"),
            FingerStatus::ReachedForce => f.write_str("REACHED_FORCE"),
            FingerStatus::CurrentProtection => f.write_str("CURRENT_PROTECTION"),
            FingerStatus::LockedRotor => f.write_str("LOCKED_ROTOR"),
            FingerStatus::Fault => f.write_str("FAULT"),
            FingerStatus::Other(code) => write!(f, "RESERVED({})", code),
        }
    }
}

/// Actuator error bitmask; several bits may be set at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ErrorFlags(pub u8);

impl ErrorFlags {
    pub const LOCKED_ROTOR: u8 = 0x01;
    pub const OVER_TEMPERATURE: u8 = 0x02;
    pub const OVER_CURRENT: u8 = 0x04;
    pub const ABNORMAL_OPERATION: u8 = 0x08;
    pub const COMMUNICATION_ERROR: u8 = 0x10;

    const DOCUMENTED: u8 = 0x1F;

    const NAMES: [(u8, &'static str); 5] = [
        (Self::LOCKED_ROTOR, "LOCKED_ROTOR"),
        (Self::OVER_TEMPERATURE, "OVER_TEMPERATURE"),
        (Self::OVER_CURRENT, "OVER_CURRENT"),
        (Self::ABNORMAL_OPERATION, "ABNORMAL_OPERATION"),
        (Self::COMMUNICATION_ERROR, "COMMUNICATION_ERROR"),
    ];

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    /// Names of the documented bits that are set
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| name)
    }
}

impl From<u8> for ErrorFlags {
    fn from(bits: u8) -> Self {
        ErrorFlags(bits)
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut parts: Vec<String> = self.names().map(str::to_string).collect();
        let undocumented = self.0 & !Self::DOCUMENTED;
        if undocumented != 0 {
            parts.push(format!("0x{:02X}", undocumented));
        }
        f.write_str(&parts.join("|"))
    }
}

/// All per-finger readings captured in one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandSnapshot {
    pub angles: [u16; FINGER_COUNT],
    pub forces: [u16; FINGER_COUNT],
    pub statuses: [FingerStatus; FINGER_COUNT],
    pub errors: [ErrorFlags; FINGER_COUNT],
    pub temperatures: [u8; FINGER_COUNT],
}
