//! Predefined hand gestures
//!
//! Each gesture is a short sequence of driver writes with settle pauses in
//! between. A failure midway leaves the hand wherever it got to.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::driver::HandDriver;
use crate::error::{Result, ValidationError};
use crate::modbus::Transport;
use crate::registers::MAX_VALUE;
use crate::types::FingerId;

/// Rotation that puts the thumb beside the closed fingers
pub const THUMB_SIDE_ANGLE: u16 = 500;

/// Force threshold used when the caller does not pick one
pub const DEFAULT_GESTURE_FORCE: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Thumb and index closed against each other
    Pinch,
    /// Index extended, everything else closed
    Point,
    /// Thumb up, fingers curled
    ThumbsUp,
    /// Every finger closed
    Grip,
}

impl Gesture {
    pub const ALL: [Gesture; 4] = [
        Gesture::Pinch,
        Gesture::Point,
        Gesture::ThumbsUp,
        Gesture::Grip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gesture::Pinch => "pinch",
            Gesture::Point => "point",
            Gesture::ThumbsUp => "thumbs_up",
            Gesture::Grip => "grip",
        }
    }

    /// Whether the force threshold is applied by this gesture
    pub fn uses_force(self) -> bool {
        matches!(self, Gesture::Pinch | Gesture::Grip)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gesture {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Gesture::ALL
            .into_iter()
            .find(|g| g.name() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown gesture '{}' (expected pinch, point, thumbs_up or grip)",
                    s
                )
            })
    }
}

impl<T: Transport> HandDriver<T> {
    /// Run a gesture; `force` only matters for pinch and grip
    pub async fn perform(&mut self, gesture: Gesture, force: u16) -> Result<()> {
        if gesture.uses_force() && force > MAX_VALUE {
            return Err(ValidationError::ValueOutOfRange {
                value: force,
                max: MAX_VALUE,
            }
            .into());
        }
        info!("Gesture: {}", gesture);

        match gesture {
            Gesture::Pinch => {
                self.open_all_fingers().await?;
                self.settle().await;
                self.settle().await;
                self.set_all_forces(force).await?;
                self.close_fingers(&[FingerId::ThumbBend, FingerId::Index])
                    .await
            },
            Gesture::Point => {
                self.open_all_fingers().await?;
                self.settle().await;
                self.close_fingers(&[
                    FingerId::Little,
                    FingerId::Ring,
                    FingerId::Middle,
                    FingerId::ThumbBend,
                ])
                .await
            },
            Gesture::ThumbsUp => {
                self.open_all_fingers().await?;
                self.settle().await;
                self.close_fingers(&[
                    FingerId::Little,
                    FingerId::Ring,
                    FingerId::Middle,
                    FingerId::Index,
                ])
                .await?;
                self.set_finger_angle(FingerId::ThumbRotate, THUMB_SIDE_ANGLE)
                    .await
            },
            Gesture::Grip => {
                self.set_all_forces(force).await?;
                self.close_all_fingers().await
            },
        }
    }

    async fn close_fingers(&mut self, fingers: &[FingerId]) -> Result<()> {
        for &id in fingers {
            self.finger(id)?.close().await?;
        }
        Ok(())
    }
}
