//! Per-finger view over a [`HandDriver`]
//!
//! Getters read the whole six-value block and pick this finger's slot.

use crate::driver::{HandDriver, CLOSED_ANGLE, OPEN_ANGLE};
use crate::error::{Result, ValidationError};
use crate::modbus::Transport;
use crate::types::{ErrorFlags, FingerId, FingerStatus};

/// One actuator, borrowed from its driver
pub struct Finger<'a, T: Transport> {
    driver: &'a mut HandDriver<T>,
    id: FingerId,
    index: usize,
}

impl<T: Transport> HandDriver<T> {
    /// Borrow a single finger; `FingerId::All` is rejected
    pub fn finger(&mut self, id: FingerId) -> std::result::Result<Finger<'_, T>, ValidationError> {
        let index = id.single()?;
        Ok(Finger {
            driver: self,
            id,
            index,
        })
    }
}

impl<T: Transport> Finger<'_, T> {
    pub fn id(&self) -> FingerId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub async fn angle(&mut self) -> Result<u16> {
        Ok(self.driver.read_angles().await?[self.index])
    }

    pub async fn set_angle(&mut self, angle: u16) -> Result<()> {
        self.driver.set_finger_angle(self.id, angle).await
    }

    pub async fn force(&mut self) -> Result<u16> {
        Ok(self.driver.read_forces().await?[self.index])
    }

    pub async fn status(&mut self) -> Result<FingerStatus> {
        Ok(self.driver.read_statuses().await?[self.index])
    }

    pub async fn error(&mut self) -> Result<ErrorFlags> {
        Ok(self.driver.read_errors().await?[self.index])
    }

    /// Temperature in degrees Celsius
    pub async fn temperature(&mut self) -> Result<u8> {
        Ok(self.driver.read_temperatures().await?[self.index])
    }

    pub async fn open(&mut self) -> Result<()> {
        self.set_angle(OPEN_ANGLE).await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.set_angle(CLOSED_ANGLE).await
    }

    /// Same as [`set_angle`](Self::set_angle)
    pub async fn move_to(&mut self, angle: u16) -> Result<()> {
        self.set_angle(angle).await
    }
}
