//! Brightness control for Govee lights.

use serde::{Deserialize, Serialize};

/// Brightness level from 0 to 100 percent.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Brightness {
    pub(crate) value: u8,
}

impl Brightness {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Clamp any integer into the valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use govee_lan_rs::Brightness;
    ///
    /// assert_eq!(Brightness::clamped(150).value(), 100);
    /// assert_eq!(Brightness::clamped(-5).value(), 0);
    /// assert_eq!(Brightness::clamped(42).value(), 42);
    /// ```
    pub fn clamped(value: i64) -> Self {
        Brightness {
            value: value.clamp(Self::MIN as i64, Self::MAX as i64) as u8,
        }
    }
}
