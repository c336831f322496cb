//! Color temperature control.

use serde::{Deserialize, Serialize};

/// Color temperature in Kelvin as accepted by the `colorwc` command.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light. Typical values:
/// - 2700K: Warm white (incandescent-like)
/// - 4000K: Neutral white
/// - 6500K: Daylight
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Kelvin {
    pub(crate) kelvin: u32,
}

impl Kelvin {
    pub const MIN: u32 = 1000;
    pub const MAX: u32 = 9000;

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u32 {
        self.kelvin
    }

    /// Clamp a value into the valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use govee_lan_rs::Kelvin;
    ///
    /// assert_eq!(Kelvin::clamped(200).kelvin(), 1000);
    /// assert_eq!(Kelvin::clamped(12000).kelvin(), 9000);
    /// ```
    pub fn clamped(kelvin: u32) -> Self {
        Kelvin {
            kelvin: kelvin.clamp(Self::MIN, Self::MAX),
        }
    }
}
