//! Power state for light control.

use serde::{Deserialize, Serialize};

/// Power state for a light.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// The light is on
    On,
    /// The light is off
    #[default]
    Off,
}

impl PowerState {
    /// Value used by the `turn` command and the `onOff` status field.
    pub fn value(&self) -> u8 {
        match self {
            PowerState::On => 1,
            PowerState::Off => 0,
        }
    }

    pub fn from_value(value: u8) -> Self {
        if value == 0 {
            PowerState::Off
        } else {
            PowerState::On
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, PowerState::On)
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on { PowerState::On } else { PowerState::Off }
    }
}
