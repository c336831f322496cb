//! Device state tracking.

use std::time::SystemTime;

use log::trace;
use serde::Serialize;

use crate::color_temp::rgb_to_kelvin;
use crate::message::StatusReport;
use crate::types::{Brightness, Color, PowerState};

/// Which of color or color temperature was set most recently.
///
/// Used to restore the right attribute when reverting a device to a
/// previous state.
#[derive(Debug, Default, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LastChanged {
    #[default]
    Unset,
    Color,
    Temperature,
}

/// Last known state of a device.
///
/// Command operations update this optimistically right after sending, so it
/// is a prediction until the next status reply confirms or corrects it.
#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Serialize, Clone, PartialEq)]
pub struct DeviceState {
    pub power: PowerState,
    pub brightness: Brightness,
    pub color: Color,
    /// Color temperature in Kelvin; `0` until known.
    pub color_temperature: u32,
    /// When the last status reply was applied.
    pub last_update: Option<SystemTime>,
    /// When a status reply last changed a field.
    pub last_state_change: Option<SystemTime>,
    pub last_changed: LastChanged,
    /// Whether at least one status reply has been applied.
    pub synchronized: bool,
}

impl DeviceState {
    /// Off, zero brightness, black, no temperature, never synchronized.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.power.is_on()
    }

    /// Merge a status reply field by field.
    ///
    /// Returns whether the state changed, which is always the case for the
    /// first reply.
    pub(crate) fn apply(&mut self, report: &StatusReport) -> bool {
        let mut changed = false;

        let power = report.power();
        if self.power != power {
            self.power = power;
            changed = true;
        }

        let brightness = Brightness::clamped(report.brightness as i64);
        if self.brightness != brightness {
            self.brightness = brightness;
            changed = true;
        }

        if self.color != report.color {
            self.color = report.color;
            self.last_changed = LastChanged::Color;
            changed = true;
        }

        match report.reported_temperature() {
            Some(kelvin) => {
                if self.color_temperature != kelvin {
                    self.color_temperature = kelvin;
                    self.last_changed = LastChanged::Temperature;
                    changed = true;
                }
            }
            None => {
                // Derived values do not claim the last-changed marker
                let kelvin = rgb_to_kelvin(&report.color);
                if self.color_temperature != kelvin {
                    self.color_temperature = kelvin;
                    changed = true;
                }
            }
        }

        let now = SystemTime::now();
        let first = !self.synchronized;
        if changed || first {
            self.last_state_change = Some(now);
            self.synchronized = true;
        }
        self.last_update = Some(now);

        trace!("applied status {report:?}, changed: {changed}");
        changed || first
    }
}
