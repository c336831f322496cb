//! Color transitions between two RGB colors.
//!
//! Intermediate colors are produced by adding a fixed per-channel delta to a
//! running value. The running value is kept as a float and folded back into
//! `[0, 255]` with a triangular wave ([`fold`]) instead of being saturated, so a
//! channel that drifts past an edge bounces back rather than sticking to it.

use std::iter::FusedIterator;

use crate::types::Color;

/// Smallest number of steps a fade can have: source, one midpoint, destination.
pub const MIN_STEPS: u64 = 3;
/// Largest number of steps accepted by [`crate::Device::fade_to_color`].
pub const MAX_STEPS: u64 = 100_000_000;

const CHANNEL_MAX: f64 = 255.0;

/// Reflect `value` into `[0, max]` with a triangular wave.
///
/// Values above `2 * max` wrap modulo `2 * max` first, values in `(max, 2 * max]`
/// fold back downwards and negative values fold upwards symmetrically.
///
/// # Examples
///
/// ```
/// use govee_lan_rs::fade::fold;
///
/// assert_eq!(fold(100.0, 255.0), 100.0);
/// assert_eq!(fold(300.0, 255.0), 210.0);
/// assert_eq!(fold(-10.0, 255.0), 10.0);
/// assert_eq!(fold(600.0, 255.0), 90.0);
/// ```
pub fn fold(mut value: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return value.clamp(0.0, max);
    }
    let period = max * 2.0;
    if value > period || value < 0.0 {
        value = value.rem_euclid(period);
    }
    if value > max { period - value } else { value }
}

/// Iterator over the colors of a fade, created by [`fade`].
///
/// Colors are computed lazily; a long fade never holds more than one color.
#[derive(Debug, Clone)]
pub struct Fade {
    from: Color,
    to: Color,
    steps: u64,
    emitted: u64,
    delta: [f64; 3],
    current: [f64; 3],
}

/// Build the `steps` colors leading from `from` to `to`.
///
/// The first color is exactly `from` and the last is exactly `to`. `steps`
/// below [`MIN_STEPS`] is raised to it.
///
/// # Examples
///
/// ```
/// use govee_lan_rs::{Color, fade::fade};
///
/// let colors: Vec<Color> = fade(3, Color::BLACK, Color::WHITE).collect();
/// assert_eq!(colors, vec![Color::BLACK, Color::rgb(128, 128, 128), Color::WHITE]);
/// ```
pub fn fade(steps: u64, from: Color, to: Color) -> Fade {
    let steps = steps.max(MIN_STEPS);
    let intervals = (steps - 1) as f64;
    let start = channels(&from);
    let end = channels(&to);

    Fade {
        from,
        to,
        steps,
        emitted: 0,
        delta: [
            (end[0] - start[0]) / intervals,
            (end[1] - start[1]) / intervals,
            (end[2] - start[2]) / intervals,
        ],
        current: start,
    }
}

fn channels(color: &Color) -> [f64; 3] {
    [color.red as f64, color.green as f64, color.blue as f64]
}

impl Iterator for Fade {
    type Item = Color;

    fn next(&mut self) -> Option<Color> {
        if self.emitted >= self.steps {
            return None;
        }
        self.emitted += 1;

        if self.emitted == 1 {
            return Some(self.from);
        }
        if self.emitted == self.steps {
            return Some(self.to);
        }

        for (value, delta) in self.current.iter_mut().zip(self.delta) {
            *value = fold(*value + delta, CHANNEL_MAX);
        }
        let [r, g, b] = self.current;
        Some(Color::rgb(
            r.round() as u8,
            g.round() as u8,
            b.round() as u8,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.steps - self.emitted).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Fade {}

impl FusedIterator for Fade {}
