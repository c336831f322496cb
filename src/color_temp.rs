//! Conversions between correlated color temperature and RGB.
//!
//! [`kelvin_to_rgb`] is Neil Bartlett's piecewise `a + b*x + c*ln(x)` curve fit
//! of the black-body RGB table. [`rgb_to_kelvin`] inverts it with a bisection
//! on the blue/red ratio, which grows monotonically with temperature.

use crate::types::Color;

/// Lower bound of the estimator's search range.
pub const SEARCH_MIN_KELVIN: f64 = 1000.0;
/// Upper bound of the estimator's search range.
pub const SEARCH_MAX_KELVIN: f64 = 40000.0;
const EPSILON: f64 = 0.4;

/// Approximate the RGB color of a black body at `kelvin`.
///
/// # Examples
///
/// ```
/// use govee_lan_rs::{Color, color_temp::kelvin_to_rgb};
///
/// assert_eq!(kelvin_to_rgb(4000.0), Color::rgb(255, 208, 164));
/// ```
pub fn kelvin_to_rgb(kelvin: f64) -> Color {
    let temperature = kelvin / 100.0;

    let red = if temperature < 66.0 {
        255.0
    } else {
        let x = temperature - 55.0;
        351.976_905_668_056_93 + 0.114_206_453_784_165 * x - 40.253_663_093_321_27 * x.ln()
    };

    let green = if temperature < 66.0 {
        let x = temperature - 2.0;
        -155.254_855_627_091_79 - 0.445_969_504_695_791_33 * x + 104.492_161_993_938_88 * x.ln()
    } else {
        let x = temperature - 50.0;
        325.449_412_571_197_4 + 0.079_434_565_366_623_42 * x - 28.085_296_350_795_7 * x.ln()
    };

    let blue = if temperature >= 66.0 {
        255.0
    } else if temperature <= 20.0 {
        0.0
    } else {
        let x = temperature - 10.0;
        -254.769_351_841_209_02 + 0.827_409_606_400_739_5 * x + 115.679_944_010_661_47 * x.ln()
    };

    Color::rgb(to_channel(red), to_channel(green), to_channel(blue))
}

fn to_channel(value: f64) -> u8 {
    // NaN (ln of a non-positive x for nonsensical inputs) maps to 0
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round() as u8
}

/// Estimate the color temperature whose RGB approximation matches `color`.
///
/// The search keeps halving `[1000, 40000]` until it is narrower than 0.4 K.
/// Colors with no red channel have no meaningful ratio and end up at the upper
/// bound.
///
/// # Examples
///
/// ```
/// use govee_lan_rs::{Color, color_temp::rgb_to_kelvin};
///
/// assert_eq!(rgb_to_kelvin(&Color::rgb(255, 208, 164)), 4000);
/// assert_eq!(rgb_to_kelvin(&Color::rgb(255, 0, 0)), 1000);
/// ```
pub fn rgb_to_kelvin(color: &Color) -> u32 {
    let target = color.blue as f64 / color.red as f64;
    let mut low = SEARCH_MIN_KELVIN;
    let mut high = SEARCH_MAX_KELVIN;
    let mut temperature = 0.0;

    while high - low > EPSILON {
        temperature = (high + low) / 2.0;
        let probe = kelvin_to_rgb(temperature);
        if probe.blue as f64 / probe.red as f64 >= target {
            high = temperature;
        } else {
            low = temperature;
        }
    }

    temperature.round() as u32
}
