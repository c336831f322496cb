//! Scripted effects built on the device command operations.

use std::future::Future;
use std::time::Duration;

use log::debug;
use rand::Rng;

use crate::device::Device;
use crate::errors::Error;
use crate::runtime;
use crate::status::LastChanged;
use crate::types::Color;

type Result<T> = std::result::Result<T, Error>;

/// A uniformly random color.
///
/// With `Some(true)` only light colors are returned, with `Some(false)` only
/// dark ones, judged by [`Color::is_light`].
///
/// # Examples
///
/// ```
/// use govee_lan_rs::actions::random_color;
///
/// assert!(random_color(Some(true)).is_light());
/// assert!(random_color(Some(false)).is_dark());
/// ```
pub fn random_color(light: Option<bool>) -> Color {
    let mut rng = rand::thread_rng();
    loop {
        let color = Color::rgb(
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
        );
        if light.is_none_or(|light| color.is_light() == light) {
            return color;
        }
    }
}

/// Fade to a random color, starting from `last` or the current color.
///
/// Returns the color faded to.
pub async fn fade_random(
    device: &Device,
    steps: u64,
    duration: Duration,
    last: Option<Color>,
) -> Result<Color> {
    let from = last.unwrap_or_else(|| device.color());
    let to = random_color(None);
    device.fade_between(from, to, steps, duration).await?;
    Ok(to)
}

/// Keep fading to random colors while `keep_going` resolves to `true`.
///
/// Each fade starts from the color the previous one ended on.
pub async fn loop_fade_random<F, Fut>(
    device: &Device,
    steps: u64,
    duration: Duration,
    mut keep_going: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut last = None;
    loop {
        last = Some(fade_random(device, steps, duration, last).await?);
        if !keep_going().await {
            return Ok(());
        }
    }
}

/// Flash `color` on and off `times` times, then restore the previous state.
///
/// The device state is synchronized first. Afterwards the power is restored,
/// and the color or temperature, whichever was set last.
pub async fn flash_color(
    device: &Device,
    color: Color,
    times: u32,
    off: Duration,
    on: Duration,
) -> Result<()> {
    device.sync_now().await?;
    let previous = device.state();
    debug!("flashing {} with {color} {times} times", device.id());

    device.turn_off().await?;
    device.set_color(color, None).await?;
    for _ in 0..times {
        device.turn_off().await?;
        runtime::sleep(off).await;
        device.turn_on().await?;
        runtime::sleep(on).await;
    }

    if !previous.is_on() {
        device.turn_off().await?;
    }
    match previous.last_changed {
        LastChanged::Color => device.set_color(previous.color, None).await,
        LastChanged::Temperature => {
            device
                .set_color_temperature(previous.color_temperature)
                .await
        }
        LastChanged::Unset => Ok(()),
    }
}
