//! Value types for light control parameters.

mod brightness;
mod color;
mod kelvin;
mod power;

pub use brightness::Brightness;
pub use color::{Color, IntoColor};
pub use kelvin::Kelvin;
pub use power::PowerState;
