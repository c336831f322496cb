//! # govee_lan_rs
//!
//! An async Rust library for discovering and controlling Govee smart lights
//! over the Govee LAN API.
//!
//! This crate provides a **runtime-agnostic** async API. A [`Registry`] joins
//! the Govee multicast group, discovers devices on the local network and keeps
//! an in-memory [`DeviceState`] for each of them in sync with the physical
//! device, despite UDP giving no delivery guarantee.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use govee_lan_rs::{Registry, RegistryOptions};
//!
//! // Works with any async runtime!
//! async fn control_light() -> Result<(), govee_lan_rs::Error> {
//!     let registry = Registry::new(RegistryOptions::default());
//!     registry.start().await?;
//!
//!     // Wait for the first device to answer the scan
//!     let device = registry.get_device(None).await?;
//!     device.sync_now().await?;
//!
//!     device.turn_on().await?;
//!     device.set_brightness(60).await?;
//!     device.fade_to_color("#ff8800", 50, Duration::from_secs(2)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Discovery**: Periodic multicast scans; devices that change address are followed
//! - **State Sync**: Status replies are merged field by field into [`DeviceState`]
//! - **RGB Colors**: Set any color from a [`Color`], a tuple or a CSS-like string
//! - **Brightness**: Control brightness from 0-100% using [`Brightness`]
//! - **Color Temperature**: Set white from 1000K to 9000K using [`Kelvin`]
//! - **Fades**: Smooth transitions with [`fade::fade`] and [`Device::fade_to_color`]
//! - **Events**: Subscribe to discovery and state changes with [`Registry::subscribe`]
//! - **Actions**: Random fades and flashes in [`actions`]
//!
//! ## Communication
//!
//! Scan requests are multicast to `239.255.255.250:4001`; commands are sent to
//! each device on port 4001 and replies are received on port 4002. Commands
//! are never acknowledged: local state is updated optimistically once a
//! command is sent, then reconciled with the next status reply.
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using feature flags:
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! govee-lan-rs = "0.1"
//! tokio = { version = "1", features = ["rt-multi-thread", "macros"] }
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! govee-lan-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! async-std = { version = "1.12", features = ["attributes"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! govee-lan-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! smol = "2"
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

pub mod actions;
pub mod color_temp;
mod device;
mod errors;
mod events;
pub mod fade;
mod message;
mod model;
mod registry;
pub mod runtime;
mod status;
pub mod transport;
mod types;

// Re-export public API
pub use device::{Device, MAX_FADE_DURATION, MIN_FADE_DURATION, SYNC_RETRY_INTERVAL, Versions};
pub use errors::Error;
pub use events::{Event, Events};
pub use message::{ColorWc, Command, CommandKind, Inbound, ScanData, StatusReport};
pub use model::DeviceModel;
pub use registry::{Registry, RegistryOptions};
pub use status::{DeviceState, LastChanged};
pub use transport::Transport;
pub use types::{Brightness, Color, IntoColor, Kelvin, PowerState};
