//! CLI application for controlling Govee lights.
//!
//! This example demonstrates a command-line interface built on the device
//! registry: every command first discovers devices on the LAN, then acts on
//! the requested one.
//!
//! Run with: cargo run --example govee_cli -- --help
//! Set RUST_LOG=debug to see the traffic.

use clap::{Parser, Subcommand};
use futures::StreamExt;
use govee_lan_rs::{Color, Device, Event, Registry, RegistryOptions, actions};
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "govee-cli")]
#[command(about = "Control Govee smart lights over the LAN API", long_about = None)]
struct Cli {
    /// Device identity to control (the first device found when omitted)
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Local interface address to listen on
    #[arg(short, long, global = true)]
    listen: Option<Ipv4Addr>,

    /// How long to wait for devices, in seconds
    #[arg(short, long, global = true, default_value = "5")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover all Govee devices on the network
    Discover,

    /// Get the current status of the device
    Status,

    /// Turn the device on
    On,

    /// Turn the device off
    Off,

    /// Set brightness (0-100, out of range values are clamped)
    Brightness {
        #[arg(allow_hyphen_values = true)]
        level: i64,
    },

    /// Set a color: "r,g,b", "#rrggbb", "rgb(r, g, b)", "hsl(h, s%, l%)" or a CSS color name
    Color {
        color: String,
        /// Also set the brightness
        #[arg(short, long)]
        brightness: Option<i64>,
    },

    /// Set color temperature in Kelvin (clamped to 1000-9000)
    Temperature { kelvin: u32 },

    /// Fade to a color
    Fade {
        color: String,
        /// Number of colors sent along the way
        #[arg(short, long, default_value = "30")]
        steps: u64,
        /// Duration of the fade in milliseconds
        #[arg(short = 'm', long, default_value = "2000")]
        duration: u64,
    },

    /// Flash a color, then restore the previous state
    Flash {
        color: String,
        #[arg(short = 'n', long, default_value = "3")]
        times: u32,
        /// Off and on time in milliseconds
        #[arg(short, long, default_value = "300")]
        period: u64,
    },

    /// Print registry events until interrupted
    Listen,
}

async fn select_device(registry: &Registry, cli: &Cli) -> Result<Device, Box<dyn std::error::Error>> {
    let device = registry
        .get_device_timeout(cli.device.as_deref(), Duration::from_secs(cli.timeout))
        .await?;
    println!("Using {} ({}, {}) at {}", device.id(), device.model(), device.name(), device.ip());
    Ok(device)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let registry = Registry::new(RegistryOptions {
        listen_to: cli.listen,
        // Only the listener wants the periodic status heartbeat
        auto_update: matches!(cli.command, Commands::Listen),
        ..Default::default()
    });
    // Subscribe before starting so early events are not missed
    let mut events = registry.subscribe();
    registry.start().await?;

    match &cli.command {
        Commands::Discover => {
            println!("Discovering Govee devices (timeout: {}s)...", cli.timeout);
            tokio::time::sleep(Duration::from_secs(cli.timeout)).await;

            let devices = registry.devices();
            if devices.is_empty() {
                println!("No devices found on the network.");
            } else {
                println!("\nFound {} device(s):", devices.len());
                for device in devices {
                    println!(
                        "  {:15}  {}  {} ({}){}",
                        device.ip().to_string(),
                        device.id(),
                        device.model(),
                        device.name(),
                        if device.supported() { "" } else { " [unsupported]" }
                    );
                }
            }
        }

        Commands::Status => {
            let device = select_device(&registry, &cli).await?;
            device.sync_now().await?;
            let state = device.state();
            println!("\nDevice Status:");
            println!("  Power: {}", if state.is_on() { "ON" } else { "OFF" });
            println!("  Brightness: {}%", state.brightness.value());
            println!("  Color: {}", state.color);
            println!("  Temperature: {}K", state.color_temperature);
            println!("  Last changed: {:?}", state.last_changed);
        }

        Commands::On => {
            select_device(&registry, &cli).await?.turn_on().await?;
            println!("Device turned ON");
        }

        Commands::Off => {
            select_device(&registry, &cli).await?.turn_off().await?;
            println!("Device turned OFF");
        }

        Commands::Brightness { level } => {
            let device = select_device(&registry, &cli).await?;
            device.set_brightness(*level).await?;
            println!("Brightness set to {}%", device.brightness());
        }

        Commands::Color { color, brightness } => {
            let device = select_device(&registry, &cli).await?;
            device.set_color(color, *brightness).await?;
            println!("Color set to {}", device.color());
        }

        Commands::Temperature { kelvin } => {
            let device = select_device(&registry, &cli).await?;
            device.set_color_temperature(*kelvin).await?;
            println!("Temperature set to {}K", device.color_temperature());
        }

        Commands::Fade { color, steps, duration } => {
            let device = select_device(&registry, &cli).await?;
            device.sync_now().await?;
            device
                .fade_to_color(color, *steps, Duration::from_millis(*duration))
                .await?;
            println!("Faded to {}", device.color());
        }

        Commands::Flash { color, times, period } => {
            let device = select_device(&registry, &cli).await?;
            let color: Color = color.parse()?;
            let period = Duration::from_millis(*period);
            actions::flash_color(&device, color, *times, period, period).await?;
            println!("Flashed {color} {times} time(s)");
        }

        Commands::Listen => {
            println!("Listening for events... (Press Ctrl+C to stop)\n");
            while let Some(event) = events.next().await {
                match event {
                    Event::DeviceDiscovered(device) => {
                        println!("[discovered] {} {} at {}", device.id(), device.model(), device.ip())
                    }
                    Event::DeviceStateChanged { id, state } => {
                        println!("[state] {id}: {}", serde_json::to_string(&state)?)
                    }
                    Event::ScanObserved(_) | Event::DeviceGotUpdate { .. } => {}
                    other => println!("[event] {other:?}"),
                }
            }
        }
    }

    registry.destroy();
    Ok(())
}
