//! CLI application for controlling a Hue bridge.
//!
//! The first run discovers the bridge and asks for its link button to be
//! pressed; later runs reuse the stored session.
//!
//! Run with: cargo run --example hue_cli -- --help

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use hue_bridge_rs::{
    Alert, Bridge, BridgeConfig, Brightness, CachedEntity, Color, Mired, Operation, Scanner,
    SsdpScanner,
};

#[derive(Parser)]
#[command(name = "hue-cli")]
#[command(
    about = "Control Philips Hue lights from the command line",
    long_about = None
)]
struct Cli {
    /// Session file holding the bridge address and credential
    #[arg(
        short,
        long,
        global = true,
        default_value = BridgeConfig::DEFAULT_SESSION_FILE
    )]
    session: PathBuf,

    /// Light name; every light when omitted
    #[arg(short, long, global = true)]
    light: Option<String>,

    /// Group name; takes precedence over --light
    #[arg(short, long, global = true)]
    group: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List SSDP candidates on the network without pairing
    Discover {
        /// Discovery window in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Show lights and groups
    List,

    /// Show the state of a light
    Status,

    /// Turn lights on
    On,

    /// Turn lights off
    Off,

    /// Set brightness (1-254)
    Brightness {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=254))]
        level: u8,
    },

    /// Set RGB color (0-255 for each component)
    Color { red: u8, green: u8, blue: u8 },

    /// Set color temperature in Kelvin (2000-6500)
    Temperature {
        #[arg(value_parser = clap::value_parser!(u16).range(2000..=6500))]
        kelvin: u16,
    },

    /// Blink once
    Blink,

    /// Create a light group from light ids
    CreateGroup {
        #[arg(short, long)]
        name: Option<String>,
        ids: Vec<String>,
    },

    /// Delete a group by id
    DeleteGroup { id: String },

    /// List whitelisted credentials
    Users,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Discover { timeout } = cli.command {
        println!("Searching for devices ({timeout}s)...");
        let candidates = SsdpScanner::default()
            .scan(Duration::from_secs(timeout))
            .await?;
        for candidate in candidates {
            println!("  {:15}  {}", candidate.ip.to_string(), candidate.path);
        }
        return Ok(());
    }

    let config = BridgeConfig::default().with_session_path(&cli.session);
    let mut bridge = Bridge::connect(config).await?;

    let operation = match &cli.command {
        Commands::On => Some(Operation::TurnOn),
        Commands::Off => Some(Operation::TurnOff),
        Commands::Brightness { level } => {
            Some(Operation::SetBrightness(Brightness::saturating(*level)))
        }
        Commands::Color { red, green, blue } => {
            Some(Operation::SetColor(Color::rgb(*red, *green, *blue)))
        }
        Commands::Temperature { kelvin } => {
            Some(Operation::SetColorTemperature(Mired::from_kelvin(*kelvin)))
        }
        Commands::Blink => Some(Operation::SetAlert(Alert::Select)),
        _ => None,
    };

    if let Some(operation) = operation {
        let called = if let Some(name) = &cli.group {
            bridge.groups().try_get(name)?.apply(&operation).await?
        } else if let Some(name) = &cli.light {
            let light = bridge.lights().try_get(name)?;
            hue_bridge_rs::Controllable::apply(light.as_ref(), &operation).await?;
            1
        } else {
            bridge.lights().apply(&operation).await?
        };
        println!("{} applied to {called} light(s)", operation.capability());
        return Ok(());
    }

    match cli.command {
        Commands::List => {
            println!(
                "Bridge {} ({:?})",
                bridge.record().address(),
                bridge.model_number()
            );
            println!("\nLights:");
            for light in bridge.lights() {
                println!(
                    "  [{:>2}] {:24} {:?} {}",
                    light.id(),
                    light.name(),
                    light.kind(),
                    light.descriptor().model_id
                );
            }
            println!("\nGroups:");
            for group in bridge.groups().iter() {
                let members: Vec<&str> = group.lights().names().collect();
                println!(
                    "  [{:>2}] {:24} {:?} {}",
                    group.id(),
                    group.name(),
                    group.kind(),
                    members.join(", ")
                );
            }
        }

        Commands::Status => {
            let name = cli.light.as_deref().ok_or("--light is required for status")?;
            let light = bridge.lights().try_get(name)?;
            let state = light.refresh(true).await?;
            println!("{}:", light.name());
            println!("  Power: {}", if state.on { "ON" } else { "OFF" });
            println!("  Brightness: {}", state.bri);
            println!("  Reachable: {}", state.reachable);
            if let Some(xy) = state.xy {
                println!("  xy: ({:.4}, {:.4})", xy[0], xy[1]);
            }
            if let Some(ct) = state.ct {
                println!("  Temperature: {ct} mired");
            }
            if let Some(mode) = state.colormode {
                println!("  Color mode: {mode}");
            }
        }

        Commands::CreateGroup { name, ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            let id = bridge.create_group(&ids, name.as_deref()).await?;
            println!("Created group {id}");
        }

        Commands::DeleteGroup { id } => {
            bridge.delete_group(&id).await?;
            println!("Deleted group {id}");
        }

        Commands::Users => {
            for user in bridge.users().await? {
                println!(
                    "  {:40} {:32} last used {}",
                    user.id,
                    user.name,
                    user.last_used
                );
            }
        }

        _ => unreachable!("handled above"),
    }

    Ok(())
}
