//! handctl - command line control for the Inspire hand
//!
//! One command per invocation: open the serial session, run the command,
//! close the session.

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::debug;

use inspire_hand::gesture::DEFAULT_GESTURE_FORCE;
use inspire_hand::{
    FingerId, Gesture, HandConfig, HandDriver, HandSnapshot, SerialTransport, Transport,
};

#[derive(Parser)]
#[command(name = "handctl")]
#[command(about = "Inspire hand control over Modbus RTU")]
#[command(long_about = "Inspire hand control over Modbus RTU

Configuration is read from built-in defaults, then the file given with
--config, then INSPIRE_HAND_* environment variables, then the flags below.

Examples:
  handctl info                      # Angles, forces, status of every finger
  handctl open                      # Open all fingers
  handctl move index 250            # Move the index finger
  handctl force all 400             # Force threshold for every finger
  handctl gesture pinch --force 300 # Pinch with a light grip")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (YAML, TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial device, e.g. /dev/ttyUSB0
    #[arg(long, global = true)]
    port: Option<String>,

    #[arg(long, global = true)]
    baud_rate: Option<u32>,

    /// Modbus slave id of the hand
    #[arg(long, global = true)]
    slave_id: Option<u8>,

    /// Enable verbose logging (frame dumps)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show hand id and per-finger readings
    Info {
        /// Print the readings as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open one finger, or all of them
    Open {
        #[arg(default_value = "all")]
        finger: FingerId,
    },
    /// Close one finger, or all of them
    Close {
        #[arg(default_value = "all")]
        finger: FingerId,
    },
    /// Move one finger to an angle (0 closed, 1000 open)
    Move { finger: FingerId, angle: u16 },
    /// Set movement speed (0-1000)
    Speed { finger: FingerId, value: u16 },
    /// Set force threshold (0-1000)
    Force { finger: FingerId, value: u16 },
    /// Perform a gesture: pinch, point, thumbs_up, grip
    Gesture {
        name: Gesture,
        /// Force threshold for pinch and grip
        #[arg(long, default_value_t = DEFAULT_GESTURE_FORCE)]
        force: u16,
    },
    /// Clear actuator errors
    Reset,
    /// Save current parameters to flash
    Save,
    /// Restore factory default parameters
    FactoryReset,
    /// Calibrate the force sensors (keep the hand unloaded)
    Calibrate,
}

impl Cli {
    fn load_config(&self) -> Result<HandConfig> {
        let mut config = HandConfig::load(self.config.as_deref())?;

        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud_rate) = self.baud_rate {
            config.baud_rate = baud_rate;
        }
        if let Some(slave_id) = self.slave_id {
            config.slave_id = slave_id;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let log_level = if cli.verbose { "debug" } else { "info" };
    logging::init(log_level, !cli.no_color);

    let config = cli.load_config()?;
    debug!(
        "Config: port={} baud={} slave={}",
        config.port, config.baud_rate, config.slave_id
    );

    let transport = SerialTransport::new(config.serial_params());
    let mut hand = HandDriver::with_options(transport, config.slave_id, config.driver_options());

    hand.connect()
        .await
        .with_context(|| format!("Cannot open {}", config.port))?;

    let result = run(&mut hand, cli.command).await;
    hand.disconnect().await;
    result
}

async fn run<T: Transport>(hand: &mut HandDriver<T>, command: Commands) -> Result<()> {
    match command {
        Commands::Info { json } => {
            let hand_id = hand.read_hand_id().await?;
            let snapshot = hand.snapshot().await?;
            if json {
                let value = serde_json::json!({
                    "hand_id": hand_id,
                    "fingers": snapshot,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_info(hand_id, &snapshot);
            }
        },
        Commands::Open { finger } => {
            match finger {
                FingerId::All => hand.open_all_fingers().await?,
                id => hand.finger(id)?.open().await?,
            }
            done(&format!("Opened {}", finger));
        },
        Commands::Close { finger } => {
            match finger {
                FingerId::All => hand.close_all_fingers().await?,
                id => hand.finger(id)?.close().await?,
            }
            done(&format!("Closed {}", finger));
        },
        Commands::Move { finger, angle } => {
            hand.set_finger_angle(finger, angle).await?;
            done(&format!("Moved {} to {}", finger, angle));
        },
        Commands::Speed { finger, value } => {
            match finger {
                FingerId::All => hand.set_all_speeds(value).await?,
                id => hand.set_finger_speed(id, value).await?,
            }
            done(&format!("Speed of {} set to {}", finger, value));
        },
        Commands::Force { finger, value } => {
            match finger {
                FingerId::All => hand.set_all_forces(value).await?,
                id => hand.set_finger_force(id, value).await?,
            }
            done(&format!("Force threshold of {} set to {}", finger, value));
        },
        Commands::Gesture { name, force } => {
            hand.perform(name, force).await?;
            done(&format!("Gesture {}", name));
        },
        Commands::Reset => {
            hand.reset().await?;
            done("Errors cleared");
        },
        Commands::Save => {
            hand.save_settings().await?;
            done("Settings saved to flash");
        },
        Commands::FactoryReset => {
            hand.restore_factory_defaults().await?;
            done("Factory defaults restored");
        },
        Commands::Calibrate => {
            println!(
                "{} Keep the hand unloaded during calibration",
                "NOTE".yellow()
            );
            hand.calibrate_force_sensors().await?;
            done("Force sensors calibrated");
        },
    }
    Ok(())
}

fn done(message: &str) {
    println!("{} {}", "OK".green(), message);
}

fn print_info(hand_id: u16, snapshot: &HandSnapshot) {
    println!("{} {}", "Hand ID:".bright_cyan(), hand_id);
    println!();
    println!(
        "{:<14} {:>6} {:>6} {:>20} {:>6}  {}",
        "FINGER".bold(),
        "ANGLE".bold(),
        "FORCE".bold(),
        "STATUS".bold(),
        "TEMP".bold(),
        "ERRORS".bold()
    );

    for (i, id) in FingerId::FINGERS.iter().enumerate() {
        let errors = snapshot.errors[i];
        let errors = if errors.is_empty() {
            errors.to_string().green()
        } else {
            errors.to_string().red()
        };
        println!(
            "{:<14} {:>6} {:>6} {:>20} {:>5}C  {}",
            id.name(),
            snapshot.angles[i],
            snapshot.forces[i],
            snapshot.statuses[i].to_string(),
            snapshot.temperatures[i],
            errors
        );
    }
}
