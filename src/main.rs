//! CLI Entry Point for rust-osa
//!
//! ```bash
//! rust-osa ports
//! rust-osa trace --memory A --format csv --output trace.csv --sweep
//! rust-osa get center-wavelength
//! rust-osa set span 20
//! rust-osa sweep repeat
//! rust-osa local
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use osa_core::settings::Memory;
use osa_driver::{list_ports, OsaDriver, Property};
use rust_osa::config::{AppConfig, DEFAULT_CONFIG_PATH};
use rust_osa::export::{self, ExportFormat};
use rust_osa::logging::{self, TracingConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rust-osa")]
#[command(about = "Control an optical spectrum analyzer and read out its traces", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial port, overriding the configuration
    #[arg(long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports on this machine
    Ports,

    /// Read a trace memory and export it
    Trace {
        #[arg(long, default_value = "A")]
        memory: Memory,

        /// Export format (default: from config, or the output extension)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Run a single sweep first and wait for it to finish
        #[arg(long)]
        sweep: bool,

        /// Longest time to wait for the sweep, in seconds
        #[arg(long, default_value = "120")]
        sweep_timeout: u64,
    },

    /// Read a setting (`all` for every readable setting)
    Get { property: String },

    /// Change a setting
    Set { property: Property, value: String },

    /// Start or stop sweeping
    Sweep {
        #[arg(value_enum)]
        action: SweepAction,
    },

    /// Return the front panel to local control
    Local,
}

#[derive(Clone, Copy, ValueEnum)]
enum SweepAction {
    Single,
    Repeat,
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Ports = cli.command {
        logging::init(TracingConfig::default())?;
        return print_ports();
    }

    let mut figment = AppConfig::figment(&cli.config);
    if let Some(port) = &cli.port {
        figment = figment.merge(("instrument.port", port.as_str()));
    }
    let config = AppConfig::from_figment(figment)
        .with_context(|| format!("Using configuration file {}", cli.config.display()))?;
    logging::init_from_config(&config)?;

    tracing::info!(
        app = %config.application.name,
        port = %config.instrument.port,
        "Connecting to spectrum analyzer"
    );
    let driver = OsaDriver::connect_serial(&config.instrument)
        .await
        .with_context(|| format!("Failed to connect on {}", config.instrument.port))?;

    let result = run(&driver, &config, cli.command).await;
    driver.disconnect();
    result
}

async fn run(driver: &OsaDriver, config: &AppConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Ports => print_ports(),
        Commands::Trace {
            memory,
            format,
            output,
            sweep,
            sweep_timeout,
        } => {
            if sweep {
                driver.sweep_single().await?;
                driver
                    .wait_for_sweep(
                        Duration::from_millis(250),
                        Duration::from_secs(sweep_timeout),
                    )
                    .await
                    .context("Sweep did not finish")?;
            }

            let trace = driver
                .read_trace(memory)
                .await
                .with_context(|| format!("Failed to read trace memory {memory}"))?;

            match output {
                Some(path) => {
                    let format = format
                        .or_else(|| ExportFormat::from_path(&path))
                        .unwrap_or(config.export.format);
                    export::save_trace(&trace, format, &config.output_path(&path))
                }
                None => {
                    let stdout = io::stdout();
                    export::write_trace(
                        &trace,
                        format.unwrap_or(config.export.format),
                        stdout.lock(),
                    )
                }
            }
        }
        Commands::Get { property } => {
            let mut stdout = io::stdout().lock();
            if property.eq_ignore_ascii_case("all") {
                for property in Property::ALL {
                    let value = driver.get_property(*property).await?;
                    writeln!(stdout, "{:<18} {value}", property.name())?;
                }
            } else {
                let property: Property = property.parse()?;
                writeln!(stdout, "{}", driver.get_property(property).await?)?;
            }
            Ok(())
        }
        Commands::Set { property, value } => {
            driver
                .set_property(property, &value)
                .await
                .with_context(|| format!("Failed to set {property}"))?;
            Ok(())
        }
        Commands::Sweep { action } => {
            match action {
                SweepAction::Single => driver.sweep_single().await?,
                SweepAction::Repeat => driver.sweep_repeat().await?,
                SweepAction::Stop => driver.sweep_stop().await?,
            }
            Ok(())
        }
        Commands::Local => Ok(driver.user_mode().await?),
    }
}

fn print_ports() -> Result<()> {
    let ports = list_ports().context("Failed to enumerate serial ports")?;
    let mut stdout = io::stdout().lock();
    if ports.is_empty() {
        writeln!(stdout, "No serial ports found")?;
    }
    for port in ports {
        writeln!(stdout, "{port}")?;
    }
    Ok(())
}
