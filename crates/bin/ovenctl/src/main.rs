//! # ovenctl — oven control CLI
//!
//! Composition root that wires a transport adapter into the device session
//! and exposes the operations as subcommands.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Initialize logging
//! - Load the recipe library
//! - Construct the transport (websocket cloud, or the virtual adapter for
//!   offline use) and inject it into the session via the port trait
//! - Map every failure class to a stable process exit code
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.
//!
//! ## Exit codes
//! `0` success, `1` general failure, `2` configuration, `3` device not
//! found, `4` command/validation failure, `130` interrupted.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use ovenctl_adapter_virtual::VirtualTransport;
use ovenctl_adapter_ws::{WsConfig, WsTransport};
use ovenctl_app::ports::Transport;
use ovenctl_app::recipes::RecipeLibrary;
use ovenctl_app::session::DeviceSession;
use ovenctl_domain::device::{CookerId, Device};
use ovenctl_domain::error::OvenError;
use ovenctl_domain::plan::CookPlan;
use ovenctl_domain::stage::{StageSpec, Timer};
use ovenctl_domain::temperature::{Temperature, Unit};

use config::{Config, ConfigError};

const EXIT_GENERAL: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "ovenctl", version, about = "Control networked combi ovens")]
struct Cli {
    /// Configuration file path.
    #[arg(long, global = true, default_value = "ovenctl.toml")]
    config: String,

    /// Recipe document path, overriding the configured location.
    #[arg(long, global = true)]
    recipe_file: Option<PathBuf>,

    /// Use the built-in simulated ovens instead of the cloud.
    #[arg(long = "virtual", global = true)]
    use_virtual: bool,

    /// Verbose logging; repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the ovens paired with the account.
    Discover {
        /// How long to wait for devices, in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Inspect the recipe library.
    Recipes {
        #[command(subcommand)]
        command: RecipesCommand,
    },
    /// Start a cook, from a recipe or an ad-hoc temperature.
    Cook {
        /// Target oven id; optional when exactly one is paired.
        #[arg(long)]
        device: Option<String>,
        /// Recipe id from the library.
        #[arg(long, conflicts_with = "temp")]
        recipe: Option<String>,
        /// Ad-hoc target temperature.
        #[arg(long)]
        temp: Option<f64>,
        /// Unit for --temp.
        #[arg(long, value_enum, default_value_t = UnitArg::Celsius)]
        unit: UnitArg,
        /// Timer duration in minutes (ad-hoc cooks only).
        #[arg(long)]
        duration: Option<u32>,
        /// Fan speed percentage (ad-hoc cooks only).
        #[arg(long, default_value_t = 100)]
        fan_speed: u8,
        /// Give up, stopping any partially started cook, after this many
        /// seconds.
        #[arg(long)]
        deadline: Option<u64>,
    },
    /// Stop whatever the oven is doing. Safe to repeat.
    Stop {
        /// Target oven id; optional when exactly one is paired.
        #[arg(long)]
        device: Option<String>,
    },
    /// Set the food probe target temperature.
    Probe {
        /// Target oven id; optional when exactly one is paired.
        #[arg(long)]
        device: Option<String>,
        /// Probe target temperature.
        #[arg(long)]
        temp: f64,
        /// Unit for --temp.
        #[arg(long, value_enum, default_value_t = UnitArg::Celsius)]
        unit: UnitArg,
    },
}

#[derive(Debug, Subcommand)]
enum RecipesCommand {
    /// List every recipe in the library.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show one recipe stage by stage.
    Show {
        /// Recipe id.
        id: String,
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnitArg {
    #[value(name = "C", alias = "c")]
    Celsius,
    #[value(name = "F", alias = "f")]
    Fahrenheit,
}

impl From<UnitArg> for Unit {
    fn from(value: UnitArg) -> Self {
        match value {
            UnitArg::Celsius => Self::Celsius,
            UnitArg::Fahrenheit => Self::Fahrenheit,
        }
    }
}

/// Everything `run` can fail with, mapped onto the exit-code table.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Oven(#[from] OvenError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no ovens discovered")]
    NoDevices,
    #[error("{count} ovens discovered, pass --device to pick one")]
    AmbiguousDevice { count: usize },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Oven(err) => err.exit_code().try_into().unwrap_or(EXIT_GENERAL),
            Self::Config(_) => 2,
            Self::NoDevices | Self::AmbiguousDevice { .. } => 3,
            Self::Other(_) => EXIT_GENERAL,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let outcome = tokio::select! {
        outcome = run(cli) => outcome,
        interrupt = tokio::signal::ctrl_c() => {
            if let Err(err) = interrupt {
                tracing::warn!(%err, "failed to install interrupt handler");
            }
            eprintln!("interrupted");
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, verbose);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::load(&cli.config)?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Command::Recipes { ref command } => {
            let library = load_library(&cli, &config)?;
            run_recipes(&library, command)
        }
        _ if cli.use_virtual => run_device_command(VirtualTransport::default(), cli, config).await,
        _ => {
            let transport = WsTransport::connect(WsConfig {
                url: config.connection.url.clone(),
                token: config.connection.token.clone(),
                connect_timeout: Duration::from_secs(config.connection.connect_timeout_secs),
                ack_timeout: Duration::from_secs(config.connection.ack_timeout_secs),
            })
            .await?;
            run_device_command(transport, cli, config).await
        }
    }
}

fn init_logging(config: &Config, verbose: u8) {
    let filter = match verbose {
        0 => config.logging.filter.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_library(cli: &Cli, config: &Config) -> Result<RecipeLibrary, AppError> {
    let path = cli
        .recipe_file
        .clone()
        .or_else(|| config.recipes.path.as_ref().map(PathBuf::from))
        .or_else(RecipeLibrary::locate);
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading recipe library");
            Ok(RecipeLibrary::load_path(&path).map_err(OvenError::from)?)
        }
        None => Ok(RecipeLibrary::empty()),
    }
}

fn run_recipes(library: &RecipeLibrary, command: &RecipesCommand) -> Result<(), AppError> {
    match command {
        RecipesCommand::List { json } => {
            if *json {
                let entries: Vec<_> = library
                    .list()
                    .map(|summary| {
                        serde_json::json!({
                            "id": summary.id,
                            "name": summary.name,
                            "description": summary.description,
                            "stages": summary.stage_count,
                            "hardware_revision": summary.hardware_revision,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries).map_err(anyhow::Error::from)?);
            } else if library.is_empty() {
                println!("no recipes loaded");
            } else {
                for summary in library.list() {
                    let revision = summary
                        .hardware_revision
                        .map_or_else(String::new, |r| format!(", {r} only"));
                    println!(
                        "{}  {} ({} stage{}{revision})",
                        summary.id,
                        summary.name,
                        summary.stage_count,
                        if summary.stage_count == 1 { "" } else { "s" },
                    );
                }
            }
            Ok(())
        }
        RecipesCommand::Show { id, json } => {
            let recipe = library.get(id).map_err(OvenError::from)?;
            if *json {
                let stages: Vec<_> = recipe
                    .plan
                    .stages()
                    .iter()
                    .map(|stage| {
                        serde_json::json!({
                            "title": stage.title,
                            "temperature_c": stage.temperature.celsius(),
                            "mode": stage.mode,
                            "timer": stage.timer,
                            "fan_speed": stage.fan_speed,
                            "steam": stage.steam,
                        })
                    })
                    .collect();
                let doc = serde_json::json!({
                    "id": recipe.id,
                    "name": recipe.name,
                    "description": recipe.description,
                    "stages": stages,
                });
                println!("{}", serde_json::to_string_pretty(&doc).map_err(anyhow::Error::from)?);
            } else {
                println!("{} — {}", recipe.name, recipe.description);
                for (index, stage) in recipe.plan.stages().iter().enumerate() {
                    let title = if stage.title.is_empty() {
                        format!("stage {}", index + 1)
                    } else {
                        stage.title.clone()
                    };
                    let timer = stage.timer.map_or_else(String::new, |t| {
                        format!(", {} min", t.initial_secs / 60)
                    });
                    println!("  {}. {title}: {}{timer}", index + 1, stage.temperature);
                }
            }
            Ok(())
        }
    }
}

async fn run_device_command<T: Transport>(
    transport: T,
    cli: Cli,
    config: Config,
) -> Result<(), AppError> {
    let session = DeviceSession::new(transport, config.retry_policy());

    match cli.command {
        Command::Discover { timeout, json } => {
            let window = timeout.map_or_else(|| config.discover_timeout(), Duration::from_secs);
            let devices = session.discover(window).await?;
            print_devices(&devices, json)?;
            Ok(())
        }
        Command::Cook {
            ref device,
            ref recipe,
            temp,
            unit,
            duration,
            fan_speed,
            deadline,
        } => {
            let plan = match (recipe, temp) {
                (Some(id), None) => {
                    let library = load_library(&cli, &config)?;
                    library.get(id).map_err(OvenError::from)?.plan.clone()
                }
                (None, Some(value)) => ad_hoc_plan(value, unit, duration, fan_speed)?,
                _ => {
                    return Err(anyhow::anyhow!("provide either --recipe or --temp").into());
                }
            };
            let bound = bind(&session, &config, device.as_deref()).await?;
            session
                .start_with_deadline(&plan, deadline.map(Duration::from_secs))
                .await?;
            println!("started {} stage(s) on {}", plan.stages().len(), bound.name);
            Ok(())
        }
        Command::Stop { ref device } => {
            let bound = bind(&session, &config, device.as_deref()).await?;
            session.stop().await?;
            println!("stopped {}", bound.name);
            Ok(())
        }
        Command::Probe {
            ref device,
            temp,
            unit,
        } => {
            let target = Temperature::from_value(temp, unit.into()).map_err(OvenError::from)?;
            let bound = bind(&session, &config, device.as_deref()).await?;
            session.probe(target).await?;
            println!("probe target set to {target} on {}", bound.name);
            Ok(())
        }
        Command::Recipes { .. } => unreachable!("handled before transport setup"),
    }
}

/// Build a single-stage plan from the ad-hoc cook flags.
fn ad_hoc_plan(
    value: f64,
    unit: UnitArg,
    duration_mins: Option<u32>,
    fan_speed: u8,
) -> Result<CookPlan, AppError> {
    let temperature = Temperature::from_value(value, unit.into()).map_err(OvenError::from)?;
    let mut builder = StageSpec::builder(temperature).fan_speed(fan_speed);
    if let Some(mins) = duration_mins {
        builder = builder.timer(Timer::new(mins.saturating_mul(60)));
    }
    let stage = builder.build().map_err(OvenError::from)?;
    Ok(CookPlan::single(stage))
}

/// Discover, pick a device, and bind the session to it.
async fn bind<T: Transport>(
    session: &DeviceSession<T>,
    config: &Config,
    requested: Option<&str>,
) -> Result<Device, AppError> {
    let devices = session.discover(config.discover_timeout()).await?;
    let id = match requested {
        Some(id) => CookerId::from(id),
        None => match devices.as_slice() {
            [only] => only.id.clone(),
            [] => return Err(AppError::NoDevices),
            many => {
                return Err(AppError::AmbiguousDevice { count: many.len() });
            }
        },
    };
    Ok(session.bind(&id).map_err(OvenError::from)?)
}

fn print_devices(devices: &[Device], json: bool) -> Result<(), AppError> {
    if json {
        let entries: Vec<_> = devices
            .iter()
            .map(|device| {
                serde_json::json!({
                    "id": device.id,
                    "name": device.name,
                    "revision": device.revision,
                    "state": device.state,
                    "paired_at": device.paired_at,
                    "temperature_c": device.current_temperature.map(Temperature::celsius),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries).map_err(anyhow::Error::from)?);
    } else if devices.is_empty() {
        println!("no ovens found");
    } else {
        for device in devices {
            println!(
                "{}  {} ({}, {})",
                device.id, device.name, device.revision, device.state
            );
        }
    }
    Ok(())
}

fn report(err: &AppError, verbose: u8) {
    eprintln!("error: {err}");
    if verbose > 0 {
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn should_have_a_consistent_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_an_ad_hoc_cook_invocation() {
        let cli = Cli::parse_from([
            "ovenctl", "cook", "--temp", "400", "--unit", "F", "--duration", "30",
            "--fan-speed", "50", "--virtual",
        ]);
        assert!(cli.use_virtual);
        let Command::Cook {
            temp,
            duration,
            fan_speed,
            ..
        } = cli.command
        else {
            panic!("expected cook command");
        };
        assert_eq!(temp, Some(400.0));
        assert_eq!(duration, Some(30));
        assert_eq!(fan_speed, 50);
    }

    #[test]
    fn should_refuse_recipe_and_temp_together() {
        let result = Cli::try_parse_from([
            "ovenctl", "cook", "--recipe", "steak", "--temp", "200",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn should_build_an_ad_hoc_plan_in_fahrenheit() {
        let plan = ad_hoc_plan(392.0, UnitArg::Fahrenheit, Some(30), 100).unwrap();
        assert_eq!(plan.stages().len(), 1);
        let stage = &plan.stages()[0];
        assert!((stage.temperature.celsius() - 200.0).abs() < 1e-6);
        assert_eq!(stage.timer, Some(Timer::new(1800)));
    }

    #[test]
    fn should_reject_ad_hoc_plan_outside_the_envelope() {
        let result = ad_hoc_plan(9000.0, UnitArg::Celsius, None, 100);
        assert!(matches!(
            result,
            Err(AppError::Oven(OvenError::Validation(_)))
        ));
    }

    #[test]
    fn should_map_device_selection_failures_to_exit_code_3() {
        assert_eq!(AppError::NoDevices.exit_code(), 3);
        assert_eq!(AppError::AmbiguousDevice { count: 2 }.exit_code(), 3);
    }

    #[test]
    fn should_map_oven_errors_through_their_own_exit_codes() {
        let err = AppError::Oven(OvenError::from(
            ovenctl_domain::error::ConfigurationError::MissingToken,
        ));
        assert_eq!(err.exit_code(), 2);
    }
}
