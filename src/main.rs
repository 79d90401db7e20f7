use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use neurofuzz_control::config::{load_config, save_config, Config, ConfigError};
use neurofuzz_control::controller::{BlinkController, ControlError, Controller, MindStateController};
use neurofuzz_control::local::{
    self, ActuatorError, Handshake, HeadsetSource, RecordSource, ReplaySource, Session,
    SessionError, SimulatedHeadset, SourceKind, SystemClock, TransportError,
};
use neurofuzz_control::utils::log::{init_tracing, LogError, SessionLog};

/// Biosignal-driven actuation control loops
#[derive(Parser, Debug)]
#[command(name = "neurofuzz")]
#[command(author, version, about = "Blink and mind-state control loops for a servo/fan rig", long_about = None)]
struct Cli {
    /// YAML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (overrides the config file)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Blink loop: single blink opens the door, double blink the window
    Blink {
        #[command(flatten)]
        run: RunArgs,

        /// Smoothed blink strength that triggers classification
        #[arg(long)]
        threshold: Option<f64>,

        /// Double-blink interval in seconds
        #[arg(long)]
        interval: Option<f64>,
    },

    /// Mind-state loop: fan speed follows the attention trend
    Mind {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Write the effective configuration to a file
    Config {
        #[arg(default_value = "neurofuzz.yaml")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Where input records come from
    #[arg(short, long, value_enum)]
    source: Option<SourceArg>,

    /// Recorded JSON lines to replay (implies --source replay)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Print commands instead of writing to the serial port
    #[arg(long)]
    dry_run: bool,

    /// Serial port of the actuator board (e.g. /dev/ttyUSB0 or COM4)
    #[arg(long)]
    serial_port: Option<String>,

    /// CSV file recording decisions and commands
    #[arg(long)]
    session_log: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Headset,
    Simulate,
    Replay,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Headset => SourceKind::Headset,
            SourceArg::Simulate => SourceKind::Simulate,
            SourceArg::Replay => SourceKind::Replay,
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

#[derive(Clone, Copy)]
enum LoopKind {
    Blink,
    Mind,
}

fn apply_run_args(config: &mut Config, run: RunArgs) {
    if let Some(source) = run.source {
        config.transport.source = source.into();
    }
    if let Some(replay) = run.replay {
        config.transport.source = SourceKind::Replay;
        config.transport.replay = Some(replay);
    }
    if run.dry_run {
        config.actuator.dry_run = true;
    }
    if let Some(port) = run.serial_port {
        config.actuator.port = port;
    }
    if let Some(path) = run.session_log {
        config.logging.session_log = Some(path);
    }
}

fn open_source(config: &Config, handshake: &Handshake) -> Result<Box<dyn RecordSource>, AppError> {
    let transport = &config.transport;
    let source: Box<dyn RecordSource> = match transport.source {
        SourceKind::Headset => Box::new(HeadsetSource::connect(&transport.headset, handshake)?),
        SourceKind::Simulate => Box::new(SimulatedHeadset::new(transport.simulate.clone())),
        SourceKind::Replay => {
            let path = transport.replay.as_ref().ok_or_else(|| {
                ConfigError::Invalid("replay source needs a file".to_string())
            })?;
            Box::new(ReplaySource::open(
                path,
                Duration::from_millis(transport.replay_interval_ms),
            )?)
        }
    };
    Ok(source)
}

fn run_loop(config: Config, kind: LoopKind) -> Result<(), AppError> {
    config.validate()?;

    let (controller, handshake, banner): (Box<dyn Controller>, Handshake, &str) = match kind {
        LoopKind::Blink => (
            Box::new(BlinkController::load(config.blink.clone())?) as Box<dyn Controller>,
            Handshake::blink(),
            "=== Blink Control (Fuzzy Confidence) Running ===",
        ),
        LoopKind::Mind => (
            Box::new(MindStateController::load(config.mind.clone())?) as Box<dyn Controller>,
            Handshake::mind(),
            "=== Mind Controlled System Active ===",
        ),
    };

    let source = open_source(&config, &handshake)?;
    let actuator = local::actuator::open(&config.actuator)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let mut session = Session::new(controller, source, actuator, Box::new(SystemClock))
        .with_echo(config.logging.console);
    if let Some(path) = &config.logging.session_log {
        session = session.with_log(SessionLog::create(path)?);
    }

    if config.logging.console {
        println!("{}", banner.bold());
    }
    let summary = session.run(&shutdown)?;
    info!(
        "exit={:?} records={} skipped={} commands={} issues={}",
        summary.exit, summary.records, summary.skipped, summary.commands, summary.issues
    );
    Ok(())
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    match cli.command {
        Commands::Config { output } => {
            save_config(&config, &output)?;
            println!("wrote {}", output.display());
            Ok(())
        }
        Commands::Blink {
            run,
            threshold,
            interval,
        } => {
            init_tracing(&config.logging.level)?;
            apply_run_args(&mut config, run);
            if let Some(threshold) = threshold {
                config.blink.activation_threshold = threshold;
            }
            if let Some(interval) = interval {
                config.blink.double_blink_interval = interval;
            }
            run_loop(config, LoopKind::Blink)
        }
        Commands::Mind { run } => {
            init_tracing(&config.logging.level)?;
            apply_run_args(&mut config, run);
            run_loop(config, LoopKind::Mind)
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
