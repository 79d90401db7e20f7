use crate::controller::{ActuationIntent, Decision, LabelStatus, MindReport};
use crate::processing::debounce::BlinkDecision;
use chrono::Local;
use colored::Colorize;
use std::fs::{self, File};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("unknown log level {0:?}")]
    InvalidLevel(String),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
    #[error("session log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session log write failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Installs the global fmt subscriber. Call once from the binary.
pub fn init_tracing(level: &str) -> Result<(), LogError> {
    let level = Level::from_str(level).map_err(|_| LogError::InvalidLevel(level.to_string()))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LogError::Subscriber(e.to_string()))
}

// SESSION LOG -----------------------------------------------------------------

const SESSION_HEADERS: [&str; 5] = ["timestamp", "loop", "kind", "detail", "command"];

/// CSV record of every decision and command a session emits.
pub struct SessionLog {
    writer: csv::Writer<File>,
}

impl SessionLog {
    /// Creates (or truncates) the log, making parent directories as needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(SESSION_HEADERS)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn record_decision(&mut self, loop_name: &str, decision: &Decision) -> Result<(), LogError> {
        let kind = match decision {
            Decision::Blink(BlinkDecision::Single(_)) => "single_blink",
            Decision::Blink(BlinkDecision::Double(..)) => "double_blink",
            Decision::Mind(_) => "mind_state",
        };
        self.write(loop_name, kind, &describe(decision), "")
    }

    pub fn record_intent(&mut self, loop_name: &str, intent: &ActuationIntent) -> Result<(), LogError> {
        self.write(loop_name, "command", "", &intent.to_string())
    }

    fn write(&mut self, loop_name: &str, kind: &str, detail: &str, command: &str) -> Result<(), LogError> {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
        self.writer
            .write_record([timestamp.as_str(), loop_name, kind, detail, command])?;
        self.writer.flush()?;
        Ok(())
    }
}

// CONSOLE ---------------------------------------------------------------------

/// Plain one-line summary of a decision.
pub fn describe(decision: &Decision) -> String {
    match decision {
        Decision::Blink(BlinkDecision::Single(event)) => format!(
            "strength={:.0} model={} fuzzy={:.2}",
            event.strength(),
            event.label().index(),
            event.confidence()
        ),
        Decision::Blink(BlinkDecision::Double(first, second)) => format!(
            "strengths=({:.0},{:.0}) models=({},{}) fuzzy=({:.2},{:.2})",
            first.strength(),
            second.strength(),
            first.label().index(),
            second.label().index(),
            first.confidence(),
            second.confidence()
        ),
        Decision::Mind(report) => describe_mind(report),
    }
}

fn describe_mind(report: &MindReport) -> String {
    let net = report
        .effects
        .as_ref()
        .map(|e| format!("{:+.2}", e.net_effect.value()))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "att={:.0}({:+.1})[{}] med={:.0}({:+.1})[{}] net={} pwm={}",
        report.attention,
        report.attention_delta,
        report.attention_level,
        report.meditation,
        report.meditation_delta,
        report.meditation_level,
        net,
        report.pwm
    )
}

/// Operator console line, coloured by trend.
pub fn print_decision(decision: &Decision, intents: &[ActuationIntent]) {
    let commands = intents
        .iter()
        .map(ActuationIntent::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    match decision {
        Decision::Blink(BlinkDecision::Single(_)) => {
            println!("{} | {} | {}", "[Single Blink]".green().bold(), describe(decision), commands)
        }
        Decision::Blink(BlinkDecision::Double(..)) => {
            println!("{} | {} | {}", "[Double Blink]".cyan().bold(), describe(decision), commands)
        }
        Decision::Mind(report) => {
            let att = format!(
                "Att:{:.0}(Δ{:+.1})[{}]",
                report.attention, report.attention_delta, report.attention_level
            );
            let med = format!(
                "Med:{:.0}(Δ{:+.1})[{}]",
                report.meditation, report.meditation_delta, report.meditation_level
            );
            let net_value = report.effects.as_ref().map(|e| e.net_effect.value());
            let net = match net_value {
                Some(v) if v >= 0.0 => format!("Net:{:+.2}", v).green(),
                Some(v) => format!("Net:{:+.2}", v).red(),
                None => "Net:n/a".yellow(),
            };
            println!(
                "[Mind State] {} | {} | {} | {}",
                if report.attention_delta >= 0.0 { att.green() } else { att.red() },
                if report.meditation_delta < 0.0 { med.green() } else { med.red() },
                net,
                commands
            );
            match &report.labels {
                LabelStatus::Waiting => println!("{}", "Waiting for full EEG sequence window...".dimmed()),
                LabelStatus::Predicted {
                    attention,
                    relaxation,
                } => println!(
                    "{}",
                    format!(
                        "[EEG Model] Attention Prediction: {}, Relaxation Prediction: {}",
                        attention, relaxation
                    )
                    .blue()
                ),
                LabelStatus::Unavailable => {}
            }
        }
    }
}
