use crate::controller::ActuationIntent;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to write command {command:?}: {source}")]
    Write {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    /// Print commands instead of opening the serial port.
    pub dry_run: bool,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout_ms: 1000,
            dry_run: false,
        }
    }
}

/// Sink for line-oriented actuation commands.
pub trait Actuator: Send {
    fn send(&mut self, intent: &ActuationIntent) -> Result<(), ActuatorError>;
}

pub fn open(config: &ActuatorConfig) -> Result<Box<dyn Actuator>, ActuatorError> {
    if config.dry_run {
        Ok(Box::new(ConsoleActuator))
    } else {
        Ok(Box::new(SerialActuator::open(config)?))
    }
}

// SERIAL ACTUATOR -------------------------------------------------------------

/// Microcontroller on a serial line.
pub struct SerialActuator {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialActuator {
    pub fn open(config: &ActuatorConfig) -> Result<Self, ActuatorError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|source| ActuatorError::Open {
                port: config.port.clone(),
                source,
            })?;
        info!("opened actuator on {} at {} baud", config.port, config.baud_rate);
        Ok(Self { port })
    }
}

impl Actuator for SerialActuator {
    fn send(&mut self, intent: &ActuationIntent) -> Result<(), ActuatorError> {
        let command = intent.to_command();
        self.port
            .write_all(command.as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(|source| ActuatorError::Write { command, source })
    }
}

// CONSOLE ACTUATOR ------------------------------------------------------------

/// Dry-run sink that echoes commands.
pub struct ConsoleActuator;

impl Actuator for ConsoleActuator {
    fn send(&mut self, intent: &ActuationIntent) -> Result<(), ActuatorError> {
        println!("{} {}", "[dry-run]".dimmed(), intent.to_string().cyan());
        Ok(())
    }
}

// MEMORY ACTUATOR -------------------------------------------------------------

/// Records commands in memory; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryActuator {
    commands: Arc<Mutex<Vec<String>>>,
}

impl MemoryActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }
}

impl Actuator for MemoryActuator {
    fn send(&mut self, intent: &ActuationIntent) -> Result<(), ActuatorError> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(intent.to_command());
        }
        Ok(())
    }
}
