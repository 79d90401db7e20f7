use super::actuator::{Actuator, ActuatorError};
use super::{RecordSource, SourceEvent, TransportError};
use crate::controller::{ActuationIntent, Controller, Step};
use crate::record::{InputRecord, RecordError};
use crate::utils::log::{print_decision, LogError, SessionLog};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Processing-time source, in seconds.
pub trait Clock: Send {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1e6
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Interrupted,
    SourceClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub exit: ExitReason,
    pub records: usize,
    pub skipped: usize,
    pub commands: usize,
    pub issues: usize,
}

// SESSION LOOP ----------------------------------------------------------------

/// Single-threaded control loop owning one controller, one transport and one
/// actuator. Every exit path sends the controller's safe state and releases
/// both handles.
pub struct Session {
    controller: Box<dyn Controller>,
    source: Box<dyn RecordSource>,
    actuator: Box<dyn Actuator>,
    clock: Box<dyn Clock>,
    log: Option<SessionLog>,
    echo: bool,
    records: usize,
    skipped: usize,
    commands: usize,
    issues: usize,
}

impl Session {
    pub fn new(
        controller: Box<dyn Controller>,
        source: Box<dyn RecordSource>,
        actuator: Box<dyn Actuator>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            controller,
            source,
            actuator,
            clock,
            log: None,
            echo: false,
            records: 0,
            skipped: 0,
            commands: 0,
            issues: 0,
        }
    }

    pub fn with_log(mut self, log: SessionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Print decisions to the operator console.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn run(mut self, shutdown: &AtomicBool) -> Result<SessionSummary, SessionError> {
        info!("{} loop running", self.controller.name());
        let outcome = self.run_loop(shutdown);
        let flushed = self.flush_safe_state();

        let exit = match (outcome, flushed) {
            (Err(e), flushed) => {
                if let Err(flush_error) = flushed {
                    warn!("safe state not delivered: {}", flush_error);
                }
                return Err(e);
            }
            (Ok(_), Err(e)) => return Err(e),
            (Ok(exit), Ok(())) => exit,
        };
        info!("{} loop stopped: {:?}", self.controller.name(), exit);
        Ok(SessionSummary {
            exit,
            records: self.records,
            skipped: self.skipped,
            commands: self.commands,
            issues: self.issues,
        })
    }

    fn run_loop(&mut self, shutdown: &AtomicBool) -> Result<ExitReason, SessionError> {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return Ok(ExitReason::Interrupted);
            }

            // Timeouts first, before blocking on the transport.
            let step = self.controller.tick(self.clock.now());
            self.apply(step)?;

            let line = match self.source.next_line()? {
                SourceEvent::Line(line) => line,
                SourceEvent::Idle => continue,
                SourceEvent::Closed => return Ok(ExitReason::SourceClosed),
            };
            let record = match InputRecord::parse(&line) {
                Ok(record) => record,
                Err(RecordError::Empty) => continue,
                Err(e) => {
                    debug!("skipping input line: {}", e);
                    self.skipped += 1;
                    continue;
                }
            };
            self.records += 1;
            let step = self.controller.ingest(&record, self.clock.now());
            self.apply(step)?;
        }
    }

    fn apply(&mut self, step: Step) -> Result<(), SessionError> {
        let name = self.controller.name();
        for issue in &step.issues {
            warn!("{} cycle skipped: {}", name, issue);
        }
        self.issues += step.issues.len();

        for decision in &step.decisions {
            if self.echo {
                print_decision(decision, &step.intents);
            }
            if let Some(log) = self.log.as_mut() {
                log.record_decision(name, decision)?;
            }
        }
        for intent in &step.intents {
            self.send(intent)?;
        }
        Ok(())
    }

    fn send(&mut self, intent: &ActuationIntent) -> Result<(), SessionError> {
        debug!("sending {}", intent);
        self.actuator.send(intent)?;
        self.commands += 1;
        if let Some(log) = self.log.as_mut() {
            log.record_intent(self.controller.name(), intent)?;
        }
        Ok(())
    }

    fn flush_safe_state(&mut self) -> Result<(), SessionError> {
        for intent in self.controller.shutdown() {
            info!("safe state: {}", intent);
            self.send(&intent)?;
        }
        Ok(())
    }
}
