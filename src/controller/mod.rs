pub mod blink;
pub mod mind;

pub use blink::{BlinkConfig, BlinkController};
pub use mind::{LabelStatus, Level, MindConfig, MindReport, MindStateController};

use crate::classifier::ClassifierError;
use crate::fuzzy::FuzzyError;
use crate::processing::debounce::BlinkDecision;
use crate::processing::features::FeatureError;
use crate::record::InputRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Problems that cost one cycle its decision but never stop the loop.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("feature extraction failed: {0}")]
    Feature(#[from] FeatureError),
    #[error("classifier failed: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("fuzzy inference failed: {0}")]
    Fuzzy(#[from] FuzzyError),
}

// ACTUATION INTENTS -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServoTarget {
    Door,
    Window,
}

impl ServoTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServoTarget::Door => "DOOR",
            ServoTarget::Window => "WINDOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationIntent {
    Servo { target: ServoTarget, angle: u8 },
    Fan { pwm: u8 },
}

impl ActuationIntent {
    /// Line-oriented command understood by the actuator firmware.
    pub fn to_command(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for ActuationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuationIntent::Servo { target, angle } => {
                write!(f, "ServoAngle:{}:{}", target.as_str(), angle)
            }
            ActuationIntent::Fan { pwm } => write!(f, "FAN:{}", pwm),
        }
    }
}

// CONTROLLER SEAM -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Blink(BlinkDecision),
    Mind(MindReport),
}

/// Everything one controller call produced.
#[derive(Debug, Default)]
pub struct Step {
    pub intents: Vec<ActuationIntent>,
    pub decisions: Vec<Decision>,
    pub issues: Vec<ControlError>,
}

impl Step {
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.decisions.is_empty() && self.issues.is_empty()
    }

    pub fn extend(&mut self, other: Step) {
        self.intents.extend(other.intents);
        self.decisions.extend(other.decisions);
        self.issues.extend(other.issues);
    }
}

/// One control loop. `tick` runs at the top of every iteration, before the
/// transport read; `ingest` runs for each parsed record.
pub trait Controller: Send {
    fn name(&self) -> &'static str;

    fn tick(&mut self, now: f64) -> Step;

    fn ingest(&mut self, record: &InputRecord, now: f64) -> Step;

    /// Commands that leave the rig in its safe state; also drops any pending decision.
    fn shutdown(&mut self) -> Vec<ActuationIntent>;
}
