use super::{ActuationIntent, ControlError, Controller, Decision, Step};
use crate::classifier::{argmax, Classifier, ClassifierError, ClassifierInput, LinearClassifier};
use crate::fuzzy::{MindEffects, MindStateSystem};
use crate::processing::fan::{FanConfig, FanDirection, FanRegulator};
use crate::processing::features::{band_feature_names, BandFeatureExtractor, FeatureSchema};
use crate::processing::window::{FeatureWindow, RollingWindow};
use crate::record::InputRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindConfig {
    /// Rows of band features the sequence model sees.
    pub window_size: usize,
    /// Depth of the per-band rolling statistics.
    pub rolling_size: usize,
    pub smoothing_history: usize,
    /// Seconds between fan updates.
    pub control_interval: f64,
    pub level_low: f64,
    pub level_high: f64,
    pub fan: FanConfig,
    pub feature_names: Vec<String>,
    pub attention_classes: Vec<String>,
    pub relaxation_classes: Vec<String>,
    pub classifier: Option<PathBuf>,
}

impl Default for MindConfig {
    fn default() -> Self {
        let classes = vec!["low".to_string(), "medium".to_string(), "high".to_string()];
        Self {
            window_size: 20,
            rolling_size: 10,
            smoothing_history: 15,
            control_interval: 1.0,
            level_low: 40.0,
            level_high: 70.0,
            fan: FanConfig::default(),
            feature_names: band_feature_names(),
            attention_classes: classes.clone(),
            relaxation_classes: classes,
            classifier: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn classify(value: f64, low: f64, high: f64) -> Self {
        if value < low {
            Level::Low
        } else if value < high {
            Level::Medium
        } else {
            Level::High
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "LOW",
            Level::Medium => "MEDIUM",
            Level::High => "HIGH",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelStatus {
    /// The sequence window is not full yet.
    Waiting,
    /// No sequence model configured, or it failed this cycle.
    Unavailable,
    Predicted { attention: String, relaxation: String },
}

/// One control update of the mind-state loop.
#[derive(Debug, Clone, PartialEq)]
pub struct MindReport {
    pub attention: f64,
    pub meditation: f64,
    pub attention_delta: f64,
    pub meditation_delta: f64,
    pub attention_level: Level,
    pub meditation_level: Level,
    pub effects: Option<MindEffects>,
    pub direction: FanDirection,
    pub pwm: u8,
    pub labels: LabelStatus,
}

// MIND STATE CONTROLLER -------------------------------------------------------

/// Steps the fan with the attention trend once per control interval.
pub struct MindStateController {
    config: MindConfig,
    extractor: BandFeatureExtractor,
    sequence: FeatureWindow,
    attention: RollingWindow,
    meditation: RollingWindow,
    last_attention: f64,
    last_meditation: f64,
    last_update: Option<f64>,
    fan: FanRegulator,
    effects: MindStateSystem,
    classifier: Option<Box<dyn Classifier>>,
}

impl MindStateController {
    pub fn new(config: MindConfig) -> Result<Self, ControlError> {
        Ok(Self {
            extractor: BandFeatureExtractor::new(
                FeatureSchema::new(config.feature_names.clone()),
                config.rolling_size,
            ),
            sequence: FeatureWindow::new(&config.feature_names, config.window_size),
            attention: RollingWindow::new(config.smoothing_history),
            meditation: RollingWindow::new(config.smoothing_history),
            last_attention: 50.0,
            last_meditation: 50.0,
            last_update: None,
            fan: FanRegulator::new(config.fan.clone()),
            effects: MindStateSystem::new()?,
            classifier: None,
            config,
        })
    }

    pub fn load(config: MindConfig) -> Result<Self, ControlError> {
        let classifier = match &config.classifier {
            Some(path) => Some(Box::new(LinearClassifier::load(path)?) as Box<dyn Classifier>),
            None => None,
        };
        let mut controller = Self::new(config)?;
        controller.classifier = classifier;
        Ok(controller)
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn pwm(&self) -> u8 {
        self.fan.pwm()
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    fn update(&mut self, record: &InputRecord, step: &mut Step) {
        self.attention.push(record.esense.attention);
        self.meditation.push(record.esense.meditation);
        let attention = self.attention.mean().unwrap_or(record.esense.attention);
        let meditation = self.meditation.mean().unwrap_or(record.esense.meditation);

        let attention_delta = attention - self.last_attention;
        let meditation_delta = meditation - self.last_meditation;

        let effects = match self.effects.calculate_effects(attention, meditation) {
            Ok(effects) => Some(effects),
            Err(e) => {
                step.issues.push(e.into());
                None
            }
        };

        let direction = if attention_delta >= 0.0 {
            FanDirection::Faster
        } else {
            FanDirection::Slower
        };
        let pwm = self.fan.step(direction);
        step.intents.push(ActuationIntent::Fan { pwm });

        self.last_attention = attention;
        self.last_meditation = meditation;

        let labels = self.predict_labels(step);
        step.decisions.push(Decision::Mind(MindReport {
            attention,
            meditation,
            attention_delta,
            meditation_delta,
            attention_level: Level::classify(attention, self.config.level_low, self.config.level_high),
            meditation_level: Level::classify(meditation, self.config.level_low, self.config.level_high),
            effects,
            direction,
            pwm,
            labels,
        }));
    }

    fn predict_labels(&mut self, step: &mut Step) -> LabelStatus {
        if !self.sequence.is_full() {
            return LabelStatus::Waiting;
        }
        let classifier = match self.classifier.as_mut() {
            Some(classifier) => classifier,
            None => return LabelStatus::Unavailable,
        };
        let rows = self.sequence.rows();
        let result = classifier
            .predict(&ClassifierInput {
                window: &rows,
                features: None,
            })
            .and_then(|heads| match &heads[..] {
                [attention, relaxation, ..] => Ok((
                    class_name(&self.config.attention_classes, attention)?,
                    class_name(&self.config.relaxation_classes, relaxation)?,
                )),
                _ => Err(ClassifierError::ShapeMismatch {
                    expected: 2,
                    got: heads.len(),
                }),
            });
        match result {
            Ok((attention, relaxation)) => LabelStatus::Predicted {
                attention,
                relaxation,
            },
            Err(e) => {
                warn!("mind-state prediction failed: {}", e);
                step.issues.push(e.into());
                LabelStatus::Unavailable
            }
        }
    }
}

fn class_name(classes: &[String], probabilities: &[f64]) -> Result<String, ClassifierError> {
    let index = argmax(probabilities).ok_or(ClassifierError::NoClasses)?;
    classes
        .get(index)
        .cloned()
        .ok_or(ClassifierError::ShapeMismatch {
            expected: classes.len(),
            got: probabilities.len(),
        })
}

impl Controller for MindStateController {
    fn name(&self) -> &'static str {
        "mind"
    }

    fn tick(&mut self, _now: f64) -> Step {
        Step::default()
    }

    fn ingest(&mut self, record: &InputRecord, now: f64) -> Step {
        let mut step = Step::default();
        match self.extractor.extract(record) {
            Ok(row) => {
                self.sequence.push_row(&row);
            }
            Err(e) => {
                debug!("dropping band feature row: {}", e);
                step.issues.push(e.into());
            }
        }

        let due = self
            .last_update
            .map_or(true, |last| now - last >= self.config.control_interval);
        if due {
            self.update(record, &mut step);
            self.last_update = Some(now);
        }
        step
    }

    fn shutdown(&mut self) -> Vec<ActuationIntent> {
        vec![ActuationIntent::Fan { pwm: 0 }]
    }
}
