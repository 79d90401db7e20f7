use super::{ActuationIntent, ControlError, Controller, Decision, ServoTarget, Step};
use crate::classifier::{
    argmax, scale_row, Classifier, ClassifierError, ClassifierInput, LinearClassifier,
    StandardScaler,
};
use crate::fuzzy::{BlinkConfidenceSystem, FallbackReason, Outcome};
use crate::processing::debounce::{BlinkDebouncer, BlinkDecision, BlinkEvent};
use crate::processing::features::{
    blink_engineered_names, blink_window_columns, BlinkFeatureExtractor, FeatureSchema,
};
use crate::processing::smoothing::{BlinkClass, LabelHistory};
use crate::processing::window::{FeatureWindow, RollingWindow};
use crate::record::InputRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Smoothed strength must exceed this before a sample is classified.
    pub activation_threshold: f64,
    /// Raw strengths below this are ignored outright.
    pub min_strength: f64,
    /// Seconds within which a second blink makes a double blink.
    pub double_blink_interval: f64,
    pub window_size: usize,
    pub strength_history: usize,
    pub smoothing_span: usize,
    pub label_history: usize,
    pub fuzzy_enabled: bool,
    pub single_target: ServoTarget,
    pub single_angle: u8,
    pub double_target: ServoTarget,
    pub double_angle: u8,
    pub window_columns: Vec<String>,
    pub engineered_features: Vec<String>,
    pub classifier: Option<PathBuf>,
    pub window_scaler: Option<PathBuf>,
    pub features_scaler: Option<PathBuf>,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 60.0,
            min_strength: 60.0,
            double_blink_interval: 1.0,
            window_size: 20,
            strength_history: 5,
            smoothing_span: 3,
            label_history: 5,
            fuzzy_enabled: true,
            single_target: ServoTarget::Door,
            single_angle: 90,
            double_target: ServoTarget::Window,
            double_angle: 90,
            window_columns: blink_window_columns(),
            engineered_features: blink_engineered_names(),
            classifier: None,
            window_scaler: None,
            features_scaler: None,
        }
    }
}

// BLINK CONTROLLER ------------------------------------------------------------

/// Turns blink-strength samples into door/window servo commands.
pub struct BlinkController {
    config: BlinkConfig,
    extractor: BlinkFeatureExtractor,
    window: FeatureWindow,
    strengths: RollingWindow,
    labels: LabelHistory,
    debouncer: BlinkDebouncer,
    confidence: BlinkConfidenceSystem,
    classifier: Option<Box<dyn Classifier>>,
    window_scaler: Option<StandardScaler>,
    features_scaler: Option<StandardScaler>,
}

impl BlinkController {
    pub fn new(config: BlinkConfig) -> Result<Self, ControlError> {
        let extractor = BlinkFeatureExtractor::new(
            FeatureSchema::new(config.window_columns.clone()),
            FeatureSchema::new(config.engineered_features.clone()),
            config.activation_threshold,
        )?;
        let mut confidence = BlinkConfidenceSystem::new()?;
        confidence.set_enabled(config.fuzzy_enabled);

        Ok(Self {
            window: FeatureWindow::zeroed(&config.window_columns, config.window_size),
            strengths: RollingWindow::new(config.strength_history),
            labels: LabelHistory::new(config.label_history),
            debouncer: BlinkDebouncer::new(config.double_blink_interval),
            extractor,
            confidence,
            classifier: None,
            window_scaler: None,
            features_scaler: None,
            config,
        })
    }

    /// Builds the controller and loads whichever model files the config names.
    pub fn load(config: BlinkConfig) -> Result<Self, ControlError> {
        let classifier = match &config.classifier {
            Some(path) => Some(Box::new(LinearClassifier::load(path)?) as Box<dyn Classifier>),
            None => None,
        };
        let window_scaler = config.window_scaler.as_ref().map(StandardScaler::load).transpose()?;
        let features_scaler = config
            .features_scaler
            .as_ref()
            .map(StandardScaler::load)
            .transpose()?;

        let mut controller = Self::new(config)?;
        controller.classifier = classifier;
        controller.window_scaler = window_scaler;
        controller.features_scaler = features_scaler;
        Ok(controller)
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_scalers(
        mut self,
        window: Option<StandardScaler>,
        features: Option<StandardScaler>,
    ) -> Self {
        self.window_scaler = window;
        self.features_scaler = features;
        self
    }

    pub fn config(&self) -> &BlinkConfig {
        &self.config
    }

    pub fn debouncer(&self) -> &BlinkDebouncer {
        &self.debouncer
    }

    pub fn labels(&self) -> &LabelHistory {
        &self.labels
    }

    /// Mean of the most recent `smoothing_span` qualifying strengths.
    fn smoothed_strength(&self, raw: f64) -> f64 {
        let recent = self.strengths.recent(self.config.smoothing_span.max(1));
        if recent.is_empty() {
            raw
        } else {
            recent.iter().sum::<f64>() / recent.len() as f64
        }
    }

    /// Raw model label for the current window. Without a model every
    /// qualifying sample counts as "no blink" and is resolved from history.
    fn classify(&mut self) -> Result<BlinkClass, ControlError> {
        let classifier = match self.classifier.as_mut() {
            Some(classifier) => classifier,
            None => return Ok(BlinkClass::NoBlink),
        };

        let rows = self.window.rows();
        let scaled_rows = match &self.window_scaler {
            Some(scaler) => scaler.transform_rows(&rows)?,
            None => rows,
        };
        let features = self.extractor.extract(&self.window)?;
        let scaled_features = scale_row(self.features_scaler.as_ref(), &features)?;

        let heads = classifier.predict(&ClassifierInput {
            window: &scaled_rows,
            features: Some(&scaled_features),
        })?;
        let probabilities = heads.first().ok_or(ClassifierError::NoClasses)?;
        let index = argmax(probabilities).ok_or(ClassifierError::NoClasses)?;
        BlinkClass::from_index(index).ok_or_else(|| {
            ClassifierError::ShapeMismatch {
                expected: 3,
                got: probabilities.len(),
            }
            .into()
        })
    }

    fn intent_for(&self, decision: &BlinkDecision) -> ActuationIntent {
        match decision {
            BlinkDecision::Single(_) => ActuationIntent::Servo {
                target: self.config.single_target,
                angle: self.config.single_angle,
            },
            BlinkDecision::Double(..) => ActuationIntent::Servo {
                target: self.config.double_target,
                angle: self.config.double_angle,
            },
        }
    }

    fn emit(&self, step: &mut Step, decisions: impl IntoIterator<Item = BlinkDecision>) {
        for decision in decisions {
            step.intents.push(self.intent_for(&decision));
            step.decisions.push(Decision::Blink(decision));
        }
    }
}

impl Controller for BlinkController {
    fn name(&self) -> &'static str {
        "blink"
    }

    fn tick(&mut self, now: f64) -> Step {
        let mut step = Step::default();
        let expired = self.debouncer.poll(now);
        self.emit(&mut step, expired);
        step
    }

    fn ingest(&mut self, record: &InputRecord, now: f64) -> Step {
        let mut step = Step::default();

        // The window tracks every record, qualifying or not.
        let row = self.extractor.row(record, now);
        self.window.push_row(&row);

        let raw = record.blink_strength;
        if raw < self.config.min_strength {
            return step;
        }
        self.strengths.push(raw);
        let strength = self.smoothed_strength(raw);
        if strength <= self.config.activation_threshold {
            return step;
        }

        let raw_label = match self.classify() {
            Ok(label) => label,
            Err(e) => {
                warn!("blink classification skipped: {}", e);
                step.issues.push(e);
                return step;
            }
        };
        let resolved = self.labels.record(raw_label);
        let label = self.labels.majority();

        let confidence = match self.confidence.calculate(strength) {
            Ok(Outcome::Fallback {
                value,
                reason: FallbackReason::Inference(e),
            }) => {
                warn!("blink confidence fell back to {:.2}: {}", value, e);
                value
            }
            Ok(outcome) => outcome.value(),
            Err(e) => {
                step.issues.push(e.into());
                return step;
            }
        };

        debug!(
            "blink sample strength={:.1} raw={:?} smoothed={:?} confidence={:.2}",
            strength, resolved, label, confidence
        );
        let event = BlinkEvent::new(now, strength, resolved, label, confidence);
        let decision = self.debouncer.on_event(event, now);
        self.emit(&mut step, decision);
        step
    }

    fn shutdown(&mut self) -> Vec<ActuationIntent> {
        if let Some(event) = self.debouncer.discard() {
            debug!("discarding pending blink from t={:.3}", event.timestamp());
        }
        Vec::new()
    }
}
