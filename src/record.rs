use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("empty line")]
    Empty,
    #[error("unparseable record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One JSON line from the headset connector. Missing blocks take neutral defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputRecord {
    #[serde(rename = "eSense")]
    pub esense: ESense,
    pub eeg_power: BandPower,
    pub blink_strength: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poor_signal_level: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ESense {
    pub attention: f64,
    pub meditation: f64,
}

impl Default for ESense {
    fn default() -> Self {
        Self {
            attention: 50.0,
            meditation: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BandPower {
    pub delta: f64,
    pub theta: f64,
    pub low_alpha: f64,
    pub high_alpha: f64,
    pub low_beta: f64,
    pub high_beta: f64,
    pub low_gamma: f64,
    pub high_gamma: f64,
}

impl BandPower {
    /// Band values in [`BANDS`](crate::processing::features::BANDS) order.
    pub fn values(&self) -> [f64; 8] {
        [
            self.delta,
            self.theta,
            self.low_alpha,
            self.high_alpha,
            self.low_beta,
            self.high_beta,
            self.low_gamma,
            self.high_gamma,
        ]
    }
}

impl InputRecord {
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(RecordError::Empty);
        }
        Ok(serde_json::from_str(line)?)
    }

    pub fn to_json(&self) -> String {
        // Plain f64 fields always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}
