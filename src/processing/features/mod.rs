pub mod band;
pub mod blink;

pub use band::BandFeatureExtractor;
pub use blink::BlinkFeatureExtractor;

use thiserror::Error;

/// EEG power bands in the order the headset reports them.
pub const BANDS: [&str; 8] = [
    "delta",
    "theta",
    "lowAlpha",
    "highAlpha",
    "lowBeta",
    "highBeta",
    "lowGamma",
    "highGamma",
];

/// Added to every ratio denominator.
pub const RATIO_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("feature count mismatch: got {got}, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("feature column '{0}' is not in the schema")]
    MissingColumn(String),
    #[error("feature window is empty")]
    EmptyWindow,
}

/// Ordered feature names supplied alongside a trained model. Vectors handed to
/// the model must match it exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Result<usize, FeatureError> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| FeatureError::MissingColumn(name.to_string()))
    }

    pub fn validate(&self, values: &[f64]) -> Result<(), FeatureError> {
        if values.len() != self.names.len() {
            return Err(FeatureError::LengthMismatch {
                expected: self.names.len(),
                got: values.len(),
            });
        }
        Ok(())
    }
}

// DEFAULT SCHEMAS -------------------------------------------------------------

/// Columns of one blink-window row.
pub fn blink_window_columns() -> Vec<String> {
    let mut cols = vec!["attention".to_string(), "meditation".to_string()];
    cols.extend(BANDS.iter().map(|b| b.to_string()));
    cols.push("blinkStrength".to_string());
    cols.push("time".to_string());
    cols
}

pub fn blink_engineered_names() -> Vec<String> {
    let mut names: Vec<String> = [
        "blink_mean",
        "blink_std",
        "blink_min",
        "blink_max",
        "blink_last",
        "blink_range",
        "blink_diff_mean",
        "blink_diff_std",
        "blink_above_threshold",
        "blink_zero_count",
        "time_min",
        "time_max",
        "time_range",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for band in BANDS {
        names.push(format!("{}_mean", band));
        names.push(format!("{}_std", band));
    }
    names.push("inter_blink_gap".to_string());
    names
}

pub const RATIO_NAMES: [&str; 10] = [
    "theta_beta",
    "alpha_beta",
    "lowHigh_alpha",
    "lowHigh_beta",
    "gamma_beta",
    "alpha_theta",
    "beta_theta",
    "alpha_theta_beta",
    "theta_alpha",
    "gamma_alpha",
];

pub fn band_feature_names() -> Vec<String> {
    let mut names: Vec<String> = BANDS.iter().map(|b| b.to_string()).collect();
    names.extend(RATIO_NAMES.iter().map(|r| r.to_string()));
    for band in BANDS {
        for stat in ["mean", "std", "min", "max"] {
            names.push(format!("{}_{}", band, stat));
        }
    }
    names.extend(BANDS.iter().map(|b| format!("{}_delta", b)));
    names.extend(BANDS.iter().map(|b| format!("{}_norm", b)));
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_lengths() {
        assert_eq!(blink_window_columns().len(), 12);
        assert_eq!(blink_engineered_names().len(), 30);
        assert_eq!(band_feature_names().len(), 66);
    }

    #[test]
    fn test_validate_reports_mismatch() {
        let schema = FeatureSchema::new(vec!["a".into(), "b".into()]);
        assert!(schema.validate(&[1.0, 2.0]).is_ok());
        assert_eq!(
            schema.validate(&[1.0, 2.0, 3.0]),
            Err(FeatureError::LengthMismatch {
                expected: 2,
                got: 3
            })
        );
        assert_eq!(
            schema.index_of("c"),
            Err(FeatureError::MissingColumn("c".into()))
        );
    }
}
