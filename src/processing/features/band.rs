use super::{FeatureError, FeatureSchema, BANDS, RATIO_EPSILON};
use crate::processing::window::RollingWindow;
use crate::record::InputRecord;

/// Raw bands, band ratios, rolling band statistics, band deltas and
/// normalised band power for one record.
#[derive(Debug, Clone)]
pub struct BandFeatureExtractor {
    schema: FeatureSchema,
    band_windows: Vec<RollingWindow>,
}

impl BandFeatureExtractor {
    pub fn new(schema: FeatureSchema, rolling_size: usize) -> Self {
        Self {
            schema,
            band_windows: BANDS.iter().map(|_| RollingWindow::new(rolling_size)).collect(),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Updates the per-band history with `record`, then builds the feature row.
    /// The history advances even when the row fails schema validation.
    pub fn extract(&mut self, record: &InputRecord) -> Result<Vec<f64>, FeatureError> {
        let bands = record.eeg_power.values();
        for (window, &value) in self.band_windows.iter_mut().zip(&bands) {
            window.push(value);
        }

        let mut feats = Vec::with_capacity(self.schema.len());
        feats.extend_from_slice(&bands);
        feats.extend(ratios(&bands));

        for window in &self.band_windows {
            feats.push(window.mean().unwrap_or(0.0));
            feats.push(window.std().unwrap_or(0.0));
            feats.push(window.min().unwrap_or(0.0));
            feats.push(window.max().unwrap_or(0.0));
        }

        // Change against the oldest retained sample (rolling_size - 1 steps back once full).
        for window in &self.band_windows {
            let delta = match (window.last(), window.first()) {
                (Some(current), Some(previous)) => current - previous,
                _ => 0.0,
            };
            feats.push(delta);
        }

        let total_power = bands.iter().sum::<f64>() + RATIO_EPSILON;
        feats.extend(bands.iter().map(|v| v / total_power));

        self.schema.validate(&feats)?;
        Ok(feats)
    }
}

/// The ten band ratios, each denominator padded by [`RATIO_EPSILON`].
pub fn ratios(bands: &[f64; 8]) -> [f64; 10] {
    let [_, theta, low_alpha, high_alpha, low_beta, high_beta, low_gamma, high_gamma] = *bands;
    let alpha = low_alpha + high_alpha;
    let beta = low_beta + high_beta;
    let gamma = low_gamma + high_gamma;
    let eps = RATIO_EPSILON;

    [
        theta / (beta + eps),
        alpha / (beta + eps),
        low_alpha / (high_alpha + eps),
        low_beta / (high_beta + eps),
        gamma / (beta + eps),
        alpha / (theta + eps),
        beta / (theta + eps),
        alpha / (theta + beta + eps),
        theta / (alpha + eps),
        gamma / (alpha + eps),
    ]
}
