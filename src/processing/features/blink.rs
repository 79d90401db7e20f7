use super::{FeatureError, FeatureSchema, BANDS};
use crate::processing::window::{diffs, mean, std, FeatureWindow};
use crate::record::InputRecord;

/// Width of one blink-window row: eSense (2), bands (8), blink strength, time.
pub const WINDOW_ROW_WIDTH: usize = 12;

/// Engineered blink-strength features over a [`FeatureWindow`].
#[derive(Debug, Clone)]
pub struct BlinkFeatureExtractor {
    columns: FeatureSchema,
    engineered: FeatureSchema,
    threshold: f64,
    attention_idx: usize,
    meditation_idx: usize,
    strength_idx: usize,
    time_idx: usize,
    band_idx: Vec<usize>,
}

impl BlinkFeatureExtractor {
    /// `columns` names the window row layout, `engineered` the vector the model expects.
    pub fn new(
        columns: FeatureSchema,
        engineered: FeatureSchema,
        threshold: f64,
    ) -> Result<Self, FeatureError> {
        if columns.len() != WINDOW_ROW_WIDTH {
            return Err(FeatureError::LengthMismatch {
                expected: WINDOW_ROW_WIDTH,
                got: columns.len(),
            });
        }
        let attention_idx = columns.index_of("attention")?;
        let meditation_idx = columns.index_of("meditation")?;
        let strength_idx = columns.index_of("blinkStrength")?;
        let time_idx = columns.index_of("time")?;
        let band_idx = BANDS
            .iter()
            .map(|band| columns.index_of(band))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            columns,
            engineered,
            threshold,
            attention_idx,
            meditation_idx,
            strength_idx,
            time_idx,
            band_idx,
        })
    }

    pub fn columns(&self) -> &FeatureSchema {
        &self.columns
    }

    /// Window row for one record in column order, stamped with processing time `now` (seconds).
    pub fn row(&self, record: &InputRecord, now: f64) -> Vec<f64> {
        let mut row = vec![0.0; self.columns.len()];
        row[self.attention_idx] = record.esense.attention;
        row[self.meditation_idx] = record.esense.meditation;
        for (&idx, value) in self.band_idx.iter().zip(record.eeg_power.values()) {
            row[idx] = value;
        }
        row[self.strength_idx] = record.blink_strength;
        row[self.time_idx] = now;
        row
    }

    pub fn extract(&self, window: &FeatureWindow) -> Result<Vec<f64>, FeatureError> {
        if window.width() != self.columns.len() {
            return Err(FeatureError::LengthMismatch {
                expected: self.columns.len(),
                got: window.width(),
            });
        }
        let strength = window
            .channel_at(self.strength_idx)
            .map(|c| c.snapshot())
            .unwrap_or_default();
        let time = window
            .channel_at(self.time_idx)
            .map(|c| c.snapshot())
            .unwrap_or_default();
        if strength.is_empty() {
            return Err(FeatureError::EmptyWindow);
        }

        let strength_diffs = diffs(&strength);
        let mut feats = Vec::with_capacity(self.engineered.len());
        feats.push(mean(&strength).unwrap_or(0.0));
        feats.push(std(&strength).unwrap_or(0.0));
        feats.push(min(&strength));
        feats.push(max(&strength));
        feats.push(strength[strength.len() - 1]);
        feats.push(max(&strength) - min(&strength));
        feats.push(mean(&strength_diffs).unwrap_or(0.0));
        feats.push(std(&strength_diffs).unwrap_or(0.0));
        feats.push(strength.iter().filter(|&&s| s > self.threshold).count() as f64);
        feats.push(strength.iter().filter(|&&s| s == 0.0).count() as f64);
        feats.push(min(&time));
        feats.push(max(&time));
        feats.push(max(&time) - min(&time));

        for &idx in &self.band_idx {
            let band = window.channel_at(idx).map(|c| c.snapshot()).unwrap_or_default();
            feats.push(mean(&band).unwrap_or(0.0));
            feats.push(std(&band).unwrap_or(0.0));
        }

        // Gap between the last two samples at or above threshold.
        let blink_times: Vec<f64> = strength
            .iter()
            .zip(&time)
            .filter(|(&s, _)| s >= self.threshold)
            .map(|(_, &t)| t)
            .collect();
        let gap = match blink_times.as_slice() {
            [.., previous, last] => last - previous,
            _ => 0.0,
        };
        feats.push(gap);

        self.engineered.validate(&feats)?;
        Ok(feats)
    }
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::features::{blink_engineered_names, blink_window_columns};

    fn extractor() -> BlinkFeatureExtractor {
        BlinkFeatureExtractor::new(
            FeatureSchema::new(blink_window_columns()),
            FeatureSchema::new(blink_engineered_names()),
            60.0,
        )
        .unwrap()
    }

    fn record(strength: f64, theta: f64) -> InputRecord {
        let mut r = InputRecord::default();
        r.blink_strength = strength;
        r.eeg_power.theta = theta;
        r
    }

    #[test]
    fn test_vector_matches_schema_length() {
        let ex = extractor();
        let mut window = FeatureWindow::zeroed(&blink_window_columns(), 20);
        window.push_row(&ex.row(&record(80.0, 1.0), 100.0));
        let feats = ex.extract(&window).unwrap();
        assert_eq!(feats.len(), 30);
    }

    #[test]
    fn test_strength_statistics_and_gap() {
        let ex = extractor();
        let mut window = FeatureWindow::new(&blink_window_columns(), 4);
        for (s, t) in [(0.0, 1.0), (70.0, 2.0), (40.0, 3.0), (90.0, 4.5)] {
            window.push_row(&ex.row(&record(s, 10.0), t));
        }
        let f = ex.extract(&window).unwrap();
        assert_eq!(f[0], 50.0); // mean
        assert_eq!(f[2], 0.0); // min
        assert_eq!(f[3], 90.0); // max
        assert_eq!(f[4], 90.0); // last
        assert_eq!(f[5], 90.0); // range
        assert_eq!(f[6], 30.0); // mean of diffs [70, -30, 50]
        assert_eq!(f[8], 2.0); // above 60
        assert_eq!(f[9], 1.0); // zeros
        assert_eq!(f[10], 1.0);
        assert_eq!(f[11], 4.5);
        assert_eq!(f[12], 3.5);
        // theta mean/std sit after delta mean/std
        assert_eq!(f[15], 10.0);
        assert_eq!(f[16], 0.0);
        // last two at-or-above-threshold samples at t=2.0 and t=4.5
        assert_eq!(f[29], 2.5);
    }

    #[test]
    fn test_gap_is_zero_with_fewer_than_two_blinks() {
        let ex = extractor();
        let mut window = FeatureWindow::new(&blink_window_columns(), 4);
        window.push_row(&ex.row(&record(75.0, 0.0), 1.0));
        window.push_row(&ex.row(&record(10.0, 0.0), 2.0));
        let f = ex.extract(&window).unwrap();
        assert_eq!(f[29], 0.0);
    }

    #[test]
    fn test_external_schema_mismatch_is_reported() {
        let mut names = blink_engineered_names();
        names.pop();
        let ex = BlinkFeatureExtractor::new(
            FeatureSchema::new(blink_window_columns()),
            FeatureSchema::new(names),
            60.0,
        )
        .unwrap();
        let window = FeatureWindow::zeroed(&blink_window_columns(), 5);
        assert_eq!(
            ex.extract(&window),
            Err(FeatureError::LengthMismatch {
                expected: 29,
                got: 30
            })
        );
    }

    #[test]
    fn test_column_list_must_name_required_channels() {
        let mut cols = blink_window_columns();
        cols[10] = "blink".to_string();
        let err = BlinkFeatureExtractor::new(
            FeatureSchema::new(cols),
            FeatureSchema::new(blink_engineered_names()),
            60.0,
        )
        .unwrap_err();
        assert_eq!(err, FeatureError::MissingColumn("blinkStrength".to_string()));
    }

    #[test]
    fn test_empty_window() {
        let ex = extractor();
        let window = FeatureWindow::new(&blink_window_columns(), 5);
        assert_eq!(ex.extract(&window), Err(FeatureError::EmptyWindow));
    }
}
