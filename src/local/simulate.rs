use super::{RecordSource, SourceEvent, TransportError};
use crate::record::{BandPower, ESense, InputRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulateConfig {
    /// Delay between generated records.
    pub interval_ms: u64,
    /// Chance per record of a blink.
    pub blink_probability: f64,
    /// Chance that a blink is followed by a second one.
    pub double_probability: f64,
    /// Records between the two blinks of a double.
    pub double_gap: u32,
    pub seed: Option<u64>,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            blink_probability: 0.02,
            double_probability: 0.4,
            double_gap: 3,
            seed: None,
        }
    }
}

// SIMULATED HEADSET -----------------------------------------------------------

/// Random-walk eSense values and band powers with occasional blink bursts.
pub struct SimulatedHeadset {
    config: SimulateConfig,
    rng: StdRng,
    attention: f64,
    meditation: f64,
    queued_blink: Option<u32>,
}

impl SimulatedHeadset {
    pub fn new(config: SimulateConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            attention: 50.0,
            meditation: 50.0,
            queued_blink: None,
        }
    }

    pub fn next_record(&mut self) -> InputRecord {
        self.attention = (self.attention + self.rng.gen_range(-5.0..5.0_f64)).clamp(0.0, 100.0);
        self.meditation = (self.meditation + self.rng.gen_range(-5.0..5.0_f64)).clamp(0.0, 100.0);

        // Rough 1/f spectrum with per-band jitter.
        let scales: [f64; 8] = [900_000.0, 250_000.0, 40_000.0, 30_000.0, 20_000.0, 15_000.0, 8_000.0, 4_000.0];
        let mut bands = [0.0_f64; 8];
        for (band, scale) in bands.iter_mut().zip(scales) {
            *band = (scale * self.rng.gen_range(0.5..1.5_f64)).round();
        }

        InputRecord {
            esense: ESense {
                attention: self.attention.round(),
                meditation: self.meditation.round(),
            },
            eeg_power: BandPower {
                delta: bands[0],
                theta: bands[1],
                low_alpha: bands[2],
                high_alpha: bands[3],
                low_beta: bands[4],
                high_beta: bands[5],
                low_gamma: bands[6],
                high_gamma: bands[7],
            },
            blink_strength: self.blink_strength(),
            poor_signal_level: Some(0.0),
        }
    }

    fn blink_strength(&mut self) -> f64 {
        let due = match self.queued_blink {
            Some(0) => {
                self.queued_blink = None;
                true
            }
            Some(n) => {
                self.queued_blink = Some(n - 1);
                false
            }
            None => {
                let blink = self.rng.gen_bool(self.config.blink_probability.clamp(0.0, 1.0));
                if blink && self.rng.gen_bool(self.config.double_probability.clamp(0.0, 1.0)) {
                    self.queued_blink = Some(self.config.double_gap);
                }
                blink
            }
        };
        if due {
            self.rng.gen_range(80.0..200.0_f64).round()
        } else {
            0.0
        }
    }
}

impl RecordSource for SimulatedHeadset {
    fn next_line(&mut self) -> Result<SourceEvent, TransportError> {
        if self.config.interval_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.interval_ms));
        }
        Ok(SourceEvent::Line(self.next_record().to_json()))
    }
}
