use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    pub pwm_min: u8,
    pub pwm_max: u8,
    pub pwm_step: u8,
    pub pwm_initial: u8,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            pwm_min: 100,
            pwm_max: 255,
            pwm_step: 5,
            pwm_initial: 140,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanDirection {
    Faster,
    Slower,
}

/// Stepwise fan duty regulator, clamped to `[pwm_min, pwm_max]`.
#[derive(Debug, Clone)]
pub struct FanRegulator {
    config: FanConfig,
    pwm: u8,
}

impl FanRegulator {
    pub fn new(config: FanConfig) -> Self {
        let (low, high) = if config.pwm_min <= config.pwm_max {
            (config.pwm_min, config.pwm_max)
        } else {
            (config.pwm_max, config.pwm_min)
        };
        let pwm = config.pwm_initial.clamp(low, high);
        Self {
            config: FanConfig {
                pwm_min: low,
                pwm_max: high,
                ..config
            },
            pwm,
        }
    }

    pub fn pwm(&self) -> u8 {
        self.pwm
    }

    pub fn step(&mut self, direction: FanDirection) -> u8 {
        self.pwm = match direction {
            FanDirection::Faster => self
                .pwm
                .saturating_add(self.config.pwm_step)
                .min(self.config.pwm_max),
            FanDirection::Slower => self
                .pwm
                .saturating_sub(self.config.pwm_step)
                .max(self.config.pwm_min),
        };
        self.pwm
    }
}
