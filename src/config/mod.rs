use crate::controller::{BlinkConfig, MindConfig};
use crate::local::{ActuatorConfig, HeadsetConfig, SimulateConfig, SourceKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub transport: TransportConfig,
    pub actuator: ActuatorConfig,
    pub blink: BlinkConfig,
    pub mind: MindConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Echo decisions to the console.
    pub console: bool,
    pub session_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            session_log: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub source: SourceKind,
    pub headset: HeadsetConfig,
    pub simulate: SimulateConfig,
    pub replay: Option<PathBuf>,
    /// Delay between replayed lines.
    pub replay_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Headset,
            headset: HeadsetConfig::default(),
            simulate: SimulateConfig::default(),
            replay: None,
            replay_interval_ms: 100,
        }
    }
}

impl Config {
    /// Rejects values no loop can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let blink = &self.blink;
        let mind = &self.mind;
        let checks = [
            (blink.window_size > 0, "blink.window_size must be positive"),
            (blink.strength_history > 0, "blink.strength_history must be positive"),
            (blink.smoothing_span > 0, "blink.smoothing_span must be positive"),
            (blink.label_history > 0, "blink.label_history must be positive"),
            (
                blink.double_blink_interval.is_finite() && blink.double_blink_interval > 0.0,
                "blink.double_blink_interval must be a positive number of seconds",
            ),
            (
                blink.activation_threshold.is_finite() && blink.min_strength.is_finite(),
                "blink thresholds must be finite",
            ),
            (blink.single_angle <= 180 && blink.double_angle <= 180, "servo angles must be within 0-180"),
            (mind.window_size > 0, "mind.window_size must be positive"),
            (mind.rolling_size > 0, "mind.rolling_size must be positive"),
            (mind.smoothing_history > 0, "mind.smoothing_history must be positive"),
            (
                mind.control_interval.is_finite() && mind.control_interval >= 0.0,
                "mind.control_interval must be a non-negative number of seconds",
            ),
            (mind.level_low <= mind.level_high, "mind.level_low must not exceed mind.level_high"),
            (mind.fan.pwm_min <= mind.fan.pwm_max, "mind.fan.pwm_min must not exceed mind.fan.pwm_max"),
            (
                self.transport.source != SourceKind::Replay || self.transport.replay.is_some(),
                "transport.replay must name a file when the source is replay",
            ),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(ConfigError::Invalid(message.to_string())),
            None => Ok(()),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ServoTarget;
    use std::io::Write;

    #[test]
    fn test_defaults_carry_documented_constants() {
        let config = Config::default();
        assert_eq!(config.blink.activation_threshold, 60.0);
        assert_eq!(config.blink.min_strength, 60.0);
        assert_eq!(config.blink.double_blink_interval, 1.0);
        assert_eq!(config.blink.window_size, 20);
        assert_eq!(config.blink.label_history, 5);
        assert_eq!(config.blink.single_target, ServoTarget::Door);
        assert_eq!(config.blink.double_target, ServoTarget::Window);
        assert_eq!(config.blink.engineered_features.len(), 30);
        assert_eq!(config.mind.feature_names.len(), 66);
        assert_eq!(config.mind.fan.pwm_initial, 140);
        assert_eq!(config.transport.headset.port, 13854);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "blink:\n  activation_threshold: 75\n  double_blink_interval: 0.6\nmind:\n  fan:\n    pwm_step: 10\n"
        )
        .unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.blink.activation_threshold, 75.0);
        assert_eq!(config.blink.double_blink_interval, 0.6);
        assert_eq!(config.blink.min_strength, 60.0);
        assert_eq!(config.mind.fan.pwm_step, 10);
        assert_eq!(config.mind.fan.pwm_max, 255);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(load_config(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neurofuzz.yaml");
        let mut config = Config::default();
        config.actuator.port = "COM4".to_string();
        config.transport.source = SourceKind::Simulate;
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.blink.double_blink_interval = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.transport.source = SourceKind::Replay;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_and_bad_yaml() {
        assert!(matches!(
            load_config("/nonexistent/neurofuzz.yaml"),
            Err(ConfigError::Read { .. })
        ));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "blink: [not, a, map]").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }
}
