pub mod debounce;
pub mod fan;
pub mod features;
pub mod smoothing;
pub mod window;

pub use debounce::{BlinkDebouncer, BlinkDecision, BlinkEvent, DebounceState};
pub use fan::{FanConfig, FanDirection, FanRegulator};
pub use smoothing::{BlinkClass, LabelHistory};
pub use window::{FeatureWindow, RollingWindow};
