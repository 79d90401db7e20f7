pub mod actuator;
pub mod headset;
pub mod replay;
pub mod session;
pub mod simulate;

pub use actuator::{Actuator, ActuatorConfig, ActuatorError, ConsoleActuator, MemoryActuator, SerialActuator};
pub use headset::{Handshake, HeadsetConfig, HeadsetSource};
pub use replay::ReplaySource;
pub use session::{Clock, ExitReason, ManualClock, Session, SessionError, SessionSummary, SystemClock};
pub use simulate::{SimulateConfig, SimulatedHeadset};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("transport write failed: {0}")]
    Write(#[source] std::io::Error),
}

/// What one blocking read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Line(String),
    /// The read timed out without a complete line.
    Idle,
    Closed,
}

/// Line-oriented input record transport.
pub trait RecordSource: Send {
    fn next_line(&mut self) -> Result<SourceEvent, TransportError>;
}

/// Where input records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Headset,
    Simulate,
    Replay,
}
