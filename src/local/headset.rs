use super::{RecordSource, SourceEvent, TransportError};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpStream;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadsetConfig {
    pub host: String,
    pub port: u16,
    pub read_timeout_ms: u64,
}

impl Default for HeadsetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 13854,
            read_timeout_ms: 1000,
        }
    }
}

/// Configuration line written to the connector right after connecting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub enable_raw_output: bool,
    pub format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_blink_detection: Option<bool>,
    #[serde(rename = "enableESense", skip_serializing_if = "Option::is_none")]
    pub enable_esense: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_spectra: Option<bool>,
}

impl Handshake {
    /// Blink loop: blink detection, eSense and spectra on.
    pub fn blink() -> Self {
        Self {
            enable_raw_output: false,
            format: "Json",
            enable_blink_detection: Some(true),
            enable_esense: Some(true),
            enable_spectra: Some(true),
        }
    }

    /// Mind-state loop: connector defaults.
    pub fn mind() -> Self {
        Self {
            enable_raw_output: false,
            format: "Json",
            enable_blink_detection: None,
            enable_esense: None,
            enable_spectra: None,
        }
    }

    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_default();
        line.push('\n');
        line
    }
}

// HEADSET SOURCE --------------------------------------------------------------

/// ThinkGear-style connector: `\r`-terminated JSON records over TCP.
pub struct HeadsetSource {
    reader: BufReader<TcpStream>,
    pending: Vec<u8>,
}

impl HeadsetSource {
    pub fn connect(config: &HeadsetConfig, handshake: &Handshake) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", config.host, config.port);
        let mut stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            addr: addr.clone(),
            source,
        })?;
        stream
            .set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms.max(1))))
            .map_err(TransportError::Read)?;
        stream
            .write_all(handshake.to_line().as_bytes())
            .map_err(TransportError::Write)?;
        info!("connected to headset connector at {}", addr);

        Ok(Self {
            reader: BufReader::new(stream),
            pending: Vec::new(),
        })
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).trim().to_string()
    }
}

impl RecordSource for HeadsetSource {
    fn next_line(&mut self) -> Result<SourceEvent, TransportError> {
        // Partial reads stay in `pending` until the terminator arrives.
        match self.reader.read_until(b'\r', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(SourceEvent::Closed),
            Ok(_) => Ok(SourceEvent::Line(self.take_line())),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(SourceEvent::Idle)
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(SourceEvent::Idle),
            Err(e) => Err(TransportError::Read(e)),
        }
    }
}
