use super::{RecordSource, SourceEvent, TransportError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Plays back recorded connector output, one JSON record per line.
pub struct ReplaySource {
    reader: Box<dyn BufRead + Send>,
    pace: Duration,
}

impl ReplaySource {
    /// `pace` is the delay before each line is handed out.
    pub fn open<P: AsRef<Path>>(path: P, pace: Duration) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TransportError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file), pace))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, pace: Duration) -> Self {
        Self {
            reader: Box::new(reader),
            pace,
        }
    }
}

impl RecordSource for ReplaySource {
    fn next_line(&mut self) -> Result<SourceEvent, TransportError> {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(SourceEvent::Closed),
            Ok(_) => Ok(SourceEvent::Line(line.trim_end_matches(&['\r', '\n'][..]).to_string())),
            Err(e) => Err(TransportError::Read(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_replays_lines_then_closes() {
        let data = "{\"blinkStrength\":90}\r\n\n{\"blinkStrength\":70}";
        let mut source = ReplaySource::from_reader(Cursor::new(data), Duration::ZERO);
        assert_eq!(
            source.next_line().unwrap(),
            SourceEvent::Line("{\"blinkStrength\":90}".to_string())
        );
        assert_eq!(source.next_line().unwrap(), SourceEvent::Line(String::new()));
        assert_eq!(
            source.next_line().unwrap(),
            SourceEvent::Line("{\"blinkStrength\":70}".to_string())
        );
        assert_eq!(source.next_line().unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"eSense\":{{\"attention\":40}}}}").unwrap();
        let mut source = ReplaySource::open(file.path(), Duration::ZERO).unwrap();
        assert!(matches!(source.next_line().unwrap(), SourceEvent::Line(_)));
        assert!(matches!(
            ReplaySource::open("/nonexistent/replay.jsonl", Duration::ZERO),
            Err(TransportError::Open { .. })
        ));
    }
}
