use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use neurofuzz_control::controller::{
    ActuationIntent, BlinkConfig, BlinkController, MindConfig, MindStateController,
};
use neurofuzz_control::local::{
    Actuator, ActuatorError, Clock, ExitReason, ManualClock, MemoryActuator, RecordSource,
    ReplaySource, Session, SessionError, SourceEvent, TransportError,
};
use neurofuzz_control::utils::log::SessionLog;

/// Hands out lines at fixed processing times; sets the shutdown flag once
/// the script runs out if one is attached, otherwise closes.
struct ScriptedSource {
    clock: ManualClock,
    script: VecDeque<(f64, Option<String>)>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl ScriptedSource {
    fn new(clock: &ManualClock, script: Vec<(f64, Option<&str>)>) -> Self {
        Self {
            clock: clock.clone(),
            script: script
                .into_iter()
                .map(|(t, line)| (t, line.map(str::to_string)))
                .collect(),
            interrupt: None,
        }
    }

    fn interrupt_at_end(mut self, flag: &Arc<AtomicBool>) -> Self {
        self.interrupt = Some(Arc::clone(flag));
        self
    }
}

impl RecordSource for ScriptedSource {
    fn next_line(&mut self) -> Result<SourceEvent, TransportError> {
        match self.script.pop_front() {
            Some((t, line)) => {
                self.clock.set(t);
                Ok(line.map_or(SourceEvent::Idle, SourceEvent::Line))
            }
            None => match &self.interrupt {
                Some(flag) => {
                    flag.store(true, Ordering::SeqCst);
                    Ok(SourceEvent::Idle)
                }
                None => Ok(SourceEvent::Closed),
            },
        }
    }
}

struct BrokenActuator;

impl Actuator for BrokenActuator {
    fn send(&mut self, intent: &ActuationIntent) -> Result<(), ActuatorError> {
        Err(ActuatorError::Write {
            command: intent.to_command(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"),
        })
    }
}

const BLINK_100: &str = r#"{"blinkStrength":100}"#;
const BLINK_110: &str = r#"{"blinkStrength":110}"#;

fn blink_session(clock: &ManualClock, source: ScriptedSource, actuator: &MemoryActuator) -> Session {
    let controller = BlinkController::new(BlinkConfig::default()).unwrap();
    Session::new(
        Box::new(controller),
        Box::new(source),
        Box::new(actuator.clone()),
        Box::new(clock.clone()),
    )
}

fn esense_line(attention: u32, meditation: u32) -> String {
    format!(
        r#"{{"eSense":{{"attention":{},"meditation":{}}},"eegPower":{{"delta":1000,"theta":500,"lowAlpha":200,"highAlpha":100,"lowBeta":80,"highBeta":60,"lowGamma":30,"highGamma":20}}}}"#,
        attention, meditation
    )
}

#[test]
fn test_double_blink_sends_window_command() {
    let clock = ManualClock::new(0.0);
    let source = ScriptedSource::new(
        &clock,
        vec![(0.0, Some(BLINK_100)), (0.5, Some(BLINK_110)), (0.7, None), (2.0, None)],
    );
    let actuator = MemoryActuator::new();
    let summary = blink_session(&clock, source, &actuator)
        .run(&AtomicBool::new(false))
        .unwrap();

    assert_eq!(summary.exit, ExitReason::SourceClosed);
    assert_eq!(summary.records, 2);
    assert_eq!(actuator.commands(), vec!["ServoAngle:WINDOW:90\n".to_string()]);
}

#[test]
fn test_single_blink_fires_once_after_timeout() {
    let clock = ManualClock::new(0.0);
    let source = ScriptedSource::new(
        &clock,
        vec![
            (0.0, Some(BLINK_100)),
            (0.5, None),
            (1.0, None),
            (1.2, None),
            (1.3, None),
            (4.0, None),
        ],
    );
    let actuator = MemoryActuator::new();
    blink_session(&clock, source, &actuator)
        .run(&AtomicBool::new(false))
        .unwrap();
    assert_eq!(actuator.commands(), vec!["ServoAngle:DOOR:90\n".to_string()]);
}

#[test]
fn test_stale_pending_blink_is_not_paired() {
    let clock = ManualClock::new(0.0);
    // The second blink lands after the window without an idle tick in between.
    let source = ScriptedSource::new(
        &clock,
        vec![(0.0, Some(BLINK_100)), (1.5, Some(BLINK_110)), (1.8, None), (3.0, None)],
    );
    let actuator = MemoryActuator::new();
    blink_session(&clock, source, &actuator)
        .run(&AtomicBool::new(false))
        .unwrap();
    assert_eq!(
        actuator.commands(),
        vec!["ServoAngle:DOOR:90\n".to_string(), "ServoAngle:DOOR:90\n".to_string()]
    );
}

#[test]
fn test_malformed_and_empty_lines_are_skipped() {
    let clock = ManualClock::new(0.0);
    let source = ScriptedSource::new(
        &clock,
        vec![
            (0.0, Some("not json")),
            (0.1, Some("")),
            (0.2, Some(r#"{"eSense": "#)),
            (0.3, Some(BLINK_100)),
            (2.0, None),
        ],
    );
    let actuator = MemoryActuator::new();
    let summary = blink_session(&clock, source, &actuator)
        .run(&AtomicBool::new(false))
        .unwrap();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.records, 1);
    assert_eq!(actuator.commands(), vec!["ServoAngle:DOOR:90\n".to_string()]);
}

#[test]
fn test_interrupt_discards_pending_blink() {
    let clock = ManualClock::new(0.0);
    let shutdown = Arc::new(AtomicBool::new(false));
    let source =
        ScriptedSource::new(&clock, vec![(0.0, Some(BLINK_100)), (0.2, None)]).interrupt_at_end(&shutdown);
    let actuator = MemoryActuator::new();
    let summary = blink_session(&clock, source, &actuator).run(&shutdown).unwrap();
    assert_eq!(summary.exit, ExitReason::Interrupted);
    assert!(actuator.commands().is_empty());
}

#[test]
fn test_mind_loop_steps_fan_and_stops_it_on_exit() {
    let clock = ManualClock::new(0.0);
    let lines = [
        esense_line(60, 50),
        esense_line(60, 50),
        esense_line(30, 50),
        esense_line(90, 40),
    ];
    let shutdown = Arc::new(AtomicBool::new(false));
    let source = ScriptedSource::new(
        &clock,
        vec![
            (0.0, Some(lines[0].as_str())),
            (0.5, Some(lines[1].as_str())),
            (1.0, Some(lines[2].as_str())),
            (2.0, Some(lines[3].as_str())),
        ],
    )
    .interrupt_at_end(&shutdown);
    let actuator = MemoryActuator::new();
    let session = Session::new(
        Box::new(MindStateController::new(MindConfig::default()).unwrap()),
        Box::new(source),
        Box::new(actuator.clone()),
        Box::new(clock.clone()),
    );
    let summary = session.run(&shutdown).unwrap();

    assert_eq!(summary.exit, ExitReason::Interrupted);
    assert_eq!(summary.records, 4);
    // attention means: 60 (up), skipped at 0.5, 45 (down), 60 (up)
    assert_eq!(
        actuator.commands(),
        vec![
            "FAN:145\n".to_string(),
            "FAN:140\n".to_string(),
            "FAN:145\n".to_string(),
            "FAN:0\n".to_string(),
        ]
    );
}

#[test]
fn test_replay_source_drives_a_session() {
    let clock = ManualClock::new(0.0);
    let data = format!("{}\r\n{}\r\n", BLINK_100, BLINK_110);
    let source = ReplaySource::from_reader(Cursor::new(data), Duration::ZERO);
    let actuator = MemoryActuator::new();
    let session = Session::new(
        Box::new(BlinkController::new(BlinkConfig::default()).unwrap()),
        Box::new(source),
        Box::new(actuator.clone()),
        Box::new(clock.clone()),
    );
    let summary = session.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(clock.now(), 0.0);
    assert_eq!(actuator.commands(), vec!["ServoAngle:WINDOW:90\n".to_string()]);
}

#[test]
fn test_session_log_records_decisions_and_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.csv");
    let clock = ManualClock::new(0.0);
    let source = ScriptedSource::new(&clock, vec![(0.0, Some(BLINK_100)), (1.5, None)]);
    let actuator = MemoryActuator::new();
    blink_session(&clock, source, &actuator)
        .with_log(SessionLog::create(&path).unwrap())
        .run(&AtomicBool::new(false))
        .unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let kinds: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[2].to_string())
        .collect();
    assert_eq!(kinds, vec!["single_blink".to_string(), "command".to_string()]);
}

#[test]
fn test_actuator_failure_ends_session() {
    let clock = ManualClock::new(0.0);
    let source = ScriptedSource::new(&clock, vec![(0.0, Some(&esense_line(50, 50)))]);
    let session = Session::new(
        Box::new(MindStateController::new(MindConfig::default()).unwrap()),
        Box::new(source),
        Box::new(BrokenActuator),
        Box::new(clock.clone()),
    );
    let result = session.run(&AtomicBool::new(false));
    assert!(matches!(result, Err(SessionError::Actuator(_))));
}
