use super::smoothing::BlinkClass;

/// A qualifying blink sample after classification. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct BlinkEvent {
    timestamp: f64,
    strength: f64,
    raw_label: BlinkClass,
    label: BlinkClass,
    confidence: f64,
}

impl BlinkEvent {
    pub fn new(
        timestamp: f64,
        strength: f64,
        raw_label: BlinkClass,
        label: BlinkClass,
        confidence: f64,
    ) -> Self {
        Self {
            timestamp,
            strength,
            raw_label,
            label,
            confidence,
        }
    }

    /// Processing time in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Smoothed blink strength.
    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Label as resolved from the classifier, before majority smoothing.
    pub fn raw_label(&self) -> BlinkClass {
        self.raw_label
    }

    /// Majority-smoothed label.
    pub fn label(&self) -> BlinkClass {
        self.label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlinkDecision {
    Single(BlinkEvent),
    Double(BlinkEvent, BlinkEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DebounceState {
    Idle,
    Pending { event: BlinkEvent, deadline: f64 },
}

// DEBOUNCER COMPONENT ---------------------------------------------------------

/// Pairs blink events arriving within `interval` seconds into a double blink;
/// an unpaired event becomes a single blink once its window has passed.
///
/// Call [`poll`](Self::poll) at the top of every loop iteration, before
/// handing over any new event.
#[derive(Debug, Clone)]
pub struct BlinkDebouncer {
    interval: f64,
    state: DebounceState,
}

impl BlinkDebouncer {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            state: DebounceState::Idle,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }

    /// Timeout check: emits the pending event as a single blink once `now`
    /// is past its deadline.
    pub fn poll(&mut self, now: f64) -> Option<BlinkDecision> {
        let expired = match &self.state {
            DebounceState::Pending { deadline, .. } => now > *deadline,
            DebounceState::Idle => false,
        };
        if !expired {
            return None;
        }
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { event, .. } => Some(BlinkDecision::Single(event)),
            DebounceState::Idle => None,
        }
    }

    /// Feeds a newly classified event observed at `now`.
    pub fn on_event(&mut self, event: BlinkEvent, now: f64) -> Option<BlinkDecision> {
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Idle => {
                self.start_pending(event);
                None
            }
            DebounceState::Pending { event: pending, .. } => {
                if now - pending.timestamp() <= self.interval {
                    Some(BlinkDecision::Double(pending, event))
                } else {
                    // Stale: never paired with the new event, which opens its own window.
                    self.start_pending(event);
                    Some(BlinkDecision::Single(pending))
                }
            }
        }
    }

    /// One cooperative tick: timeout first, then the new event if any.
    pub fn step(&mut self, now: f64, event: Option<BlinkEvent>) -> Vec<BlinkDecision> {
        let mut decisions = Vec::new();
        decisions.extend(self.poll(now));
        if let Some(event) = event {
            decisions.extend(self.on_event(event, now));
        }
        decisions
    }

    /// Drops any pending event without emitting it.
    pub fn discard(&mut self) -> Option<BlinkEvent> {
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { event, .. } => Some(event),
            DebounceState::Idle => None,
        }
    }

    fn start_pending(&mut self, event: BlinkEvent) {
        let deadline = event.timestamp() + self.interval;
        self.state = DebounceState::Pending { event, deadline };
    }
}
