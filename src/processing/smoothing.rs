use std::collections::VecDeque;

/// Classifier output classes for the blink model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlinkClass {
    NoBlink,
    Single,
    Double,
}

impl BlinkClass {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(BlinkClass::NoBlink),
            1 => Some(BlinkClass::Single),
            2 => Some(BlinkClass::Double),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            BlinkClass::NoBlink => 0,
            BlinkClass::Single => 1,
            BlinkClass::Double => 2,
        }
    }

    pub fn is_blink(self) -> bool {
        self != BlinkClass::NoBlink
    }
}

// LABEL HISTORY COMPONENT -----------------------------------------------------

/// Bounded, insertion-ordered history of classified labels used for majority smoothing.
#[derive(Debug, Clone)]
pub struct LabelHistory {
    labels: VecDeque<BlinkClass>,
    capacity: usize,
}

impl LabelHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            labels: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn from_labels(capacity: usize, labels: &[BlinkClass]) -> Self {
        let mut history = Self::new(capacity);
        for &label in labels {
            history.push(label);
        }
        history
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = BlinkClass> + '_ {
        self.labels.iter().copied()
    }

    pub fn push(&mut self, label: BlinkClass) {
        if self.labels.len() >= self.capacity {
            self.labels.pop_front();
        }
        self.labels.push_back(label);
    }

    /// A "no blink" label becomes the most recent blink label seen, or `Single`.
    pub fn resolve(&self, raw: BlinkClass) -> BlinkClass {
        if raw.is_blink() {
            return raw;
        }
        self.labels
            .iter()
            .rev()
            .copied()
            .find(|label| label.is_blink())
            .unwrap_or(BlinkClass::Single)
    }

    /// Resolves `raw`, stores the result and returns it.
    pub fn record(&mut self, raw: BlinkClass) -> BlinkClass {
        let label = self.resolve(raw);
        self.push(label);
        label
    }

    /// Majority of {Single, Double}; ties, empty and all-"no blink" histories give `Single`.
    pub fn majority(&self) -> BlinkClass {
        let doubles = self.labels.iter().filter(|&&l| l == BlinkClass::Double).count();
        let singles = self.labels.iter().filter(|&&l| l == BlinkClass::Single).count();
        if doubles > singles {
            BlinkClass::Double
        } else {
            BlinkClass::Single
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BlinkClass::*;

    #[test]
    fn test_majority_vote() {
        let history = LabelHistory::from_labels(5, &[Single, Single, Double, Double, Double]);
        assert_eq!(history.majority(), Double);
    }

    #[test]
    fn test_majority_defaults_to_single() {
        assert_eq!(LabelHistory::new(5).majority(), Single);
        let zeros = LabelHistory::from_labels(5, &[NoBlink, NoBlink, NoBlink]);
        assert_eq!(zeros.majority(), Single);
        let tie = LabelHistory::from_labels(5, &[Double, Single]);
        assert_eq!(tie.majority(), Single);
    }

    #[test]
    fn test_no_blink_takes_most_recent_blink_label() {
        let mut history = LabelHistory::new(5);
        assert_eq!(history.record(NoBlink), Single);
        history.record(Double);
        history.record(Single);
        history.record(Double);
        assert_eq!(history.resolve(NoBlink), Double);
        assert_eq!(history.record(NoBlink), Double);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut history = LabelHistory::new(5);
        for _ in 0..4 {
            history.push(Single);
        }
        for _ in 0..3 {
            history.push(Double);
        }
        assert_eq!(history.len(), 5);
        // [Single, Single, Double, Double, Double]
        assert_eq!(history.majority(), Double);
    }

    #[test]
    fn test_class_indices() {
        assert_eq!(BlinkClass::from_index(2), Some(Double));
        assert_eq!(BlinkClass::from_index(3), None);
        assert_eq!(NoBlink.index(), 0);
    }
}
