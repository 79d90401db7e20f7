// ROLLING WINDOW COMPONENT ----------------------------------------------------

/// Fixed-capacity ring buffer that overwrites its oldest sample once full.
/// Statistics are recomputed from the current contents on every query.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    buffer: Vec<f64>,
    capacity: usize,
    start: usize,
    len: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0.0; capacity],
            capacity,
            start: 0,
            len: 0,
        }
    }

    /// A window that already holds `capacity` copies of `value`.
    pub fn filled(capacity: usize, value: f64) -> Self {
        let mut window = Self::new(capacity);
        window.buffer.iter_mut().for_each(|slot| *slot = value);
        window.len = window.capacity;
        window
    }

    pub fn push(&mut self, sample: f64) {
        let end = (self.start + self.len) % self.capacity;
        self.buffer[end] = sample;
        if self.len == self.capacity {
            self.start = (self.start + 1) % self.capacity; // Overwrite oldest if full
        } else {
            self.len += 1;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.len = 0;
    }

    /// Oldest-first view, `index` 0 being the oldest retained sample.
    pub fn get(&self, index: usize) -> Option<f64> {
        if index >= self.len {
            return None;
        }
        Some(self.buffer[(self.start + index) % self.capacity])
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |i| self.buffer[(self.start + i) % self.capacity])
    }

    /// The retained samples, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// The `n` most recent samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<f64> {
        let skip = self.len.saturating_sub(n);
        self.iter().skip(skip).collect()
    }

    pub fn first(&self) -> Option<f64> {
        self.get(0)
    }

    pub fn last(&self) -> Option<f64> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn mean(&self) -> Option<f64> {
        mean(&self.snapshot())
    }

    /// Population standard deviation.
    pub fn std(&self) -> Option<f64> {
        std(&self.snapshot())
    }

    pub fn min(&self) -> Option<f64> {
        self.iter().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.iter().reduce(f64::max)
    }

    pub fn range(&self) -> Option<f64> {
        Some(self.max()? - self.min()?)
    }

    pub fn diff_mean(&self) -> Option<f64> {
        mean(&diffs(&self.snapshot()))
    }

    pub fn diff_std(&self) -> Option<f64> {
        std(&diffs(&self.snapshot()))
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

pub(crate) fn diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

// FEATURE WINDOW COMPONENT ----------------------------------------------------

/// Multi-channel rolling window: one [`RollingWindow`] per named column, all
/// advanced together so rows stay aligned.
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    columns: Vec<String>,
    channels: Vec<RollingWindow>,
}

impl FeatureWindow {
    pub fn new(columns: &[String], capacity: usize) -> Self {
        Self {
            columns: columns.to_vec(),
            channels: columns.iter().map(|_| RollingWindow::new(capacity)).collect(),
        }
    }

    /// Starts full of zero rows, so a full window is available from the first sample.
    pub fn zeroed(columns: &[String], capacity: usize) -> Self {
        Self {
            columns: columns.to_vec(),
            channels: columns
                .iter()
                .map(|_| RollingWindow::filled(capacity, 0.0))
                .collect(),
        }
    }

    /// Pushes one row; returns false (and changes nothing) on a width mismatch.
    pub fn push_row(&mut self, row: &[f64]) -> bool {
        if row.len() != self.channels.len() {
            return false;
        }
        for (channel, &value) in self.channels.iter_mut().zip(row) {
            channel.push(value);
        }
        true
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.channels.len()
    }

    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, RollingWindow::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.channels.first().map_or(false, RollingWindow::is_full)
    }

    pub fn channel(&self, name: &str) -> Option<&RollingWindow> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| &self.channels[idx])
    }

    pub fn channel_at(&self, index: usize) -> Option<&RollingWindow> {
        self.channels.get(index)
    }

    /// Rows oldest first, each row in column order.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        let snapshots: Vec<Vec<f64>> = self.channels.iter().map(RollingWindow::snapshot).collect();
        (0..self.len())
            .map(|row| snapshots.iter().map(|col| col[row]).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrites_oldest_in_order() {
        let mut window = RollingWindow::new(20);
        for v in 1..=25 {
            window.push(v as f64);
        }
        let expected: Vec<f64> = (6..=25).map(|v| v as f64).collect();
        assert_eq!(window.len(), 20);
        assert_eq!(window.snapshot(), expected);
    }

    #[test]
    fn test_partial_window_keeps_insert_order() {
        let mut window = RollingWindow::new(5);
        window.push(3.0);
        window.push(1.0);
        assert_eq!(window.snapshot(), vec![3.0, 1.0]);
        assert_eq!(window.first(), Some(3.0));
        assert_eq!(window.last(), Some(1.0));
        assert!(!window.is_full());
    }

    #[test]
    fn test_statistics() {
        let mut window = RollingWindow::new(4);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            window.push(v);
        }
        // Holds [5, 5, 7, 9]
        assert_eq!(window.mean(), Some(6.5));
        assert!((window.std().unwrap() - 1.6583123951777).abs() < 1e-9);
        assert_eq!(window.min(), Some(5.0));
        assert_eq!(window.max(), Some(9.0));
        assert_eq!(window.range(), Some(4.0));
        // diffs [0, 2, 2]
        assert!((window.diff_mean().unwrap() - 4.0 / 3.0).abs() < 1e-12);
        assert!((window.diff_std().unwrap() - 0.9428090415820634).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window_has_no_statistics() {
        let window = RollingWindow::new(3);
        assert_eq!(window.mean(), None);
        assert_eq!(window.range(), None);
        assert_eq!(window.diff_mean(), None);
        assert_eq!(window.last(), None);
    }

    #[test]
    fn test_recent_returns_tail() {
        let mut window = RollingWindow::new(5);
        for v in 1..=7 {
            window.push(v as f64);
        }
        assert_eq!(window.recent(3), vec![5.0, 6.0, 7.0]);
        assert_eq!(window.recent(10), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_filled_window_starts_full() {
        let mut window = RollingWindow::filled(3, 0.0);
        assert!(window.is_full());
        window.push(9.0);
        assert_eq!(window.snapshot(), vec![0.0, 0.0, 9.0]);
    }

    #[test]
    fn test_feature_window_rows_stay_aligned() {
        let cols = vec!["a".to_string(), "b".to_string()];
        let mut window = FeatureWindow::zeroed(&cols, 3);
        assert!(window.push_row(&[1.0, 10.0]));
        assert!(window.push_row(&[2.0, 20.0]));
        assert!(!window.push_row(&[3.0]));
        assert_eq!(
            window.rows(),
            vec![vec![0.0, 0.0], vec![1.0, 10.0], vec![2.0, 20.0]]
        );
        assert_eq!(window.channel("b").unwrap().last(), Some(20.0));
        assert!(window.channel("c").is_none());
    }
}
