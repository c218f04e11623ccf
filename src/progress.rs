use log::info;

/// Logs "processed X of Y lines" each time the number of processed lines reaches a multiple of
/// the interval. An interval of 0 disables the periodic notices.
#[derive(Debug)]
pub struct ProgressTracker {
    interval: usize,
    total: usize,
    count: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> ProgressTracker {
        ProgressTracker { interval: 1000, total, count: 0 }
    }

    pub fn with_interval(mut self, interval: usize) -> ProgressTracker {
        self.interval = interval;
        self
    }

    /// Count one processed line. Returns `true` when a notice was logged.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.interval > 0 && self.count % self.interval == 0 {
            info!("{}", self.notice());
            true
        } else {
            false
        }
    }

    pub fn notice(&self) -> String {
        format!("processed {} of {} lines", self.count, self.total)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn log_final(&self) {
        info!("{} (complete)", self.notice());
    }
}
