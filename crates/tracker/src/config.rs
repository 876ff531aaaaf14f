use std::time::Duration;

/// Tunable parameters for [`JobTracker`](crate::JobTracker).
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Delay between consecutive status polls of one job.
    pub poll_interval: Duration,
    /// A job still pending this long after its first poll is failed.
    pub poll_timeout: Duration,
    /// Capacity of the [`TrackerEvent`](crate::TrackerEvent) broadcast
    /// channel.
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(60),
            event_capacity: 256,
        }
    }
}
