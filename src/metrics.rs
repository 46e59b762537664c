use metrics::{register_counter, register_histogram, Counter, Histogram};
use std::time::Duration;

pub struct Metrics {
    pub captures_completed: Counter,
    pub captures_failed: Counter,
    pub segments_captured: Counter,
    pub capture_duration: Histogram,
    pub artifact_bytes: Histogram,
}

impl Metrics {
    /// Handles that discard everything. Used when no recorder is installed.
    pub fn new() -> Self {
        Self {
            captures_completed: Counter::noop(),
            captures_failed: Counter::noop(),
            segments_captured: Counter::noop(),
            capture_duration: Histogram::noop(),
            artifact_bytes: Histogram::noop(),
        }
    }

    /// Handles registered with the global recorder.
    ///
    /// The host installs the recorder (an exporter, a debugging recorder)
    /// before calling this and passes the result to
    /// [`SnagService::with_metrics`](crate::SnagService::with_metrics). With no
    /// recorder installed these handles discard everything, same as [`Metrics::new`].
    pub fn registered() -> Self {
        Self {
            captures_completed: register_counter!("snag_captures_completed_total"),
            captures_failed: register_counter!("snag_captures_failed_total"),
            segments_captured: register_counter!("snag_segments_captured_total"),
            capture_duration: register_histogram!("snag_capture_duration_seconds"),
            artifact_bytes: register_histogram!("snag_artifact_bytes"),
        }
    }

    pub fn record_capture(&self, duration: Duration, success: bool) {
        if success {
            self.captures_completed.increment(1);
        } else {
            self.captures_failed.increment(1);
        }

        self.capture_duration.record(duration.as_secs_f64());
    }

    pub fn record_segments(&self, count: usize) {
        self.segments_captured.increment(count as u64);
    }

    pub fn record_artifact(&self, bytes: usize) {
        self.artifact_bytes.record(bytes as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        for metrics in [Metrics::new(), Metrics::registered()] {
            metrics.record_capture(Duration::from_millis(120), true);
            metrics.record_capture(Duration::from_millis(80), false);
            metrics.record_segments(3);
            metrics.record_artifact(4096);
        }
    }
}
