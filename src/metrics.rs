use std::collections::HashMap;
use std::sync::Mutex;

/// Duration aggregate for one operation name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationStats {
    pub count: u64,
    pub total_seconds: f64,
    pub max_seconds: f64,
}

impl DurationStats {
    pub fn mean_seconds(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_seconds / self.count as f64
        }
    }
}

/// Metrics collaborator, injected where observations are wanted.
///
/// All state sits behind one mutex; every method is safe to call from
/// concurrent tasks. Components take an `Option<Arc<Metrics>>` so the
/// unconfigured path does no work at all.
#[derive(Default)]
pub struct Metrics {
    inner: Mutex<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    durations: HashMap<String, DurationStats>,
    requests: HashMap<String, u64>,
    errors: HashMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Record one elapsed-time observation for `operation`.
    pub fn record_duration(&self, operation: &str, seconds: f64) {
        let mut inner = self.inner.lock().unwrap();
        let stats = inner.durations.entry(operation.to_string()).or_default();
        stats.count += 1;
        stats.total_seconds += seconds;
        if seconds > stats.max_seconds {
            stats.max_seconds = seconds;
        }
    }

    /// Count one API request, bucketed by method and outcome.
    pub fn record_request(&self, method: &str, ok: bool) {
        let key = format!("{}:{}", method, if ok { "ok" } else { "error" });
        let mut inner = self.inner.lock().unwrap();
        *inner.requests.entry(key).or_insert(0) += 1;
    }

    /// Count one error by type name.
    pub fn record_error(&self, error_type: &str) {
        let mut inner = self.inner.lock().unwrap();
        *inner.errors.entry(error_type.to_string()).or_insert(0) += 1;
    }

    /// Sorted rendering of everything recorded, for end-of-run output.
    pub fn snapshot(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut lines = Vec::new();

        let mut durations: Vec<_> = inner.durations.iter().collect();
        durations.sort_by(|a, b| a.0.cmp(b.0));
        for (op, stats) in durations {
            lines.push(format!(
                "{}: {} observations, mean {:.3}s, max {:.3}s",
                op,
                stats.count,
                stats.mean_seconds(),
                stats.max_seconds
            ));
        }

        let mut requests: Vec<_> = inner.requests.iter().collect();
        requests.sort_by(|a, b| a.0.cmp(b.0));
        for (key, count) in requests {
            lines.push(format!("requests {}: {}", key, count));
        }

        let mut errors: Vec<_> = inner.errors.iter().collect();
        errors.sort_by(|a, b| a.0.cmp(b.0));
        for (key, count) in errors {
            lines.push(format!("errors {}: {}", key, count));
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn duration_stats_accumulate() {
        let metrics = Metrics::new();
        metrics.record_duration("page", 0.5);
        metrics.record_duration("page", 1.5);
        let lines = metrics.snapshot();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("2 observations"));
        assert!(lines[0].contains("mean 1.000s"));
        assert!(lines[0].contains("max 1.500s"));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let metrics = Arc::new(Metrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_request("GET", true);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let lines = metrics.snapshot();
        assert!(lines.iter().any(|l| l == "requests GET:ok: 800"));
    }
}
