use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Named statistics and timing samples for one viewer process.
///
/// Gauges hold the latest value reported by the server; timings accumulate
/// local instrumentation. Both use sorted maps so reports print in a stable
/// order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    gauges: BTreeMap<&'static str, i64>,
    counters: BTreeMap<&'static str, u64>,
    timings: BTreeMap<&'static str, Timing>,
}

/// Aggregate of recorded durations, in microseconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Timing {
    pub count: u64,
    pub total_us: u64,
    pub min_us: u64,
    pub max_us: u64,
}

impl Timing {
    pub fn record(&mut self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        if self.count == 0 {
            self.min_us = us;
            self.max_us = us;
        } else {
            self.min_us = self.min_us.min(us);
            self.max_us = self.max_us.max(us);
        }
        self.count += 1;
        self.total_us = self.total_us.saturating_add(us);
    }

    pub fn merge(&mut self, other: &Timing) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.min_us = self.min_us.min(other.min_us);
        self.max_us = self.max_us.max(other.max_us);
        self.count += other.count;
        self.total_us = self.total_us.saturating_add(other.total_us);
    }

    pub fn mean_us(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_us / self.count
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.gauges.clear();
        self.counters.clear();
        self.timings.clear();
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: &'static str, value: i64) {
        self.gauges.insert(name, value);
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: &'static str) {
        *self.counters.entry(name).or_insert(0) += 1;
    }

    pub fn timing(&self, name: &str) -> Option<Timing> {
        self.timings.get(name).copied()
    }

    pub fn record_timing(&mut self, name: &'static str, elapsed: Duration) {
        self.timings.entry(name).or_default().record(elapsed);
    }

    /// Runs `f`, recording how long it took under `name`.
    pub fn time<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record_timing(name, started.elapsed());
        out
    }

    /// Folds `other` into this collector. Counters and timings accumulate;
    /// gauges from `other` replace ours.
    pub fn merge(&mut self, other: &Metrics) {
        for (name, value) in &other.gauges {
            self.gauges.insert(*name, *value);
        }
        for (name, value) in &other.counters {
            *self.counters.entry(*name).or_insert(0) += *value;
        }
        for (name, timing) in &other.timings {
            self.timings.entry(*name).or_default().merge(timing);
        }
    }

    /// One `name=value` line per gauge and counter, sorted by name.
    pub fn report(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .gauges
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        lines.extend(self.counters.iter().map(|(k, v)| format!("{k}={v}")));
        lines.extend(self.timings.iter().map(|(k, t)| {
            format!("{k}: n={} mean={}us max={}us", t.count, t.mean_us(), t.max_us)
        }));
        lines
    }
}
