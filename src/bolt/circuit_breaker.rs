//! Circuit breaker over a Bolt connection to one cluster's client
//! service.
//!
//! States: `Closed` passes every call through; `Open` fails fast;
//! `HalfOpen` allows exactly one probe. Trip condition is >= 5
//! consecutive failures within a 30s window; recovery is
//! `HalfOpen`+success -> `Closed`, `HalfOpen`+failure -> `Open`.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    window_start: Option<DateTime<Utc>>,
    next_probe_at: Option<DateTime<Utc>>,
    failure_threshold: u32,
    window: ChronoDuration,
    probe_interval: ChronoDuration,
    /// `HalfOpen` allows exactly one in-flight probe at a time.
    probe_in_flight: bool,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, window_secs: u64, probe_interval_secs: u64) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            window_start: None,
            next_probe_at: None,
            failure_threshold,
            window: ChronoDuration::seconds(window_secs as i64),
            probe_interval: ChronoDuration::seconds(probe_interval_secs as i64),
            probe_in_flight: false,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Call before issuing a Bolt request. Transitions `Open` ->
    /// `HalfOpen` once the probe interval has elapsed and admits the
    /// single probe; otherwise returns `false` for `Open`.
    pub fn allow_request(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
            CircuitState::Open => {
                if self.next_probe_at.is_some_and(|t| now >= t) {
                    self.state = CircuitState::HalfOpen;
                    self.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn on_success(&mut self, now: DateTime<Utc>) {
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Closed;
                self.probe_in_flight = false;
                self.failure_count = 0;
                self.window_start = None;
            }
            CircuitState::Closed => {
                self.failure_count = 0;
                self.window_start = None;
            }
            CircuitState::Open => {
                // a stray success after a concurrent transition; ignore
                let _ = now;
            }
        }
    }

    pub fn on_failure(&mut self, now: DateTime<Utc>) {
        match self.state {
            CircuitState::HalfOpen => {
                self.trip(now);
            }
            CircuitState::Closed => {
                match self.window_start {
                    Some(start) if now - start <= self.window => {
                        self.failure_count += 1;
                    }
                    _ => {
                        self.window_start = Some(now);
                        self.failure_count = 1;
                    }
                }
                if self.failure_count >= self.failure_threshold {
                    self.trip(now);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn trip(&mut self, now: DateTime<Utc>) {
        self.state = CircuitState::Open;
        self.probe_in_flight = false;
        self.next_probe_at = Some(now + self.probe_interval);
    }

    pub fn next_probe_at(&self) -> Option<DateTime<Utc>> {
        self.next_probe_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn stays_closed_under_threshold() {
        let mut cb = CircuitBreaker::new(5, 30, 30);
        for i in 0..4 {
            cb.on_failure(t(i));
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn trips_open_at_threshold_within_window() {
        let mut cb = CircuitBreaker::new(5, 30, 30);
        for i in 0..5 {
            cb.on_failure(t(i));
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn fails_fast_while_open() {
        let mut cb = CircuitBreaker::new(5, 30, 30);
        for i in 0..5 {
            cb.on_failure(t(i));
        }
        assert!(!cb.allow_request(t(10)));
    }

    #[test]
    fn half_opens_after_probe_interval_and_closes_on_success() {
        let mut cb = CircuitBreaker::new(5, 30, 30);
        for i in 0..5 {
            cb.on_failure(t(i));
        }
        assert!(cb.allow_request(t(40)));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.on_success(t(41));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let mut cb = CircuitBreaker::new(5, 30, 30);
        for i in 0..5 {
            cb.on_failure(t(i));
        }
        assert!(cb.allow_request(t(40)));
        cb.on_failure(t(41));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn window_resets_after_gap() {
        let mut cb = CircuitBreaker::new(5, 30, 30);
        cb.on_failure(t(0));
        cb.on_failure(t(1));
        cb.on_failure(t(100)); // well past the 30s window; counter restarts
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
