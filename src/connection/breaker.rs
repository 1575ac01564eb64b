//! Per-profile circuit breaker.
//!
//! `closed → open → half-open → closed`. Failures are counted per profile
//! name; at the threshold the breaker opens for one cooldown period, during
//! which attempts are refused without touching the network. Once the
//! cooldown has passed one attempt is let through (half-open). Any success
//! forgets the profile's record entirely.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Failure record for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerState {
    pub failures: u32,
    pub last_failure: Option<Instant>,
    pub state: BreakerState,
    pub next_attempt: Option<Instant>,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            failures: 0,
            last_failure: None,
            state: BreakerState::Closed,
            next_attempt: None,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    entries: Mutex<HashMap<String, CircuitBreakerState>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether an attempt for `name` may go through at `now`. When the
    /// breaker is open, returns how long until the next attempt is allowed.
    /// An open breaker whose cooldown has passed moves to half-open.
    pub fn check(&self, name: &str, now: Instant) -> Result<(), Duration> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get_mut(name) else {
            return Ok(());
        };

        match entry.state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => match entry.next_attempt {
                Some(next) if now < next => Err(next - now),
                _ => {
                    tracing::debug!(profile = %name, "circuit half-open, allowing one attempt");
                    entry.state = BreakerState::HalfOpen;
                    Ok(())
                }
            },
        }
    }

    /// Count a failed attempt. Opens the breaker once the threshold is
    /// reached, and again straight away after a failed half-open attempt.
    pub fn record_failure(&self, name: &str, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(name.to_string()).or_default();
        entry.failures += 1;
        entry.last_failure = Some(now);

        if entry.failures >= self.threshold {
            if entry.state != BreakerState::Open {
                tracing::warn!(
                    profile = %name,
                    failures = entry.failures,
                    cooldown_secs = self.cooldown.as_secs(),
                    "circuit opened"
                );
            }
            entry.state = BreakerState::Open;
            entry.next_attempt = Some(now + self.cooldown);
        }
    }

    /// A successful attempt resets the profile to a fresh closed state.
    pub fn record_success(&self, name: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(name);
    }

    /// Snapshot of the record for `name`, if any failures are on file.
    pub fn state(&self, name: &str) -> Option<CircuitBreakerState> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_secs(60))
    }

    #[test]
    fn test_opens_at_threshold() {
        let b = breaker();
        let now = Instant::now();

        b.record_failure("prod", now);
        b.record_failure("prod", now);
        assert!(b.check("prod", now).is_ok());
        assert_eq!(b.state("prod").unwrap().state, BreakerState::Closed);

        b.record_failure("prod", now);
        let state = b.state("prod").unwrap();
        assert_eq!(state.state, BreakerState::Open);
        assert_eq!(state.failures, 3);
        assert_eq!(state.next_attempt, Some(now + Duration::from_secs(60)));

        let wait = b.check("prod", now + Duration::from_secs(10)).unwrap_err();
        assert_eq!(wait, Duration::from_secs(50));
    }

    #[test]
    fn test_half_open_after_cooldown() {
        let b = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            b.record_failure("prod", now);
        }

        let later = now + Duration::from_secs(61);
        assert!(b.check("prod", later).is_ok());
        assert_eq!(b.state("prod").unwrap().state, BreakerState::HalfOpen);

        // Failing the half-open attempt re-opens for another full cooldown
        b.record_failure("prod", later);
        let state = b.state("prod").unwrap();
        assert_eq!(state.state, BreakerState::Open);
        assert_eq!(state.next_attempt, Some(later + Duration::from_secs(60)));
        assert!(b.check("prod", later + Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_success_resets() {
        let b = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            b.record_failure("prod", now);
        }
        b.record_success("prod");
        assert!(b.state("prod").is_none());
        assert!(b.check("prod", now).is_ok());
    }

    #[test]
    fn test_profiles_are_independent() {
        let b = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            b.record_failure("prod", now);
        }
        assert!(b.check("prod", now).is_err());
        assert!(b.check("staging", now).is_ok());
        assert!(b.state("staging").is_none());
    }
}
