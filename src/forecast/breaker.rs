// Circuit breaker around the forecasting engine. Replaces a lazily-rechecked
// readiness flag: repeated failures open the circuit, a cooldown later a
// single probe call is let through.

use super::ForecastError;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen,
}

pub struct CircuitBreaker {
    state: std::sync::Mutex<State>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: std::sync::Mutex::new(State::Closed { failures: 0 }),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Gate a call. While Open, rejects locally until the cooldown elapses,
    /// then admits exactly one probe (HalfOpen); concurrent callers stay
    /// rejected until the probe reports back.
    pub fn check(&self) -> Result<(), ForecastError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            State::Closed { .. } => Ok(()),
            State::Open { since } => {
                if since.elapsed() >= self.cooldown {
                    *state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(ForecastError::ServiceUnavailable(
                        "forecasting engine circuit is open (recent failures)".into(),
                    ))
                }
            }
            State::HalfOpen => Err(ForecastError::ServiceUnavailable(
                "forecasting engine circuit is half-open (probe in flight)".into(),
            )),
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = State::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = match *state {
            State::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.failure_threshold {
                    tracing::warn!(failures, "forecasting engine circuit opened");
                    State::Open {
                        since: Instant::now(),
                    }
                } else {
                    State::Closed { failures }
                }
            }
            // a failed probe re-opens with a fresh cooldown
            State::HalfOpen | State::Open { .. } => State::Open {
                since: Instant::now(),
            },
        };
    }

    /// Non-consuming view for status endpoints: would a call currently pass?
    pub fn is_available(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            State::Closed { .. } => true,
            State::Open { since } => since.elapsed() >= self.cooldown,
            State::HalfOpen => false,
        }
    }
}
