// src/recovery/circuit_breaker.rs
//! Circuit breaker state machine.
//!
//! ```text
//! CLOSED    -> OPEN       failure_count >= failure_threshold, or any api_limit error
//! OPEN      -> HALF_OPEN  now >= next_attempt_time (checked lazily on the next call)
//! HALF_OPEN -> CLOSED     success_threshold successful trial calls
//! HALF_OPEN -> OPEN       any failure
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BreakerState::Closed => "CLOSED",
            BreakerState::Open => "OPEN",
            BreakerState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    ApiLimit,
    Generic,
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "network" => Ok(ErrorKind::Network),
            "timeout" => Ok(ErrorKind::Timeout),
            "api_limit" | "api-limit" | "ratelimit" | "rate_limit" => Ok(ErrorKind::ApiLimit),
            "generic" => Ok(ErrorKind::Generic),
            other => Err(format!(
                "Unknown error kind: {}. Use network, timeout, api_limit or generic",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerPolicy {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            reset_timeout: Duration::seconds(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerState {
    pub state: BreakerState,
    pub failure_count: u32,
    #[serde(default)]
    pub success_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub next_attempt_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error_kind: Option<ErrorKind>,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerState {
    pub fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt_time: None,
            last_error_kind: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }

    /// Whether a call may go through at `now`. Moves an expired OPEN breaker to HALF_OPEN.
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let expired = self.next_attempt_time.map_or(true, |at| now >= at);
                if expired {
                    self.state = BreakerState::HalfOpen;
                    self.success_count = 0;
                }
                expired
            }
        }
    }

    pub fn on_success(&mut self, policy: &BreakerPolicy) {
        match self.state {
            BreakerState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= policy.success_threshold {
                    self.reset();
                }
            }
            BreakerState::Closed => self.failure_count = 0,
            BreakerState::Open => {}
        }
    }

    pub fn on_failure(&mut self, policy: &BreakerPolicy, kind: ErrorKind, now: DateTime<Utc>) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_time = Some(now);
        self.last_error_kind = Some(kind);

        let trip = match self.state {
            BreakerState::HalfOpen | BreakerState::Open => true,
            BreakerState::Closed => {
                kind == ErrorKind::ApiLimit || self.failure_count >= policy.failure_threshold
            }
        };

        if trip {
            self.trip(policy, now);
        }
    }

    /// Opens the breaker regardless of the failure count.
    pub fn trip(&mut self, policy: &BreakerPolicy, now: DateTime<Utc>) {
        self.state = BreakerState::Open;
        self.success_count = 0;
        self.next_attempt_time = Some(
            now.checked_add_signed(policy.reset_timeout)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
