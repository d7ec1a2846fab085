//! Connection State Module
//!
//! Retry bookkeeping for the resilient cache client. Pure state transitions
//! driven by an explicit clock reading, so the decision table is testable
//! without a network.

use serde::Serialize;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Reconnect attempts allowed per cool-down window.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Wait after exhausting the retries before trying again.
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(10 * 60);

/// Shortest cool-down a policy accepts.
pub const MIN_RETRY_COOLDOWN: Duration = Duration::from_secs(1);

// == Connection Phase ==
/// Lifecycle phase of a cache client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    /// Retries exhausted; no reconnect until the cool-down elapses
    CoolingDown,
}

// == Retry Policy ==
/// Retry ceiling and cool-down window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    cooldown: Duration,
}

impl RetryPolicy {
    /// A ceiling of zero is raised to one so the client can ever connect,
    /// and the cool-down is raised to [`MIN_RETRY_COOLDOWN`].
    pub fn new(max_retries: u32, cooldown: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            cooldown: cooldown.max(MIN_RETRY_COOLDOWN),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_COOLDOWN)
    }
}

/// Outcome of asking whether a reconnect may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Proceed,
    Skip,
}

// == Connection State ==
/// Retry counter, last attempt time and phase of one client.
#[derive(Debug)]
pub struct ConnectionState {
    policy: RetryPolicy,
    phase: ConnectionPhase,
    last_attempt: Option<Instant>,
    retry_count: u32,
}

impl ConnectionState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            phase: ConnectionPhase::Disconnected,
            last_attempt: None,
            retry_count: 0,
        }
    }

    /// Applies the reconnect decision table at time `now`.
    ///
    /// - exhausted and inside the cool-down: skip
    /// - exhausted and cool-down elapsed: reset the counter, then proceed
    /// - otherwise: count the attempt, stamp `now`, proceed
    pub fn begin_attempt(&mut self, now: Instant) -> Attempt {
        let last = *self.last_attempt.get_or_insert(now);

        if self.is_exhausted() {
            if now < last + self.policy.cooldown {
                self.phase = ConnectionPhase::CoolingDown;
                return Attempt::Skip;
            }
            debug!("Cache cool-down elapsed, resetting retry count");
            self.retry_count = 0;
        }

        self.retry_count += 1;
        self.last_attempt = Some(now);
        self.phase = ConnectionPhase::Connecting;
        Attempt::Proceed
    }

    /// A connection was established; retry history is cleared.
    pub fn record_success(&mut self) {
        self.retry_count = 0;
        self.phase = ConnectionPhase::Connected;
    }

    /// The attempt started by [`begin_attempt`](Self::begin_attempt) failed.
    pub fn record_failure(&mut self) {
        self.phase = if self.is_exhausted() {
            ConnectionPhase::CoolingDown
        } else {
            ConnectionPhase::Disconnected
        };
    }

    /// A previously healthy connection stopped answering.
    pub fn record_lost(&mut self) {
        if self.phase == ConnectionPhase::Connected {
            self.phase = ConnectionPhase::Disconnected;
        }
    }

    /// Back to the initial phase after shutdown.
    pub fn reset(&mut self) {
        self.phase = ConnectionPhase::Disconnected;
        self.retry_count = 0;
    }

    /// Phase as observed at `now`; a cool-down whose window has passed
    /// reads as `Disconnected`.
    pub fn phase_at(&self, now: Instant) -> ConnectionPhase {
        match (self.phase, self.last_attempt) {
            (ConnectionPhase::CoolingDown, Some(last)) if now >= last + self.policy.cooldown => {
                ConnectionPhase::Disconnected
            }
            (phase, _) => phase,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn is_exhausted(&self) -> bool {
        self.retry_count >= self.policy.max_retries
    }
}
