//! Deadline helpers for verifier runs.

use std::time::{Duration, Instant};

pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => Instant::now() >= deadline,
        None => false,
    }
}

/// `0` disables the timeout.
pub fn overall_timeout_duration(timeout_secs: u64) -> Option<Duration> {
    if timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(timeout_secs))
    }
}

pub(crate) fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

pub(crate) fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

/// How long to block on the next receive: the poll interval, shortened to
/// what is left of the deadline.
pub(crate) fn next_wait(poll: Duration, deadline: Option<Instant>) -> Duration {
    match remaining(deadline) {
        Some(left) => poll.min(left),
        None => poll,
    }
}
