//! Poll-with-timeout waiting for out-of-band results.
//!
//! The host's extract command gives no completion signal, so the pipeline
//! waits for its output file instead: the file must exist and its content
//! hash must hold still across two consecutive polls.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use xxhash_rust::xxh3::xxh3_64;

/// How often and for how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_millis(100, 10_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "WaitOutcome reports whether the condition was met"]
pub enum WaitOutcome {
    Ready { elapsed: Duration },
    TimedOut { elapsed: Duration },
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            WaitOutcome::Ready { elapsed } | WaitOutcome::TimedOut { elapsed } => *elapsed,
        }
    }
}

/// Evaluate `predicate` every `policy.interval` until it holds or
/// `policy.timeout` has passed. The predicate is always evaluated at least
/// once, and once more at the deadline.
pub fn wait_until<F>(policy: PollPolicy, mut predicate: F) -> WaitOutcome
where
    F: FnMut() -> bool,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;

    loop {
        if predicate() {
            return WaitOutcome::Ready {
                elapsed: started.elapsed(),
            };
        }

        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::TimedOut {
                elapsed: started.elapsed(),
            };
        }

        thread::sleep(policy.interval.min(deadline - now));
    }
}

/// Wait until `path` exists and its content stops changing.
pub fn wait_for_stable_file(path: &Path, policy: PollPolicy) -> WaitOutcome {
    let mut last_hash = None;
    wait_until(policy, || {
        let Ok(bytes) = fs::read(path) else {
            last_hash = None;
            return false;
        };
        let hash = xxh3_64(&bytes);
        let stable = last_hash == Some(hash);
        last_hash = Some(hash);
        stable
    })
}
