//! Probe thunks and their fault-isolated execution.
//!
//! A probe is the optional behavioral test attached to a check. Probes signal
//! through [`ProbeVerdict`] (or an error); execution turns every way a probe
//! can go wrong, including panics and timeouts, into a [`ProbeFailure`] so the
//! harness can record it against that one check and move on.
//!
//! A timed-out probe is told to stop through its [`ProbeContext`] and given a
//! grace period to return before the caller continues, so the next probe does
//! not start while the previous one is still running.

use crate::harness::CancelToken;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

type ProbeFn = dyn Fn(&ProbeContext) -> anyhow::Result<ProbeVerdict> + Send + Sync;
type Outcome = Result<ProbeVerdict, ProbeFailure>;

#[derive(Debug, Clone, Default)]
/// Handed to every probe call. Long-running probes poll
/// [`ProbeContext::is_cancelled`] and return early once it fires, which
/// happens when the probe overran its timeout.
pub struct ProbeContext {
    cancel: CancelToken,
}

impl ProbeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep for up to `duration`, waking early on cancellation. Returns
    /// `false` when cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let step = Duration::from_millis(5);
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let nap = remaining.min(step);
            thread::sleep(nap);
            remaining -= nap;
        }
        !self.is_cancelled()
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How long a probe may run, and how long to wait for it to wind down after
/// it has been cancelled.
pub struct TimeLimit {
    pub timeout: Duration,
    pub grace: Duration,
}

#[derive(Clone)]
/// Zero-argument behavioral test, shareable across threads.
pub struct Probe(Arc<ProbeFn>);

impl Probe {
    /// Wrap a closure whose return value converts into a [`ProbeVerdict`].
    ///
    /// `()` and `true` pass, strings pass with a detail, `false` and `None`
    /// fail.
    pub fn new<F, V>(probe: F) -> Self
    where
        F: Fn() -> anyhow::Result<V> + Send + Sync + 'static,
        V: Into<ProbeVerdict>,
    {
        Self::with_context(move |_| probe())
    }

    /// Like [`Probe::new`], for probes that watch their [`ProbeContext`].
    pub fn with_context<F, V>(probe: F) -> Self
    where
        F: Fn(&ProbeContext) -> anyhow::Result<V> + Send + Sync + 'static,
        V: Into<ProbeVerdict>,
    {
        Self(Arc::new(move |context: &ProbeContext| {
            probe(context).map(Into::into)
        }))
    }

    fn call(&self, context: &ProbeContext) -> anyhow::Result<ProbeVerdict> {
        (self.0)(context)
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Probe(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What a probe reported when it returned normally.
pub enum ProbeVerdict {
    Pass,
    Detail(String),
    False,
    Absent,
}

impl ProbeVerdict {
    /// Collapse the verdict into the detail of a pass or the failure it implies.
    pub fn into_detail(self) -> Result<Option<String>, ProbeFailure> {
        match self {
            ProbeVerdict::Pass => Ok(None),
            ProbeVerdict::Detail(detail) => Ok(Some(detail)),
            ProbeVerdict::False => Err(ProbeFailure::ReturnedFalse),
            ProbeVerdict::Absent => Err(ProbeFailure::ReturnedNothing),
        }
    }
}

impl From<()> for ProbeVerdict {
    fn from(_: ()) -> Self {
        ProbeVerdict::Pass
    }
}

impl From<bool> for ProbeVerdict {
    fn from(value: bool) -> Self {
        if value {
            ProbeVerdict::Pass
        } else {
            ProbeVerdict::False
        }
    }
}

impl From<String> for ProbeVerdict {
    fn from(value: String) -> Self {
        ProbeVerdict::Detail(value)
    }
}

impl From<&str> for ProbeVerdict {
    fn from(value: &str) -> Self {
        ProbeVerdict::Detail(value.to_string())
    }
}

impl<T: Into<ProbeVerdict>> From<Option<T>> for ProbeVerdict {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ProbeVerdict::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Every way a present capability's probe can fail.
pub enum ProbeFailure {
    #[error("probe returned false")]
    ReturnedFalse,
    #[error("probe returned no value")]
    ReturnedNothing,
    #[error("{0}")]
    Errored(String),
    #[error("probe panicked: {0}")]
    Panicked(String),
    #[error("timeout")]
    TimedOut,
    #[error("unable to start probe thread: {0}")]
    Spawn(String),
}

impl ProbeFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeFailure::TimedOut)
    }
}

/// Run `probe` with panics and errors captured.
///
/// Without a limit the probe runs on the calling thread. With one, it runs on
/// a dedicated thread named after `label` and the caller waits at most
/// `limit.timeout`. An overrunning probe is reported as
/// [`ProbeFailure::TimedOut`] whatever it does afterwards; its context is
/// cancelled and the caller waits up to `limit.grace` more for the thread to
/// return before giving up on it.
pub fn execute(
    probe: &Probe,
    label: &str,
    limit: Option<TimeLimit>,
) -> Result<Option<String>, ProbeFailure> {
    let verdict = match limit {
        None => call_isolated(probe, &ProbeContext::new())?,
        Some(limit) => call_with_timeout(probe, label, limit)?,
    };
    verdict.into_detail()
}

fn call_isolated(probe: &Probe, context: &ProbeContext) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| probe.call(context))) {
        Ok(Ok(verdict)) => Ok(verdict),
        Ok(Err(err)) => Err(ProbeFailure::Errored(format!("{err:#}"))),
        Err(payload) => Err(ProbeFailure::Panicked(panic_message(payload.as_ref()))),
    }
}

fn call_with_timeout(probe: &Probe, label: &str, limit: TimeLimit) -> Outcome {
    let (tx, rx) = mpsc::channel();
    let worker = probe.clone();
    let context = ProbeContext::new();
    let worker_context = context.clone();
    thread::Builder::new()
        .name(format!("probe:{label}"))
        .spawn(move || {
            // The receiver is gone once the caller stopped waiting.
            let _ = tx.send(call_isolated(&worker, &worker_context));
        })
        .map_err(|err| ProbeFailure::Spawn(err.to_string()))?;

    match rx.recv_timeout(limit.timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            context.cancel();
            wait_for_wind_down(&rx, label, limit.grace);
            Err(ProbeFailure::TimedOut)
        }
        Err(RecvTimeoutError::Disconnected) => Err(ProbeFailure::Panicked(
            "probe thread exited without reporting".to_string(),
        )),
    }
}

fn wait_for_wind_down(rx: &Receiver<Outcome>, label: &str, grace: Duration) {
    match rx.recv_timeout(grace) {
        Ok(_) | Err(RecvTimeoutError::Disconnected) => {
            tracing::debug!(probe = label, "timed-out probe returned within grace period");
        }
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(
                probe = label,
                grace = ?grace,
                "timed-out probe is still running after its grace period; it may overlap later probes"
            );
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    #[test]
    fn verdict_conversions_cover_each_signal() {
        assert_eq!(ProbeVerdict::from(()), ProbeVerdict::Pass);
        assert_eq!(ProbeVerdict::from(true), ProbeVerdict::Pass);
        assert_eq!(ProbeVerdict::from(false), ProbeVerdict::False);
        assert_eq!(
            ProbeVerdict::from("ok"),
            ProbeVerdict::Detail("ok".to_string())
        );
        assert_eq!(ProbeVerdict::from(None::<String>), ProbeVerdict::Absent);
        assert_eq!(ProbeVerdict::from(Some(false)), ProbeVerdict::False);
    }

    #[test]
    fn execute_returns_detail_for_passing_probe() {
        let probe = Probe::new(|| Ok("hashed 3 bytes"));
        assert_eq!(
            execute(&probe, "crypt.hash", None),
            Ok(Some("hashed 3 bytes".to_string()))
        );
        let silent = Probe::new(|| Ok(()));
        assert_eq!(execute(&silent, "silent", None), Ok(None));
    }

    #[test]
    fn execute_maps_false_absent_and_errors() {
        let falsy = Probe::new(|| Ok(false));
        assert_eq!(
            execute(&falsy, "falsy", None),
            Err(ProbeFailure::ReturnedFalse)
        );

        let absent = Probe::new(|| Ok(None::<&str>));
        assert_eq!(
            execute(&absent, "absent", None),
            Err(ProbeFailure::ReturnedNothing)
        );

        let erroring = Probe::new(|| -> anyhow::Result<()> {
            Err(anyhow!("decode failed").context("round trip"))
        });
        let failure = execute(&erroring, "erroring", None).expect_err("error surfaces");
        assert_eq!(failure.to_string(), "round trip: decode failed");
    }

    #[test]
    fn execute_captures_panics() {
        let probe = Probe::new(|| -> anyhow::Result<()> { panic!("boom") });
        let failure = execute(&probe, "panicky", None).expect_err("panic captured");
        assert_eq!(failure, ProbeFailure::Panicked("boom".to_string()));

        let threaded = execute(&probe, "panicky", limit(5_000, 0))
            .expect_err("panic captured on worker thread");
        assert_eq!(threaded, ProbeFailure::Panicked("boom".to_string()));
    }

    fn limit(timeout_ms: u64, grace_ms: u64) -> Option<TimeLimit> {
        Some(TimeLimit {
            timeout: Duration::from_millis(timeout_ms),
            grace: Duration::from_millis(grace_ms),
        })
    }

    #[test]
    fn execute_times_out_slow_probe() {
        let probe = Probe::new(|| {
            thread::sleep(Duration::from_millis(500));
            Ok(true)
        });
        let failure = execute(&probe, "slow", limit(20, 0)).expect_err("slow probe times out");
        assert!(failure.is_timeout());
        assert_eq!(failure.to_string(), "timeout");
    }

    #[test]
    fn timed_out_probe_is_cancelled_and_awaited() {
        let finished = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&finished);
        let probe = Probe::with_context(move |context| {
            let completed = context.sleep(Duration::from_secs(10));
            observed.store(true, Ordering::SeqCst);
            Ok(completed)
        });

        let started = Instant::now();
        let failure = execute(&probe, "cooperative", limit(20, 2_000))
            .expect_err("overran its timeout");
        assert!(failure.is_timeout());
        assert!(finished.load(Ordering::SeqCst));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn uncooperative_probe_is_awaited_for_the_grace_period() {
        let finished = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&finished);
        let probe = Probe::new(move || {
            thread::sleep(Duration::from_millis(100));
            observed.store(true, Ordering::SeqCst);
            Ok(true)
        });
        let failure = execute(&probe, "stubborn", limit(10, 2_000)).expect_err("timed out");
        assert!(failure.is_timeout());
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn context_is_live_without_a_limit() {
        let probe = Probe::with_context(|context| Ok(!context.is_cancelled()));
        assert_eq!(execute(&probe, "live", None), Ok(None));
    }

    #[test]
    fn execute_with_generous_timeout_passes_through() {
        let probe = Probe::new(|| Ok("fast"));
        assert_eq!(
            execute(&probe, "fast", limit(5_000, 0)),
            Ok(Some("fast".to_string()))
        );
    }
}
