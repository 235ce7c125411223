//! Deadline-bearing cancellation context and the deadline budget.

use crate::error::{Interrupted, ProbeError};
use chrono::{DateTime, TimeDelta, Utc};
use std::{future::Future, time::Duration};
use tokio::{sync::watch, time::Instant};

/// Caller-supplied context: an absolute deadline plus an optional
/// cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct ProbeContext {
    deadline: Option<DateTime<Utc>>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every [`ProbeContext`] cloned from the one that created it.
#[derive(Debug)]
pub struct Canceller(watch::Sender<bool>);

impl Canceller {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl ProbeContext {
    /// Context without a deadline; the executor refuses to run with it
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_deadline(deadline: DateTime<Utc>) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Deadline at `now + timeout`
    #[must_use]
    pub fn with_timeout(timeout: TimeDelta) -> Self {
        let now = Utc::now();
        Self::with_deadline(now.checked_add_signed(timeout).unwrap_or(now))
    }

    /// Attach a cancellation signal to this context
    #[must_use]
    pub fn cancellable(mut self) -> (Self, Canceller) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, Canceller(tx))
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled; never resolves otherwise
    pub async fn cancelled(&self) {
        if let Some(mut rx) = self.cancel.clone() {
            let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
            if fired {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

/// Time budget derived from a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Whole seconds left, handed to the driver as its connect timeout
    pub connect_timeout: Duration,
    /// Exact time left, used to bound every blocking step
    pub remaining: Duration,
}

/// Derive the time budget from `deadline` as seen at `now`
///
/// The remaining time is floored to whole seconds. A budget under one second
/// leaves the driver no usable timeout and is reported as exceeded.
///
/// # Errors
///
/// Returns [`ProbeError::DeadlineMissing`] without a deadline and
/// [`ProbeError::DeadlineExceeded`] when less than a second is left
pub fn budget(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<Budget, ProbeError> {
    let deadline = deadline.ok_or(ProbeError::DeadlineMissing)?;
    let remaining = deadline.signed_duration_since(now);

    let seconds = u64::try_from(remaining.num_seconds()).unwrap_or(0);
    if seconds == 0 {
        return Err(ProbeError::DeadlineExceeded {
            remaining_ms: remaining.num_milliseconds(),
        });
    }

    let exact = remaining
        .to_std()
        .map_err(|_| ProbeError::DeadlineExceeded {
            remaining_ms: remaining.num_milliseconds(),
        })?;

    Ok(Budget {
        connect_timeout: Duration::from_secs(seconds),
        remaining: exact,
    })
}

/// Run `fut` until it completes, the deadline passes or the context is
/// cancelled, whichever comes first. Cancellation is checked first.
pub(crate) async fn bounded<F, T>(
    ctx: &ProbeContext,
    deadline: Instant,
    fut: F,
) -> Result<T, Interrupted>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        () = ctx.cancelled() => Err(Interrupted::Cancelled),
        result = tokio::time::timeout_at(deadline, fut) => result.map_err(|_| Interrupted::Deadline),
    }
}
