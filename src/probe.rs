//! Probe executor.
//!
//! One invocation walks a short linear state machine:
//!
//! ```text
//! Init -> Validated -> Connecting -> Pinging -> (QueryExecuting) -> Done
//! ```
//!
//! Any transition may fail, which ends the invocation with a [`ProbeError`].
//! Every blocking step races the context deadline and its cancellation signal,
//! and the connection handle is released on every exit path before
//! [`Probe::execute`] returns.

use crate::{
    config::ProbeConfig,
    deadline::{Budget, ProbeContext, bounded, budget},
    driver::{Driver, Handle, PoolLimits, PoolStats},
    error::{DriverError, Interrupted, ProbeError, ProbeOutcome},
    metrics::{CONNECTIONS_OPEN, LAST_SUCCESS, OPERATION_DURATION, PROBE_DURATION, PROBES_TOTAL},
    target::ConnectTarget,
};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info, warn};

/// States of a single invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Init,
    Validated,
    Connecting,
    Pinging,
    QueryExecuting,
    Done,
}

impl ProbeState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Runs probes through a [`Driver`]
#[derive(Debug, Clone, Default)]
pub struct Probe<D> {
    driver: D,
}

impl<D: Driver> Probe<D> {
    pub const fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Execute one probe against the wall clock
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered; see [`ProbeError`]
    pub async fn execute(&self, ctx: &ProbeContext, config: &ProbeConfig) -> Result<(), ProbeError> {
        self.execute_at(ctx, config, Utc::now()).await
    }

    /// Execute one probe with the budget computed at `now`
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered; see [`ProbeError`]
    pub async fn execute_at(
        &self,
        ctx: &ProbeContext,
        config: &ProbeConfig,
        now: DateTime<Utc>,
    ) -> Result<(), ProbeError> {
        let driver = self.driver.name();
        let started = Instant::now();

        let mut session = Session::new(&self.driver, ctx, config, now);
        let result = session.run().await;
        session.release().await;

        PROBE_DURATION
            .with_label_values(&[driver])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(()) => {
                PROBES_TOTAL.with_label_values(&[driver, "success"]).inc();
                LAST_SUCCESS
                    .with_label_values(&[driver])
                    .set(Utc::now().timestamp());
                info!(driver, host = %config.host, "probe succeeded");
            }
            Err(err) => {
                PROBES_TOTAL.with_label_values(&[driver, err.kind()]).inc();
                warn!(driver, host = %config.host, kind = err.kind(), error = %err, "probe failed");
            }
        }

        result
    }

    /// Execute and collapse the result into a [`ProbeOutcome`]
    pub async fn outcome(&self, ctx: &ProbeContext, config: &ProbeConfig) -> ProbeOutcome {
        ProbeOutcome::from(&self.execute(ctx, config).await)
    }
}

/// Per-invocation state; never outlives [`Probe::execute_at`]
struct Session<'a, D: Driver> {
    driver: &'a D,
    ctx: &'a ProbeContext,
    config: &'a ProbeConfig,
    now: DateTime<Utc>,
    budget: Option<Budget>,
    deadline: Option<tokio::time::Instant>,
    target: Option<ConnectTarget>,
    handle: Option<D::Handle>,
}

impl<'a, D: Driver> Session<'a, D> {
    fn new(driver: &'a D, ctx: &'a ProbeContext, config: &'a ProbeConfig, now: DateTime<Utc>) -> Self {
        Self {
            driver,
            ctx,
            config,
            now,
            budget: None,
            deadline: None,
            target: None,
            handle: None,
        }
    }

    async fn run(&mut self) -> Result<(), ProbeError> {
        let mut state = ProbeState::Init;
        while !state.is_terminal() {
            let next = self.step(state).await?;
            debug!(driver = self.driver.name(), from = ?state, to = ?next, "probe transition");
            state = next;
        }
        Ok(())
    }

    /// Transition function: perform the work of `state` and return the next one
    async fn step(&mut self, state: ProbeState) -> Result<ProbeState, ProbeError> {
        match state {
            ProbeState::Init => {
                self.config.validate()?;
                Ok(ProbeState::Validated)
            }
            ProbeState::Validated => {
                let budget = budget(self.ctx.deadline(), self.now)?;
                self.deadline = Some(tokio::time::Instant::now() + budget.remaining);
                self.budget = Some(budget);
                Ok(ProbeState::Connecting)
            }
            ProbeState::Connecting => {
                self.connect().await?;
                Ok(ProbeState::Pinging)
            }
            ProbeState::Pinging => {
                self.ping().await?;
                if self.config.has_query() {
                    Ok(ProbeState::QueryExecuting)
                } else {
                    Ok(ProbeState::Done)
                }
            }
            ProbeState::QueryExecuting => {
                self.query().await?;
                Ok(ProbeState::Done)
            }
            ProbeState::Done => Ok(ProbeState::Done),
        }
    }

    fn deadline(&self) -> tokio::time::Instant {
        // Connecting is only reachable after Validated set the deadline
        self.deadline.unwrap_or_else(tokio::time::Instant::now)
    }

    fn redacted_target(&self) -> String {
        self.target
            .as_ref()
            .map_or_else(|| self.config.host.clone(), ConnectTarget::redacted)
    }

    async fn connect(&mut self) -> Result<(), ProbeError> {
        let connect_timeout = self.budget.map(|b| b.connect_timeout).unwrap_or_default();
        let limits = PoolLimits::single(connect_timeout);
        let target = ConnectTarget::new(self.config);
        debug!(endpoint = %target, ?limits, "opening connection handle");

        let timer = Instant::now();
        let opened = bounded(self.ctx, self.deadline(), self.driver.open(&target, limits)).await;
        self.target = Some(target);
        observe(self.driver.name(), "connect", timer);

        let handle = flatten(opened).map_err(|source| ProbeError::ConnectFailed {
            target: self.redacted_target(),
            source,
        })?;

        CONNECTIONS_OPEN.with_label_values(&[self.driver.name()]).inc();
        self.handle = Some(handle);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), ProbeError> {
        let target = self.redacted_target();
        let deadline = self.deadline();
        let Some(handle) = self.handle.as_mut() else {
            return Err(ProbeError::PingFailed {
                target,
                source: "no open connection handle".into(),
            });
        };

        let timer = Instant::now();
        let pinged = bounded(self.ctx, deadline, handle.ping()).await;
        observe(self.driver.name(), "ping", timer);

        flatten(pinged).map_err(|source| ProbeError::PingFailed { target, source })
    }

    async fn query(&mut self) -> Result<(), ProbeError> {
        let query = self.config.query.as_str();
        let deadline = self.deadline();
        let Some(handle) = self.handle.as_mut() else {
            return Err(ProbeError::QueryFailed {
                query: query.to_string(),
                source: "no open connection handle".into(),
            });
        };

        let timer = Instant::now();
        let fetched = bounded(self.ctx, deadline, handle.fetch_any(query)).await;
        observe(self.driver.name(), "query", timer);

        let has_rows = flatten(fetched).map_err(|source| ProbeError::QueryFailed {
            query: query.to_string(),
            source,
        })?;

        if has_rows {
            Ok(())
        } else {
            Err(ProbeError::NoRows {
                query: query.to_string(),
            })
        }
    }

    /// Close the handle, if one was opened. Bounded by the deadline: when it
    /// fires the close future is dropped together with the handle, which
    /// drops its sockets.
    async fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        let held = handle.stats();
        let timer = Instant::now();
        // not raced against cancellation: releasing is the answer to it
        match tokio::time::timeout_at(self.deadline(), handle.close()).await {
            Ok(left) if left == PoolStats::default() => {
                debug!(held_open = held.open, held_idle = held.idle, "connection handle released");
            }
            Ok(left) => {
                warn!(
                    endpoint = %self.redacted_target(),
                    open = left.open,
                    idle = left.idle,
                    "connections still held after close"
                );
            }
            Err(_) => {
                debug!(endpoint = %self.redacted_target(), "connection close timed out, handle dropped");
            }
        }
        observe(self.driver.name(), "release", timer);
        CONNECTIONS_OPEN.with_label_values(&[self.driver.name()]).dec();
    }
}

fn flatten<T>(result: Result<Result<T, DriverError>, Interrupted>) -> Result<T, DriverError> {
    match result {
        Ok(inner) => inner,
        Err(interrupted) => Err(interrupted.into()),
    }
}

fn observe(driver: &str, operation: &str, timer: Instant) {
    OPERATION_DURATION
        .with_label_values(&[driver, operation])
        .observe(timer.elapsed().as_secs_f64());
}
