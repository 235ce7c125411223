//! Database driver capability consumed by the probe.
//!
//! The probe needs three things from a driver: open a handle, ping through it,
//! and run one query. [`mysql`] and [`postgres`] implement them on top of
//! `sqlx`; tests plug in scripted drivers.

pub mod mysql;
pub mod postgres;

use crate::{error::DriverError, target::ConnectTarget};
use sqlx::{Database, pool::PoolOptions};
use std::{future::Future, time::Duration};

/// Connection ceiling applied to every handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub max_open: u32,
    pub max_idle: u32,
    pub connect_timeout: Duration,
}

impl PoolLimits {
    /// One open connection, nothing kept idle
    #[must_use]
    pub const fn single(connect_timeout: Duration) -> Self {
        Self {
            max_open: 1,
            max_idle: 0,
            connect_timeout,
        }
    }

    /// `sqlx` pool options enforcing these limits
    ///
    /// `sqlx` has no idle ceiling; `max_idle` bounds the warm set through
    /// `min_connections`, and handles detach their connection on close so it
    /// never returns to the idle queue.
    pub(crate) fn pool_options<DB: Database>(self) -> PoolOptions<DB> {
        PoolOptions::new()
            .max_connections(self.max_open)
            .min_connections(self.max_idle)
            .acquire_timeout(self.connect_timeout)
            .test_before_acquire(false)
    }
}

/// Connections currently held by a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub open: u32,
    pub idle: u32,
}

pub trait Driver: Send + Sync {
    type Handle: Handle;

    /// Label used in logs and metrics
    fn name(&self) -> &'static str;

    /// Open a logical handle. Lazy drivers do no I/O here.
    fn open(
        &self,
        target: &ConnectTarget,
        limits: PoolLimits,
    ) -> impl Future<Output = Result<Self::Handle, DriverError>> + Send;
}

pub trait Handle: Send {
    /// Liveness check; the first real I/O for lazy drivers
    fn ping(&mut self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Run `query` and report whether it produced at least one row
    fn fetch_any(&mut self, query: &str)
    -> impl Future<Output = Result<bool, DriverError>> + Send;

    fn stats(&self) -> PoolStats;

    /// Release every connection held by the handle and report what is still
    /// open afterwards
    fn close(self) -> impl Future<Output = PoolStats> + Send;
}
