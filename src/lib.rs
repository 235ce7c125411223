//! Single-shot reachability probe for `MySQL`/`MariaDB` and `PostgreSQL`.
//!
//! A probe decodes and validates a [`ProbeConfig`], derives a connect timeout
//! from the caller's deadline, opens exactly one connection, pings it and
//! optionally checks that a validation query returns at least one row.

pub mod cli;
pub mod config;
pub mod deadline;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod report;
pub mod target;
pub mod tls;

pub use config::{DriverKind, ProbeConfig};
pub use deadline::{Budget, Canceller, ProbeContext};
pub use error::{FailureClass, Interrupted, ProbeError, ProbeOutcome};
pub use probe::{Probe, ProbeState};
pub use report::ProbeReport;
pub use target::ConnectTarget;
