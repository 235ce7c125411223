use super::{Action, Source};
use crate::{
    config::{self, DriverKind, ProbeConfig},
    deadline::ProbeContext,
    driver::{Driver, mysql::MySqlDriver, postgres::PostgresDriver},
    error::ProbeError,
    metrics::encode_metrics,
    probe::Probe,
    report::ProbeReport,
    target::ConnectTarget,
};
use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, TimeDelta, Utc};
use tracing::debug;

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Check { source } => check(source),
        Action::Probe {
            source,
            timeout,
            metrics,
        } => probe(source, timeout, metrics).await,
    }
}

fn check(source: Source) -> Result<()> {
    let config = match source {
        Source::Json(payload) => config::decode_and_validate(&payload),
        Source::Config(config) => config.validate().map(|()| *config),
    }
    .context("configuration check failed")?;

    println!(
        "{} - configuration is valid: {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        ConnectTarget::new(&config)
    );

    Ok(())
}

async fn probe(source: Source, timeout: u16, metrics: bool) -> Result<()> {
    let config = source.into_config()?;
    let ctx = ProbeContext::with_timeout(TimeDelta::seconds(i64::from(timeout)));
    debug!(?config, deadline = ?ctx.deadline(), "starting probe");

    let started = Utc::now();
    let result = match config.driver {
        DriverKind::Mysql => run_with(MySqlDriver, &ctx, &config).await,
        DriverKind::Postgres => run_with(PostgresDriver, &ctx, &config).await,
    };

    let report = ProbeReport::new(
        config.driver.as_str(),
        ConnectTarget::new(&config).redacted(),
        &result,
        started,
        Utc::now(),
    );
    println!("{}", serde_json::to_string(&report)?);

    if metrics {
        let buffer = encode_metrics().map_err(|e| anyhow!(e))?;
        print!("{}", String::from_utf8_lossy(&buffer));
    }

    result.context("probe failed")
}

async fn run_with<D: Driver>(
    driver: D,
    ctx: &ProbeContext,
    config: &ProbeConfig,
) -> Result<(), ProbeError> {
    Probe::new(driver).execute(ctx, config).await
}
