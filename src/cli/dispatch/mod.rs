use crate::{
    cli::actions::{Action, Source},
    config::ProbeConfig,
};
use anyhow::{Context, Result};
use clap::ArgMatches;

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if neither a configuration nor a DSN was given, or if the
/// DSN cannot be parsed
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let source = if let Some(payload) = matches.get_one::<String>("config") {
        Source::Json(payload.clone())
    } else {
        let dsn_str = matches
            .get_one::<String>("dsn")
            .context("either --config or --dsn is required")?;
        let dsn = dsn::parse(dsn_str).context("Failed to parse DSN")?;
        let query = matches.get_one::<String>("query").cloned();
        Source::Config(Box::new(ProbeConfig::from_dsn(&dsn, query)?))
    };

    if matches.get_flag("check") {
        return Ok(Action::Check { source });
    }

    let timeout = matches.get_one::<u16>("timeout").copied().unwrap_or(10);
    let metrics = matches.get_flag("metrics");

    Ok(Action::Probe {
        source,
        timeout,
        metrics,
    })
}
