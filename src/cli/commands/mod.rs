use clap::{
    Arg, ArgAction, ArgGroup, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("config")
                .env("DBPROBE_CONFIG")
                .help("JSON probe configuration")
                .long("config")
                .long_help(
                    "JSON probe configuration:\n\n\
                    {\"driver\": \"mysql\", \"host\": \"db.local\", \"port\": 3306,\n \
                    \"username\": \"u\", \"password\": \"p\", \"database\": \"app\",\n \
                    \"query\": \"SELECT 1\", \"tls\": \"disable\"}\n\n\
                    driver: mysql (default) or postgres\n\
                    host: also accepted as target or server\n\
                    port: defaults to 3306 (mysql) or 5432 (postgres)\n\
                    query: optional, must return at least one row\n\
                    tls: disable, require, verify-ca, verify-full"
                )
                .short('c')
                .value_name("JSON"),
        )
        .arg(
            Arg::new("dsn")
                .env("DBPROBE_DSN")
                .help("<mysql|postgres>://<username>:<password>@tcp(<host>:<port>)/<database>")
                .long("dsn")
                .short('d'),
        )
        .group(
            ArgGroup::new("target")
                .args(["config", "dsn"])
                .required(true)
                .multiple(false),
        )
        .arg(
            Arg::new("query")
                .env("DBPROBE_QUERY")
                .help("validation query used with --dsn, must return at least one row")
                .long("query")
                .short('q')
                .requires("dsn")
                .value_name("SQL"),
        )
        .arg(
            Arg::new("timeout")
                .default_value("10")
                .env("DBPROBE_TIMEOUT")
                .help("number of seconds before the probe gives up")
                .long("timeout")
                .short('t')
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("check")
                .help("only decode and validate the configuration, no network")
                .long("check")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("metrics")
                .help("print Prometheus metrics after the probe")
                .long("metrics")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .help("increase log verbosity (-v info, -vv debug, -vvv trace)")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count),
        )
}
