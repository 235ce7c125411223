//! Probe configuration: decoding and validation.
//!
//! A configuration arrives either as a JSON document or as a DSN string. Absent
//! keys decode to empty values so the validator, not the decoder, reports them.

use crate::{error::ProbeError, tls::TlsMode};
use dsn::DSN;
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    #[serde(alias = "mariadb")]
    Mysql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl DriverKind {
    /// Well-known port used when the configuration omits one
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Postgres => 5432,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(ProbeError::invalid(
                "driver",
                format!("unsupported driver {s:?}, expected mysql or postgres"),
            )),
        }
    }
}

/// Target description for a single probe invocation
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub driver: DriverKind,
    #[serde(default, alias = "target", alias = "server")]
    pub host: String,
    /// `None` means the driver's well-known port
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Empty means "ping only"
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub tls: TlsMode,
    /// CA bundle for the verify modes
    #[serde(default, alias = "sslrootcert")]
    pub tls_ca: Option<String>,
    /// Client certificate, only used together with `tls_key`
    #[serde(default, alias = "sslcert")]
    pub tls_cert: Option<String>,
    #[serde(default, alias = "sslkey")]
    pub tls_key: Option<String>,
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("query", &self.query)
            .field("tls", &self.tls)
            .field("tls_ca", &self.tls_ca)
            .field("tls_cert", &self.tls_cert)
            .field("tls_key", &self.tls_key)
            .finish()
    }
}

/// Decode a JSON configuration payload
///
/// # Errors
///
/// Returns [`ProbeError::Decode`] if the payload is not a valid JSON document
/// of the expected shape
pub fn decode(payload: &str) -> Result<ProbeConfig, ProbeError> {
    Ok(serde_json::from_str(payload)?)
}

/// Validator-only mode: decode the payload, then validate it
///
/// # Errors
///
/// Returns the decode error, or the first invalid field
pub fn decode_and_validate(payload: &str) -> Result<ProbeConfig, ProbeError> {
    let config = decode(payload)?;
    config.validate()?;
    Ok(config)
}

impl ProbeConfig {
    /// Build a configuration from a parsed DSN
    ///
    /// TLS mode is read from `sslmode` or `ssl-mode`, certificate paths from
    /// `sslrootcert`/`sslca`/`ssl-ca`, `sslcert`/`ssl-cert` and
    /// `sslkey`/`ssl-key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the DSN driver is not supported or the TLS mode is
    /// not recognised
    pub fn from_dsn(dsn: &DSN, query: Option<String>) -> Result<Self, ProbeError> {
        let driver = dsn.driver.parse::<DriverKind>()?;

        let tls = param(dsn, &["sslmode", "ssl-mode"])
            .map(|mode| mode.parse::<TlsMode>())
            .transpose()
            .map_err(|e| ProbeError::invalid("tls", e))?
            .unwrap_or_default();

        Ok(Self {
            driver,
            host: dsn.host.clone().unwrap_or_default(),
            port: dsn.port.map(i64::from),
            username: dsn.username.clone().unwrap_or_default(),
            password: dsn.password.clone().unwrap_or_default(),
            database: dsn.database.clone().unwrap_or_default(),
            query: query.unwrap_or_default(),
            tls,
            tls_ca: param(dsn, &["sslrootcert", "sslca", "ssl-ca"]).cloned(),
            tls_cert: param(dsn, &["sslcert", "ssl-cert"]).cloned(),
            tls_key: param(dsn, &["sslkey", "ssl-key"]).cloned(),
        })
    }

    /// Check the configuration before any network activity
    ///
    /// Fields are checked in the order host, port, username, password,
    /// database, then the client certificate pair; the first invalid one is
    /// reported. The query is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ConfigInvalid`] naming the first invalid field
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.host.is_empty() {
            return Err(ProbeError::invalid("host", "must not be empty"));
        }

        if let Some(port) = self.port
            && !u16::try_from(port).is_ok_and(|p| p != 0)
        {
            return Err(ProbeError::invalid(
                "port",
                format!("{port} is out of range 1..=65535"),
            ));
        }

        if self.username.is_empty() {
            return Err(ProbeError::invalid("username", "must not be empty"));
        }

        if self.password.is_empty() {
            return Err(ProbeError::invalid("password", "must not be empty"));
        }

        if self.database.is_empty() {
            return Err(ProbeError::invalid("database", "must not be empty"));
        }

        match (&self.tls_cert, &self.tls_key) {
            (Some(_), None) => Err(ProbeError::invalid(
                "tls_key",
                "required when tls_cert is set",
            )),
            (None, Some(_)) => Err(ProbeError::invalid(
                "tls_cert",
                "required when tls_key is set",
            )),
            _ => Ok(()),
        }
    }

    /// Effective port, falling back to the driver default
    ///
    /// Only meaningful on a validated configuration.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0)
            .unwrap_or_else(|| self.driver.default_port())
    }

    /// Whether a validation query should run after the ping
    #[must_use]
    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }
}

fn param<'a>(dsn: &'a DSN, keys: &[&str]) -> Option<&'a String> {
    keys.iter().find_map(|key| dsn.params.get(*key))
}
