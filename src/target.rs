use crate::{
    config::{DriverKind, ProbeConfig},
    tls::TlsMode,
};
use std::fmt;
use urlencoding::encode;

/// Connection target derived from a [`ProbeConfig`]
///
/// Drivers build their connect options from the typed accessors; the URL form
/// exists for display only and always masks the password.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    driver: DriverKind,
    host: String,
    port: u16,
    username: String,
    password: String,
    database: String,
    tls: TlsMode,
    tls_ca: Option<String>,
    tls_client: Option<(String, String)>,
}

impl ConnectTarget {
    #[must_use]
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            driver: config.driver,
            host: config.host.clone(),
            port: config.port(),
            username: config.username.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            tls: config.tls,
            tls_ca: config.tls_ca.clone(),
            tls_client: config.tls_cert.clone().zip(config.tls_key.clone()),
        }
    }

    #[must_use]
    pub const fn driver(&self) -> DriverKind {
        self.driver
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub const fn tls(&self) -> TlsMode {
        self.tls
    }

    /// CA bundle path, if one was configured
    #[must_use]
    pub fn tls_ca(&self) -> Option<&str> {
        self.tls_ca.as_deref()
    }

    /// Client certificate and key paths, present only as a pair
    #[must_use]
    pub fn tls_client(&self) -> Option<(&str, &str)> {
        self.tls_client
            .as_ref()
            .map(|(cert, key)| (cert.as_str(), key.as_str()))
    }

    /// Connection URL with the password masked
    #[must_use]
    pub fn redacted(&self) -> String {
        let mut url = format!(
            "{}://{}:***@{}:{}/{}",
            self.driver,
            encode(&self.username),
            self.host_part(),
            self.port,
            encode(&self.database),
        );

        if self.tls.is_enabled() {
            match self.driver {
                DriverKind::Mysql => {
                    url.push_str("?ssl-mode=");
                    url.push_str(self.tls.as_mysql_str());
                }
                DriverKind::Postgres => {
                    url.push_str("?sslmode=");
                    url.push_str(self.tls.as_str());
                }
            }
        }

        url
    }

    // IPv6 literals need brackets inside a URL authority
    fn host_part(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectTarget")
            .field(&self.redacted())
            .finish()
    }
}
