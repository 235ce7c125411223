use serde::Deserialize;
use std::{fmt, str::FromStr};

/// TLS/SSL mode for the probe connection
///
/// JSON values go through [`FromStr`], so a payload accepts the same spellings
/// as a DSN parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum TlsMode {
    /// No TLS encryption
    #[default]
    Disable,
    /// TLS required, but no certificate verification
    Require,
    /// Verify server certificate against CA
    VerifyCA,
    /// Verify certificate and hostname
    VerifyFull,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "disabled" => Ok(Self::Disable),
            "require" | "required" => Ok(Self::Require),
            "verify-ca" | "verify_ca" => Ok(Self::VerifyCA),
            "verify-full" | "verify_full" | "verify-identity" | "verify_identity" => {
                Ok(Self::VerifyFull)
            }
            _ => Err(format!("Invalid TLS mode: {s}")),
        }
    }
}

impl TryFrom<String> for TlsMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TlsMode {
    /// Check if TLS is enabled
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disable)
    }

    /// PostgreSQL-style mode name (`sslmode`)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Require => "require",
            Self::VerifyCA => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }

    /// MySQL-style mode name (`ssl-mode`)
    #[must_use]
    pub const fn as_mysql_str(&self) -> &'static str {
        match self {
            Self::Disable => "DISABLED",
            Self::Require => "REQUIRED",
            Self::VerifyCA => "VERIFY_CA",
            Self::VerifyFull => "VERIFY_IDENTITY",
        }
    }
}
