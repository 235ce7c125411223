mod run;

use crate::{
    config::{self, ProbeConfig},
    error::ProbeError,
};

/// Where the probe configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Raw JSON payload, decoded when the action runs
    Json(String),
    /// Configuration already built from a DSN
    Config(Box<ProbeConfig>),
}

impl Source {
    /// Decode the source into a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON payload cannot be decoded
    pub fn into_config(self) -> Result<ProbeConfig, ProbeError> {
        match self {
            Self::Json(payload) => config::decode(&payload),
            Self::Config(config) => Ok(*config),
        }
    }
}

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    /// Run one probe with a deadline `timeout` seconds from now
    Probe {
        source: Source,
        timeout: u16,
        metrics: bool,
    },
    /// Decode and validate the configuration only
    Check { source: Source },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the probe fails
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_action_debug_hides_password() {
        let action = Action::Probe {
            source: Source::Config(Box::new(ProbeConfig {
                host: "db.local".into(),
                password: "hunter2".into(),
                ..ProbeConfig::default()
            })),
            timeout: 10,
            metrics: false,
        };

        let debug_str = format!("{action:?}");
        assert!(debug_str.contains("Probe"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_check_valid_config() {
        let action = Action::Check {
            source: Source::Json(
                r#"{"host":"db.local","username":"u","password":"p","database":"app"}"#.into(),
            ),
        };
        assert!(action.execute().await.is_ok());
    }

    #[tokio::test]
    async fn test_check_invalid_config() {
        let action = Action::Check {
            source: Source::Json(r#"{"host":"db.local","port":65536}"#.into()),
        };
        let err = action.execute().await.unwrap_err();
        assert!(format!("{err:#}").contains("port"));
    }

    #[tokio::test]
    async fn test_run_without_valid_config_fails_before_network() {
        let action = Action::Probe {
            source: Source::Json(r#"{"host":"db.local"}"#.into()),
            timeout: 1,
            metrics: false,
        };
        let err = action.execute().await.unwrap_err();
        assert!(format!("{err:#}").contains("username"));
    }
}
