use super::{Driver, Handle, PoolLimits, PoolStats};
use crate::{error::DriverError, target::ConnectTarget, tls::TlsMode};
use sqlx::{
    Connection, Executor, MySql,
    mysql::{MySqlConnectOptions, MySqlPool, MySqlSslMode},
    pool::PoolConnection,
};
use tracing::debug;

/// `MySQL`/`MariaDB` driver backed by a lazy single-connection `sqlx` pool
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

/// Handle holding the pool and, once pinged, its only connection
pub struct MySqlHandle {
    pool: MySqlPool,
    conn: Option<PoolConnection<MySql>>,
}

/// Typed connect options; every field reaches the driver verbatim
pub(crate) fn connect_options(target: &ConnectTarget) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(target.host())
        .port(target.port())
        .username(target.username())
        .password(target.password())
        .database(target.database());

    options = match target.tls() {
        TlsMode::Disable => options.ssl_mode(MySqlSslMode::Disabled),
        TlsMode::Require => options.ssl_mode(MySqlSslMode::Required),
        TlsMode::VerifyCA => options.ssl_mode(MySqlSslMode::VerifyCa),
        TlsMode::VerifyFull => options.ssl_mode(MySqlSslMode::VerifyIdentity),
    };

    if let Some(ca) = target.tls_ca() {
        options = options.ssl_ca(ca);
    }

    if let Some((cert, key)) = target.tls_client() {
        options = options.ssl_client_cert(cert).ssl_client_key(key);
    }

    options
}

impl Driver for MySqlDriver {
    type Handle = MySqlHandle;

    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn open(
        &self,
        target: &ConnectTarget,
        limits: PoolLimits,
    ) -> Result<Self::Handle, DriverError> {
        // connect_lazy_with defers the TCP/TLS handshake to the first acquire
        let pool = limits
            .pool_options::<MySql>()
            .connect_lazy_with(connect_options(target));

        Ok(MySqlHandle { pool, conn: None })
    }
}

impl MySqlHandle {
    async fn connection(&mut self) -> Result<&mut PoolConnection<MySql>, DriverError> {
        if self.conn.is_none() {
            let conn = self.pool.acquire().await?;
            self.conn = Some(conn);
        }

        self.conn
            .as_mut()
            .ok_or_else(|| "mysql connection was not acquired".into())
    }
}

impl Handle for MySqlHandle {
    async fn ping(&mut self) -> Result<(), DriverError> {
        let conn = self.connection().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn fetch_any(&mut self, query: &str) -> Result<bool, DriverError> {
        let conn = self.connection().await?;
        let row = (&mut **conn).fetch_optional(query).await?;
        Ok(row.is_some())
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            open: self.pool.size(),
            idle: u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX),
        }
    }

    async fn close(self) -> PoolStats {
        let Self { pool, conn } = self;

        // detached, the connection never re-enters the idle queue
        if let Some(conn) = conn
            && let Err(err) = conn.detach().close().await
        {
            debug!(%err, "mysql connection did not close cleanly");
        }

        pool.close().await;
        PoolStats {
            open: pool.size(),
            idle: u32::try_from(pool.num_idle()).unwrap_or(u32::MAX),
        }
    }
}
