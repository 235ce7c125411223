use super::{Driver, Handle, PoolLimits, PoolStats};
use crate::{error::DriverError, target::ConnectTarget, tls::TlsMode};
use sqlx::{
    Connection, Executor, Postgres,
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPool, PgSslMode},
};
use tracing::debug;

/// `PostgreSQL` driver backed by a lazy single-connection `sqlx` pool
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

pub struct PostgresHandle {
    pool: PgPool,
    conn: Option<PoolConnection<Postgres>>,
}

/// Typed connect options; every field reaches the driver verbatim
pub(crate) fn connect_options(target: &ConnectTarget) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(target.host())
        .port(target.port())
        .username(target.username())
        .password(target.password())
        .database(target.database())
        .application_name("dbprobe");

    options = match target.tls() {
        TlsMode::Disable => options.ssl_mode(PgSslMode::Disable),
        TlsMode::Require => options.ssl_mode(PgSslMode::Require),
        TlsMode::VerifyCA => options.ssl_mode(PgSslMode::VerifyCa),
        TlsMode::VerifyFull => options.ssl_mode(PgSslMode::VerifyFull),
    };

    if let Some(ca) = target.tls_ca() {
        options = options.ssl_root_cert(ca);
    }

    if let Some((cert, key)) = target.tls_client() {
        options = options.ssl_client_cert(cert).ssl_client_key(key);
    }

    options
}

impl Driver for PostgresDriver {
    type Handle = PostgresHandle;

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn open(
        &self,
        target: &ConnectTarget,
        limits: PoolLimits,
    ) -> Result<Self::Handle, DriverError> {
        let pool = limits
            .pool_options::<Postgres>()
            .connect_lazy_with(connect_options(target));

        Ok(PostgresHandle { pool, conn: None })
    }
}

impl PostgresHandle {
    async fn connection(&mut self) -> Result<&mut PoolConnection<Postgres>, DriverError> {
        if self.conn.is_none() {
            let conn = self.pool.acquire().await?;
            self.conn = Some(conn);
        }

        self.conn
            .as_mut()
            .ok_or_else(|| "postgres connection was not acquired".into())
    }
}

impl Handle for PostgresHandle {
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

        if let Some(conn) = conn
            && let Err(err) = conn.detach().close().await
        {
            debug!(%err, "postgres connection did not close cleanly");
        }

        pool.close().await;
        PoolStats {
            open: pool.size(),
            idle: u32::try_from(pool.num_idle()).unwrap_or(u32::MAX),
        }
    }
}
