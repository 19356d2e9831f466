//! PostgreSQL ledger backed by sqlx.

use async_trait::async_trait;
use rates_core::HistoryRow;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::info;

use crate::application::ports::{BoxError, DbError, LedgerStore, LedgerTransaction};
use crate::infrastructure::config::DatabaseConfig;

pub const INSERT_HISTORY_ROW: &str = "INSERT INTO history (type_price, price, volume, amount, time_stamp_order, transcription_type) VALUES ($1, $2, $3, $4, $5, $6)";

/// PostgreSQL-backed ledger.
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Open the pool and check the database answers.
    pub async fn connect(config: &DatabaseConfig, acquire_timeout: Duration) -> Result<Self, DbError> {
        let options = Self::connect_options(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connect(Box::new(e)))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| DbError::Connect(Box::new(e)))?;

        info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Connection options from either `url` or the discrete fields.
    pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DbError> {
        if let Some(url) = &config.url {
            return url
                .parse::<PgConnectOptions>()
                .map_err(|e| DbError::Connect(Box::new(e)));
        }

        let mut options = PgConnectOptions::new().ssl_mode(PgSslMode::Disable);
        if let Some(host) = &config.host {
            options = options.host(host);
        }
        if let Some(port) = config.port {
            options = options.port(port);
        }
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        if let Some(name) = &config.name {
            options = options.database(name);
        }
        Ok(options)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migrate(Box::new(e)))?;
        info!("Database migrations applied");
        Ok(())
    }
}

pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction, BoxError> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

#[async_trait]
impl LedgerTransaction for PostgresTransaction {
    async fn insert(&mut self, row: &HistoryRow) -> Result<(), BoxError> {
        sqlx::query(INSERT_HISTORY_ROW)
            .bind(&row.type_price)
            .bind(&row.price)
            .bind(&row.volume)
            .bind(&row.amount)
            .bind(row.time_stamp_order)
            .bind(row.transcription_type.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), BoxError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), BoxError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
