use crate::errors::{Result, StorageError};
use crate::model::TelemetryRecord;
use crate::sink::TelemetrySink;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub async fn make_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// PostgreSQL-backed sink. One row per record, no retries.
#[derive(Debug, Clone)]
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TelemetrySink for PgSink {
    async fn insert(&self, record: TelemetryRecord) -> std::result::Result<Uuid, StorageError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO telemetry (id, ts, temperature, battery, altitude, signal, anomaly_flags)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(record.timestamp)
        .bind(record.temperature)
        .bind(record.battery)
        .bind(record.altitude)
        .bind(record.signal)
        .bind(i16::from(record.anomaly_flags.bits()))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }
}
