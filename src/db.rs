//! Database module - PostgreSQL connection and telemetry document table

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Channel notified with the satellite ID whenever its document changes
pub const TELEMETRY_CHANNEL: &str = "telemetry_updates";

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Statements run one at a time; the trigger function body contains semicolons
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database schema applied successfully");
    Ok(())
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS satellite_telemetry (
    id TEXT PRIMARY KEY,
    document JSONB NOT NULL,
    updated_at TIMESTAMPTZ DEFAULT NOW()
)
"#,
    r#"
CREATE OR REPLACE FUNCTION notify_telemetry_update() RETURNS trigger AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        PERFORM pg_notify('telemetry_updates', OLD.id);
        RETURN OLD;
    END IF;
    PERFORM pg_notify('telemetry_updates', NEW.id);
    RETURN NEW;
END;
$$ LANGUAGE plpgsql
"#,
    "DROP TRIGGER IF EXISTS satellite_telemetry_notify ON satellite_telemetry",
    r#"
CREATE TRIGGER satellite_telemetry_notify
    AFTER INSERT OR UPDATE OR DELETE ON satellite_telemetry
    FOR EACH ROW EXECUTE FUNCTION notify_telemetry_update()
"#,
    "CREATE INDEX IF NOT EXISTS idx_satellite_telemetry_updated ON satellite_telemetry(updated_at)",
];
