//! Database adapters: connection pool and schema bootstrap.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::store::StoreError;

/// Idempotent schema. Role ids below 100 are reserved for the built-in
/// catalogue, so the role sequence starts at 100.
pub const SCHEMA: &str = r#"
CREATE SEQUENCE IF NOT EXISTS roles_id_seq START WITH 100 MINVALUE 100;

CREATE TABLE IF NOT EXISTS roles (
    id          BIGINT PRIMARY KEY DEFAULT nextval('roles_id_seq'),
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL DEFAULT '',
    hashed_password TEXT NOT NULL,
    role            BIGINT NOT NULL DEFAULT 99 REFERENCES roles(id),
    is_active       BOOLEAN NOT NULL DEFAULT TRUE,
    is_superadmin   BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS modules (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS permissions (
    id          BIGSERIAL PRIMARY KEY,
    role_id     BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    module_id   BIGINT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
    can_view    BOOLEAN NOT NULL DEFAULT FALSE,
    can_edit    BOOLEAN NOT NULL DEFAULT FALSE,
    can_approve BOOLEAN NOT NULL DEFAULT FALSE,
    can_delete  BOOLEAN NOT NULL DEFAULT FALSE,
    UNIQUE (role_id, module_id)
);

CREATE TABLE IF NOT EXISTS purchase_requisitions (
    id           BIGSERIAL PRIMARY KEY,
    pr_number    TEXT NOT NULL UNIQUE,
    requested_by TEXT NOT NULL,
    dept         TEXT NOT NULL,
    amount       DOUBLE PRECISION NOT NULL,
    items        INTEGER NOT NULL,
    status       TEXT NOT NULL DEFAULT 'pending'
                 CHECK (status IN ('pending', 'approved', 'rejected')),
    created_at   DATE NOT NULL DEFAULT CURRENT_DATE
);

CREATE INDEX IF NOT EXISTS idx_purchase_requisitions_created_at
    ON purchase_requisitions (created_at);
"#;

pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Backend(format!("failed to connect to postgres: {e}")))
}

/// Apply [`SCHEMA`]. Safe to run on every startup.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Backend(format!("failed to apply schema: {e}")))?;
    tracing::info!("database schema is up to date");
    Ok(())
}
