//! Schema bootstrap: enum types, tables and indexes for users, rides and driver applications.
//! Every statement is idempotent, so this runs on each startup.

use crate::error::AppError;
use sqlx::PgPool;

/// Enum types are created inside a DO block because PostgreSQL has no `CREATE TYPE IF NOT EXISTS`.
fn create_enum(name: &str, values: &[&str]) -> String {
    let values: Vec<String> = values.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect();
    format!(
        "DO $$ BEGIN CREATE TYPE {} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
        name,
        values.join(", ")
    )
}

fn statements() -> Vec<String> {
    let mut out = vec![
        create_enum("user_role", &["user", "driver", "admin"]),
        create_enum("ride_status", &["pending", "assigned", "completed", "cancelled"]),
    ];
    // Older databases were created with the short ride_status list.
    for value in ["accepted", "enroute", "arrived"] {
        out.push(format!("ALTER TYPE ride_status ADD VALUE IF NOT EXISTS '{}'", value));
    }
    out.push(create_enum("driver_app_status", &["applied", "approved", "rejected"]));

    out.extend(
        [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id          BIGSERIAL PRIMARY KEY,
                name        TEXT,
                email       TEXT NOT NULL UNIQUE,
                role        user_role NOT NULL DEFAULT 'user',
                created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS rides (
                id                 BIGSERIAL PRIMARY KEY,
                user_id            BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                driver_id          BIGINT REFERENCES users(id) ON DELETE SET NULL,
                origin             TEXT NOT NULL,
                destination        TEXT NOT NULL,
                status             ride_status NOT NULL DEFAULT 'pending',
                requested_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                shared_with_email  TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_rides_requested_at ON rides (requested_at)",
            "CREATE INDEX IF NOT EXISTS idx_rides_user ON rides (user_id)",
            "CREATE INDEX IF NOT EXISTS idx_rides_driver ON rides (driver_id)",
            r#"
            CREATE TABLE IF NOT EXISTS driver_applications (
                id              BIGSERIAL PRIMARY KEY,
                user_id         BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                license_number  TEXT,
                vehicle         TEXT,
                notes           TEXT,
                status          driver_app_status NOT NULL DEFAULT 'applied',
                submitted_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                reviewed_at     TIMESTAMPTZ,
                reviewed_by     BIGINT REFERENCES users(id) ON DELETE SET NULL,
                review_notes    TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_driver_apps_user ON driver_applications (user_id)",
            "CREATE INDEX IF NOT EXISTS idx_driver_apps_status ON driver_applications (status)",
            // At most one pending application per user.
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_driver_apps_user_pending \
             ON driver_applications (user_id) WHERE status = 'applied'",
        ]
        .into_iter()
        .map(String::from),
    );
    out
}

/// Apply the schema. `ALTER TYPE … ADD VALUE` cannot run inside a transaction block
/// together with statements that use the new value, so statements run one by one.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    for sql in statements() {
        tracing::debug!(sql = %sql.trim(), "migration");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!("schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_ddl_is_idempotent_and_escaped() {
        let sql = create_enum("odd", &["it's"]);
        assert!(sql.contains("'it''s'"));
        assert!(sql.contains("duplicate_object"));
    }

    #[test]
    fn types_are_created_before_tables_use_them() {
        let all = statements();
        let position = |needle: &str| all.iter().position(|s| s.contains(needle)).unwrap();
        assert!(position("CREATE TYPE ride_status") < position("CREATE TABLE IF NOT EXISTS rides"));
        assert!(position("ADD VALUE IF NOT EXISTS 'arrived'") < position("CREATE TABLE IF NOT EXISTS rides"));
        assert!(position("CREATE TYPE driver_app_status") < position("CREATE TABLE IF NOT EXISTS driver_applications"));
        assert!(position("CREATE TABLE IF NOT EXISTS users") < position("CREATE TABLE IF NOT EXISTS rides"));
    }
}
