//! PostgreSQL-backed store. Every statement is parameterized; guarded writes run in a
//! transaction with row locks.

use super::{pending_conflict, NameMerge, ResetCounts, ResetScope, Store};
use crate::error::AppError;
use crate::model::{
    ensure_admin_remains, is_admin_demotion, ApplicationStatus, DriverApplication, NewApplication, NewRide,
    ReviewDecision, Review, Ride, RideFilter, RideStatus, RideVersion, Role, User,
};
use async_trait::async_trait;
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

const USER_COLUMNS: &str = "id, name, email, role";
const RIDE_COLUMNS: &str =
    "id, user_id, driver_id, origin, destination, status, requested_at, shared_with_email";
const APPLICATION_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.license_number, a.vehicle, a.notes, a.status,
           a.submitted_at, a.reviewed_at, a.reviewed_by, a.review_notes,
           u.email, u.name
      FROM driver_applications a
      JOIN users u ON u.id = a.user_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn application_by_id(
        conn: &mut sqlx::PgConnection,
        id: i64,
    ) -> Result<Option<DriverApplication>, AppError> {
        let sql = format!("{} WHERE a.id = $1", APPLICATION_SELECT);
        let row = sqlx::query_as::<_, DriverApplication>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_user(&self, email: &str, name: &str, merge: NameMerge) -> Result<User, AppError> {
        let on_conflict = match merge {
            NameMerge::PreferIncoming => "name = COALESCE(NULLIF(EXCLUDED.name, ''), users.name)",
            NameMerge::KeepExisting => "name = COALESCE(NULLIF(users.name, ''), EXCLUDED.name)",
        };
        let sql = format!(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, 'user') \
             ON CONFLICT (email) DO UPDATE SET {} RETURNING {}",
            on_conflict, USER_COLUMNS
        );
        tracing::debug!(sql = %sql, email = %email, "upsert user");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {} FROM users ORDER BY id ASC", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let mut tx = self.pool.begin().await?;
        let current: Option<(Role,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((current,)) = current else {
            return Ok(None);
        };
        if is_admin_demotion(current, role) {
            // Lock every admin row so two concurrent demotions cannot both see "two admins".
            let admins: Vec<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE role = 'admin' FOR UPDATE")
                .fetch_all(&mut *tx)
                .await?;
            ensure_admin_remains(current, role, admins.len())?;
        }
        let sql = format!("UPDATE users SET role = $1 WHERE id = $2 RETURNING {}", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(user))
    }

    async fn upsert_driver(&self, email: &str, name: &str) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, 'driver') \
             ON CONFLICT (email) DO UPDATE SET role = 'driver' RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn seed_admin(&self, email: &str, name: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, 'admin') ON CONFLICT (email) DO NOTHING",
        )
        .bind(name)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_ride(&self, ride: NewRide) -> Result<Ride, AppError> {
        let sql = format!(
            "INSERT INTO rides (user_id, origin, destination, shared_with_email) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            RIDE_COLUMNS
        );
        let row = sqlx::query_as::<_, Ride>(&sql)
            .bind(ride.user_id)
            .bind(&ride.origin)
            .bind(&ride.destination)
            .bind(&ride.shared_with_email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn ride(&self, id: i64) -> Result<Option<Ride>, AppError> {
        let sql = format!("SELECT {} FROM rides WHERE id = $1", RIDE_COLUMNS);
        Ok(sqlx::query_as::<_, Ride>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn list_rides(&self, filter: RideFilter) -> Result<Vec<Ride>, AppError> {
        let (clause, param) = match filter {
            RideFilter::All => ("", None),
            RideFilter::OwnedBy(id) => ("WHERE user_id = $1", Some(id)),
            RideFilter::DrivenBy(id) => ("WHERE driver_id = $1", Some(id)),
        };
        let sql = format!(
            "SELECT {} FROM rides {} ORDER BY requested_at DESC, id DESC",
            RIDE_COLUMNS, clause
        );
        let mut query = sqlx::query_as::<_, Ride>(&sql);
        if let Some(id) = param {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn assign_ride(&self, id: i64, expected: RideVersion, driver_id: i64) -> Result<Option<Ride>, AppError> {
        let sql = format!(
            "UPDATE rides SET driver_id = $3, status = 'assigned' \
             WHERE id = $1 AND status = $2 AND driver_id IS NOT DISTINCT FROM $4 RETURNING {}",
            RIDE_COLUMNS
        );
        let row = sqlx::query_as::<_, Ride>(&sql)
            .bind(id)
            .bind(expected.status)
            .bind(driver_id)
            .bind(expected.driver_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_ride_status(&self, id: i64, expected: RideVersion, next: RideStatus) -> Result<Option<Ride>, AppError> {
        let sql = format!(
            "UPDATE rides SET status = $3 \
             WHERE id = $1 AND status = $2 AND driver_id IS NOT DISTINCT FROM $4 RETURNING {}",
            RIDE_COLUMNS
        );
        let row = sqlx::query_as::<_, Ride>(&sql)
            .bind(id)
            .bind(expected.status)
            .bind(next)
            .bind(expected.driver_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn share_ride(&self, id: i64, email: &str) -> Result<Option<Ride>, AppError> {
        let sql = format!(
            "UPDATE rides SET shared_with_email = $2 WHERE id = $1 RETURNING {}",
            RIDE_COLUMNS
        );
        let row = sqlx::query_as::<_, Ride>(&sql)
            .bind(id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_application(&self, application: NewApplication) -> Result<DriverApplication, AppError> {
        let mut tx = self.pool.begin().await?;
        let pending: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM driver_applications WHERE user_id = $1 AND status = 'applied' LIMIT 1",
        )
        .bind(application.user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if pending.is_some() {
            return Err(pending_conflict());
        }
        // A racing insert trips uq_driver_apps_user_pending and surfaces as 409.
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO driver_applications (user_id, license_number, vehicle, notes, status) \
             VALUES ($1, $2, $3, $4, 'applied') RETURNING id",
        )
        .bind(application.user_id)
        .bind(&application.license_number)
        .bind(&application.vehicle)
        .bind(&application.notes)
        .fetch_one(&mut *tx)
        .await?;
        let created = Self::application_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        Ok(created)
    }

    async fn applications_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<DriverApplication>, AppError> {
        let sql = format!(
            "{} WHERE a.user_id = $1 ORDER BY a.submitted_at DESC, a.id DESC LIMIT $2",
            APPLICATION_SELECT
        );
        let rows = sqlx::query_as::<_, DriverApplication>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_applications(&self, status: Option<ApplicationStatus>) -> Result<Vec<DriverApplication>, AppError> {
        let clause = if status.is_some() { "WHERE a.status = $1" } else { "" };
        let sql = format!(
            "{} {} ORDER BY a.submitted_at DESC, a.id DESC",
            APPLICATION_SELECT, clause
        );
        let mut query = sqlx::query_as::<_, DriverApplication>(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn review_application(&self, id: i64, review: Review) -> Result<Option<DriverApplication>, AppError> {
        let mut tx = self.pool.begin().await?;
        let locked: Option<(i64, ApplicationStatus)> =
            sqlx::query_as("SELECT user_id, status FROM driver_applications WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((user_id, status)) = locked else {
            return Ok(None);
        };
        status.ensure_reviewable()?;
        sqlx::query(
            "UPDATE driver_applications \
                SET status = $2, reviewed_at = NOW(), reviewed_by = $3, \
                    review_notes = COALESCE($4, review_notes) \
              WHERE id = $1",
        )
        .bind(id)
        .bind(review.decision.outcome())
        .bind(review.reviewer_id)
        .bind(&review.notes)
        .execute(&mut *tx)
        .await?;
        if review.decision == ReviewDecision::Approve {
            // Drivers stay drivers and admins keep their rights.
            sqlx::query("UPDATE users SET role = 'driver' WHERE id = $1 AND role = 'user'")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        let reviewed = Self::application_by_id(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(reviewed)
    }

    async fn reset(&self, scope: ResetScope) -> Result<ResetCounts, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut counts = ResetCounts::default();
        if scope.includes_applications() {
            counts.applications = sqlx::query("DELETE FROM driver_applications")
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        if scope.includes_rides() {
            counts.rides = sqlx::query("DELETE FROM rides").execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        tracing::info!(rides = counts.rides, applications = counts.applications, "data reset");
        Ok(counts)
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, query)) => (name.trim(), Some(query)),
        None => (path_and_query.trim(), None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_from_url() {
        let (admin, db) = parse_db_name_from_url("postgres://me:pw@localhost:5432/urbandrive").unwrap();
        assert_eq!(admin, "postgres://me:pw@localhost:5432/postgres");
        assert_eq!(db, "urbandrive");
    }

    #[test]
    fn keeps_query_parameters_on_admin_url() {
        let (admin, db) = parse_db_name_from_url("postgres://localhost/rides?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://localhost/postgres?sslmode=disable");
        assert_eq!(db, "rides");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
