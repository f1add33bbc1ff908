//! Database module for SQLite persistence.
//!
//! One table per collection of the lab portal; SQLite is the source of truth.

mod approval;
mod projects;
mod repository;
mod users;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            tracing::warn!("Could not create database directory {:?}: {}", parent, e);
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create tables if they don't exist
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            user_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            address TEXT NOT NULL,
            dob TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL,
            rank TEXT,
            is_active_member INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL,
            profile_pic TEXT,
            skills TEXT NOT NULL DEFAULT '[]',
            social TEXT NOT NULL DEFAULT '{}',
            projects TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Profile lists arrived after the first schema
    add_column_if_missing(pool, "users", "skills", "TEXT NOT NULL DEFAULT '[]'").await?;
    add_column_if_missing(pool, "users", "social", "TEXT NOT NULL DEFAULT '{}'").await?;
    add_column_if_missing(pool, "users", "projects", "TEXT NOT NULL DEFAULT '[]'").await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS credentials (
            user_id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_users (
            id TEXT PRIMARY KEY,
            user_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            address TEXT NOT NULL,
            dob TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL,
            rank TEXT,
            profile_pic TEXT,
            description TEXT NOT NULL,
            is_active_member INTEGER NOT NULL DEFAULT 0,
            password_hash TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            requested_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_notifications (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            pending_user_id TEXT NOT NULL,
            user_name TEXT NOT NULL,
            email TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role TEXT NOT NULL,
            message TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            reviewed_at TEXT,
            review_note TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            image TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'private',
            mentor_id TEXT NOT NULL,
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            mentor_id TEXT NOT NULL,
            student_ids TEXT NOT NULL,
            project_type TEXT NOT NULL,
            image TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'private',
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Identity uniqueness within each table; cross-table checks happen in the repository
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_user_name ON users(user_name);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_credentials_email ON credentials(email);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_pending_users_email ON pending_users(email);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_pending_users_user_name ON pending_users(user_name);
        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        CREATE INDEX IF NOT EXISTS idx_notifications_pending_user ON admin_notifications(pending_user_id);
        CREATE INDEX IF NOT EXISTS idx_notifications_status ON admin_notifications(status);
        CREATE INDEX IF NOT EXISTS idx_projects_mentor ON projects(mentor_id);
        CREATE INDEX IF NOT EXISTS idx_admin_projects_type ON admin_projects(project_type);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn add_column_if_missing(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<(), sqlx::Error> {
    let (present,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    if present == 0 {
        tracing::info!("Adding column {}.{}", table, column);
        sqlx::query(&format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column, definition
        ))
        .execute(pool)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_migrations_add_profile_columns_to_old_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("old.sqlite");

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        sqlx::query(
            r#"CREATE TABLE users (
                id TEXT PRIMARY KEY, user_name TEXT NOT NULL, first_name TEXT NOT NULL,
                last_name TEXT NOT NULL, address TEXT NOT NULL, dob TEXT NOT NULL,
                email TEXT NOT NULL, role TEXT NOT NULL, rank TEXT,
                is_active_member INTEGER NOT NULL DEFAULT 0, description TEXT NOT NULL,
                profile_pic TEXT, created_at TEXT NOT NULL, updated_at TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1)"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        let pool = init_database(&db_path).await.unwrap();
        let (columns,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name IN ('skills', 'social', 'projects')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(columns, 3);

        // Running again is a no-op
        run_migrations(&pool).await.unwrap();
    }
}
