use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

const BASELINE_TABLES: &[&str] =
    &["approval_document", "approval_line", "shift_assignment", "approved_leave", "roster_plan"];

/// Applied migrations in order, rendered as `NNNN description` lines
/// for operator-facing output.
pub async fn applied_migrations(pool: &DbPool) -> Result<Vec<String>, sqlx::Error> {
    use sqlx::Row;

    let rows = sqlx::query(
        "SELECT version, description FROM _sqlx_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let version: i64 = row.get("version");
            let description: String = row.get("description");
            format!("{version:04} {description}")
        })
        .collect())
}

/// True when every migration-managed table exists. Readiness check for
/// the operator CLI; does not apply anything.
pub async fn schema_ready(pool: &DbPool) -> Result<bool, sqlx::Error> {
    use sqlx::Row;

    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM sqlite_master
         WHERE type = 'table' AND name IN (?, ?, ?, ?, ?)",
    )
    .bind(BASELINE_TABLES[0])
    .bind(BASELINE_TABLES[1])
    .bind(BASELINE_TABLES[2])
    .bind(BASELINE_TABLES[3])
    .bind(BASELINE_TABLES[4])
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i64, _>("count") == BASELINE_TABLES.len() as i64)
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{applied_migrations, run_pending};
    use crate::{connect_memory, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "approval_document",
        "approval_line",
        "shift_assignment",
        "approved_leave",
        "roster_plan",
        "idx_approval_line_document_id",
        "idx_approval_line_kind_order",
        "idx_shift_assignment_slot",
        "idx_shift_assignment_date",
        "idx_approved_leave_staff_id",
        "idx_approved_leave_from_date",
    ];

    async fn table_count(pool: &sqlx::SqlitePool, name: &str) -> i64 {
        sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("query sqlite_master")
        .get::<i64, _>("count")
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_memory().await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in
            ["approval_document", "approval_line", "shift_assignment", "approved_leave", "roster_plan"]
        {
            assert_eq!(table_count(&pool, table).await, 1, "missing table `{table}`");
        }
    }

    #[tokio::test]
    async fn applied_migrations_lists_each_version_once() {
        let pool = connect_memory().await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let applied = applied_migrations(&pool).await.expect("list applied");
        assert_eq!(applied.len(), 1);
        assert!(applied[0].contains("schedule"), "unexpected entry: {}", applied[0]);

        // Re-running changes nothing.
        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(applied_migrations(&pool).await.expect("list applied").len(), 1);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_memory().await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        assert_eq!(table_count(&pool, "approval_document").await, 0);
        assert_eq!(table_count(&pool, "shift_assignment").await, 0);
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_memory().await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let initial_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            initial_signature.len(),
            MANAGED_SCHEMA_OBJECTS.len(),
            "initial migration pass should create all managed schema objects",
        );

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let after_down_signature = managed_schema_signature(&pool).await;
        assert!(
            after_down_signature.is_empty(),
            "managed schema objects should be removed after full undo",
        );

        run_pending(&pool).await.expect("re-run migrations");

        let after_second_up_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            after_second_up_signature, initial_signature,
            "up/down/up should preserve migration-managed schema signature",
        );
    }

    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            if MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()) {
                Some((row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
            } else {
                None
            }
        })
        .collect();
        signature.sort();
        signature
    }
}
