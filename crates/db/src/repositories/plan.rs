use chrono::{DateTime, Utc};
use sqlx::Row;

use super::{parse_timestamp, PlanRepository, RecordOutcome, RepositoryError};
use crate::DbPool;

/// One recorded bulk submission. `request_fingerprint` is the
/// canonical serialization of the request so a reused key with a
/// different request can be detected; `outcome_json` is the snapshot
/// returned to retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterPlanRecord {
    pub plan_key: String,
    pub request_fingerprint: String,
    pub outcome_json: String,
    pub created_at: DateTime<Utc>,
}

pub struct SqlPlanRepository {
    pool: DbPool,
}

impl SqlPlanRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PlanRepository for SqlPlanRepository {
    async fn find_by_key(
        &self,
        plan_key: &str,
    ) -> Result<Option<RosterPlanRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT plan_key, request_fingerprint, outcome_json, created_at
             FROM roster_plan WHERE plan_key = ?",
        )
        .bind(plan_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at_raw: String =
            row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok(Some(RosterPlanRecord {
            plan_key: row
                .try_get("plan_key")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            request_fingerprint: row
                .try_get("request_fingerprint")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            outcome_json: row
                .try_get("outcome_json")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            created_at: parse_timestamp(&created_at_raw)?,
        }))
    }

    async fn record(&self, record: &RosterPlanRecord) -> Result<RecordOutcome, RepositoryError> {
        // First writer wins. A concurrent submission that lost the
        // race must not clobber the recorded outcome, so a taken key
        // turns this into a zero-row insert.
        let result = sqlx::query(
            "INSERT INTO roster_plan (plan_key, request_fingerprint, outcome_json, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(plan_key) DO NOTHING",
        )
        .bind(&record.plan_key)
        .bind(&record.request_fingerprint)
        .bind(&record.outcome_json)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(RecordOutcome::Recorded)
        } else {
            Ok(RecordOutcome::AlreadyRecorded)
        }
    }
}
