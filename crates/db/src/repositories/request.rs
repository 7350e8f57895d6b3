use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use hrflow_core::domain::actor::{ActorId, Role};
use hrflow_core::domain::approval::{ApprovalLogEntry, ApprovalLogId};
use hrflow_core::domain::request::{RequestId, RequestKind, WorkflowRequest};
use hrflow_core::domain::revision::{RequestVersionSnapshot, SnapshotData, SnapshotId};
use hrflow_core::workflow::ports::{StoreError, WorkflowStore, WorkflowTransaction};
use hrflow_core::workflow::states::{WorkflowAction, WorkflowStatus};

use super::{is_stale_snapshot, parse_counter, parse_enum, parse_timestamp, RepositoryError};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, kind, requester_id, requester_role, status, version,
     revision_version, current_approver_id, current_approver_role, payload_json,
     created_at, updated_at";

#[derive(Clone)]
pub struct SqlWorkflowStore {
    pool: DbPool,
}

impl SqlWorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Unit of work over the pool. Reads go through the pool until the first
/// write, which opens the SQLite transaction; every later statement shares
/// it. Dropping the value without `commit` rolls the writes back.
pub struct SqlWorkflowTransaction {
    pool: DbPool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqlWorkflowTransaction {
    async fn writer(&mut self) -> Result<&mut Transaction<'static, Sqlite>, RepositoryError> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await?);
        }
        self.tx.as_mut().ok_or_else(|| RepositoryError::Decode("transaction not open".into()))
    }
}

fn row_to_request(row: &SqliteRow) -> Result<WorkflowRequest, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let kind: String = row.try_get("kind").map_err(decode)?;
    let requester_role: String = row.try_get("requester_role").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let version: i64 = row.try_get("version").map_err(decode)?;
    let revision_version: i64 = row.try_get("revision_version").map_err(decode)?;
    let current_approver_id: Option<String> = row.try_get("current_approver_id").map_err(decode)?;
    let current_approver_role: Option<String> =
        row.try_get("current_approver_role").map_err(decode)?;
    let payload_json: String = row.try_get("payload_json").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    Ok(WorkflowRequest {
        id: RequestId(row.try_get("id").map_err(decode)?),
        kind: parse_enum("request kind", &kind, RequestKind::parse)?,
        requester_id: ActorId(row.try_get("requester_id").map_err(decode)?),
        requester_role: parse_enum("role", &requester_role, Role::parse)?,
        status: parse_enum("status", &status, WorkflowStatus::parse)?,
        version: parse_counter("version", version)?,
        revision_version: parse_counter("revision_version", revision_version)?,
        current_approver_id: current_approver_id.map(ActorId),
        current_approver_role: current_approver_role
            .map(|role| parse_enum("role", &role, Role::parse))
            .transpose()?,
        payload: serde_json::from_str(&payload_json)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn row_to_log_entry(row: &SqliteRow) -> Result<ApprovalLogEntry, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let action: String = row.try_get("action").map_err(decode)?;
    let from_status: String = row.try_get("from_status").map_err(decode)?;
    let to_status: String = row.try_get("to_status").map_err(decode)?;
    let performed_at: String = row.try_get("performed_at").map_err(decode)?;

    Ok(ApprovalLogEntry {
        id: ApprovalLogId(row.try_get("id").map_err(decode)?),
        request_id: RequestId(row.try_get("request_id").map_err(decode)?),
        actor_id: ActorId(row.try_get("actor_id").map_err(decode)?),
        action: parse_enum("action", &action, WorkflowAction::parse)?,
        step_name: row.try_get("step_name").map_err(decode)?,
        from_status: parse_enum("status", &from_status, WorkflowStatus::parse)?,
        to_status: parse_enum("status", &to_status, WorkflowStatus::parse)?,
        comment: row.try_get("comment").map_err(decode)?,
        ip_address: row.try_get("ip_address").map_err(decode)?,
        performed_at: parse_timestamp("performed_at", &performed_at)?,
    })
}

fn row_to_snapshot(row: &SqliteRow) -> Result<RequestVersionSnapshot, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let version_number: i64 = row.try_get("version_number").map_err(decode)?;
    let snapshot_json: String = row.try_get("snapshot_json").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let snapshot_data: SnapshotData = serde_json::from_str(&snapshot_json)?;

    Ok(RequestVersionSnapshot {
        id: SnapshotId(row.try_get("id").map_err(decode)?),
        request_id: RequestId(row.try_get("request_id").map_err(decode)?),
        version_number: parse_counter("version_number", version_number)?,
        snapshot_data,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

async fn fetch_request<'e, E>(
    executor: E,
    id: &RequestId,
) -> Result<Option<WorkflowRequest>, RepositoryError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM workflow_request WHERE id = ?");
    let row = sqlx::query(&sql).bind(&id.0).fetch_optional(executor).await?;
    row.as_ref().map(row_to_request).transpose()
}

#[async_trait]
impl WorkflowStore for SqlWorkflowStore {
    type Tx = SqlWorkflowTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(SqlWorkflowTransaction { pool: self.pool.clone(), tx: None })
    }

    async fn find_request(&self, id: &RequestId) -> Result<Option<WorkflowRequest>, StoreError> {
        Ok(fetch_request(&self.pool, id).await?)
    }

    async fn list_assigned_to(
        &self,
        approver_id: &ActorId,
    ) -> Result<Vec<WorkflowRequest>, StoreError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM workflow_request
             WHERE current_approver_id = ?
             ORDER BY updated_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(&approver_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_log_entries(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalLogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, request_id, actor_id, action, step_name, from_status, to_status,
                    comment, ip_address, performed_at
             FROM approval_log
             WHERE request_id = ?
             ORDER BY performed_at ASC, rowid ASC",
        )
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(rows.iter().map(row_to_log_entry).collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_snapshots(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<RequestVersionSnapshot>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, request_id, version_number, snapshot_json, created_at
             FROM request_version_snapshot
             WHERE request_id = ?
             ORDER BY version_number DESC",
        )
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(rows.iter().map(row_to_snapshot).collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl WorkflowTransaction for SqlWorkflowTransaction {
    async fn load_request(
        &mut self,
        id: &RequestId,
    ) -> Result<Option<WorkflowRequest>, StoreError> {
        let request = match self.tx.as_mut() {
            Some(tx) => fetch_request(&mut **tx, id).await?,
            None => fetch_request(&self.pool, id).await?,
        };
        Ok(request)
    }

    async fn insert_request(&mut self, request: &WorkflowRequest) -> Result<(), StoreError> {
        let payload_json = serde_json::to_string(&request.payload).map_err(RepositoryError::from)?;
        let tx = self.writer().await?;
        sqlx::query(
            "INSERT INTO workflow_request (id, kind, requester_id, requester_role, status, version,
                                           revision_version, current_approver_id,
                                           current_approver_role, payload_json, created_at,
                                           updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(request.kind.as_str())
        .bind(&request.requester_id.0)
        .bind(request.requester_role.as_str())
        .bind(request.status.as_str())
        .bind(i64::from(request.version))
        .bind(i64::from(request.revision_version))
        .bind(request.current_approver_id.as_ref().map(|id| id.0.as_str()))
        .bind(request.current_approver_role.map(|role| role.as_str()))
        .bind(payload_json)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn update_request(
        &mut self,
        request: &WorkflowRequest,
        expected_version: u32,
    ) -> Result<(), StoreError> {
        let payload_json = serde_json::to_string(&request.payload).map_err(RepositoryError::from)?;
        let tx = self.writer().await?;
        let result = sqlx::query(
            "UPDATE workflow_request
             SET status = ?, version = ?, revision_version = ?, current_approver_id = ?,
                 current_approver_role = ?, payload_json = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(request.status.as_str())
        .bind(i64::from(request.version))
        .bind(i64::from(request.revision_version))
        .bind(request.current_approver_id.as_ref().map(|id| id.0.as_str()))
        .bind(request.current_approver_role.map(|role| role.as_str()))
        .bind(payload_json)
        .bind(request.updated_at.to_rfc3339())
        .bind(&request.id.0)
        .bind(i64::from(expected_version))
        .execute(&mut **tx)
        .await;

        let conflict = |actual: Option<u32>| RepositoryError::VersionConflict {
            request_id: request.id.clone(),
            expected: expected_version,
            actual,
        };

        let result = match result {
            Ok(result) => result,
            Err(error) if is_stale_snapshot(&error) => return Err(conflict(None).into()),
            Err(error) => return Err(RepositoryError::from(error).into()),
        };

        if result.rows_affected() == 0 {
            let actual = fetch_request(&mut **tx, &request.id).await?.map(|row| row.version);
            debug!(
                event_name = "db.request.version_conflict",
                request_id = %request.id,
                expected_version,
                actual_version = ?actual,
                "compare-and-swap matched no row"
            );
            return Err(conflict(actual).into());
        }
        Ok(())
    }

    async fn append_log_entry(&mut self, entry: &ApprovalLogEntry) -> Result<(), StoreError> {
        let tx = self.writer().await?;
        sqlx::query(
            "INSERT INTO approval_log (id, request_id, actor_id, action, step_name, from_status,
                                       to_status, comment, ip_address, performed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id.0)
        .bind(&entry.request_id.0)
        .bind(&entry.actor_id.0)
        .bind(entry.action.as_str())
        .bind(&entry.step_name)
        .bind(entry.from_status.as_str())
        .bind(entry.to_status.as_str())
        .bind(&entry.comment)
        .bind(&entry.ip_address)
        .bind(entry.performed_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn insert_snapshot(
        &mut self,
        snapshot: &RequestVersionSnapshot,
    ) -> Result<(), StoreError> {
        let snapshot_json =
            serde_json::to_string(&snapshot.snapshot_data).map_err(RepositoryError::from)?;
        let tx = self.writer().await?;
        sqlx::query(
            "INSERT INTO request_version_snapshot (id, request_id, version_number, snapshot_json,
                                                   created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&snapshot.id.0)
        .bind(&snapshot.request_id.0)
        .bind(i64::from(snapshot.version_number))
        .bind(snapshot_json)
        .bind(snapshot.created_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx {
            tx.commit().await.map_err(RepositoryError::from)?;
        }
        Ok(())
    }
}
