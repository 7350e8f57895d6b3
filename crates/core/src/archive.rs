use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::domain::request::WorkflowRequest;
use crate::domain::revision::{RequestVersionSnapshot, SnapshotData, SnapshotId};
use crate::workflow::ports::{StoreError, WorkflowTransaction};

/// Preserves the editable content of a request each time it is sent back to
/// draft. Snapshots are keyed by the revision being closed.
#[derive(Clone, Copy, Debug, Default)]
pub struct VersionArchiver;

impl VersionArchiver {
    /// Snapshot of `request` as it stood before the transition was applied.
    pub fn snapshot(
        &self,
        request: &WorkflowRequest,
        created_at: DateTime<Utc>,
    ) -> RequestVersionSnapshot {
        RequestVersionSnapshot {
            id: SnapshotId(Uuid::new_v4().to_string()),
            request_id: request.id.clone(),
            version_number: request.revision_version,
            snapshot_data: SnapshotData {
                status: request.status,
                payload: request.payload.clone(),
            },
            created_at,
        }
    }

    pub async fn archive<T>(
        &self,
        tx: &mut T,
        before: &WorkflowRequest,
        created_at: DateTime<Utc>,
    ) -> Result<RequestVersionSnapshot, StoreError>
    where
        T: WorkflowTransaction + ?Sized,
    {
        let snapshot = self.snapshot(before, created_at);
        tx.insert_snapshot(&snapshot).await?;
        info!(
            event_name = "workflow.revision.archived",
            request_id = %snapshot.request_id,
            version_number = snapshot.version_number,
            status = %snapshot.snapshot_data.status,
            "request revision archived"
        );
        Ok(snapshot)
    }
}
