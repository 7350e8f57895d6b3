use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::{RequestId, RequestPayload};
use crate::workflow::states::WorkflowStatus;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub status: WorkflowStatus,
    pub payload: RequestPayload,
}

/// Archived copy of a request's mutable content, keyed by the revision it closed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestVersionSnapshot {
    pub id: SnapshotId,
    pub request_id: RequestId,
    pub version_number: u32,
    pub snapshot_data: SnapshotData,
    pub created_at: DateTime<Utc>,
}
