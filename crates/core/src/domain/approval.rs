use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::ActorId;
use crate::domain::request::RequestId;
use crate::workflow::states::{WorkflowAction, WorkflowStatus};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalLogId(pub String);

/// One row per successful transition. Never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLogEntry {
    pub id: ApprovalLogId,
    pub request_id: RequestId,
    pub actor_id: ActorId,
    pub action: WorkflowAction,
    pub step_name: String,
    pub from_status: WorkflowStatus,
    pub to_status: WorkflowStatus,
    pub comment: Option<String>,
    pub ip_address: Option<String>,
    pub performed_at: DateTime<Utc>,
}
