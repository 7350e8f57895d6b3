use async_trait::async_trait;
use thiserror::Error;

use crate::domain::actor::{Actor, ActorId, Role};
use crate::domain::approval::ApprovalLogEntry;
use crate::domain::request::{RequestId, WorkflowRequest};
use crate::domain::revision::RequestVersionSnapshot;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("version conflict on request {request_id}: expected {expected}, found {actual:?}")]
    VersionConflict { request_id: RequestId, expected: u32, actual: Option<u32> },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only view of the organisation: roles and reporting edges.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn find_actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError>;

    /// Active holders of `role`, ordered by id.
    async fn list_by_role(&self, role: Role) -> Result<Vec<Actor>, StoreError>;
}

/// Transactional persistence for requests and their append-only audit data.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    type Tx: WorkflowTransaction;

    /// Opens a unit of work. Dropping it without `commit` discards every write.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn find_request(&self, id: &RequestId) -> Result<Option<WorkflowRequest>, StoreError>;

    async fn list_assigned_to(
        &self,
        approver_id: &ActorId,
    ) -> Result<Vec<WorkflowRequest>, StoreError>;

    /// Chronological.
    async fn list_log_entries(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalLogEntry>, StoreError>;

    /// Descending by version number.
    async fn list_snapshots(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<RequestVersionSnapshot>, StoreError>;
}

#[async_trait]
pub trait WorkflowTransaction: Send {
    async fn load_request(&mut self, id: &RequestId)
        -> Result<Option<WorkflowRequest>, StoreError>;

    async fn insert_request(&mut self, request: &WorkflowRequest) -> Result<(), StoreError>;

    /// Compare-and-swap on `version`: fails with `VersionConflict` unless the
    /// stored row is still at `expected_version`.
    async fn update_request(
        &mut self,
        request: &WorkflowRequest,
        expected_version: u32,
    ) -> Result<(), StoreError>;

    async fn append_log_entry(&mut self, entry: &ApprovalLogEntry) -> Result<(), StoreError>;

    async fn insert_snapshot(&mut self, snapshot: &RequestVersionSnapshot)
        -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
