use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use hrflow_core::domain::actor::{Actor, ActorId, Role};
use hrflow_core::domain::approval::ApprovalLogEntry;
use hrflow_core::domain::request::{RequestId, WorkflowRequest};
use hrflow_core::domain::revision::RequestVersionSnapshot;
use hrflow_core::workflow::ports::{
    ActorDirectory, StoreError, WorkflowStore, WorkflowTransaction,
};

#[derive(Default)]
struct MemoryState {
    requests: HashMap<String, WorkflowRequest>,
    log_entries: Vec<ApprovalLogEntry>,
    snapshots: Vec<RequestVersionSnapshot>,
}

enum Staged {
    Insert(WorkflowRequest),
    Update { request: WorkflowRequest, expected_version: u32 },
    Log(ApprovalLogEntry),
    Snapshot(RequestVersionSnapshot),
}

/// Process-local store with the same unit-of-work contract as the SQL one:
/// writes are staged and only land, all together, when `commit` re-checks
/// every expected version under the write lock.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    state: Arc<RwLock<MemoryState>>,
}

pub struct InMemoryTransaction {
    state: Arc<RwLock<MemoryState>>,
    staged: Vec<Staged>,
}

impl InMemoryTransaction {
    fn staged_request(&self, id: &RequestId) -> Option<&WorkflowRequest> {
        self.staged.iter().rev().find_map(|write| match write {
            Staged::Insert(request) | Staged::Update { request, .. } if request.id == *id => {
                Some(request)
            }
            _ => None,
        })
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(InMemoryTransaction { state: Arc::clone(&self.state), staged: Vec::new() })
    }

    async fn find_request(&self, id: &RequestId) -> Result<Option<WorkflowRequest>, StoreError> {
        let state = self.state.read().await;
        Ok(state.requests.get(&id.0).cloned())
    }

    async fn list_assigned_to(
        &self,
        approver_id: &ActorId,
    ) -> Result<Vec<WorkflowRequest>, StoreError> {
        let state = self.state.read().await;
        let mut assigned: Vec<_> = state
            .requests
            .values()
            .filter(|request| request.current_approver_id.as_ref() == Some(approver_id))
            .cloned()
            .collect();
        assigned.sort_by(|left, right| {
            left.updated_at.cmp(&right.updated_at).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(assigned)
    }

    async fn list_log_entries(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalLogEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .log_entries
            .iter()
            .filter(|entry| entry.request_id == *request_id)
            .cloned()
            .collect())
    }

    async fn list_snapshots(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<RequestVersionSnapshot>, StoreError> {
        let state = self.state.read().await;
        let mut snapshots: Vec<_> = state
            .snapshots
            .iter()
            .filter(|snapshot| snapshot.request_id == *request_id)
            .cloned()
            .collect();
        snapshots.sort_by(|left, right| right.version_number.cmp(&left.version_number));
        Ok(snapshots)
    }
}

#[async_trait]
impl WorkflowTransaction for InMemoryTransaction {
    async fn load_request(
        &mut self,
        id: &RequestId,
    ) -> Result<Option<WorkflowRequest>, StoreError> {
        if let Some(request) = self.staged_request(id) {
            return Ok(Some(request.clone()));
        }
        let state = self.state.read().await;
        Ok(state.requests.get(&id.0).cloned())
    }

    async fn insert_request(&mut self, request: &WorkflowRequest) -> Result<(), StoreError> {
        self.staged.push(Staged::Insert(request.clone()));
        Ok(())
    }

    async fn update_request(
        &mut self,
        request: &WorkflowRequest,
        expected_version: u32,
    ) -> Result<(), StoreError> {
        let current = self.load_request(&request.id).await?.map(|stored| stored.version);
        if current != Some(expected_version) {
            return Err(StoreError::VersionConflict {
                request_id: request.id.clone(),
                expected: expected_version,
                actual: current,
            });
        }
        self.staged.push(Staged::Update { request: request.clone(), expected_version });
        Ok(())
    }

    async fn append_log_entry(&mut self, entry: &ApprovalLogEntry) -> Result<(), StoreError> {
        self.staged.push(Staged::Log(entry.clone()));
        Ok(())
    }

    async fn insert_snapshot(
        &mut self,
        snapshot: &RequestVersionSnapshot,
    ) -> Result<(), StoreError> {
        self.staged.push(Staged::Snapshot(snapshot.clone()));
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        // validate everything before applying anything
        let mut versions: HashMap<&str, Option<u32>> = HashMap::new();
        for write in &self.staged {
            match write {
                Staged::Insert(request) => {
                    let existing = versions
                        .get(request.id.as_str())
                        .copied()
                        .unwrap_or_else(|| state.requests.get(&request.id.0).map(|r| r.version));
                    if existing.is_some() {
                        return Err(StoreError::Unavailable(format!(
                            "request {} already exists",
                            request.id
                        )));
                    }
                    versions.insert(request.id.as_str(), Some(request.version));
                }
                Staged::Update { request, expected_version } => {
                    let actual = versions
                        .get(request.id.as_str())
                        .copied()
                        .unwrap_or_else(|| state.requests.get(&request.id.0).map(|r| r.version));
                    if actual != Some(*expected_version) {
                        return Err(StoreError::VersionConflict {
                            request_id: request.id.clone(),
                            expected: *expected_version,
                            actual,
                        });
                    }
                    versions.insert(request.id.as_str(), Some(request.version));
                }
                Staged::Log(_) | Staged::Snapshot(_) => {}
            }
        }

        for write in self.staged {
            match write {
                Staged::Insert(request) | Staged::Update { request, .. } => {
                    state.requests.insert(request.id.0.clone(), request);
                }
                Staged::Log(entry) => state.log_entries.push(entry),
                Staged::Snapshot(snapshot) => state.snapshots.push(snapshot),
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryActorDirectory {
    actors: Arc<RwLock<BTreeMap<ActorId, Actor>>>,
}

impl InMemoryActorDirectory {
    pub fn with_actors(actors: impl IntoIterator<Item = Actor>) -> Self {
        let actors = actors.into_iter().map(|actor| (actor.id.clone(), actor)).collect();
        Self { actors: Arc::new(RwLock::new(actors)) }
    }

    pub async fn save(&self, actor: Actor) {
        let mut actors = self.actors.write().await;
        actors.insert(actor.id.clone(), actor);
    }
}

#[async_trait]
impl ActorDirectory for InMemoryActorDirectory {
    async fn find_actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        let actors = self.actors.read().await;
        Ok(actors.get(id).cloned())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Actor>, StoreError> {
        let actors = self.actors.read().await;
        Ok(actors.values().filter(|actor| actor.active && actor.role == role).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use hrflow_core::domain::actor::{Actor, ActorId, Role};
    use hrflow_core::domain::request::{
        EmploymentType, ManpowerPayload, RequestId, RequestKind, RequestPayload, WorkflowRequest,
    };
    use hrflow_core::workflow::ports::{
        ActorDirectory, StoreError, WorkflowStore, WorkflowTransaction,
    };
    use hrflow_core::workflow::states::WorkflowStatus;

    use crate::repositories::{InMemoryActorDirectory, InMemoryWorkflowStore};

    fn request(id: &str) -> WorkflowRequest {
        let now = Utc::now();
        WorkflowRequest {
            id: RequestId::new(id),
            kind: RequestKind::Manpower,
            requester_id: ActorId::new("emp-1"),
            requester_role: Role::Employee,
            status: WorkflowStatus::PendingManager,
            version: 0,
            revision_version: 0,
            current_approver_id: Some(ActorId::new("mgr-1")),
            current_approver_role: Some(Role::Manager),
            payload: RequestPayload::Manpower(ManpowerPayload {
                position_title: "Recruiter".to_string(),
                department: "People".to_string(),
                headcount: 1,
                employment_type: EmploymentType::Permanent,
                justification: "Growth".to_string(),
                monthly_budget: Decimal::new(700_000, 2),
            }),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn staged_writes_are_invisible_until_commit() {
        let store = InMemoryWorkflowStore::default();
        let original = request("MPR-1");

        let mut tx = store.begin().await.expect("begin");
        tx.insert_request(&original).await.expect("stage");
        assert_eq!(store.find_request(&original.id).await.expect("find"), None);
        tx.commit().await.expect("commit");
        assert_eq!(store.find_request(&original.id).await.expect("find"), Some(original));
    }

    #[tokio::test]
    async fn racing_commits_against_one_version_let_only_one_through() {
        let store = InMemoryWorkflowStore::default();
        let original = request("MPR-2");
        let mut tx = store.begin().await.expect("begin");
        tx.insert_request(&original).await.expect("stage");
        tx.commit().await.expect("commit");

        let mut approve = original.clone();
        approve.status = WorkflowStatus::PendingHr;
        approve.version = 1;
        let mut reject = original.clone();
        reject.status = WorkflowStatus::Rejected;
        reject.version = 1;

        let mut first = store.begin().await.expect("begin");
        let mut second = store.begin().await.expect("begin");
        first.update_request(&approve, 0).await.expect("stage approve");
        second.update_request(&reject, 0).await.expect("stage reject");

        first.commit().await.expect("first commit");
        let error = second.commit().await.expect_err("second commit must lose");
        assert!(matches!(error, StoreError::VersionConflict { actual: Some(1), .. }));

        let stored = store.find_request(&original.id).await.expect("find").expect("row");
        assert_eq!(stored.status, WorkflowStatus::PendingHr);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn directory_role_pool_is_ordered_and_active_only() {
        let mut retired = Actor::new("fin-0", Role::Finance);
        retired.active = false;
        let directory = InMemoryActorDirectory::with_actors([
            Actor::new("fin-2", Role::Finance),
            retired,
            Actor::new("fin-1", Role::Finance),
        ]);
        directory.save(Actor::new("fin-3", Role::Finance)).await;

        let pool = directory.list_by_role(Role::Finance).await.expect("pool");
        let ids: Vec<_> = pool.iter().map(|actor| actor.id.as_str()).collect();
        assert_eq!(ids, vec!["fin-1", "fin-2", "fin-3"]);
    }
}
