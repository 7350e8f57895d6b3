use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::archive::VersionArchiver;
use crate::audit::{AuditContext, AuditTrail};
use crate::clock::{Clock, SystemClock};
use crate::domain::actor::{Actor, ActorId, Role};
use crate::domain::approval::ApprovalLogEntry;
use crate::domain::request::{
    CreateRequestInput, RequestId, RequestKind, RequestPayload, WorkflowRequest,
};
use crate::domain::revision::RequestVersionSnapshot;
use crate::errors::WorkflowError;
use crate::workflow::guard::ConcurrencyGuard;
use crate::workflow::machine::TransitionStateMachine;
use crate::workflow::ports::{ActorDirectory, WorkflowStore, WorkflowTransaction};
use crate::workflow::router::{ApproverRouter, Routing};
use crate::workflow::states::{WorkflowAction, WorkflowStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCommand {
    pub request_id: RequestId,
    pub actor_id: ActorId,
    pub action: WorkflowAction,
    pub expected_version: u32,
    pub comment: Option<String>,
    pub ip_address: Option<String>,
}

impl TransitionCommand {
    pub fn new(
        request_id: RequestId,
        actor_id: ActorId,
        action: WorkflowAction,
        expected_version: u32,
    ) -> Self {
        Self { request_id, actor_id, action, expected_version, comment: None, ip_address: None }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn from_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionReceipt {
    pub previous_status: WorkflowStatus,
    pub new_status: WorkflowStatus,
    pub request: WorkflowRequest,
    pub log_entry: ApprovalLogEntry,
    pub snapshot: Option<RequestVersionSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequestInput {
    pub payload: RequestPayload,
}

/// Orchestrates every request mutation. Each call runs in its own unit of
/// work obtained from the store; early returns drop it and nothing persists.
pub struct WorkflowEngine<S, D, C = SystemClock> {
    store: S,
    directory: D,
    clock: C,
    router: ApproverRouter,
    machine: TransitionStateMachine,
    guard: ConcurrencyGuard,
    audit: AuditTrail,
    archiver: VersionArchiver,
}

impl<S, D, C> WorkflowEngine<S, D, C>
where
    S: WorkflowStore,
    D: ActorDirectory,
    C: Clock,
{
    pub fn new(store: S, directory: D, clock: C) -> Self {
        Self {
            store,
            directory,
            clock,
            router: ApproverRouter::default(),
            machine: TransitionStateMachine,
            guard: ConcurrencyGuard,
            audit: AuditTrail,
            archiver: VersionArchiver,
        }
    }

    pub fn with_router(mut self, router: ApproverRouter) -> Self {
        self.router = router;
        self
    }

    pub async fn create(
        &self,
        input: CreateRequestInput,
        requester_id: &ActorId,
    ) -> Result<WorkflowRequest, WorkflowError> {
        input.payload.validate().map_err(WorkflowError::Validation)?;
        let requester = self.load_actor(requester_id).await?;
        if !requester.active {
            return Err(WorkflowError::Forbidden {
                actor_id: requester.id,
                action: "create".to_string(),
            });
        }

        let kind = input.payload.kind();
        let status = if input.save_as_draft {
            WorkflowStatus::Draft
        } else {
            self.router.initial_status(kind, requester.role)
        };
        let now = self.clock.now();
        let mut request = WorkflowRequest {
            id: next_request_id(kind),
            kind,
            requester_id: requester.id.clone(),
            requester_role: requester.role,
            status,
            version: 0,
            revision_version: 0,
            current_approver_id: None,
            current_approver_role: None,
            payload: input.payload,
            created_at: now,
            updated_at: now,
        };
        self.assign_approver(&mut request).await?;

        let mut tx = self.store.begin().await?;
        tx.insert_request(&request).await?;
        tx.commit().await?;

        info!(
            event_name = "workflow.request.created",
            request_id = %request.id,
            kind = request.kind.as_str(),
            requester_id = %request.requester_id,
            status = %request.status,
            approver_id = request.current_approver_id.as_ref().map(ActorId::as_str),
            "workflow request created"
        );
        Ok(request)
    }

    pub async fn transition(
        &self,
        command: TransitionCommand,
    ) -> Result<TransitionReceipt, WorkflowError> {
        let result = self.apply_transition(&command).await;
        match &result {
            Ok(receipt) => info!(
                event_name = "workflow.transition.applied",
                request_id = %command.request_id,
                actor_id = %command.actor_id,
                action = %command.action,
                from = %receipt.previous_status,
                to = %receipt.new_status,
                version = receipt.request.version,
                archived = receipt.snapshot.is_some(),
                "workflow transition applied"
            ),
            Err(error) => warn!(
                event_name = "workflow.transition.rejected",
                request_id = %command.request_id,
                actor_id = %command.actor_id,
                action = %command.action,
                expected_version = command.expected_version,
                error_code = error.code(),
                error = %error,
                "workflow transition rejected"
            ),
        }
        result
    }

    async fn apply_transition(
        &self,
        command: &TransitionCommand,
    ) -> Result<TransitionReceipt, WorkflowError> {
        let mut tx = self.store.begin().await?;

        let before = tx
            .load_request(&command.request_id)
            .await?
            .ok_or_else(|| WorkflowError::request_not_found(command.request_id.as_str()))?;
        let actor = self.load_actor(&command.actor_id).await?;

        let sequence = self.router.sequence_for(before.kind, before.requester_role);
        let outcome = self.machine.transition(before.kind, sequence, before.status, command.action)?;
        self.guard.check_and_lock(
            &before,
            command.expected_version,
            &actor,
            command.action,
            outcome.authority,
        )?;

        let now = self.clock.now();
        let mut after = before.clone();
        after.status = outcome.to;
        after.version = before.version + 1;
        if outcome.starts_revision() {
            after.revision_version = before.revision_version + 1;
        }
        after.updated_at = now;
        if outcome.to != outcome.from {
            self.assign_approver(&mut after).await?;
        }

        tx.update_request(&after, before.version).await?;
        let context = AuditContext::new(command.comment.clone(), command.ip_address.clone());
        let log_entry =
            self.audit.record(&mut tx, &after.id, &actor.id, &outcome, &context, now).await?;
        let snapshot = if outcome.starts_revision() {
            Some(self.archiver.archive(&mut tx, &before, now).await?)
        } else {
            None
        };
        tx.commit().await?;

        Ok(TransitionReceipt {
            previous_status: outcome.from,
            new_status: outcome.to,
            request: after,
            log_entry,
            snapshot,
        })
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<WorkflowRequest, WorkflowError> {
        self.store
            .find_request(id)
            .await?
            .ok_or_else(|| WorkflowError::request_not_found(id.as_str()))
    }

    pub async fn history(&self, id: &RequestId) -> Result<Vec<ApprovalLogEntry>, WorkflowError> {
        self.get_request(id).await?;
        Ok(self.store.list_log_entries(id).await?)
    }

    pub async fn versions(
        &self,
        id: &RequestId,
    ) -> Result<Vec<RequestVersionSnapshot>, WorkflowError> {
        self.get_request(id).await?;
        Ok(self.store.list_snapshots(id).await?)
    }

    /// Payload edit outside the state machine. Same version contract as a
    /// transition; only the requester may edit, and only while in draft.
    pub async fn update(
        &self,
        id: &RequestId,
        input: UpdateRequestInput,
        expected_version: u32,
        user_id: &ActorId,
    ) -> Result<WorkflowRequest, WorkflowError> {
        let mut tx = self.store.begin().await?;
        let before =
            tx.load_request(id).await?.ok_or_else(|| WorkflowError::request_not_found(id.as_str()))?;

        self.guard.check_version(&before, expected_version)?;
        if !before.is_editable_by(user_id) {
            return Err(WorkflowError::Forbidden {
                actor_id: user_id.clone(),
                action: "update".to_string(),
            });
        }
        if input.payload.kind() != before.kind {
            return Err(WorkflowError::Validation(format!(
                "payload kind `{}` does not match request kind `{}`",
                input.payload.kind().as_str(),
                before.kind.as_str()
            )));
        }
        input.payload.validate().map_err(WorkflowError::Validation)?;

        let mut after = before.clone();
        after.payload = input.payload;
        after.version = before.version + 1;
        after.updated_at = self.clock.now();
        tx.update_request(&after, before.version).await?;
        tx.commit().await?;

        info!(
            event_name = "workflow.request.updated",
            request_id = %after.id,
            actor_id = %user_id,
            version = after.version,
            "workflow request updated"
        );
        Ok(after)
    }

    pub async fn list_pending_for_approver(
        &self,
        approver_id: &ActorId,
    ) -> Result<Vec<WorkflowRequest>, WorkflowError> {
        let requests = self.store.list_assigned_to(approver_id).await?;
        Ok(requests.into_iter().filter(|request| request.status.is_pending()).collect())
    }

    /// Actions the state machine accepts for the request right now; permission
    /// is not considered.
    pub async fn available_actions(
        &self,
        id: &RequestId,
    ) -> Result<Vec<WorkflowAction>, WorkflowError> {
        let request = self.get_request(id).await?;
        let sequence = self.router.sequence_for(request.kind, request.requester_role);
        Ok(self.machine.available_actions(request.kind, sequence, request.status))
    }

    async fn load_actor(&self, id: &ActorId) -> Result<Actor, WorkflowError> {
        self.directory.find_actor(id).await?.ok_or_else(|| WorkflowError::actor_not_found(id.as_str()))
    }

    async fn assign_approver(&self, request: &mut WorkflowRequest) -> Result<(), WorkflowError> {
        let routing =
            self.router.next_approver(&self.directory, request.status, &request.requester_id).await?;
        request.current_approver_id = routing.approver_id().cloned();
        request.current_approver_role = match &routing {
            Routing::Assigned(approver) => Some(approver.role),
            Routing::RolePool(role) => Some(*role),
            Routing::Unassigned => None,
        };
        if request.status.is_pending() && request.current_approver_id.is_none() {
            warn!(
                event_name = "workflow.routing.unassigned",
                request_id = %request.id,
                status = %request.status,
                required_role = request.status.required_role().map(|role: Role| role.as_str()),
                open_to_role = request.current_approver_role.is_some(),
                "no approver resolved"
            );
        }
        Ok(())
    }
}

fn next_request_id(kind: RequestKind) -> RequestId {
    let prefix = match kind {
        RequestKind::Manpower => "MPR",
        RequestKind::BusinessTrip => "BTR",
    };
    let token = Uuid::new_v4().simple().to_string();
    RequestId(format!("{prefix}-{}", &token[..12]))
}
