use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::actor::ActorId;
use crate::domain::approval::{ApprovalLogEntry, ApprovalLogId};
use crate::domain::request::RequestId;
use crate::workflow::ports::{StoreError, WorkflowTransaction};
use crate::workflow::states::TransitionOutcome;

/// Caller-side context attached to a transition: free-text note plus the
/// client address seen by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub comment: Option<String>,
    pub ip_address: Option<String>,
}

impl AuditContext {
    pub fn new(comment: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            comment: comment.filter(|text| !text.trim().is_empty()),
            ip_address: ip_address.filter(|ip| !ip.trim().is_empty()),
        }
    }
}

/// Writes the append-only approval log. Entries go through the transition's
/// own unit of work, so a failed append aborts the transition with it.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuditTrail;

impl AuditTrail {
    pub fn entry(
        &self,
        request_id: &RequestId,
        actor_id: &ActorId,
        outcome: &TransitionOutcome,
        context: &AuditContext,
        performed_at: DateTime<Utc>,
    ) -> ApprovalLogEntry {
        ApprovalLogEntry {
            id: ApprovalLogId(Uuid::new_v4().to_string()),
            request_id: request_id.clone(),
            actor_id: actor_id.clone(),
            action: outcome.action,
            step_name: outcome.step_name().to_string(),
            from_status: outcome.from,
            to_status: outcome.to,
            comment: context.comment.clone(),
            ip_address: context.ip_address.clone(),
            performed_at,
        }
    }

    pub async fn record<T>(
        &self,
        tx: &mut T,
        request_id: &RequestId,
        actor_id: &ActorId,
        outcome: &TransitionOutcome,
        context: &AuditContext,
        performed_at: DateTime<Utc>,
    ) -> Result<ApprovalLogEntry, StoreError>
    where
        T: WorkflowTransaction + ?Sized,
    {
        let entry = self.entry(request_id, actor_id, outcome, context, performed_at);
        tx.append_log_entry(&entry).await?;
        debug!(
            event_name = "workflow.audit.recorded",
            request_id = %entry.request_id,
            actor_id = %entry.actor_id,
            action = %entry.action,
            step_name = %entry.step_name,
            "approval log entry staged"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::{AuditContext, AuditTrail};
    use crate::domain::actor::ActorId;
    use crate::domain::request::RequestId;
    use crate::workflow::states::{Authority, TransitionOutcome, WorkflowAction, WorkflowStatus};

    #[test]
    fn entry_labels_the_step_being_exited() {
        let at: DateTime<Utc> = "2026-05-02T10:30:00Z".parse().expect("timestamp");
        let outcome = TransitionOutcome {
            from: WorkflowStatus::PendingHr,
            to: WorkflowStatus::Draft,
            action: WorkflowAction::RequestChange,
            authority: Authority::RequesterOrApprover,
        };
        let context =
            AuditContext::new(Some("Clarify budget".to_string()), Some("10.0.0.8".to_string()));

        let entry = AuditTrail.entry(
            &RequestId::new("MPR-1"),
            &ActorId::new("hr-1"),
            &outcome,
            &context,
            at,
        );

        assert_eq!(entry.step_name, "HR Review");
        assert_eq!(entry.action, WorkflowAction::RequestChange);
        assert_eq!(entry.from_status, WorkflowStatus::PendingHr);
        assert_eq!(entry.to_status, WorkflowStatus::Draft);
        assert_eq!(entry.comment.as_deref(), Some("Clarify budget"));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.8"));
        assert_eq!(entry.performed_at, at);
        assert!(!entry.id.0.is_empty());
    }

    #[test]
    fn blank_comment_and_ip_are_dropped() {
        let context = AuditContext::new(Some("   ".to_string()), Some(String::new()));
        assert_eq!(context, AuditContext::default());
    }
}
