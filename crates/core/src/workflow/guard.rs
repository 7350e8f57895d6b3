use crate::domain::actor::Actor;
use crate::domain::request::WorkflowRequest;
use crate::errors::WorkflowError;
use crate::workflow::states::{Authority, WorkflowAction};

/// Version and permission gate in front of every mutation.
///
/// No lock is held: the request was read inside the caller's unit of work and
/// the write that follows is a compare-and-swap on the same version, so a
/// racing writer that slips in between still loses at commit.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConcurrencyGuard;

impl ConcurrencyGuard {
    pub fn check_and_lock(
        &self,
        request: &WorkflowRequest,
        expected_version: u32,
        actor: &Actor,
        action: WorkflowAction,
        authority: Authority,
    ) -> Result<(), WorkflowError> {
        self.check_version(request, expected_version)?;
        self.authorize(request, actor, action, authority)
    }

    pub fn check_version(
        &self,
        request: &WorkflowRequest,
        expected_version: u32,
    ) -> Result<(), WorkflowError> {
        if request.version != expected_version {
            return Err(WorkflowError::Conflict {
                expected: expected_version,
                actual: request.version,
            });
        }
        Ok(())
    }

    pub fn authorize(
        &self,
        request: &WorkflowRequest,
        actor: &Actor,
        action: WorkflowAction,
        authority: Authority,
    ) -> Result<(), WorkflowError> {
        let is_requester = request.is_owned_by(&actor.id);
        let allowed = actor.active
            && match authority {
                Authority::Requester => is_requester,
                Authority::CurrentApprover => is_current_approver(request, actor),
                Authority::RequesterOrApprover => {
                    is_requester || is_current_approver(request, actor)
                }
                Authority::RequesterOrRole(role) => is_requester || actor.role == role,
            };

        if allowed {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden {
                actor_id: actor.id.clone(),
                action: action.as_str().to_string(),
            })
        }
    }
}

fn is_current_approver(request: &WorkflowRequest, actor: &Actor) -> bool {
    match (&request.current_approver_id, request.current_approver_role) {
        (Some(approver_id), _) => approver_id == &actor.id,
        // open functional step: any holder of the role except the requester
        (None, Some(role)) => {
            role.is_functional()
                && request.status.required_role() == Some(role)
                && actor.role == role
                && !request.is_owned_by(&actor.id)
        }
        (None, None) => false,
    }
}
