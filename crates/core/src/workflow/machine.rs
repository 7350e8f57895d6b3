use thiserror::Error;

use crate::domain::actor::Role;
use crate::domain::request::RequestKind;
use crate::workflow::sequence::ApprovalSequence;
use crate::workflow::states::{Authority, TransitionOutcome, WorkflowAction, WorkflowStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid transition from {status} using action {action}")]
pub struct InvalidTransition {
    pub status: WorkflowStatus,
    pub action: WorkflowAction,
}

/// Legal `(status, action) -> status` moves for one request, given the
/// approval sequence derived from its kind and the requester's rank.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransitionStateMachine;

impl TransitionStateMachine {
    pub fn transition(
        &self,
        kind: RequestKind,
        sequence: &ApprovalSequence,
        status: WorkflowStatus,
        action: WorkflowAction,
    ) -> Result<TransitionOutcome, InvalidTransition> {
        let (to, authority) = next_status(kind, sequence, status, action)
            .ok_or(InvalidTransition { status, action })?;
        Ok(TransitionOutcome { from: status, to, action, authority })
    }

    /// Every action accepted from `status`, in declaration order.
    pub fn available_actions(
        &self,
        kind: RequestKind,
        sequence: &ApprovalSequence,
        status: WorkflowStatus,
    ) -> Vec<WorkflowAction> {
        WorkflowAction::ALL
            .into_iter()
            .filter(|action| next_status(kind, sequence, status, *action).is_some())
            .collect()
    }
}

fn next_status(
    kind: RequestKind,
    sequence: &ApprovalSequence,
    status: WorkflowStatus,
    action: WorkflowAction,
) -> Option<(WorkflowStatus, Authority)> {
    use WorkflowAction::{Approve, Archive, Cancel, Hold, Reject, RequestChange, Submit};
    use WorkflowStatus::{
        Approved, ApprovedOpen, Archived, Cancelled, Draft, HiringInProgress, PendingCeo,
        PendingFinance, PendingHr, PendingManager, Rejected,
    };

    match status {
        Draft => match action {
            Submit => Some((sequence.first(), Authority::Requester)),
            Cancel => Some((Cancelled, Authority::Requester)),
            Approve | Reject | RequestChange | Hold | Archive => None,
        },
        PendingManager | PendingHr | PendingFinance | PendingCeo => {
            // a pending status outside the requester's sequence has no outgoing edges
            let after = sequence.step_after(status)?;
            match action {
                Approve => {
                    let to = after.unwrap_or_else(|| kind.approved_status());
                    Some((to, Authority::CurrentApprover))
                }
                Reject => Some((Rejected, Authority::CurrentApprover)),
                RequestChange => Some((Draft, Authority::RequesterOrApprover)),
                Hold if status == PendingHr => Some((PendingHr, Authority::CurrentApprover)),
                Cancel if status == sequence.first() => Some((Cancelled, Authority::Requester)),
                Submit | Hold | Cancel | Archive => None,
            }
        }
        ApprovedOpen => match action {
            Submit if kind == RequestKind::Manpower => {
                Some((HiringInProgress, Authority::RequesterOrRole(Role::Hr)))
            }
            Archive => Some((Archived, Authority::RequesterOrRole(Role::Hr))),
            Submit | Approve | Reject | RequestChange | Hold | Cancel => None,
        },
        Approved | HiringInProgress | Rejected | Cancelled => match action {
            Archive => Some((Archived, Authority::RequesterOrRole(Role::Hr))),
            Submit | Approve | Reject | RequestChange | Hold | Cancel => None,
        },
        Archived => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidTransition, TransitionStateMachine};
    use crate::domain::actor::Role;
    use crate::domain::request::RequestKind;
    use crate::workflow::sequence::{ApprovalSequence, SequenceTable};
    use crate::workflow::states::{Authority, WorkflowAction, WorkflowStatus};

    use WorkflowAction::{Approve, Archive, Cancel, Hold, Reject, RequestChange, Submit};
    use WorkflowStatus::{
        Approved, ApprovedOpen, Archived, Cancelled, Draft, HiringInProgress, PendingCeo,
        PendingFinance, PendingHr, PendingManager, Rejected,
    };

    fn sequence(kind: RequestKind, role: Role) -> ApprovalSequence {
        SequenceTable::standard().sequence_for(kind, role).clone()
    }

    fn to(
        kind: RequestKind,
        role: Role,
        status: WorkflowStatus,
        action: WorkflowAction,
    ) -> WorkflowStatus {
        TransitionStateMachine
            .transition(kind, &sequence(kind, role), status, action)
            .unwrap_or_else(|error| panic!("{error}"))
            .to
    }

    #[test]
    fn employee_manpower_request_walks_the_full_chain() {
        let kind = RequestKind::Manpower;
        let mut status = to(kind, Role::Employee, Draft, Submit);
        assert_eq!(status, PendingManager);
        for expected in [PendingHr, PendingFinance, PendingCeo, ApprovedOpen] {
            status = to(kind, Role::Employee, status, Approve);
            assert_eq!(status, expected);
        }
        assert_eq!(to(kind, Role::Employee, ApprovedOpen, Submit), HiringInProgress);
    }

    #[test]
    fn same_approve_lands_differently_per_requester_rank() {
        let kind = RequestKind::BusinessTrip;
        assert_eq!(to(kind, Role::Employee, PendingFinance, Approve), PendingCeo);
        assert_eq!(to(kind, Role::Ceo, PendingFinance, Approve), Approved);
        assert_eq!(to(kind, Role::Ceo, Draft, Submit), PendingHr);
    }

    #[test]
    fn rejection_and_send_back_are_available_from_every_pending_step() {
        for status in [PendingManager, PendingHr, PendingFinance, PendingCeo] {
            assert_eq!(to(RequestKind::Manpower, Role::Employee, status, Reject), Rejected);
            assert_eq!(to(RequestKind::Manpower, Role::Employee, status, RequestChange), Draft);
        }
    }

    #[test]
    fn hold_is_a_self_loop_only_at_hr() {
        assert_eq!(to(RequestKind::Manpower, Role::Employee, PendingHr, Hold), PendingHr);
        let machine = TransitionStateMachine;
        let seq = sequence(RequestKind::Manpower, Role::Employee);
        assert!(machine.transition(RequestKind::Manpower, &seq, PendingFinance, Hold).is_err());
    }

    #[test]
    fn cancel_is_limited_to_draft_and_the_first_step() {
        let machine = TransitionStateMachine;
        let employee = sequence(RequestKind::Manpower, Role::Employee);
        let outcome = machine
            .transition(RequestKind::Manpower, &employee, PendingManager, Cancel)
            .expect("cancel at first step");
        assert_eq!(outcome.to, Cancelled);
        assert_eq!(outcome.authority, Authority::Requester);
        assert!(machine.transition(RequestKind::Manpower, &employee, PendingHr, Cancel).is_err());

        let manager = sequence(RequestKind::Manpower, Role::Manager);
        assert!(machine.transition(RequestKind::Manpower, &manager, PendingHr, Cancel).is_ok());
    }

    #[test]
    fn steps_outside_the_requester_sequence_have_no_edges() {
        let machine = TransitionStateMachine;
        let ceo_trip = sequence(RequestKind::BusinessTrip, Role::Ceo);
        assert!(machine
            .available_actions(RequestKind::BusinessTrip, &ceo_trip, PendingCeo)
            .is_empty());
        assert!(machine
            .available_actions(RequestKind::BusinessTrip, &ceo_trip, PendingManager)
            .is_empty());
    }

    #[test]
    fn terminal_statuses_only_archive() {
        let machine = TransitionStateMachine;
        let seq = sequence(RequestKind::Manpower, Role::Employee);
        for status in [Approved, HiringInProgress, Rejected, Cancelled] {
            assert_eq!(
                machine.available_actions(RequestKind::Manpower, &seq, status),
                vec![Archive]
            );
        }
        assert_eq!(
            machine.available_actions(RequestKind::Manpower, &seq, ApprovedOpen),
            vec![Submit, Archive]
        );
        assert!(machine.available_actions(RequestKind::Manpower, &seq, Archived).is_empty());
    }

    #[test]
    fn hiring_extension_is_manpower_only() {
        let machine = TransitionStateMachine;
        let seq = sequence(RequestKind::BusinessTrip, Role::Employee);
        let error = machine
            .transition(RequestKind::BusinessTrip, &seq, ApprovedOpen, Submit)
            .expect_err("trips never start hiring");
        assert_eq!(error, InvalidTransition { status: ApprovedOpen, action: Submit });
    }

    #[test]
    fn approve_from_approved_open_is_invalid() {
        let machine = TransitionStateMachine;
        let seq = sequence(RequestKind::Manpower, Role::Employee);
        let error = machine
            .transition(RequestKind::Manpower, &seq, ApprovedOpen, Approve)
            .expect_err("terminal success has no approve edge");
        assert_eq!(error.status, ApprovedOpen);
        assert_eq!(error.action, Approve);
    }

    #[test]
    fn only_send_back_starts_a_revision() {
        let machine = TransitionStateMachine;
        let seq = sequence(RequestKind::Manpower, Role::Employee);
        let send_back =
            machine.transition(RequestKind::Manpower, &seq, PendingHr, RequestChange).expect("ok");
        assert!(send_back.starts_revision());
        assert_eq!(send_back.step_name(), "HR Review");
        let submit = machine.transition(RequestKind::Manpower, &seq, Draft, Submit).expect("ok");
        assert!(!submit.starts_revision());
    }

    fn standard_steps(kind: RequestKind, role: Role) -> &'static [WorkflowStatus] {
        match (kind, role) {
            (_, Role::Employee) => &[PendingManager, PendingHr, PendingFinance, PendingCeo],
            (_, Role::Manager | Role::Hr) => &[PendingHr, PendingFinance, PendingCeo],
            (_, Role::Finance) => &[PendingHr, PendingCeo],
            (RequestKind::Manpower, Role::Ceo) => &[PendingHr],
            (RequestKind::BusinessTrip, Role::Ceo) => &[PendingHr, PendingFinance],
        }
    }

    /// The transition table written out longhand from the approval matrix.
    fn expected_edge(
        kind: RequestKind,
        role: Role,
        status: WorkflowStatus,
        action: WorkflowAction,
    ) -> Option<WorkflowStatus> {
        let steps = standard_steps(kind, role);
        let success = match kind {
            RequestKind::Manpower => ApprovedOpen,
            RequestKind::BusinessTrip => Approved,
        };
        if let Some(at) = steps.iter().position(|step| *step == status) {
            return match action {
                Approve => Some(steps.get(at + 1).copied().unwrap_or(success)),
                Reject => Some(Rejected),
                RequestChange => Some(Draft),
                Hold => (status == PendingHr).then_some(PendingHr),
                Cancel => (at == 0).then_some(Cancelled),
                Submit | Archive => None,
            };
        }
        match (status, action) {
            (Draft, Submit) => Some(steps[0]),
            (Draft, Cancel) => Some(Cancelled),
            (ApprovedOpen, Submit) if kind == RequestKind::Manpower => Some(HiringInProgress),
            (Approved | ApprovedOpen | HiringInProgress | Rejected | Cancelled, Archive) => {
                Some(Archived)
            }
            _ => None,
        }
    }

    #[test]
    fn every_pair_outside_the_table_is_an_invalid_transition() {
        let machine = TransitionStateMachine;
        let mut legal = 0;
        for kind in RequestKind::ALL {
            for role in Role::ALL {
                let seq = sequence(kind, role);
                for status in WorkflowStatus::ALL {
                    for action in WorkflowAction::ALL {
                        let actual = machine.transition(kind, &seq, status, action);
                        match expected_edge(kind, role, status, action) {
                            Some(expected) => {
                                legal += 1;
                                let outcome = actual.unwrap_or_else(|error| {
                                    panic!("{kind:?}/{role:?}: {error}")
                                });
                                assert_eq!(
                                    outcome.to, expected,
                                    "{kind:?}/{role:?}: {status} + {action}"
                                );
                            }
                            None => assert_eq!(
                                actual.map(|outcome| outcome.to),
                                Err(InvalidTransition { status, action }),
                                "{kind:?}/{role:?}: {status} + {action} should be refused"
                            ),
                        }
                    }
                }
            }
        }
        assert!(legal > 0);
    }
}
