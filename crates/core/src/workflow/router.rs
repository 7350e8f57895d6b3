use crate::domain::actor::{ActorId, Role};
use crate::domain::request::RequestKind;
use crate::workflow::hierarchy::{HierarchyResolver, ResolvedApprover, RoleLookup};
use crate::workflow::ports::{ActorDirectory, StoreError};
use crate::workflow::sequence::{ApprovalSequence, SequenceTable};
use crate::workflow::states::WorkflowStatus;

/// Who may act on a pending step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routing {
    Assigned(ResolvedApprover),
    /// Functional step with nobody resolvable right now. Any active holder of
    /// the role other than the requester may act.
    RolePool(Role),
    /// Not pending, or the reporting line is broken or has no holder of the
    /// role. Nobody may act as approver.
    Unassigned,
}

impl Routing {
    pub fn approver_id(&self) -> Option<&ActorId> {
        match self {
            Self::Assigned(approver) => Some(&approver.actor_id),
            Self::RolePool(_) | Self::Unassigned => None,
        }
    }
}

/// Decides where a request enters its chain, which steps a requester skips,
/// and who must act next.
#[derive(Clone, Debug, Default)]
pub struct ApproverRouter {
    sequences: SequenceTable,
    resolver: HierarchyResolver,
}

impl ApproverRouter {
    pub fn new(sequences: SequenceTable, resolver: HierarchyResolver) -> Self {
        Self { sequences, resolver }
    }

    pub fn resolver(&self) -> &HierarchyResolver {
        &self.resolver
    }

    pub fn sequence_for(&self, kind: RequestKind, requester_role: Role) -> &ApprovalSequence {
        self.sequences.sequence_for(kind, requester_role)
    }

    pub fn initial_status(&self, kind: RequestKind, requester_role: Role) -> WorkflowStatus {
        self.sequence_for(kind, requester_role).first()
    }

    /// True when `status` is a pending step the requester's rank omits.
    pub fn skips(&self, kind: RequestKind, requester_role: Role, status: WorkflowStatus) -> bool {
        status.is_pending() && !self.sequence_for(kind, requester_role).contains(status)
    }

    /// Who must act on `status`. A broken reporting line always fails closed;
    /// only functional steps may widen to the role pool.
    pub async fn next_approver<D>(
        &self,
        directory: &D,
        status: WorkflowStatus,
        requester_id: &ActorId,
    ) -> Result<Routing, StoreError>
    where
        D: ActorDirectory + ?Sized,
    {
        let Some(role) = status.required_role() else {
            return Ok(Routing::Unassigned);
        };

        match self.resolver.nearest_with_role(directory, requester_id, role).await? {
            RoleLookup::Found(approver) => Ok(Routing::Assigned(approver)),
            RoleLookup::Broken => Ok(Routing::Unassigned),
            RoleLookup::NotInChain if role.is_functional() => {
                let pool = directory.list_by_role(role).await?;
                Ok(pool
                    .iter()
                    .filter(|actor| &actor.id != requester_id)
                    .min_by(|left, right| left.id.cmp(&right.id))
                    .map(|actor| Routing::Assigned(actor.into()))
                    .unwrap_or(Routing::RolePool(role)))
            }
            RoleLookup::NotInChain => Ok(Routing::Unassigned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApproverRouter, Routing};
    use crate::domain::actor::{Actor, ActorId, Role};
    use crate::workflow::hierarchy::ResolvedApprover;
    use crate::domain::request::RequestKind;
    use crate::workflow::hierarchy::test_support::StaticDirectory;
    use crate::workflow::states::WorkflowStatus;

    fn org() -> StaticDirectory {
        StaticDirectory::with([
            Actor::new("emp-1", Role::Employee).reporting_to("mgr-1"),
            Actor::new("mgr-1", Role::Manager).reporting_to("ceo-1"),
            Actor::new("hr-2", Role::Hr).reporting_to("ceo-1"),
            Actor::new("hr-1", Role::Hr).reporting_to("ceo-1"),
            Actor::new("fin-1", Role::Finance).reporting_to("ceo-1"),
            Actor::new("ceo-1", Role::Ceo),
        ])
    }

    fn assigned(routing: Routing) -> ResolvedApprover {
        match routing {
            Routing::Assigned(approver) => approver,
            other => panic!("expected an assigned approver, got {other:?}"),
        }
    }

    #[test]
    fn initial_status_skips_steps_the_requester_outranks() {
        let router = ApproverRouter::default();
        assert_eq!(
            router.initial_status(RequestKind::Manpower, Role::Employee),
            WorkflowStatus::PendingManager
        );
        assert_eq!(
            router.initial_status(RequestKind::Manpower, Role::Manager),
            WorkflowStatus::PendingHr
        );
        assert_eq!(router.initial_status(RequestKind::Manpower, Role::Hr), WorkflowStatus::PendingHr);
        assert_eq!(
            router.initial_status(RequestKind::BusinessTrip, Role::Ceo),
            WorkflowStatus::PendingHr
        );
        assert!(router.skips(RequestKind::Manpower, Role::Manager, WorkflowStatus::PendingManager));
        assert!(router.skips(RequestKind::BusinessTrip, Role::Ceo, WorkflowStatus::PendingCeo));
        assert!(!router.skips(RequestKind::Manpower, Role::Employee, WorkflowStatus::PendingCeo));
        assert!(!router.skips(RequestKind::Manpower, Role::Employee, WorkflowStatus::Draft));
    }

    #[tokio::test]
    async fn manager_step_resolves_along_the_reporting_line() {
        let approver = assigned(
            ApproverRouter::default()
                .next_approver(&org(), WorkflowStatus::PendingManager, &ActorId::new("emp-1"))
                .await
                .expect("route"),
        );
        assert_eq!(approver.actor_id, ActorId::new("mgr-1"));
        assert_eq!(approver.role, Role::Manager);
    }

    #[tokio::test]
    async fn functional_steps_fall_back_to_the_role_pool() {
        let router = ApproverRouter::default();
        let hr = assigned(
            router
                .next_approver(&org(), WorkflowStatus::PendingHr, &ActorId::new("emp-1"))
                .await
                .expect("route"),
        );
        assert_eq!(hr.actor_id, ActorId::new("hr-1"));

        let ceo = assigned(
            router
                .next_approver(&org(), WorkflowStatus::PendingCeo, &ActorId::new("emp-1"))
                .await
                .expect("route"),
        );
        assert_eq!(ceo.actor_id, ActorId::new("ceo-1"));
    }

    #[tokio::test]
    async fn requester_is_never_routed_to_themselves() {
        let hr = assigned(
            ApproverRouter::default()
                .next_approver(&org(), WorkflowStatus::PendingHr, &ActorId::new("hr-1"))
                .await
                .expect("route"),
        );
        assert_eq!(hr.actor_id, ActorId::new("hr-2"));
    }

    #[tokio::test]
    async fn top_of_hierarchy_gets_no_manager() {
        let router = ApproverRouter::default();
        let approver = router
            .next_approver(&org(), WorkflowStatus::PendingManager, &ActorId::new("ceo-1"))
            .await
            .expect("route");
        assert_eq!(approver, Routing::Unassigned);
        let terminal = router
            .next_approver(&org(), WorkflowStatus::Approved, &ActorId::new("emp-1"))
            .await
            .expect("route");
        assert_eq!(terminal, Routing::Unassigned);
    }

    #[tokio::test]
    async fn broken_hierarchy_routes_nobody() {
        let directory = StaticDirectory::with([
            Actor::new("a", Role::Employee).reporting_to("b"),
            Actor::new("b", Role::Employee).reporting_to("a"),
            Actor::new("hr-1", Role::Hr),
        ]);
        let approver = ApproverRouter::default()
            .next_approver(&directory, WorkflowStatus::PendingHr, &ActorId::new("a"))
            .await
            .expect("route");
        assert_eq!(approver, Routing::Unassigned);
    }

    #[tokio::test]
    async fn functional_step_without_other_holders_opens_to_the_role() {
        let directory = StaticDirectory::with([
            Actor::new("hr-1", Role::Hr),
            Actor::new("ceo-1", Role::Ceo),
        ]);
        let routing = ApproverRouter::default()
            .next_approver(&directory, WorkflowStatus::PendingHr, &ActorId::new("hr-1"))
            .await
            .expect("route");
        assert_eq!(routing, Routing::RolePool(Role::Hr));
        assert_eq!(routing.approver_id(), None);
    }
}
