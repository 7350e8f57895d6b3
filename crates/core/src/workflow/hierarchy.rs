use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::actor::{Actor, ActorId, Role};
use crate::workflow::ports::{ActorDirectory, StoreError};

pub const DEFAULT_MAX_HIERARCHY_DEPTH: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedApprover {
    pub actor_id: ActorId,
    pub role: Role,
}

impl From<&Actor> for ResolvedApprover {
    fn from(actor: &Actor) -> Self {
        Self { actor_id: actor.id.clone(), role: actor.role }
    }
}

/// Result of walking `reports_to` edges upward from a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HierarchyWalk {
    /// Ancestors nearest first; the walk reached an actor with no manager.
    Complete(Vec<Actor>),
    CycleDetected { at: ActorId },
    DepthExceeded { max_depth: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleLookup {
    Found(ResolvedApprover),
    /// The chain ended cleanly without an actor holding the role.
    NotInChain,
    /// Cycle or depth overrun. Callers must treat this as "no approver".
    Broken,
}

#[derive(Clone, Copy, Debug)]
pub struct HierarchyResolver {
    max_depth: usize,
}

impl Default for HierarchyResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HIERARCHY_DEPTH)
    }
}

impl HierarchyResolver {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth: max_depth.max(1) }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub async fn walk<D>(
        &self,
        directory: &D,
        user_id: &ActorId,
    ) -> Result<HierarchyWalk, StoreError>
    where
        D: ActorDirectory + ?Sized,
    {
        let mut visited = HashSet::from([user_id.clone()]);
        let mut ancestors = Vec::new();

        let mut next = match directory.find_actor(user_id).await? {
            Some(user) => user.reports_to,
            None => return Ok(HierarchyWalk::Complete(ancestors)),
        };

        while let Some(manager_id) = next {
            if !visited.insert(manager_id.clone()) {
                return Ok(HierarchyWalk::CycleDetected { at: manager_id });
            }
            if ancestors.len() >= self.max_depth {
                return Ok(HierarchyWalk::DepthExceeded { max_depth: self.max_depth });
            }

            let Some(manager) = directory.find_actor(&manager_id).await? else {
                // dangling edge: the chain ends here
                break;
            };
            next = manager.reports_to.clone();
            ancestors.push(manager);
        }

        Ok(HierarchyWalk::Complete(ancestors))
    }

    /// Chain of ancestors up to and including the first one holding an
    /// approval role. Empty when the chain ends without one or is broken.
    pub async fn resolve<D>(
        &self,
        directory: &D,
        user_id: &ActorId,
    ) -> Result<Vec<ResolvedApprover>, StoreError>
    where
        D: ActorDirectory + ?Sized,
    {
        let HierarchyWalk::Complete(ancestors) = self.walk(directory, user_id).await? else {
            return Ok(Vec::new());
        };

        let mut chain = Vec::new();
        for actor in &ancestors {
            chain.push(ResolvedApprover::from(actor));
            if actor.active && actor.role != Role::Employee {
                return Ok(chain);
            }
        }
        Ok(Vec::new())
    }

    pub async fn nearest_with_role<D>(
        &self,
        directory: &D,
        user_id: &ActorId,
        role: Role,
    ) -> Result<RoleLookup, StoreError>
    where
        D: ActorDirectory + ?Sized,
    {
        let lookup = match self.walk(directory, user_id).await? {
            HierarchyWalk::Complete(ancestors) => ancestors
                .iter()
                .find(|actor| actor.active && actor.role == role)
                .map(|actor| RoleLookup::Found(actor.into()))
                .unwrap_or(RoleLookup::NotInChain),
            HierarchyWalk::CycleDetected { .. } | HierarchyWalk::DepthExceeded { .. } => {
                RoleLookup::Broken
            }
        };
        Ok(lookup)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StaticDirectory;
    use super::{HierarchyResolver, HierarchyWalk, ResolvedApprover, RoleLookup};
    use crate::domain::actor::{Actor, ActorId, Role};

    fn org() -> StaticDirectory {
        StaticDirectory::with([
            Actor::new("emp-1", Role::Employee).reporting_to("lead-1"),
            Actor::new("lead-1", Role::Employee).reporting_to("mgr-1"),
            Actor::new("mgr-1", Role::Manager).reporting_to("ceo-1"),
            Actor::new("ceo-1", Role::Ceo),
            Actor::new("hr-1", Role::Hr).reporting_to("ceo-1"),
        ])
    }

    #[tokio::test]
    async fn resolve_stops_at_first_approval_role() {
        let chain = HierarchyResolver::default()
            .resolve(&org(), &ActorId::new("emp-1"))
            .await
            .expect("resolve");
        assert_eq!(
            chain,
            vec![
                ResolvedApprover { actor_id: ActorId::new("lead-1"), role: Role::Employee },
                ResolvedApprover { actor_id: ActorId::new("mgr-1"), role: Role::Manager },
            ]
        );
    }

    #[tokio::test]
    async fn root_actor_has_no_approver() {
        let resolver = HierarchyResolver::default();
        let chain = resolver.resolve(&org(), &ActorId::new("ceo-1")).await.expect("resolve");
        assert!(chain.is_empty());
        let lookup = resolver
            .nearest_with_role(&org(), &ActorId::new("ceo-1"), Role::Ceo)
            .await
            .expect("lookup");
        assert_eq!(lookup, RoleLookup::NotInChain);
    }

    #[tokio::test]
    async fn nearest_with_role_skips_inactive_actors() {
        let mut away = Actor::new("mgr-2", Role::Manager).reporting_to("mgr-1");
        away.active = false;
        let directory = StaticDirectory::with([
            Actor::new("emp-2", Role::Employee).reporting_to("mgr-2"),
            away,
            Actor::new("mgr-1", Role::Manager),
        ]);
        let lookup = HierarchyResolver::default()
            .nearest_with_role(&directory, &ActorId::new("emp-2"), Role::Manager)
            .await
            .expect("lookup");
        assert_eq!(
            lookup,
            RoleLookup::Found(ResolvedApprover {
                actor_id: ActorId::new("mgr-1"),
                role: Role::Manager
            })
        );
    }

    #[tokio::test]
    async fn cycles_fail_closed() {
        let directory = StaticDirectory::with([
            Actor::new("a", Role::Employee).reporting_to("b"),
            Actor::new("b", Role::Employee).reporting_to("c"),
            Actor::new("c", Role::Employee).reporting_to("a"),
        ]);
        let resolver = HierarchyResolver::default();
        let walk = resolver.walk(&directory, &ActorId::new("a")).await.expect("walk");
        assert_eq!(walk, HierarchyWalk::CycleDetected { at: ActorId::new("a") });
        assert!(resolver.resolve(&directory, &ActorId::new("a")).await.expect("ok").is_empty());
        let lookup = resolver
            .nearest_with_role(&directory, &ActorId::new("a"), Role::Manager)
            .await
            .expect("lookup");
        assert_eq!(lookup, RoleLookup::Broken);
    }

    #[tokio::test]
    async fn walk_is_bounded_by_max_depth() {
        let mut actors: Vec<Actor> = (0..10)
            .map(|level| {
                Actor::new(format!("n{level}"), Role::Employee)
                    .reporting_to(format!("n{}", level + 1))
            })
            .collect();
        actors.push(Actor::new("n10", Role::Manager));
        let directory = StaticDirectory::with(actors);

        let shallow = HierarchyResolver::new(3);
        let walk = shallow.walk(&directory, &ActorId::new("n0")).await.expect("walk");
        assert_eq!(walk, HierarchyWalk::DepthExceeded { max_depth: 3 });

        let deep = HierarchyResolver::new(32);
        let lookup = deep
            .nearest_with_role(&directory, &ActorId::new("n0"), Role::Manager)
            .await
            .expect("lookup");
        assert!(matches!(lookup, RoleLookup::Found(ref found) if found.actor_id.as_str() == "n10"));
    }

    #[tokio::test]
    async fn dangling_manager_edge_ends_the_chain() {
        let directory =
            StaticDirectory::with([Actor::new("emp-9", Role::Employee).reporting_to("ghost")]);
        let walk = HierarchyResolver::default()
            .walk(&directory, &ActorId::new("emp-9"))
            .await
            .expect("walk");
        assert_eq!(walk, HierarchyWalk::Complete(Vec::new()));
    }
}
