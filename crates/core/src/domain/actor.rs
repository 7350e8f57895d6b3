use serde::{Deserialize, Serialize};

use crate::workflow::states::WorkflowStatus;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Organisational rank of an actor. Ordering follows authority: a requester
/// holding a role at or above an approval step skips that step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Manager,
    Hr,
    Finance,
    Ceo,
}

impl Role {
    pub const ALL: [Role; 5] = [Self::Employee, Self::Manager, Self::Hr, Self::Finance, Self::Ceo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Hr => "hr",
            Self::Finance => "finance",
            Self::Ceo => "ceo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "employee" | "requester" | "staff" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "hr" => Some(Self::Hr),
            "finance" => Some(Self::Finance),
            "ceo" => Some(Self::Ceo),
            _ => None,
        }
    }

    /// The pending status this role is responsible for, if any.
    pub fn approval_status(&self) -> Option<WorkflowStatus> {
        match self {
            Self::Employee => None,
            Self::Manager => Some(WorkflowStatus::PendingManager),
            Self::Hr => Some(WorkflowStatus::PendingHr),
            Self::Finance => Some(WorkflowStatus::PendingFinance),
            Self::Ceo => Some(WorkflowStatus::PendingCeo),
        }
    }

    /// Functional roles are staffed centrally rather than along the reporting
    /// line, so approver lookup may fall back to the role pool.
    pub fn is_functional(&self) -> bool {
        matches!(self, Self::Hr | Self::Finance | Self::Ceo)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub display_name: String,
    pub role: Role,
    pub reports_to: Option<ActorId>,
    pub active: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        let id = id.into();
        Self { display_name: id.clone(), id: ActorId(id), role, reports_to: None, active: true }
    }

    pub fn reporting_to(mut self, manager: impl Into<String>) -> Self {
        self.reports_to = Some(ActorId(manager.into()));
        self
    }

    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::Role;
    use crate::workflow::states::WorkflowStatus;

    #[test]
    fn role_round_trips_from_storage_encoding() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("REQUESTER"), Some(Role::Employee));
        assert_eq!(Role::parse("intern"), None);
    }

    #[test]
    fn every_approving_role_owns_exactly_one_pending_status() {
        assert_eq!(Role::Employee.approval_status(), None);
        assert_eq!(Role::Manager.approval_status(), Some(WorkflowStatus::PendingManager));
        assert_eq!(Role::Ceo.approval_status(), Some(WorkflowStatus::PendingCeo));
        for role in Role::ALL.into_iter().filter(|role| *role != Role::Employee) {
            let status = role.approval_status().expect("approving role");
            assert_eq!(status.required_role(), Some(role));
        }
    }

    #[test]
    fn rank_ordering_follows_authority() {
        assert!(Role::Employee < Role::Manager);
        assert!(Role::Manager < Role::Hr);
        assert!(Role::Finance < Role::Ceo);
    }
}
