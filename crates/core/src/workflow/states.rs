use serde::{Deserialize, Serialize};

use crate::domain::actor::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    PendingManager,
    PendingHr,
    PendingFinance,
    PendingCeo,
    ApprovedOpen,
    Approved,
    HiringInProgress,
    Rejected,
    Cancelled,
    Archived,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 11] = [
        Self::Draft,
        Self::PendingManager,
        Self::PendingHr,
        Self::PendingFinance,
        Self::PendingCeo,
        Self::ApprovedOpen,
        Self::Approved,
        Self::HiringInProgress,
        Self::Rejected,
        Self::Cancelled,
        Self::Archived,
    ];

    /// Pending statuses in canonical (lowest rank first) order.
    pub const CANONICAL_SEQUENCE: [WorkflowStatus; 4] =
        [Self::PendingManager, Self::PendingHr, Self::PendingFinance, Self::PendingCeo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingManager => "pending_manager",
            Self::PendingHr => "pending_hr",
            Self::PendingFinance => "pending_finance",
            Self::PendingCeo => "pending_ceo",
            Self::ApprovedOpen => "approved_open",
            Self::Approved => "approved",
            Self::HiringInProgress => "hiring_in_progress",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending_manager" => Some(Self::PendingManager),
            "pending_hr" => Some(Self::PendingHr),
            "pending_finance" => Some(Self::PendingFinance),
            "pending_ceo" => Some(Self::PendingCeo),
            "approved_open" => Some(Self::ApprovedOpen),
            "approved" => Some(Self::Approved),
            "hiring_in_progress" => Some(Self::HiringInProgress),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Human label recorded as the step name when a transition exits this status.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PendingManager => "Manager Approval",
            Self::PendingHr => "HR Review",
            Self::PendingFinance => "Finance Review",
            Self::PendingCeo => "CEO Approval",
            Self::ApprovedOpen => "Approved (Open)",
            Self::Approved => "Approved",
            Self::HiringInProgress => "Hiring In Progress",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::Archived => "Archived",
        }
    }

    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::PendingManager => Some(Role::Manager),
            Self::PendingHr => Some(Role::Hr),
            Self::PendingFinance => Some(Role::Finance),
            Self::PendingCeo => Some(Role::Ceo),
            Self::Draft
            | Self::ApprovedOpen
            | Self::Approved
            | Self::HiringInProgress
            | Self::Rejected
            | Self::Cancelled
            | Self::Archived => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.required_role().is_some()
    }

    pub fn canonical_rank(&self) -> Option<usize> {
        Self::CANONICAL_SEQUENCE.iter().position(|status| status == self)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    Approve,
    Reject,
    RequestChange,
    Hold,
    Cancel,
    Archive,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 7] = [
        Self::Submit,
        Self::Approve,
        Self::Reject,
        Self::RequestChange,
        Self::Hold,
        Self::Cancel,
        Self::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequestChange => "request_change",
            Self::Hold => "hold",
            Self::Cancel => "cancel",
            Self::Archive => "archive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submit" => Some(Self::Submit),
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "request_change" => Some(Self::RequestChange),
            "hold" => Some(Self::Hold),
            "cancel" => Some(Self::Cancel),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may perform a given legal move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    CurrentApprover,
    Requester,
    RequesterOrApprover,
    RequesterOrRole(Role),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
    pub action: WorkflowAction,
    pub authority: Authority,
}

impl TransitionOutcome {
    pub fn step_name(&self) -> &'static str {
        self.from.step_name()
    }

    /// Re-entering the editable status from anywhere else starts a new revision.
    pub fn starts_revision(&self) -> bool {
        self.to == WorkflowStatus::Draft && self.from != WorkflowStatus::Draft
    }
}
