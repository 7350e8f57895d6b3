use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::actor::{ActorId, Role};
use crate::workflow::states::WorkflowStatus;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Manpower,
    BusinessTrip,
}

impl RequestKind {
    pub const ALL: [RequestKind; 2] = [Self::Manpower, Self::BusinessTrip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manpower => "manpower",
            Self::BusinessTrip => "business_trip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manpower" => Some(Self::Manpower),
            "business_trip" => Some(Self::BusinessTrip),
            _ => None,
        }
    }

    /// Status a request of this kind lands on after its last approval step.
    pub fn approved_status(&self) -> WorkflowStatus {
        match self {
            Self::Manpower => WorkflowStatus::ApprovedOpen,
            Self::BusinessTrip => WorkflowStatus::Approved,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Permanent,
    Contract,
    Intern,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManpowerPayload {
    pub position_title: String,
    pub department: String,
    pub headcount: u32,
    pub employment_type: EmploymentType,
    pub justification: String,
    pub monthly_budget: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessTripPayload {
    pub destination: String,
    pub purpose: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub estimated_cost: Decimal,
}

/// Domain payload of a request. Opaque to the workflow; only read for snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPayload {
    Manpower(ManpowerPayload),
    BusinessTrip(BusinessTripPayload),
}

impl RequestPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Manpower(_) => RequestKind::Manpower,
            Self::BusinessTrip(_) => RequestKind::BusinessTrip,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Manpower(payload) => {
                if payload.position_title.trim().is_empty() {
                    return Err("position_title must not be empty".to_string());
                }
                if payload.headcount == 0 {
                    return Err("headcount must be greater than zero".to_string());
                }
                if payload.monthly_budget.is_sign_negative() {
                    return Err("monthly_budget must not be negative".to_string());
                }
            }
            Self::BusinessTrip(payload) => {
                if payload.destination.trim().is_empty() {
                    return Err("destination must not be empty".to_string());
                }
                if payload.return_date < payload.departure_date {
                    return Err("return_date must not precede departure_date".to_string());
                }
                if payload.estimated_cost.is_sign_negative() {
                    return Err("estimated_cost must not be negative".to_string());
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub requester_id: ActorId,
    pub requester_role: Role,
    pub status: WorkflowStatus,
    pub version: u32,
    pub revision_version: u32,
    pub current_approver_id: Option<ActorId>,
    pub current_approver_role: Option<Role>,
    pub payload: RequestPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRequest {
    pub fn is_owned_by(&self, actor_id: &ActorId) -> bool {
        &self.requester_id == actor_id
    }

    pub fn is_editable_by(&self, actor_id: &ActorId) -> bool {
        self.is_owned_by(actor_id) && self.status == WorkflowStatus::Draft
    }

    /// An assignee always carries the status's role. Without one, a role is
    /// only recorded for a functional step open to the role pool.
    pub fn approver_consistent(&self) -> bool {
        let required = self.status.required_role();
        match (&self.current_approver_id, self.current_approver_role) {
            (Some(_), role) => role.is_some() && role == required,
            (None, Some(role)) => role.is_functional() && Some(role) == required,
            (None, None) => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequestInput {
    pub payload: RequestPayload,
    #[serde(default)]
    pub save_as_draft: bool,
}
