use thiserror::Error;

use crate::domain::actor::ActorId;
use crate::workflow::machine::InvalidTransition;
use crate::workflow::ports::StoreError;
use crate::workflow::states::{WorkflowAction, WorkflowStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Request,
    Actor,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Actor => "actor",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{} `{id}` not found", entity.as_str())]
    NotFound { entity: EntityKind, id: String },
    #[error("invalid transition from {status} using action {action}")]
    InvalidTransition { status: WorkflowStatus, action: WorkflowAction },
    #[error("version conflict: expected {expected}, current {actual}")]
    Conflict { expected: u32, actual: u32 },
    #[error("actor `{actor_id}` may not {action} this request")]
    Forbidden { actor_id: ActorId, action: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Conflict { .. } => "CONFLICT",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Only a version conflict is worth retrying, and only after a reload.
    pub fn is_retryable_after_reload(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn request_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { entity: EntityKind::Request, id: id.into() }
    }

    pub fn actor_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { entity: EntityKind::Actor, id: id.into() }
    }
}

impl From<InvalidTransition> for WorkflowError {
    fn from(value: InvalidTransition) -> Self {
        Self::InvalidTransition { status: value.status, action: value.action }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::VersionConflict { expected, actual, .. } => {
                Self::Conflict { expected, actual: actual.unwrap_or(expected) }
            }
            other @ (StoreError::Unavailable(_) | StoreError::Decode(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { code: &'static str, message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "This action is not allowed for the request in its current state.",
            Self::Forbidden { .. } => "You are not permitted to perform this action on the request.",
            Self::NotFound { .. } => "The request could not be found.",
            Self::Conflict { .. } => {
                "The request was changed by someone else. Refresh it and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. } => code,
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl WorkflowError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let code = self.code();
        let message = self.to_string();
        match self {
            Self::InvalidTransition { .. } | Self::Validation(_) => {
                InterfaceError::BadRequest { code, message, correlation_id }
            }
            Self::Forbidden { .. } => InterfaceError::Forbidden { message, correlation_id },
            Self::NotFound { .. } => InterfaceError::NotFound { message, correlation_id },
            Self::Conflict { .. } => InterfaceError::Conflict { message, correlation_id },
            Self::Internal(_) => InterfaceError::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::actor::ActorId;
    use crate::domain::request::RequestId;
    use crate::errors::{InterfaceError, WorkflowError};
    use crate::workflow::ports::StoreError;
    use crate::workflow::states::{WorkflowAction, WorkflowStatus};

    #[test]
    fn invalid_transition_maps_to_bad_request_with_code() {
        let interface = WorkflowError::InvalidTransition {
            status: WorkflowStatus::ApprovedOpen,
            action: WorkflowAction::Approve,
        }
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { code: "INVALID_TRANSITION", ref correlation_id, .. }
                if correlation_id == "req-1"
        ));
        assert_eq!(interface.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn store_version_conflict_surfaces_as_conflict() {
        let error = WorkflowError::from(StoreError::VersionConflict {
            request_id: RequestId::new("MPR-1"),
            expected: 3,
            actual: Some(4),
        });
        assert_eq!(error, WorkflowError::Conflict { expected: 3, actual: 4 });
        assert!(error.is_retryable_after_reload());

        let interface = error.into_interface("req-2");
        assert_eq!(
            interface.user_message(),
            "The request was changed by someone else. Refresh it and try again."
        );
    }

    #[test]
    fn store_outage_is_internal_and_terminal() {
        let error = WorkflowError::from(StoreError::Unavailable("database lock timeout".into()));
        assert_eq!(error.code(), "INTERNAL");
        assert!(!error.is_retryable_after_reload());
        assert!(matches!(error.into_interface("req-3"), InterfaceError::Internal { .. }));
    }

    #[test]
    fn forbidden_names_the_actor_and_action() {
        let error = WorkflowError::Forbidden {
            actor_id: ActorId::new("random-user"),
            action: "approve".to_string(),
        };
        assert_eq!(error.to_string(), "actor `random-user` may not approve this request");
        assert_eq!(error.into_interface("req-4").correlation_id(), "req-4");
    }
}
