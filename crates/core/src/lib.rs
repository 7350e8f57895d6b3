pub mod archive;
pub mod audit;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use archive::VersionArchiver;
pub use audit::{AuditContext, AuditTrail};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::actor::{Actor, ActorId, Role};
pub use domain::approval::{ApprovalLogEntry, ApprovalLogId};
pub use domain::request::{
    BusinessTripPayload, CreateRequestInput, EmploymentType, ManpowerPayload, RequestId,
    RequestKind, RequestPayload, WorkflowRequest,
};
pub use domain::revision::{RequestVersionSnapshot, SnapshotData, SnapshotId};
pub use errors::{EntityKind, InterfaceError, WorkflowError};
pub use workflow::{
    ActorDirectory, ApprovalSequence, ApproverRouter, Authority, ConcurrencyGuard,
    HierarchyResolver, InvalidTransition, SequenceTable, StoreError, TransitionCommand,
    TransitionOutcome, TransitionReceipt, TransitionStateMachine, UpdateRequestInput,
    WorkflowAction, WorkflowEngine, WorkflowStatus, WorkflowStore, WorkflowTransaction,
};
