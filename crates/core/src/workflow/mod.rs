pub mod engine;
pub mod guard;
pub mod hierarchy;
pub mod machine;
pub mod ports;
pub mod router;
pub mod sequence;
pub mod states;

pub use engine::{TransitionCommand, TransitionReceipt, UpdateRequestInput, WorkflowEngine};
pub use guard::ConcurrencyGuard;
pub use hierarchy::{HierarchyResolver, HierarchyWalk, ResolvedApprover, RoleLookup};
pub use machine::{InvalidTransition, TransitionStateMachine};
pub use ports::{ActorDirectory, StoreError, WorkflowStore, WorkflowTransaction};
pub use router::{ApproverRouter, Routing};
pub use sequence::{ApprovalSequence, SequenceError, SequenceTable};
pub use states::{Authority, TransitionOutcome, WorkflowAction, WorkflowStatus};
