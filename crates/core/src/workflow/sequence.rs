use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::actor::Role;
use crate::domain::request::RequestKind;
use crate::workflow::states::WorkflowStatus;

use WorkflowStatus::{PendingCeo, PendingFinance, PendingHr, PendingManager};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("approval sequence must contain at least one step")]
    Empty,
    #[error("`{0}` is not a pending approval status")]
    NotPending(WorkflowStatus),
    #[error("`{later}` cannot follow `{earlier}`: steps must follow canonical order without repeats")]
    OutOfOrder { earlier: WorkflowStatus, later: WorkflowStatus },
}

/// Ordered pending statuses a request passes through before terminal success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApprovalSequence(Vec<WorkflowStatus>);

impl ApprovalSequence {
    pub fn new(steps: Vec<WorkflowStatus>) -> Result<Self, SequenceError> {
        if steps.is_empty() {
            return Err(SequenceError::Empty);
        }

        let mut previous: Option<(WorkflowStatus, usize)> = None;
        for step in &steps {
            let rank = step.canonical_rank().ok_or(SequenceError::NotPending(*step))?;
            if let Some((earlier, earlier_rank)) = previous {
                if rank <= earlier_rank {
                    return Err(SequenceError::OutOfOrder { earlier, later: *step });
                }
            }
            previous = Some((*step, rank));
        }

        Ok(Self(steps))
    }

    pub fn canonical() -> Self {
        Self(WorkflowStatus::CANONICAL_SEQUENCE.to_vec())
    }

    pub fn steps(&self) -> &[WorkflowStatus] {
        &self.0
    }

    pub fn first(&self) -> WorkflowStatus {
        self.0[0]
    }

    pub fn contains(&self, status: WorkflowStatus) -> bool {
        self.0.contains(&status)
    }

    /// `None` when `status` is not part of this sequence, `Some(None)` when it
    /// is the last step.
    pub fn step_after(&self, status: WorkflowStatus) -> Option<Option<WorkflowStatus>> {
        let index = self.0.iter().position(|step| *step == status)?;
        Some(self.0.get(index + 1).copied())
    }
}

impl<'de> Deserialize<'de> for ApprovalSequence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let steps = Vec::<WorkflowStatus>::deserialize(deserializer)?;
        Self::new(steps).map_err(serde::de::Error::custom)
    }
}

/// Per request kind, per requester role approval sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceTable {
    manpower: [ApprovalSequence; 5],
    business_trip: [ApprovalSequence; 5],
}

impl SequenceTable {
    pub fn standard() -> Self {
        let seq = |steps: &[WorkflowStatus]| ApprovalSequence(steps.to_vec());
        Self {
            manpower: [
                seq(&[PendingManager, PendingHr, PendingFinance, PendingCeo]),
                seq(&[PendingHr, PendingFinance, PendingCeo]),
                seq(&[PendingHr, PendingFinance, PendingCeo]),
                seq(&[PendingHr, PendingCeo]),
                seq(&[PendingHr]),
            ],
            business_trip: [
                seq(&[PendingManager, PendingHr, PendingFinance, PendingCeo]),
                seq(&[PendingHr, PendingFinance, PendingCeo]),
                seq(&[PendingHr, PendingFinance, PendingCeo]),
                seq(&[PendingHr, PendingCeo]),
                seq(&[PendingHr, PendingFinance]),
            ],
        }
    }

    pub fn sequence_for(&self, kind: RequestKind, requester_role: Role) -> &ApprovalSequence {
        let row = match kind {
            RequestKind::Manpower => &self.manpower,
            RequestKind::BusinessTrip => &self.business_trip,
        };
        &row[requester_role as usize]
    }

    pub fn set(&mut self, kind: RequestKind, requester_role: Role, sequence: ApprovalSequence) {
        let row = match kind {
            RequestKind::Manpower => &mut self.manpower,
            RequestKind::BusinessTrip => &mut self.business_trip,
        };
        row[requester_role as usize] = sequence;
    }

    pub fn with_sequence(
        mut self,
        kind: RequestKind,
        requester_role: Role,
        sequence: ApprovalSequence,
    ) -> Self {
        self.set(kind, requester_role, sequence);
        self
    }
}

impl Default for SequenceTable {
    fn default() -> Self {
        Self::standard()
    }
}
