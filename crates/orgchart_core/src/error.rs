use shared::{domain::EmployeeId, error::BackendRejection};
use thiserror::Error;

pub const ASSIGN_FALLBACK_MESSAGE: &str = "Failed to assign employees";
pub const UNASSIGN_FALLBACK_MESSAGE: &str = "Failed to unassign employees";
pub const FETCH_FALLBACK_MESSAGE: &str = "Failed to fetch employee tree";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Every candidate of an assign batch is already placed in the tree.
    AllAlreadyAssigned,
    /// Unassign would remove nobody.
    NothingToRemove,
}

impl NoOpReason {
    pub fn user_message(self) -> &'static str {
        match self {
            NoOpReason::AllAlreadyAssigned => {
                "All selected employees are already assigned to a manager in the tree"
            }
            NoOpReason::NothingToRemove => "No employees selected for removal",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrgChartError {
    #[error("failed to fetch org chart: {0}")]
    Fetch(String),
    #[error("assignment rejected: {0}")]
    AssignRejected(String),
    #[error("unassignment rejected: {0}")]
    UnassignRejected(String),
    #[error("{}", .0.user_message())]
    NoOp(NoOpReason),
    #[error("manager {0} already has an edit in flight")]
    ManagerBusy(EmployeeId),
    #[error("employee {0} is not part of the loaded org chart")]
    UnknownEmployee(EmployeeId),
    #[error("no root employee selected")]
    NotLoaded,
}

impl OrgChartError {
    /// Text shown to the user in an alert.
    pub fn user_message(&self) -> String {
        match self {
            OrgChartError::Fetch(message)
            | OrgChartError::AssignRejected(message)
            | OrgChartError::UnassignRejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Server-provided message when `err` is a backend rejection that carried
/// one, otherwise `fallback`.
pub fn rejection_message(err: &anyhow::Error, fallback: &str) -> String {
    err.downcast_ref::<BackendRejection>()
        .map(|rejection| rejection.message.trim())
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}
