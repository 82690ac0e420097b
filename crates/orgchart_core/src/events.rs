use shared::domain::EmployeeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentKind {
    Assign,
    Unassign,
}

/// Lifecycle of one assign/unassign action. There is no separate pending
/// phase: the tree already shows the new state once the action starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentPhase {
    OptimisticallyApplied,
    Confirmed,
    RolledBack,
}

#[derive(Debug, Clone)]
pub enum OrgChartEvent {
    ForestLoaded {
        roots: usize,
    },
    RosterLoaded {
        employees: usize,
    },
    RootChanged {
        root_id: EmployeeId,
        fallback: bool,
    },
    Assignment {
        kind: AssignmentKind,
        manager_id: EmployeeId,
        employee_ids: Vec<EmployeeId>,
        phase: AssignmentPhase,
    },
    TreeReloaded,
    /// Blocking, user-visible message.
    Alert(String),
}
