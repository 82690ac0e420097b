use serde::{Deserialize, Serialize};

use crate::domain::{EmployeeId, EmployeeNode, EmployeeSummary};

pub const TREE_ROUTE: &str = "/api/employee-tree";
pub const ROSTER_ROUTE: &str = "/api/employee-tree/employees";
pub const SUBTREE_ROUTE_PREFIX: &str = "/api/employee-tree/employee";
pub const ASSIGN_ROUTE: &str = "/api/employee-tree/assign";
pub const UNASSIGN_ROUTE: &str = "/api/employee-tree/unassign";

/// `GET /api/employee-tree`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForestResponse {
    pub success: bool,
    #[serde(default)]
    pub tree: Vec<EmployeeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/employee-tree/employees`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterResponse {
    pub success: bool,
    #[serde(default)]
    pub employees: Vec<EmployeeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/employee-tree/employee/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtreeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<EmployeeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EmployeeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<SubtreeDebug>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeDebug {
    #[serde(default)]
    pub direct_reports: usize,
    #[serde(default)]
    pub total_reports: usize,
    #[serde(default)]
    pub depth: usize,
}

/// Body of both `assign` and `unassign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub manager_id: EmployeeId,
    pub employee_ids: Vec<EmployeeId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

pub fn subtree_route(id: EmployeeId) -> String {
    format!("{SUBTREE_ROUTE_PREFIX}/{}", id.0)
}
