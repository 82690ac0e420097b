use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(EmployeeId);

/// One employee as materialized in an org-chart tree.
///
/// `children` is owned: a node is never shared between two parents. When
/// the same employee has to appear in a second place, the node is cloned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeNode {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "employee_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub employee_code: Option<String>,
    /// Count of all transitive reports, maintained incrementally.
    #[serde(default)]
    pub team_size: u32,
    #[serde(default)]
    pub children: Vec<EmployeeNode>,
}

impl EmployeeNode {
    /// A node with no reports.
    pub fn leaf(summary: &EmployeeSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name.clone(),
            title: summary.title.clone(),
            avatar: summary.avatar.clone(),
            email: summary.email.clone(),
            employee_code: summary.employee_code.clone(),
            team_size: 0,
            children: Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child_ids(&self) -> Vec<EmployeeId> {
        self.children.iter().map(|child| child.id).collect()
    }

    /// Depth-first search for `id`, including `self`.
    pub fn find(&self, id: EmployeeId) -> Option<&EmployeeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// True when some node of this tree lists `id` as a direct child.
    pub fn has_descendant(&self, id: EmployeeId) -> bool {
        self.children
            .iter()
            .any(|child| child.id == id || child.has_descendant(id))
    }

    /// Ids from `self` down to `target`, both ends included.
    pub fn path_to(&self, target: EmployeeId) -> Option<Vec<EmployeeId>> {
        if self.id == target {
            return Some(vec![self.id]);
        }
        self.children.iter().find_map(|child| {
            child.path_to(target).map(|mut tail| {
                tail.insert(0, self.id);
                tail
            })
        })
    }

    /// Rebuild the tree, replacing the node `id` (wherever it occurs) with
    /// the result of `update`. Untouched subtrees are cloned as-is.
    pub fn map_node<F>(&self, id: EmployeeId, update: &F) -> EmployeeNode
    where
        F: Fn(&EmployeeNode) -> EmployeeNode,
    {
        if self.id == id {
            return update(self);
        }
        EmployeeNode {
            children: self
                .children
                .iter()
                .map(|child| child.map_node(id, update))
                .collect(),
            ..self.summary_fields()
        }
    }

    fn summary_fields(&self) -> EmployeeNode {
        EmployeeNode {
            id: self.id,
            name: self.name.clone(),
            title: self.title.clone(),
            avatar: self.avatar.clone(),
            email: self.email.clone(),
            employee_code: self.employee_code.clone(),
            team_size: self.team_size,
            children: Vec::new(),
        }
    }

    pub fn summary(&self) -> EmployeeSummary {
        EmployeeSummary {
            id: self.id,
            name: self.name.clone(),
            title: self.title.clone(),
            avatar: self.avatar.clone(),
            email: self.email.clone(),
            employee_code: self.employee_code.clone(),
            reporting_manager_name: None,
        }
    }
}

/// Flat roster entry used by pickers and for fallback nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "employee_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub employee_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_manager_name: Option<String>,
}
