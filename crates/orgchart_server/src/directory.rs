use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use shared::{
    domain::{EmployeeId, EmployeeNode, EmployeeSummary},
    error::ErrorCode,
    protocol::SubtreeDebug,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Employee {0} not found")]
    NotFound(EmployeeId),
    #[error("No employees selected")]
    EmptySelection,
    #[error("{name} cannot report to themselves")]
    SelfAssignment { name: String },
    #[error("{name} already has a manager")]
    AlreadyAssigned { name: String },
    #[error("Assigning {name} under {manager} would create a cycle")]
    Cycle { name: String, manager: String },
    #[error("{name} is not a direct report of {manager}")]
    NotDirectReport { name: String, manager: String },
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
}

impl DirectoryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DirectoryError::NotFound(_) => ErrorCode::NotFound,
            DirectoryError::AlreadyAssigned { .. } | DirectoryError::Cycle { .. } => {
                ErrorCode::Conflict
            }
            DirectoryError::EmptySelection
            | DirectoryError::SelfAssignment { .. }
            | DirectoryError::NotDirectReport { .. }
            | DirectoryError::InvalidSeed(_) => ErrorCode::Validation,
        }
    }
}

/// One employee as listed in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEmployee {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "employee_id")]
    pub employee_code: Option<String>,
    #[serde(default)]
    pub manager_id: Option<EmployeeId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Seed {
    pub employees: Vec<SeedEmployee>,
}

#[derive(Debug, Clone)]
struct Record {
    summary: EmployeeSummary,
    manager_id: Option<EmployeeId>,
    /// Assignment order; children are listed by it.
    position: u64,
}

/// In-memory organization of record. Every employee has at most one
/// manager and the manager relation has no cycles.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    records: BTreeMap<EmployeeId, Record>,
    next_position: u64,
}

impl Directory {
    pub fn from_seed(seed: Seed) -> Result<Self, DirectoryError> {
        let mut directory = Directory::default();
        for employee in &seed.employees {
            if directory.records.contains_key(&employee.id) {
                return Err(DirectoryError::InvalidSeed(format!(
                    "duplicate employee id {}",
                    employee.id
                )));
            }
            let position = directory.bump_position();
            directory.records.insert(
                employee.id,
                Record {
                    summary: EmployeeSummary {
                        id: employee.id,
                        name: employee.name.clone(),
                        title: employee.title.clone(),
                        avatar: employee.avatar.clone(),
                        email: employee.email.clone(),
                        employee_code: employee.employee_code.clone(),
                        reporting_manager_name: None,
                    },
                    manager_id: None,
                    position,
                },
            );
        }

        for employee in &seed.employees {
            let Some(manager_id) = employee.manager_id else {
                continue;
            };
            if !directory.records.contains_key(&manager_id) {
                return Err(DirectoryError::InvalidSeed(format!(
                    "employee {} reports to unknown manager {manager_id}",
                    employee.id
                )));
            }
            if manager_id == employee.id || directory.chain_of(manager_id).contains(&employee.id) {
                return Err(DirectoryError::InvalidSeed(format!(
                    "manager chain of employee {} is cyclic",
                    employee.id
                )));
            }
            if let Some(record) = directory.records.get_mut(&employee.id) {
                record.manager_id = Some(manager_id);
            }
        }
        Ok(directory)
    }

    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        let seed: Seed =
            serde_json::from_str(raw).map_err(|err| DirectoryError::InvalidSeed(err.to_string()))?;
        Self::from_seed(seed)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn manager_of(&self, id: EmployeeId) -> Option<EmployeeId> {
        self.records.get(&id).and_then(|record| record.manager_id)
    }

    /// Flat roster ordered by id, with each employee's manager name.
    pub fn roster(&self) -> Vec<EmployeeSummary> {
        self.records
            .values()
            .map(|record| EmployeeSummary {
                reporting_manager_name: record
                    .manager_id
                    .and_then(|manager| self.records.get(&manager))
                    .map(|manager| manager.summary.name.clone()),
                ..record.summary.clone()
            })
            .collect()
    }

    /// Trees of every top-level manager. Employees with neither a manager
    /// nor reports are left out.
    pub fn forest(&self) -> Vec<EmployeeNode> {
        self.records
            .values()
            .filter(|record| record.manager_id.is_none())
            .filter(|record| !self.direct_reports(record.summary.id).is_empty())
            .map(|record| self.build_node(record.summary.id))
            .collect()
    }

    pub fn subtree(
        &self,
        id: EmployeeId,
    ) -> Result<(EmployeeNode, Option<EmployeeSummary>, SubtreeDebug), DirectoryError> {
        if !self.records.contains_key(&id) {
            return Err(DirectoryError::NotFound(id));
        }
        let tree = self.build_node(id);
        let parent = self
            .manager_of(id)
            .and_then(|manager| self.records.get(&manager))
            .map(|record| record.summary.clone());
        let debug = SubtreeDebug {
            direct_reports: tree.children.len(),
            total_reports: tree.team_size as usize,
            depth: depth_of(&tree),
        };
        Ok((tree, parent, debug))
    }

    /// Place `employee_ids` under `manager_id`. All or nothing; returns how
    /// many employees were assigned.
    pub fn assign(
        &mut self,
        manager_id: EmployeeId,
        employee_ids: &[EmployeeId],
    ) -> Result<usize, DirectoryError> {
        let manager = self.name_of(manager_id)?;
        let batch = dedup(employee_ids);
        if batch.is_empty() {
            return Err(DirectoryError::EmptySelection);
        }
        let chain = self.chain_of(manager_id);
        for &id in &batch {
            let name = self.name_of(id)?;
            if id == manager_id {
                return Err(DirectoryError::SelfAssignment { name });
            }
            if self.manager_of(id).is_some() {
                return Err(DirectoryError::AlreadyAssigned { name });
            }
            if chain.contains(&id) {
                return Err(DirectoryError::Cycle {
                    name,
                    manager: manager.clone(),
                });
            }
        }

        for &id in &batch {
            let position = self.bump_position();
            if let Some(record) = self.records.get_mut(&id) {
                record.manager_id = Some(manager_id);
                record.position = position;
            }
        }
        Ok(batch.len())
    }

    /// Detach `employee_ids` from `manager_id`. All or nothing.
    pub fn unassign(
        &mut self,
        manager_id: EmployeeId,
        employee_ids: &[EmployeeId],
    ) -> Result<usize, DirectoryError> {
        let manager = self.name_of(manager_id)?;
        let batch = dedup(employee_ids);
        if batch.is_empty() {
            return Err(DirectoryError::EmptySelection);
        }
        for &id in &batch {
            let name = self.name_of(id)?;
            if self.manager_of(id) != Some(manager_id) {
                return Err(DirectoryError::NotDirectReport {
                    name,
                    manager: manager.clone(),
                });
            }
        }

        for id in &batch {
            if let Some(record) = self.records.get_mut(id) {
                record.manager_id = None;
            }
        }
        Ok(batch.len())
    }

    fn name_of(&self, id: EmployeeId) -> Result<String, DirectoryError> {
        self.records
            .get(&id)
            .map(|record| record.summary.name.clone())
            .ok_or(DirectoryError::NotFound(id))
    }

    /// `id` followed by its managers up to the top.
    fn chain_of(&self, id: EmployeeId) -> Vec<EmployeeId> {
        let mut chain = vec![id];
        let mut current = self.manager_of(id);
        while let Some(manager) = current {
            if chain.contains(&manager) {
                break;
            }
            chain.push(manager);
            current = self.manager_of(manager);
        }
        chain
    }

    fn direct_reports(&self, id: EmployeeId) -> Vec<&Record> {
        let mut reports: Vec<&Record> = self
            .records
            .values()
            .filter(|record| record.manager_id == Some(id))
            .collect();
        reports.sort_by_key(|record| record.position);
        reports
    }

    fn build_node(&self, id: EmployeeId) -> EmployeeNode {
        let mut node = self
            .records
            .get(&id)
            .map(|record| EmployeeNode::leaf(&record.summary))
            .unwrap_or_else(|| EmployeeNode {
                id,
                name: String::new(),
                title: String::new(),
                avatar: None,
                email: None,
                employee_code: None,
                team_size: 0,
                children: Vec::new(),
            });
        node.children = self
            .direct_reports(id)
            .into_iter()
            .map(|record| self.build_node(record.summary.id))
            .collect();
        node.team_size = node.children.iter().map(|child| 1 + child.team_size).sum();
        node
    }

    fn bump_position(&mut self) -> u64 {
        self.next_position += 1;
        self.next_position
    }
}

fn dedup(ids: &[EmployeeId]) -> Vec<EmployeeId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn depth_of(node: &EmployeeNode) -> usize {
    node.children
        .iter()
        .map(|child| 1 + depth_of(child))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
