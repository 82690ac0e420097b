//! Tree builders and an in-memory backend for unit tests.

use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{EmployeeId, EmployeeNode, EmployeeSummary},
    error::BackendRejection,
    protocol::{SubtreeDebug, SubtreeResponse},
};
use tokio::sync::{Mutex, Notify};

use crate::backend::OrgChartBackend;

/// Node with `team_size` derived from `children`.
pub(crate) fn node(id: i64, name: &str, children: Vec<EmployeeNode>) -> EmployeeNode {
    let team_size = children.iter().map(|child| 1 + child.team_size).sum();
    EmployeeNode {
        id: EmployeeId(id),
        name: name.to_string(),
        title: String::new(),
        avatar: None,
        email: None,
        employee_code: None,
        team_size,
        children,
    }
}

pub(crate) fn leaf(id: i64, name: &str) -> EmployeeNode {
    node(id, name, Vec::new())
}

pub(crate) fn summary(id: i64, name: &str) -> EmployeeSummary {
    EmployeeSummary {
        id: EmployeeId(id),
        name: name.to_string(),
        title: String::new(),
        avatar: None,
        email: Some(format!("{}@example.com", name.to_ascii_lowercase())),
        employee_code: Some(format!("EMP-{id:03}")),
        reporting_manager_name: None,
    }
}

pub(crate) fn ids(raw: &[i64]) -> Vec<EmployeeId> {
    raw.iter().copied().map(EmployeeId).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    Rejected,
    Transport,
}

/// Backend answering from in-memory data. Subtrees are served from the
/// forest unless overridden.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub forest: Mutex<Vec<EmployeeNode>>,
    pub roster: Mutex<Vec<EmployeeSummary>>,
    pub parents: Mutex<HashMap<EmployeeId, EmployeeSummary>>,
    pub subtree_failure: Mutex<Option<Failure>>,
    pub forest_failure: Mutex<Option<Failure>>,
    pub assign_failure: Mutex<Option<Failure>>,
    pub unassign_failure: Mutex<Option<Failure>>,
    pub calls: Mutex<Vec<String>>,
    /// When set, `assign` waits for a notification before answering.
    pub assign_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBackend {
    pub(crate) fn with_forest(forest: Vec<EmployeeNode>, roster: Vec<EmployeeSummary>) -> Arc<Self> {
        Arc::new(Self {
            forest: Mutex::new(forest),
            roster: Mutex::new(roster),
            ..Self::default()
        })
    }

    pub(crate) async fn fail(&self, slot: &Mutex<Option<Failure>>, failure: Failure) {
        *slot.lock().await = Some(failure);
    }

    pub(crate) async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

fn failure_error(failure: Failure, message: &str) -> anyhow::Error {
    match failure {
        Failure::Rejected => BackendRejection::new(200, message).into(),
        Failure::Transport => anyhow!("connection refused"),
    }
}

#[async_trait]
impl OrgChartBackend for FakeBackend {
    async fn fetch_forest(&self) -> Result<Vec<EmployeeNode>> {
        self.record("fetch_forest".into()).await;
        if let Some(failure) = *self.forest_failure.lock().await {
            return Err(failure_error(failure, "forest unavailable"));
        }
        Ok(self.forest.lock().await.clone())
    }

    async fn fetch_roster(&self) -> Result<Vec<EmployeeSummary>> {
        self.record("fetch_roster".into()).await;
        Ok(self.roster.lock().await.clone())
    }

    async fn fetch_subtree(&self, employee_id: EmployeeId) -> Result<SubtreeResponse> {
        self.record(format!("fetch_subtree:{employee_id}")).await;
        if let Some(failure) = *self.subtree_failure.lock().await {
            return Err(failure_error(failure, "Employee not found"));
        }
        let tree = self
            .forest
            .lock()
            .await
            .iter()
            .find_map(|root| root.find(employee_id).cloned());
        let debug = tree.as_ref().map(|tree| SubtreeDebug {
            direct_reports: tree.children.len(),
            total_reports: tree.team_size as usize,
            depth: 1,
        });
        Ok(SubtreeResponse {
            success: tree.is_some(),
            tree,
            parent: self.parents.lock().await.get(&employee_id).cloned(),
            debug,
            error: None,
        })
    }

    async fn assign(&self, manager_id: EmployeeId, employee_ids: &[EmployeeId]) -> Result<()> {
        self.record(format!("assign:{manager_id}:{employee_ids:?}"))
            .await;
        let gate = self.assign_gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(failure) = *self.assign_failure.lock().await {
            return Err(failure_error(failure, "Employee already has a manager"));
        }
        Ok(())
    }

    async fn unassign(&self, manager_id: EmployeeId, employee_ids: &[EmployeeId]) -> Result<()> {
        self.record(format!("unassign:{manager_id}:{employee_ids:?}"))
            .await;
        if let Some(failure) = *self.unassign_failure.lock().await {
            return Err(failure_error(failure, "Not a direct report"));
        }
        Ok(())
    }
}
