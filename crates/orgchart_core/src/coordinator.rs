//! Optimistic assign/unassign of direct reports.
//!
//! Each action applies its change to the store first, then calls the
//! backend. A rejection discards the optimistic tree by refetching; if the
//! refetch fails, only that edit is undone locally.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
    sync::Arc,
};

use anyhow::anyhow;
use shared::domain::{EmployeeId, EmployeeNode};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    backend::OrgChartBackend,
    error::{
        rejection_message, NoOpReason, OrgChartError, ASSIGN_FALLBACK_MESSAGE,
        UNASSIGN_FALLBACK_MESSAGE,
    },
    events::{AssignmentKind, AssignmentPhase, OrgChartEvent},
    store::{HierarchyStore, Revert, TreeState},
};

/// What happens when a second edit targets a manager that already has one
/// in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPolicy {
    /// Both run; whichever the backend applies last wins.
    #[default]
    LastWriteWins,
    /// The second edit fails with [`OrgChartError::ManagerBusy`].
    RejectConcurrent,
}

impl FromStr for EditPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "last-write-wins" => Ok(EditPolicy::LastWriteWins),
            "reject-concurrent" => Ok(EditPolicy::RejectConcurrent),
            other => Err(anyhow!(
                "unknown edit policy '{other}', expected 'last-write-wins' or 'reject-concurrent'"
            )),
        }
    }
}

impl fmt::Display for EditPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditPolicy::LastWriteWins => f.write_str("last-write-wins"),
            EditPolicy::RejectConcurrent => f.write_str("reject-concurrent"),
        }
    }
}

/// `node` with `new_children` appended (skipping ids it already has) and
/// `team_size` grown by `1 + child.team_size` per added child.
pub fn add_children(node: &EmployeeNode, new_children: &[EmployeeNode]) -> EmployeeNode {
    let existing: HashSet<EmployeeId> = node.children.iter().map(|child| child.id).collect();
    let to_add: Vec<EmployeeNode> = new_children
        .iter()
        .filter(|child| !existing.contains(&child.id))
        .cloned()
        .collect();
    let increment: u32 = to_add.iter().map(|child| 1 + child.team_size).sum();

    let mut children = node.children.clone();
    children.extend(to_add);
    EmployeeNode {
        children,
        team_size: node.team_size + increment,
        ..node.clone()
    }
}

/// `node` without the children in `remove`; `team_size` shrinks by
/// `1 + child.team_size` per removed child, never below zero.
pub fn remove_children(node: &EmployeeNode, remove: &[EmployeeId]) -> EmployeeNode {
    let (removed, kept): (Vec<&EmployeeNode>, Vec<&EmployeeNode>) = node
        .children
        .iter()
        .partition(|child| remove.contains(&child.id));
    let decrement: u32 = removed.iter().map(|child| 1 + child.team_size).sum();

    EmployeeNode {
        children: kept.into_iter().cloned().collect(),
        team_size: node.team_size.saturating_sub(decrement),
        ..node.clone()
    }
}

/// Candidates of an assign batch that may be placed under `manager_id`,
/// in input order.
pub fn assignable_ids(
    state: &TreeState,
    manager_id: EmployeeId,
    employee_ids: &[EmployeeId],
) -> Vec<EmployeeId> {
    let ancestors: HashSet<EmployeeId> = state.ancestors_of(manager_id).into_iter().collect();
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();

    for &id in employee_ids {
        let skip = if !seen.insert(id) {
            Some("duplicate in batch")
        } else if id == manager_id {
            Some("is the manager")
        } else if ancestors.contains(&id) {
            Some("is above the manager")
        } else if state.is_assigned_anywhere(id) {
            Some("already assigned")
        } else if state.roster_entry(id).is_none() && state.find_node(id).is_none() {
            Some("unknown employee")
        } else {
            None
        };
        match skip {
            Some(reason) => debug!(
                manager_id = manager_id.0,
                employee_id = id.0,
                reason,
                "assign: skipping candidate"
            ),
            None => accepted.push(id),
        }
    }
    accepted
}

/// Node to hang under the manager: a copy of the already materialized
/// node when there is one, so its known reports stay visible.
fn child_node_for(state: &TreeState, id: EmployeeId) -> Option<EmployeeNode> {
    state
        .find_node(id)
        .cloned()
        .or_else(|| state.roster_entry(id).map(EmployeeNode::leaf))
}

pub struct AssignmentCoordinator {
    backend: Arc<dyn OrgChartBackend>,
    store: Arc<HierarchyStore>,
    events: broadcast::Sender<OrgChartEvent>,
    policy: EditPolicy,
    inflight: Mutex<HashMap<EmployeeId, usize>>,
}

impl AssignmentCoordinator {
    pub fn new(
        backend: Arc<dyn OrgChartBackend>,
        store: Arc<HierarchyStore>,
        events: broadcast::Sender<OrgChartEvent>,
        policy: EditPolicy,
    ) -> Self {
        Self {
            backend,
            store,
            events,
            policy,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    /// Whether an edit for `manager_id` is awaiting the backend.
    pub async fn is_busy(&self, manager_id: EmployeeId) -> bool {
        self.inflight.lock().await.contains_key(&manager_id)
    }

    /// Assign `employee_ids` as direct reports of `manager_id`. Returns the
    /// ids actually sent to the backend.
    pub async fn assign(
        &self,
        manager_id: EmployeeId,
        employee_ids: &[EmployeeId],
    ) -> Result<Vec<EmployeeId>, OrgChartError> {
        self.begin(manager_id).await?;
        let result = self.run_assign(manager_id, employee_ids).await;
        self.finish(manager_id).await;
        result
    }

    /// Keep only `keep` among the direct reports of `manager_id`. Returns
    /// the removed ids; empty means nothing changed.
    pub async fn unassign(
        &self,
        manager_id: EmployeeId,
        keep: &[EmployeeId],
    ) -> Result<Vec<EmployeeId>, OrgChartError> {
        self.begin(manager_id).await?;
        let result = self.run_unassign(manager_id, keep).await;
        self.finish(manager_id).await;
        result
    }

    async fn run_assign(
        &self,
        manager_id: EmployeeId,
        employee_ids: &[EmployeeId],
    ) -> Result<Vec<EmployeeId>, OrgChartError> {
        let accepted = self
            .store
            .mutate(|state| -> Result<_, OrgChartError> {
                if state.displayed_node(manager_id).is_none() {
                    return Err(OrgChartError::UnknownEmployee(manager_id));
                }
                let accepted = assignable_ids(state, manager_id, employee_ids);
                if accepted.is_empty() {
                    return Ok(None);
                }
                let new_children: Vec<EmployeeNode> = accepted
                    .iter()
                    .filter_map(|id| child_node_for(state, *id))
                    .collect();
                state.replace_node(manager_id, |node| add_children(node, &new_children));
                state.view.expand(manager_id);
                Ok(Some(accepted))
            })
            .await?;

        let Some(accepted) = accepted else {
            let reason = NoOpReason::AllAlreadyAssigned;
            info!(
                manager_id = manager_id.0,
                requested = employee_ids.len(),
                "assign: nothing to assign"
            );
            self.alert(reason.user_message());
            return Err(OrgChartError::NoOp(reason));
        };

        self.publish(
            AssignmentKind::Assign,
            manager_id,
            &accepted,
            AssignmentPhase::OptimisticallyApplied,
        );
        info!(
            manager_id = manager_id.0,
            employees = accepted.len(),
            "assign: applied optimistically"
        );

        match self.backend.assign(manager_id, &accepted).await {
            Ok(()) => {
                info!(manager_id = manager_id.0, "assign: confirmed");
                self.publish(
                    AssignmentKind::Assign,
                    manager_id,
                    &accepted,
                    AssignmentPhase::Confirmed,
                );
                Ok(accepted)
            }
            Err(err) => {
                let message = rejection_message(&err, ASSIGN_FALLBACK_MESSAGE);
                warn!(
                    manager_id = manager_id.0,
                    error = %err,
                    "assign: rejected, reloading tree"
                );
                self.store
                    .reload_after_rejection(manager_id, Revert::Assigned(accepted.clone()))
                    .await;
                self.publish(
                    AssignmentKind::Assign,
                    manager_id,
                    &accepted,
                    AssignmentPhase::RolledBack,
                );
                self.alert(&message);
                Err(OrgChartError::AssignRejected(message))
            }
        }
    }

    async fn run_unassign(
        &self,
        manager_id: EmployeeId,
        keep: &[EmployeeId],
    ) -> Result<Vec<EmployeeId>, OrgChartError> {
        let applied = self
            .store
            .mutate(|state| -> Result<_, OrgChartError> {
                let manager = state
                    .displayed_node(manager_id)
                    .ok_or(OrgChartError::UnknownEmployee(manager_id))?;
                let removed_nodes: Vec<EmployeeNode> = manager
                    .children
                    .iter()
                    .filter(|child| !keep.contains(&child.id))
                    .cloned()
                    .collect();
                if removed_nodes.is_empty() {
                    return Ok(None);
                }
                let to_remove: Vec<EmployeeId> =
                    removed_nodes.iter().map(|child| child.id).collect();
                state.replace_node(manager_id, |node| remove_children(node, &to_remove));
                Ok(Some((removed_nodes, to_remove)))
            })
            .await?;

        let Some((removed_nodes, removed)) = applied else {
            debug!(
                manager_id = manager_id.0,
                "unassign: every report kept, nothing to do"
            );
            return Ok(Vec::new());
        };

        self.publish(
            AssignmentKind::Unassign,
            manager_id,
            &removed,
            AssignmentPhase::OptimisticallyApplied,
        );
        info!(
            manager_id = manager_id.0,
            employees = removed.len(),
            "unassign: applied optimistically"
        );

        match self.backend.unassign(manager_id, &removed).await {
            Ok(()) => {
                info!(manager_id = manager_id.0, "unassign: confirmed");
                self.publish(
                    AssignmentKind::Unassign,
                    manager_id,
                    &removed,
                    AssignmentPhase::Confirmed,
                );
                Ok(removed)
            }
            Err(err) => {
                let message = rejection_message(&err, UNASSIGN_FALLBACK_MESSAGE);
                warn!(
                    manager_id = manager_id.0,
                    error = %err,
                    "unassign: rejected, reloading tree"
                );
                self.store
                    .reload_after_rejection(manager_id, Revert::Unassigned(removed_nodes))
                    .await;
                self.publish(
                    AssignmentKind::Unassign,
                    manager_id,
                    &removed,
                    AssignmentPhase::RolledBack,
                );
                self.alert(&message);
                Err(OrgChartError::UnassignRejected(message))
            }
        }
    }

    async fn begin(&self, manager_id: EmployeeId) -> Result<(), OrgChartError> {
        let mut inflight = self.inflight.lock().await;
        let count = inflight.entry(manager_id).or_insert(0);
        if *count > 0 && self.policy == EditPolicy::RejectConcurrent {
            warn!(manager_id = manager_id.0, "org chart: concurrent edit refused");
            return Err(OrgChartError::ManagerBusy(manager_id));
        }
        *count += 1;
        Ok(())
    }

    async fn finish(&self, manager_id: EmployeeId) {
        let mut inflight = self.inflight.lock().await;
        if let Some(count) = inflight.get_mut(&manager_id) {
            *count -= 1;
            if *count == 0 {
                inflight.remove(&manager_id);
            }
        }
    }

    fn publish(
        &self,
        kind: AssignmentKind,
        manager_id: EmployeeId,
        employee_ids: &[EmployeeId],
        phase: AssignmentPhase,
    ) {
        let _ = self.events.send(OrgChartEvent::Assignment {
            kind,
            manager_id,
            employee_ids: employee_ids.to_vec(),
            phase,
        });
    }

    fn alert(&self, message: &str) {
        let _ = self.events.send(OrgChartEvent::Alert(message.to_string()));
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
