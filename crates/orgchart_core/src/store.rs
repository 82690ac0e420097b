use std::{sync::Arc, time::Instant};

use shared::domain::{EmployeeId, EmployeeNode, EmployeeSummary};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    backend::OrgChartBackend,
    coordinator::{add_children, remove_children},
    error::{rejection_message, OrgChartError, FETCH_FALLBACK_MESSAGE},
    events::OrgChartEvent,
    geometry::{connectors, Connector, GridGeometry},
    layout::{build_columns, ColumnLayout},
    view::{ClickKind, ClickTracker, ViewState},
};

/// Local undo of one optimistic edit.
#[derive(Debug, Clone)]
pub(crate) enum Revert {
    /// Ids that were appended under the manager.
    Assigned(Vec<EmployeeId>),
    /// Reports that were taken away from the manager, as they were.
    Unassigned(Vec<EmployeeNode>),
}

/// Which parts of the state still hold optimistic data.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stale {
    pub root: bool,
    pub forest: bool,
}

/// Everything the org-chart screen shows for the current session.
#[derive(Debug, Clone, Default)]
pub struct TreeState {
    /// Displayed subtree.
    pub root: Option<EmployeeNode>,
    /// Manager of the displayed root, for "go up".
    pub parent: Option<EmployeeSummary>,
    /// Raw forest of top-level trees.
    pub forest: Vec<EmployeeNode>,
    pub roster: Vec<EmployeeSummary>,
    pub view: ViewState,
}

impl TreeState {
    pub fn root_id(&self) -> Option<EmployeeId> {
        self.root.as_ref().map(|root| root.id)
    }

    pub fn roster_entry(&self, id: EmployeeId) -> Option<&EmployeeSummary> {
        self.roster.iter().find(|entry| entry.id == id)
    }

    /// Already materialized node for `id`, looked up in the forest first,
    /// then in the displayed subtree.
    pub fn find_node(&self, id: EmployeeId) -> Option<&EmployeeNode> {
        self.forest
            .iter()
            .find_map(|tree| tree.find(id))
            .or_else(|| self.root.as_ref().and_then(|root| root.find(id)))
    }

    /// The node as displayed, falling back to the forest.
    pub fn displayed_node(&self, id: EmployeeId) -> Option<&EmployeeNode> {
        self.root
            .as_ref()
            .and_then(|root| root.find(id))
            .or_else(|| self.forest.iter().find_map(|tree| tree.find(id)))
    }

    pub fn find_path(&self, target: EmployeeId) -> Option<Vec<EmployeeId>> {
        self.root.as_ref()?.path_to(target)
    }

    /// Best-effort: only the materialized trees are visible here, the
    /// backend enforces single-manager for the whole organization.
    pub fn is_assigned_anywhere(&self, employee_id: EmployeeId) -> bool {
        self.root
            .iter()
            .chain(self.forest.iter())
            .any(|tree| tree.has_descendant(employee_id))
    }

    /// Whether `employee_id` is a report of someone other than `manager_id`
    /// in any materialized tree.
    fn reports_elsewhere(&self, employee_id: EmployeeId, manager_id: EmployeeId) -> bool {
        self.root
            .iter()
            .chain(self.forest.iter())
            .filter_map(|tree| tree.path_to(employee_id))
            .any(|path| path.len() >= 2 && path[path.len() - 2] != manager_id)
    }

    /// `manager_id` and everything above it in any materialized tree.
    pub fn ancestors_of(&self, manager_id: EmployeeId) -> Vec<EmployeeId> {
        self.root
            .iter()
            .chain(self.forest.iter())
            .filter_map(|tree| tree.path_to(manager_id))
            .flatten()
            .collect()
    }

    pub fn columns(&self) -> ColumnLayout<'_> {
        match &self.root {
            Some(root) => build_columns(root, &self.view.collapsed),
            None => ColumnLayout::default(),
        }
    }

    /// Connector polylines of the current layout; edges on the path to the
    /// selected node are highlighted.
    pub fn connectors(&self, geometry: &GridGeometry) -> Vec<Connector> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let layout = build_columns(root, &self.view.collapsed);
        let selected_path = self.view.selected.and_then(|id| root.path_to(id));
        connectors(
            root,
            &layout,
            &self.view.collapsed,
            &self.view.scroll,
            selected_path.as_deref(),
            geometry,
        )
    }

    pub fn toggle_collapse(&mut self, node_id: EmployeeId) -> bool {
        self.view.toggle_collapse(node_id)
    }

    /// Rebuild every materialized tree with `update` applied to `id`.
    pub fn replace_node<F>(&mut self, id: EmployeeId, update: F)
    where
        F: Fn(&EmployeeNode) -> EmployeeNode,
    {
        self.replace_node_in(
            id,
            update,
            Stale {
                root: true,
                forest: true,
            },
        );
    }

    fn replace_node_in<F>(&mut self, id: EmployeeId, update: F, parts: Stale)
    where
        F: Fn(&EmployeeNode) -> EmployeeNode,
    {
        if parts.root {
            if let Some(root) = &self.root {
                self.root = Some(root.map_node(id, &update));
            }
        }
        if parts.forest {
            self.forest = self
                .forest
                .iter()
                .map(|tree| tree.map_node(id, &update))
                .collect();
        }
    }

    /// Undo one edit on the parts that were not refetched. Removed reports
    /// that have since been placed elsewhere stay where they are.
    pub(crate) fn revert_edit(&mut self, manager_id: EmployeeId, revert: &Revert, stale: Stale) {
        match revert {
            Revert::Assigned(added) => {
                self.replace_node_in(manager_id, |node| remove_children(node, added), stale);
            }
            Revert::Unassigned(removed) => {
                let restore: Vec<EmployeeNode> = removed
                    .iter()
                    .filter(|child| !self.reports_elsewhere(child.id, manager_id))
                    .cloned()
                    .collect();
                self.replace_node_in(manager_id, |node| add_children(node, &restore), stale);
            }
        }
    }

    fn install_root(&mut self, tree: EmployeeNode, parent: Option<EmployeeSummary>) {
        self.view.expand(tree.id);
        self.view.selected = Some(tree.id);
        self.parent = parent;
        self.root = Some(tree);
    }

    /// Single-node stand-in used when the subtree cannot be fetched.
    fn install_fallback(&mut self, employee_id: EmployeeId) {
        let node = match self.roster_entry(employee_id) {
            Some(entry) => EmployeeNode::leaf(entry),
            None => EmployeeNode {
                id: employee_id,
                name: String::new(),
                title: String::new(),
                avatar: None,
                email: None,
                employee_code: None,
                team_size: 0,
                children: Vec::new(),
            },
        };
        self.install_root(node, None);
    }
}

/// Holder of the session's org-chart state. Backend calls are made with
/// the state unlocked; results are applied by whole-tree replacement.
pub struct HierarchyStore {
    backend: Arc<dyn OrgChartBackend>,
    state: Mutex<TreeState>,
    clicks: Mutex<ClickTracker>,
    events: broadcast::Sender<OrgChartEvent>,
}

impl HierarchyStore {
    pub fn new(
        backend: Arc<dyn OrgChartBackend>,
        events: broadcast::Sender<OrgChartEvent>,
    ) -> Self {
        Self {
            backend,
            state: Mutex::new(TreeState::default()),
            clicks: Mutex::new(ClickTracker::default()),
            events,
        }
    }

    /// Fetch forest and roster. A roster failure only degrades the pickers.
    pub async fn load(&self) -> Result<(), OrgChartError> {
        match self.backend.fetch_roster().await {
            Ok(roster) => {
                let employees = roster.len();
                self.state.lock().await.roster = roster;
                let _ = self.events.send(OrgChartEvent::RosterLoaded { employees });
            }
            Err(err) => warn!(error = %err, "org chart: failed to fetch roster"),
        }
        self.refresh_forest().await
    }

    pub async fn refresh_forest(&self) -> Result<(), OrgChartError> {
        let forest = self.backend.fetch_forest().await.map_err(|err| {
            warn!(error = %err, "org chart: failed to fetch forest");
            OrgChartError::Fetch(rejection_message(&err, FETCH_FALLBACK_MESSAGE))
        })?;
        let roots = forest.len();
        self.state.lock().await.forest = forest;
        let _ = self.events.send(OrgChartEvent::ForestLoaded { roots });
        Ok(())
    }

    /// Re-root the view at `employee_id`.
    ///
    /// On `Err(OrgChartError::Fetch)` a single-node fallback tree is
    /// already displayed; the error only reports why.
    pub async fn select_root(&self, employee_id: EmployeeId) -> Result<(), OrgChartError> {
        match self.fetch_root(employee_id).await {
            Ok((tree, parent)) => {
                info!(
                    root_id = employee_id.0,
                    team_size = tree.team_size,
                    has_parent = parent.is_some(),
                    "org chart: root selected"
                );
                self.state.lock().await.install_root(tree, parent);
                let _ = self.events.send(OrgChartEvent::RootChanged {
                    root_id: employee_id,
                    fallback: false,
                });
                Ok(())
            }
            Err(err) => {
                warn!(
                    root_id = employee_id.0,
                    error = %err,
                    "org chart: subtree fetch failed, showing single node"
                );
                self.state.lock().await.install_fallback(employee_id);
                let _ = self.events.send(OrgChartEvent::RootChanged {
                    root_id: employee_id,
                    fallback: true,
                });
                Err(err)
            }
        }
    }

    /// Re-root at the current root's manager. `Ok(false)` when there is none.
    pub async fn go_up(&self) -> Result<bool, OrgChartError> {
        let parent_id = self.state.lock().await.parent.as_ref().map(|p| p.id);
        match parent_id {
            Some(id) => self.select_root(id).await.map(|()| true),
            None => Ok(false),
        }
    }

    pub async fn toggle_collapse(&self, node_id: EmployeeId) -> bool {
        let collapsed = self.state.lock().await.toggle_collapse(node_id);
        debug!(node_id = node_id.0, collapsed, "org chart: toggled node");
        collapsed
    }

    /// Team-size badge: make sure the node's reports are visible.
    pub async fn reveal_reports(&self, node_id: EmployeeId) {
        self.state.lock().await.view.expand(node_id);
    }

    pub async fn select(&self, node_id: Option<EmployeeId>) {
        self.state.lock().await.view.selected = node_id;
    }

    /// A click on a node card: selects it, or re-roots there when it is the
    /// second click inside the double-click window.
    pub async fn click(&self, node_id: EmployeeId, at: Instant) -> Result<ClickKind, OrgChartError> {
        let kind = self.clicks.lock().await.register(node_id, at);
        match kind {
            ClickKind::Single => self.select(Some(node_id)).await,
            ClickKind::Double => self.select_root(node_id).await?,
        }
        Ok(kind)
    }

    pub async fn set_column_scroll(&self, column_index: usize, offset: f32) {
        self.state
            .lock()
            .await
            .view
            .scroll
            .set_column(column_index, offset);
    }

    pub async fn set_horizontal_scroll(&self, offset: f32) {
        self.state.lock().await.view.scroll.horizontal = offset.max(0.0);
    }

    pub async fn find_path(&self, target: EmployeeId) -> Option<Vec<EmployeeId>> {
        self.state.lock().await.find_path(target)
    }

    pub async fn is_assigned_anywhere(&self, employee_id: EmployeeId) -> bool {
        self.state.lock().await.is_assigned_anywhere(employee_id)
    }

    pub async fn snapshot(&self) -> TreeState {
        self.state.lock().await.clone()
    }

    /// Run `f` against the state under the lock.
    pub async fn read<R>(&self, f: impl FnOnce(&TreeState) -> R) -> R {
        f(&*self.state.lock().await)
    }

    pub(crate) async fn mutate<R>(&self, f: impl FnOnce(&mut TreeState) -> R) -> R {
        f(&mut *self.state.lock().await)
    }

    /// Discard optimistic state after a rejected edit: refetch forest and
    /// displayed root. Whatever could not be refetched gets only this
    /// edit's own change reverted, so other edits applied meanwhile stay.
    pub(crate) async fn reload_after_rejection(&self, manager_id: EmployeeId, revert: Revert) {
        let root_id = self.state.lock().await.root_id();
        let forest = self.backend.fetch_forest().await;
        let root = match root_id {
            Some(id) => Some(self.fetch_root(id).await),
            None => None,
        };

        let mut state = self.state.lock().await;
        let forest_error = match forest {
            Ok(forest) => {
                state.forest = forest;
                None
            }
            Err(err) => Some(err.to_string()),
        };
        let root_error = match root {
            Some(Ok((tree, parent))) => {
                state.parent = parent;
                state.root = Some(tree);
                None
            }
            Some(Err(err)) => Some(err.to_string()),
            None => None,
        };
        if forest_error.is_some() || root_error.is_some() {
            warn!(
                manager_id = manager_id.0,
                ?forest_error,
                ?root_error,
                "org chart: refetch after rejection failed, reverting the edit locally"
            );
            state.revert_edit(
                manager_id,
                &revert,
                Stale {
                    root: root_error.is_some(),
                    forest: forest_error.is_some(),
                },
            );
        }
        drop(state);
        let _ = self.events.send(OrgChartEvent::TreeReloaded);
    }

    async fn fetch_root(
        &self,
        employee_id: EmployeeId,
    ) -> Result<(EmployeeNode, Option<EmployeeSummary>), OrgChartError> {
        let response = self
            .backend
            .fetch_subtree(employee_id)
            .await
            .map_err(|err| {
                OrgChartError::Fetch(rejection_message(&err, "Failed to fetch employee subtree"))
            })?;
        if let Some(meta) = &response.debug {
            debug!(
                root_id = employee_id.0,
                direct_reports = meta.direct_reports,
                total_reports = meta.total_reports,
                depth = meta.depth,
                "org chart: subtree debug metadata"
            );
        }
        match response.tree {
            Some(tree) if response.success => Ok((tree, response.parent)),
            _ => Err(OrgChartError::Fetch(response.error.unwrap_or_else(|| {
                format!("no subtree returned for employee {employee_id}")
            }))),
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
