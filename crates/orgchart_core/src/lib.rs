//! Client-side org-chart editor: hierarchy store, column layout and
//! optimistic assignment against the employee-tree REST backend.

use std::sync::Arc;

use shared::domain::EmployeeId;
use tokio::sync::broadcast;
use tracing::info;

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod picker;
pub mod settings;
pub mod store;
pub mod view;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub use backend::{HttpBackend, OrgChartBackend};
pub use coordinator::{AssignmentCoordinator, EditPolicy};
pub use error::{NoOpReason, OrgChartError};
pub use events::{AssignmentKind, AssignmentPhase, OrgChartEvent};
pub use layout::{build_columns, column_label, ColumnEntry, ColumnLayout, GridPosition};
pub use settings::{load_settings, ClientSettings};
pub use store::{HierarchyStore, TreeState};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One org-chart session: store and coordinator sharing a backend and an
/// event channel.
pub struct OrgChartClient {
    store: Arc<HierarchyStore>,
    coordinator: AssignmentCoordinator,
    events: broadcast::Sender<OrgChartEvent>,
}

impl OrgChartClient {
    pub fn new(backend: Arc<dyn OrgChartBackend>, policy: EditPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = Arc::new(HierarchyStore::new(backend.clone(), events.clone()));
        let coordinator =
            AssignmentCoordinator::new(backend, store.clone(), events.clone(), policy);
        Self {
            store,
            coordinator,
            events,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        let backend = HttpBackend::from_settings(settings)?;
        info!(
            api_url = backend.api_url(),
            edit_policy = %settings.edit_policy,
            "org chart: client configured"
        );
        Ok(Self::new(Arc::new(backend), settings.edit_policy))
    }

    pub fn store(&self) -> &Arc<HierarchyStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &AssignmentCoordinator {
        &self.coordinator
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<OrgChartEvent> {
        self.events.subscribe()
    }

    /// Load forest and roster, then open on `root` or, failing that, on
    /// the detected main root. Returns the chosen root.
    pub async fn open(&self, root: Option<EmployeeId>) -> Result<EmployeeId, OrgChartError> {
        self.store.load().await?;
        let root_id = match root {
            Some(id) => id,
            None => self
                .store
                .read(|state| picker::identify_main_root(&state.roster, &state.forest).map(|e| e.id))
                .await
                .ok_or(OrgChartError::NotLoaded)?,
        };
        self.store.select_root(root_id).await?;
        Ok(root_id)
    }

    pub async fn select_root(&self, employee_id: EmployeeId) -> Result<(), OrgChartError> {
        self.store.select_root(employee_id).await
    }

    pub async fn go_up(&self) -> Result<bool, OrgChartError> {
        self.store.go_up().await
    }

    pub async fn assign(
        &self,
        manager_id: EmployeeId,
        employee_ids: &[EmployeeId],
    ) -> Result<Vec<EmployeeId>, OrgChartError> {
        self.coordinator.assign(manager_id, employee_ids).await
    }

    pub async fn unassign(
        &self,
        manager_id: EmployeeId,
        keep: &[EmployeeId],
    ) -> Result<Vec<EmployeeId>, OrgChartError> {
        self.coordinator.unassign(manager_id, keep).await
    }

    /// Path from the displayed root to `target`, for highlighting.
    pub async fn path_to(&self, target: EmployeeId) -> Result<Vec<EmployeeId>, OrgChartError> {
        let state = self.store.snapshot().await;
        if state.root.is_none() {
            return Err(OrgChartError::NotLoaded);
        }
        state
            .find_path(target)
            .ok_or(OrgChartError::UnknownEmployee(target))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
