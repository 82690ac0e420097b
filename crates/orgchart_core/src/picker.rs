//! Candidate lists for the assign and unassign dialogs.

use shared::domain::{EmployeeId, EmployeeNode, EmployeeSummary};

use crate::store::TreeState;

#[derive(Debug, Clone, PartialEq)]
pub struct AssignCandidate {
    pub employee: EmployeeSummary,
    /// Already placed under some manager in the loaded tree; shown but not
    /// selectable.
    pub already_assigned: bool,
}

fn matches_search(search: &str, fields: &[Option<&str>]) -> bool {
    let needle = search.trim().to_lowercase();
    needle.is_empty()
        || fields
            .iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
}

/// Roster entries whose name, email or employee code contain `search`.
pub fn search_roster<'a>(roster: &'a [EmployeeSummary], search: &str) -> Vec<&'a EmployeeSummary> {
    roster
        .iter()
        .filter(|employee| {
            matches_search(
                search,
                &[
                    Some(employee.name.as_str()),
                    employee.email.as_deref(),
                    employee.employee_code.as_deref(),
                ],
            )
        })
        .collect()
}

/// Roster minus the manager, filtered like [`search_roster`].
pub fn assign_candidates(
    state: &TreeState,
    manager_id: EmployeeId,
    search: &str,
) -> Vec<AssignCandidate> {
    search_roster(&state.roster, search)
        .into_iter()
        .filter(|employee| employee.id != manager_id)
        .map(|employee| AssignCandidate {
            employee: employee.clone(),
            already_assigned: state.is_assigned_anywhere(employee.id),
        })
        .collect()
}

/// Direct reports of `manager`, filtered on name, email, employee code or
/// title.
pub fn unassign_candidates<'a>(manager: &'a EmployeeNode, search: &str) -> Vec<&'a EmployeeNode> {
    manager
        .children
        .iter()
        .filter(|child| {
            matches_search(
                search,
                &[
                    Some(child.name.as_str()),
                    child.email.as_deref(),
                    child.employee_code.as_deref(),
                    Some(child.title.as_str()),
                ],
            )
        })
        .collect()
}

/// How many direct reports an unassign with `keep` would remove.
pub fn removal_count(manager: &EmployeeNode, keep: &[EmployeeId]) -> usize {
    manager
        .children
        .iter()
        .filter(|child| !keep.contains(&child.id))
        .count()
}

/// Add or remove `id` from a checkbox selection, keeping click order.
pub fn toggle_selection(selection: &mut Vec<EmployeeId>, id: EmployeeId) {
    if let Some(index) = selection.iter().position(|selected| *selected == id) {
        selection.remove(index);
    } else {
        selection.push(id);
    }
}

/// Select every selectable visible candidate, or clear them when they are
/// all selected already. Selections hidden by the search are kept.
pub fn toggle_select_all_assign(selection: &mut Vec<EmployeeId>, visible: &[AssignCandidate]) {
    let available: Vec<EmployeeId> = visible
        .iter()
        .filter(|candidate| !candidate.already_assigned)
        .map(|candidate| candidate.employee.id)
        .collect();
    let all_selected =
        !available.is_empty() && available.iter().all(|id| selection.contains(id));

    if all_selected {
        selection.retain(|id| !available.contains(id));
    } else {
        for id in available {
            if !selection.contains(&id) {
                selection.push(id);
            }
        }
    }
}

/// Same toggle for the unassign dialog, where the selection is the set of
/// reports to keep. Clearing drops the whole selection.
pub fn toggle_select_all_keep(selection: &mut Vec<EmployeeId>, visible: &[&EmployeeNode]) {
    let all_selected =
        !visible.is_empty() && visible.iter().all(|child| selection.contains(&child.id));
    if all_selected {
        selection.clear();
    } else {
        *selection = visible.iter().map(|child| child.id).collect();
    }
}

/// Employee the chart opens on: a CEO by title, else the first forest root,
/// else someone without a reporting manager.
pub fn identify_main_root<'a>(
    roster: &'a [EmployeeSummary],
    forest: &[EmployeeNode],
) -> Option<&'a EmployeeSummary> {
    if roster.is_empty() || forest.is_empty() {
        return None;
    }
    roster
        .iter()
        .find(|employee| employee.title.to_lowercase().contains("ceo"))
        .or_else(|| roster.iter().find(|employee| employee.id == forest[0].id))
        .or_else(|| {
            roster.iter().find(|employee| {
                employee
                    .reporting_manager_name
                    .as_deref()
                    .map_or(true, |name| name.trim().is_empty())
            })
        })
}
