use std::fmt::Write as _;

use orgchart_core::{column_label, TreeState};
use shared::domain::{EmployeeId, EmployeeNode};

fn describe(node: &EmployeeNode) -> String {
    let mut line = format!("{} #{}", node.name, node.id);
    if !node.title.is_empty() {
        let _ = write!(line, " ({})", node.title);
    }
    if node.team_size > 0 {
        let _ = write!(line, " [team {}]", node.team_size);
    }
    line
}

/// Columns of the displayed tree, one labelled block per column. Collapsed
/// managers are marked with `+`.
pub fn render_columns(state: &TreeState) -> String {
    let layout = state.columns();
    let mut out = String::new();
    for (index, column) in layout.columns().iter().enumerate() {
        let _ = writeln!(out, "{}", column_label(index));
        for entry in column {
            let marker = if entry.node.has_children() && state.view.is_collapsed(entry.node.id) {
                "+"
            } else {
                " "
            };
            let _ = writeln!(out, " {marker} {}", describe(entry.node));
        }
    }
    out
}

pub fn render_forest(forest: &[EmployeeNode]) -> String {
    forest
        .iter()
        .map(|root| format!("{}\n", describe(root)))
        .collect()
}

/// `Avery > Blake > Dana`, falling back to ids for nodes not on display.
pub fn render_path(state: &TreeState, path: &[EmployeeId]) -> String {
    path.iter()
        .map(|id| {
            state
                .displayed_node(*id)
                .map(|node| node.name.clone())
                .unwrap_or_else(|| format!("#{id}"))
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, name: &str, title: &str, children: Vec<EmployeeNode>) -> EmployeeNode {
        EmployeeNode {
            id: EmployeeId(id),
            name: name.into(),
            title: title.into(),
            avatar: None,
            email: None,
            employee_code: None,
            team_size: children.iter().map(|c| 1 + c.team_size).sum(),
            children,
        }
    }

    fn state() -> TreeState {
        TreeState {
            root: Some(node(
                1,
                "Avery",
                "CEO",
                vec![
                    node(2, "Blake", "", vec![node(4, "Dana", "", Vec::new())]),
                    node(3, "Casey", "", Vec::new()),
                ],
            )),
            ..TreeState::default()
        }
    }

    #[test]
    fn columns_are_labelled_and_annotated() {
        let rendered = render_columns(&state());
        assert_eq!(
            rendered,
            "A\n   Avery #1 (CEO) [team 3]\nB\n   Blake #2 [team 1]\n   Casey #3\nC\n   Dana #4\n"
        );
    }

    #[test]
    fn collapsed_manager_is_marked() {
        let mut state = state();
        state.view.toggle_collapse(EmployeeId(2));
        let rendered = render_columns(&state);
        assert!(rendered.contains(" + Blake #2"));
        assert!(!rendered.contains("Dana"));
    }

    #[test]
    fn path_uses_names() {
        let state = state();
        assert_eq!(
            render_path(&state, &[EmployeeId(1), EmployeeId(2), EmployeeId(9)]),
            "Avery > Blake > #9"
        );
    }
}
