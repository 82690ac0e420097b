//! Column layout of a rooted org-chart tree.
//!
//! Column index is depth below the displayed root; row index is the
//! position inside the column, in traversal order. The layout is a pure
//! function of the tree and the collapsed set.

use std::collections::HashSet;

use shared::domain::{EmployeeId, EmployeeNode};

#[derive(Debug, Clone, Copy)]
pub struct ColumnEntry<'a> {
    pub node: &'a EmployeeNode,
    pub column_index: usize,
    /// Node one column to the left that produced this entry.
    pub parent_id: Option<EmployeeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnLayout<'a> {
    columns: Vec<Vec<ColumnEntry<'a>>>,
}

impl<'a> ColumnLayout<'a> {
    pub fn columns(&self) -> &[Vec<ColumnEntry<'a>>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&[ColumnEntry<'a>]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ColumnEntry<'a>> {
        self.columns.iter().flatten()
    }

    pub fn position_of(&self, id: EmployeeId) -> Option<GridPosition> {
        self.columns.iter().enumerate().find_map(|(column, entries)| {
            entries
                .iter()
                .position(|entry| entry.node.id == id)
                .map(|row| GridPosition { column, row })
        })
    }

    pub fn entry_at(&self, position: GridPosition) -> Option<&ColumnEntry<'a>> {
        self.columns.get(position.column)?.get(position.row)
    }

    /// Ids per column, handy for comparing layouts.
    pub fn ids_by_column(&self) -> Vec<Vec<EmployeeId>> {
        self.columns
            .iter()
            .map(|column| column.iter().map(|entry| entry.node.id).collect())
            .collect()
    }
}

pub fn build_columns<'a>(
    root: &'a EmployeeNode,
    collapsed: &HashSet<EmployeeId>,
) -> ColumnLayout<'a> {
    let mut columns = Vec::new();
    let mut placed = HashSet::new();
    place(root, 0, None, collapsed, &mut columns, &mut placed);
    ColumnLayout { columns }
}

fn place<'a>(
    node: &'a EmployeeNode,
    column_index: usize,
    parent_id: Option<EmployeeId>,
    collapsed: &HashSet<EmployeeId>,
    columns: &mut Vec<Vec<ColumnEntry<'a>>>,
    placed: &mut HashSet<(usize, EmployeeId)>,
) {
    if columns.len() <= column_index {
        columns.resize_with(column_index + 1, Vec::new);
    }

    // Only reachable through two paths if the tree breaks acyclicity.
    if placed.insert((column_index, node.id)) {
        columns[column_index].push(ColumnEntry {
            node,
            column_index,
            parent_id,
        });
    }

    if collapsed.contains(&node.id) {
        return;
    }
    for child in &node.children {
        place(child, column_index + 1, Some(node.id), collapsed, columns, placed);
    }
}

/// Spreadsheet-style label for a column: A..Z, AA, AB, ...
pub fn column_label(index: usize) -> String {
    let mut label = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/layout_tests.rs"]
mod tests;
