//! Pixel geometry for the column grid and the manager→report connectors.

use std::collections::HashSet;

use shared::domain::{EmployeeId, EmployeeNode};

use crate::{
    layout::{ColumnLayout, GridPosition},
    view::ScrollOffsets,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub node_width: f32,
    pub node_height: f32,
    pub column_gap: f32,
    pub header_height: f32,
    pub column_padding: f32,
    pub row_gap: f32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            node_width: 220.0,
            node_height: 90.0,
            column_gap: 60.0,
            header_height: 32.0,
            column_padding: 8.0,
            row_gap: 8.0,
        }
    }
}

impl GridGeometry {
    pub fn column_width(&self) -> f32 {
        self.node_width + self.column_gap
    }

    /// Vertical centre of a node box before scrolling.
    pub fn row_center_y(&self, row: usize) -> f32 {
        self.header_height
            + self.column_padding
            + row as f32 * (self.node_height + self.row_gap)
            + self.node_height / 2.0
    }

    fn column_left_x(&self, column: usize) -> f32 {
        column as f32 * self.column_width() + self.column_padding
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Three-segment polyline: out of the parent, along the trunk, into the
/// child.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub parent_id: EmployeeId,
    pub child_id: EmployeeId,
    pub points: [Point; 4],
    pub highlighted: bool,
}

pub fn connectors(
    root: &EmployeeNode,
    layout: &ColumnLayout<'_>,
    collapsed: &HashSet<EmployeeId>,
    scroll: &ScrollOffsets,
    selected_path: Option<&[EmployeeId]>,
    geometry: &GridGeometry,
) -> Vec<Connector> {
    let mut out = Vec::new();
    collect(
        root,
        layout,
        collapsed,
        scroll,
        selected_path,
        geometry,
        &mut out,
    );
    out
}

fn collect(
    node: &EmployeeNode,
    layout: &ColumnLayout<'_>,
    collapsed: &HashSet<EmployeeId>,
    scroll: &ScrollOffsets,
    selected_path: Option<&[EmployeeId]>,
    geometry: &GridGeometry,
    out: &mut Vec<Connector>,
) {
    if collapsed.contains(&node.id) {
        return;
    }
    let Some(parent_pos) = layout.position_of(node.id) else {
        return;
    };
    for child in &node.children {
        let Some(child_pos) = layout.position_of(child.id) else {
            continue;
        };
        if parent_pos.column < child_pos.column {
            out.push(Connector {
                parent_id: node.id,
                child_id: child.id,
                points: polyline(parent_pos, child_pos, scroll, geometry),
                highlighted: consecutive_in_path(selected_path, node.id, child.id),
            });
        }
        collect(child, layout, collapsed, scroll, selected_path, geometry, out);
    }
}

fn polyline(
    parent: GridPosition,
    child: GridPosition,
    scroll: &ScrollOffsets,
    geometry: &GridGeometry,
) -> [Point; 4] {
    let parent_x = geometry.column_left_x(parent.column) + geometry.node_width - scroll.horizontal;
    let child_x = geometry.column_left_x(child.column) - scroll.horizontal;
    let parent_y = geometry.row_center_y(parent.row) - scroll.column(parent.column);
    let child_y = geometry.row_center_y(child.row) - scroll.column(child.column);
    let trunk_x = (parent_x + child_x) / 2.0;

    [
        Point {
            x: parent_x,
            y: parent_y,
        },
        Point {
            x: trunk_x,
            y: parent_y,
        },
        Point {
            x: trunk_x,
            y: child_y,
        },
        Point {
            x: child_x,
            y: child_y,
        },
    ]
}

fn consecutive_in_path(path: Option<&[EmployeeId]>, parent: EmployeeId, child: EmployeeId) -> bool {
    path.is_some_and(|path| {
        path.windows(2)
            .any(|pair| pair[0] == parent && pair[1] == child)
    })
}
