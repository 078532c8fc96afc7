// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Lineage extraction: converts a solved assignment back into a forest of
//! [`Cell`]s.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::GraphBuilder;
use crate::node::{NodeKind, NodeRef, VariableNode};
use crate::segment::Segment;

/// The four kinds of temporal relation between a chosen segment in frame
/// `t` and zero/one/two chosen segments in frame `t + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentType {
    #[serde(rename = "APPEAR")]
    Appear,
    #[serde(rename = "MAP")]
    Map,
    #[serde(rename = "DIVIDE")]
    Divide,
    #[serde(rename = "EXIT")]
    Exit,
}

impl From<NodeKind> for AssignmentType {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Appearance => Self::Appear,
            NodeKind::Mapping => Self::Map,
            NodeKind::Division => Self::Divide,
            NodeKind::Exit => Self::Exit,
            NodeKind::Segment => unreachable!("a SegmentNode is never itself an assignment"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentAssignment {
    pub assignment_type: AssignmentType,
    pub cost: f64,
}

/// A maximal chain of MAP/DIVIDE assignments starting at an APPEAR (or the
/// birth half of a DIVIDE) and ending at an EXIT or a DIVIDE into two new
/// cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_id: u64,
    pub parent_id: Option<u64>,
    pub first_frame: u32,
    pub lifespan: usize,
    pub segments: Vec<Segment>,
    pub assignments: Vec<SegmentAssignment>,
}

impl Cell {
    pub fn is_alive_at(&self, frame_no: u32) -> bool {
        frame_no >= self.first_frame && frame_no < self.first_frame + self.lifespan as u32
    }

    pub fn segment_at(&self, frame_no: u32) -> Option<&Segment> {
        self.is_alive_at(frame_no)
            .then(|| &self.segments[(frame_no - self.first_frame) as usize])
    }

    pub fn assignment_at(&self, frame_no: u32) -> Option<AssignmentType> {
        self.is_alive_at(frame_no)
            .then(|| self.assignments[(frame_no - self.first_frame) as usize].assignment_type)
    }
}

/// In-progress lineage while walking forward through the chosen assignment
/// forest. `cursor` is always set explicitly at spawn time, so a cell never
/// re-examines a division it didn't just decide to walk into — this keeps
/// the size-tie resolution unambiguous (see DESIGN.md).
struct WipCell {
    cell_id: u64,
    parent_id: Option<u64>,
    node_refs: Vec<NodeRef>,
    segment_refs: Vec<usize>,
    cursor: Option<usize>,
}

fn segment_ref_of(nodes: &[VariableNode], node_ref: NodeRef) -> usize {
    match nodes[node_ref] {
        VariableNode::Segment { segment_ref, .. } => segment_ref,
        _ => unreachable!("expected a SegmentNode reference"),
    }
}

/// Walks the solved factor graph forward from every chosen `AppearanceNode`
/// and builds the resulting `Cell` forest.
pub fn extract_lineage(builder: &GraphBuilder) -> Result<Vec<Cell>> {
    let nodes = builder.nodes();
    let milp = &builder.milp;

    let mut wip: Vec<WipCell> = Vec::new();
    let mut next_cell_id: u64 = 0;

    for (node_ref, node) in nodes.iter().enumerate() {
        if let VariableNode::Appearance { seg_node_ref, .. } = node {
            if milp.value(node.mip_var()) == 1 {
                wip.push(WipCell {
                    cell_id: next_cell_id,
                    parent_id: None,
                    node_refs: vec![node_ref],
                    segment_refs: Vec::new(),
                    cursor: Some(segment_ref_of(nodes, *seg_node_ref)),
                });
                next_cell_id += 1;
            }
        }
    }

    let mut i = 0;
    while i < wip.len() {
        while let Some(seg_ref) = wip[i].cursor {
            let chosen: Vec<NodeRef> = builder
                .segment_context(seg_ref)
                .outgoing
                .iter()
                .copied()
                .filter(|&n| milp.value(nodes[n].mip_var()) == 1)
                .collect();

            if chosen.len() != 1 {
                let message = format!(
                    "segment ref {seg_ref} has {} chosen outgoing assignments, expected exactly 1",
                    chosen.len()
                );
                log::error!("{message}");
                return Err(Error::InconsistentSolution(message));
            }
            let outgoing_ref = chosen[0];

            wip[i].segment_refs.push(seg_ref);
            wip[i].node_refs.push(outgoing_ref);

            match &nodes[outgoing_ref] {
                VariableNode::Exit { .. } => {
                    wip[i].cursor = None;
                }
                VariableNode::Mapping { new_ref, .. } => {
                    wip[i].cursor = Some(segment_ref_of(nodes, *new_ref));
                }
                VariableNode::Division { new_ref_1, new_ref_2, .. } => {
                    let seg1 = segment_ref_of(nodes, *new_ref_1);
                    let seg2 = segment_ref_of(nodes, *new_ref_2);

                    // Larger daughter continues this cell; ties favor the
                    // first-listed daughter.
                    let (larger, smaller) =
                        if builder.segments()[seg1].size >= builder.segments()[seg2].size {
                            (seg1, seg2)
                        } else {
                            (seg2, seg1)
                        };

                    wip.push(WipCell {
                        cell_id: next_cell_id,
                        parent_id: Some(wip[i].cell_id),
                        node_refs: vec![outgoing_ref],
                        segment_refs: Vec::new(),
                        cursor: Some(smaller),
                    });
                    next_cell_id += 1;

                    wip[i].cursor = Some(larger);
                }
                VariableNode::Segment { .. } | VariableNode::Appearance { .. } => {
                    unreachable!("a SegmentNode's outgoing assignment is Exit, Mapping or Division")
                }
            }
        }
        i += 1;
    }

    let mut cells = Vec::with_capacity(wip.len());
    for cell in wip {
        let segments: Vec<Segment> = cell
            .segment_refs
            .iter()
            .map(|&r| builder.segments()[r].clone())
            .collect();
        let assignments: Vec<SegmentAssignment> = cell
            .node_refs
            .iter()
            .map(|&n| SegmentAssignment {
                assignment_type: nodes[n].kind().into(),
                cost: nodes[n].cost(),
            })
            .collect();

        let first_frame = segments
            .first()
            .map(|s| s.frame_id)
            .ok_or_else(|| Error::InconsistentSolution(format!("cell {} has no segments", cell.cell_id)))?;

        cells.push(Cell {
            cell_id: cell.cell_id,
            parent_id: cell.parent_id,
            first_frame,
            lifespan: segments.len(),
            segments,
            assignments,
        });
    }

    Ok(cells)
}
