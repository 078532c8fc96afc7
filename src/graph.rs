// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Node graph builder.
//!
//! Builds the factor graph's variable nodes and posts its constraints to a
//! [`MilpModel`]: per-frame segment/appearance/exit nodes, then from the
//! second frame on, mapping nodes for every ordered pair and division nodes
//! for every unordered pair under the `max_cost` prune, then conflict
//! cliques for that frame — all inside one per-frame pass — followed by the
//! continuity, no-consecutive-division, and (optionally)
//! force-all-segments constraints once every frame has been visited.

use std::collections::HashSet;

use crate::cost::CostCalculator;
use crate::error::{Error, Result};
use crate::milp::{MilpModel, Relation};
use crate::node::{NodeKind, NodeRef, SegmentRef, VariableNode, NodeHeader};
use crate::segment::{ProcessedFrame, Segment};

/// Per-build transient back-references for one segment: which assignment
/// nodes lead into it and which lead out of it. Kept as a build-scoped side
/// table instead of a mutable field on `Segment` itself (see DESIGN.md).
#[derive(Default, Clone, Debug)]
pub struct SegmentContext {
    pub incoming: Vec<NodeRef>,
    pub outgoing: Vec<NodeRef>,
}

/// Build-state machine of a [`GraphBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    Empty,
    NodesAdded,
    ConstraintsPosted,
    ReadyToSolve,
}

/// Builds and owns one factor graph for one solve. A fresh `GraphBuilder`
/// is the only reset mechanism; incremental constraint changes between
/// solves go through the constraint editor on the resulting [`MilpModel`],
/// not through rebuilding.
pub struct GraphBuilder<'a> {
    frames: &'a [ProcessedFrame],
    force_all_segments: bool,
    cost_calc: CostCalculator,

    segments: Vec<&'a Segment>,
    frame_offsets: Vec<usize>,
    contexts: Vec<SegmentContext>,

    pub(crate) nodes: Vec<VariableNode>,
    segment_node_ref: Vec<NodeRef>,

    pub(crate) milp: MilpModel,
    state: BuildState,
}

impl<'a> GraphBuilder<'a> {
    /// Validates input and constructs an empty builder. Fails fast with a
    /// descriptive error on an empty frame list, a segment with a zero
    /// mask, or a segment whose mask shape doesn't match its frame's shape
    /// — no partial model is ever constructed.
    pub fn new(
        frames: &'a [ProcessedFrame],
        cost_calc: CostCalculator,
        force_all_segments: bool,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::InvalidInput("frame list is empty".into()));
        }

        for frame in frames {
            for segment in frame.flattened_segments() {
                segment.validate().map_err(Error::InvalidInput)?;
                let (h, w) = segment.mask.shape();
                if (h, w) != frame.frame_shape {
                    return Err(Error::InvalidInput(format!(
                        "segment {}/{} mask shape {:?} does not match frame shape {:?}",
                        segment.frame_id, segment.seg_id, (h, w), frame.frame_shape
                    )));
                }
            }
        }

        Ok(Self {
            frames,
            force_all_segments,
            cost_calc,
            segments: Vec::new(),
            frame_offsets: Vec::new(),
            contexts: Vec::new(),
            nodes: Vec::new(),
            segment_node_ref: Vec::new(),
            milp: MilpModel::new(),
            state: BuildState::Empty,
        })
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    fn push_node(&mut self, cost: f64, var_name: String, node: impl FnOnce(NodeHeader) -> VariableNode) -> NodeRef {
        let mip_var = self.milp.add_binary_var(var_name);
        let header = NodeHeader { cost, mip_var, force_inclusion: false };
        let node_ref = self.nodes.len();
        self.nodes.push(node(header));
        node_ref
    }

    fn segment(&self, seg_ref: SegmentRef) -> &'a Segment {
        self.segments[seg_ref]
    }

    /// Phase 1: enumerates all variable nodes. Transitions
    /// `Empty -> NodesAdded`.
    pub fn build_nodes(&mut self) -> Result<()> {
        if self.state != BuildState::Empty {
            return Err(Error::WrongBuildState { expected: BuildState::Empty, actual: self.state });
        }

        let mut previous_frame_segments: Vec<SegmentRef> = Vec::new();

        for frame in self.frames {
            let frame_offset = self.segments.len();
            self.frame_offsets.push(frame_offset);

            let mut current_frame_segments: Vec<SegmentRef> = Vec::new();
            for segment in frame.flattened_segments() {
                let seg_ref = self.segments.len();
                self.segments.push(segment);
                self.contexts.push(SegmentContext::default());
                current_frame_segments.push(seg_ref);

                let segment_node_ref = self.push_node(
                    self.cost_calc.segment_cost(segment),
                    format!("segment_{}_{}", segment.name, segment.seg_id),
                    |header| VariableNode::Segment { header, segment_ref: seg_ref },
                );
                self.segment_node_ref.push(segment_node_ref);

                let appearance_ref = self.push_node(
                    self.cost_calc.appearance_cost(segment),
                    format!("appear_{}_{}", segment.name, segment.seg_id),
                    |header| VariableNode::Appearance { header, seg_node_ref: segment_node_ref },
                );
                let exit_ref = self.push_node(
                    self.cost_calc.exit_cost(),
                    format!("exit_{}_{}", segment.name, segment.seg_id),
                    |header| VariableNode::Exit { header, seg_node_ref: segment_node_ref },
                );

                self.contexts[seg_ref].incoming.push(appearance_ref);
                self.contexts[seg_ref].outgoing.push(exit_ref);
            }

            if !previous_frame_segments.is_empty() {
                for &prev_ref in &previous_frame_segments {
                    for &new_ref in &current_frame_segments {
                        let prev_seg = self.segment(prev_ref);
                        let new_seg = self.segment(new_ref);
                        let cost = self.cost_calc.mapping_cost(prev_seg, new_seg);
                        let prev_node = self.segment_node_ref[prev_ref];
                        let new_node = self.segment_node_ref[new_ref];

                        let mapping_ref = self.push_node(
                            cost,
                            format!(
                                "map_{}_{}_to_{}_{}",
                                prev_seg.name, prev_seg.seg_id, new_seg.name, new_seg.seg_id
                            ),
                            |header| VariableNode::Mapping { header, old_ref: prev_node, new_ref: new_node },
                        );
                        self.contexts[prev_ref].outgoing.push(mapping_ref);
                        self.contexts[new_ref].incoming.push(mapping_ref);
                    }
                }

                for &prev_ref in &previous_frame_segments {
                    if self.segment(prev_ref).manually_chosen {
                        continue;
                    }
                    for i in 0..current_frame_segments.len() {
                        for j in (i + 1)..current_frame_segments.len() {
                            let a_ref = current_frame_segments[i];
                            let b_ref = current_frame_segments[j];
                            if self.segment(a_ref).manually_chosen || self.segment(b_ref).manually_chosen {
                                continue;
                            }

                            let prev_seg = self.segment(prev_ref);
                            let a_seg = self.segment(a_ref);
                            let b_seg = self.segment(b_ref);
                            let cost = self.cost_calc.division_cost(prev_seg, a_seg, b_seg);

                            if cost >= self.cost_calc.params().max_cost {
                                continue;
                            }

                            let prev_node = self.segment_node_ref[prev_ref];
                            let a_node = self.segment_node_ref[a_ref];
                            let b_node = self.segment_node_ref[b_ref];

                            let division_ref = self.push_node(
                                cost,
                                format!(
                                    "divide_{}_{}_to_{}_{}_and_{}_{}",
                                    prev_seg.name, prev_seg.seg_id, a_seg.name, a_seg.seg_id, b_seg.name, b_seg.seg_id
                                ),
                                |header| VariableNode::Division {
                                    header,
                                    old_ref: prev_node,
                                    new_ref_1: a_node,
                                    new_ref_2: b_node,
                                },
                            );
                            self.contexts[prev_ref].outgoing.push(division_ref);
                            self.contexts[a_ref].incoming.push(division_ref);
                            self.contexts[b_ref].incoming.push(division_ref);
                        }
                    }
                }
            }

            previous_frame_segments = current_frame_segments;
        }

        self.state = BuildState::NodesAdded;
        Ok(())
    }

    /// Phase 2: posts conflict-clique, continuity, no-consecutive-division,
    /// and (if requested) force-all-segments constraints, and sets the
    /// objective. Transitions `NodesAdded -> ConstraintsPosted ->
    /// ReadyToSolve`.
    pub fn post_constraints(&mut self) -> Result<()> {
        if self.state != BuildState::NodesAdded {
            return Err(Error::WrongBuildState { expected: BuildState::NodesAdded, actual: self.state });
        }

        let mut posted_cliques: HashSet<Vec<SegmentRef>> = HashSet::new();

        for (frame_idx, &frame_offset) in self.frame_offsets.clone().iter().enumerate() {
            let frame_len = self.frames[frame_idx].flattened_segments().count();
            for local_idx in 0..frame_len {
                let seg_ref = frame_offset + local_idx;
                let segment = self.segment(seg_ref);
                if segment.conflicts.is_empty() {
                    continue;
                }

                let mut clique: Vec<SegmentRef> =
                    segment.conflicts.iter().map(|&c| frame_offset + c as usize).collect();
                clique.push(seg_ref);
                clique.sort_unstable();
                clique.dedup();

                if !posted_cliques.insert(clique.clone()) {
                    continue;
                }

                let terms = clique
                    .iter()
                    .map(|&r| (self.nodes[self.segment_node_ref[r]].mip_var(), 1.0))
                    .collect();
                self.milp.add_linear_constraint(terms, Relation::LessOrEqual, 1.0, None);
            }
        }

        for seg_ref in 0..self.segments.len() {
            let segment_node_ref = self.segment_node_ref[seg_ref];
            let segment_var = self.nodes[segment_node_ref].mip_var();

            let incoming_terms: Vec<(_, f64)> = self.contexts[seg_ref]
                .incoming
                .iter()
                .map(|&n| (self.nodes[n].mip_var(), 1.0))
                .collect();
            self.milp.add_linear_constraint(
                {
                    let mut terms = incoming_terms.clone();
                    terms.push((segment_var, -1.0));
                    terms
                },
                Relation::Equal,
                0.0,
                None,
            );

            let outgoing_terms: Vec<(_, f64)> = self.contexts[seg_ref]
                .outgoing
                .iter()
                .map(|&n| (self.nodes[n].mip_var(), 1.0))
                .collect();
            self.milp.add_linear_constraint(
                {
                    let mut terms = outgoing_terms;
                    terms.push((segment_var, -1.0));
                    terms
                },
                Relation::Equal,
                0.0,
                None,
            );

            let div_terms: Vec<(_, f64)> = self.contexts[seg_ref]
                .incoming
                .iter()
                .chain(self.contexts[seg_ref].outgoing.iter())
                .filter(|&&n| self.nodes[n].kind() == NodeKind::Division)
                .map(|&n| (self.nodes[n].mip_var(), 1.0))
                .collect();
            if !div_terms.is_empty() {
                self.milp.add_linear_constraint(div_terms, Relation::LessOrEqual, 1.0, None);
            }

            if self.force_all_segments {
                self.milp.add_linear_constraint(vec![(segment_var, 1.0)], Relation::Equal, 1.0, None);
            }
        }

        self.state = BuildState::ConstraintsPosted;

        let objective = self.nodes.iter().map(|n| (n.mip_var(), n.cost())).collect();
        self.milp.set_objective(objective, true);

        self.state = BuildState::ReadyToSolve;
        Ok(())
    }

    /// Runs both build phases. Convenience for callers that don't need to
    /// observe the intermediate `NodesAdded` state.
    pub fn build(&mut self) -> Result<()> {
        self.build_nodes()?;
        self.post_constraints()
    }

    pub fn frames(&self) -> &'a [ProcessedFrame] {
        self.frames
    }

    pub fn nodes(&self) -> &[VariableNode] {
        &self.nodes
    }

    pub fn segments(&self) -> &[&'a Segment] {
        &self.segments
    }

    pub fn segment_context(&self, seg_ref: SegmentRef) -> &SegmentContext {
        &self.contexts[seg_ref]
    }

    pub fn segment_node_ref(&self, seg_ref: SegmentRef) -> NodeRef {
        self.segment_node_ref[seg_ref]
    }
}
