// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Top-level orchestration and the constraint editor.

use log::{debug, info};

use crate::cost::CostCalculator;
use crate::error::{Error, Result};
use crate::graph::{BuildState, GraphBuilder};
use crate::lineage::extract_lineage;
use crate::milp::{Relation, Status};
use crate::node::NodeRef;
use crate::segment::ProcessedFrame;
use crate::solution::TrackingSolution;

/// Lifecycle status of a [`TrackingEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    Initialised,
    Running,
    SolvedOptimal,
    SolvedFeasible,
    Unsolvable,
    Error,
}

/// Drives one `GraphBuilder` through build, solve, constraint-edit, and
/// lineage extraction.
pub struct TrackingEngine<'a> {
    builder: GraphBuilder<'a>,
    root_directory: String,
    status: SolverStatus,
}

impl<'a> TrackingEngine<'a> {
    pub fn new(
        frames: &'a [ProcessedFrame],
        cost_calc: CostCalculator,
        force_all_segments: bool,
        root_directory: impl Into<String>,
    ) -> Result<Self> {
        let builder = GraphBuilder::new(frames, cost_calc, force_all_segments)?;
        Ok(Self { builder, root_directory: root_directory.into(), status: SolverStatus::Initialised })
    }

    pub fn status(&self) -> SolverStatus {
        self.status
    }

    pub fn builder(&self) -> &GraphBuilder<'a> {
        &self.builder
    }

    /// Builds the graph (if not already built) and runs branch-and-bound
    /// with a `max_seconds` wall-clock budget.
    pub fn solve(&mut self, max_seconds: f64) -> Result<SolverStatus> {
        if self.builder.state() == BuildState::Empty {
            debug!("building factor graph before first solve");
            self.builder.build()?;
        }

        self.status = SolverStatus::Running;
        let status = self.builder.milp.solve(max_seconds);
        self.status = match status {
            Status::Optimal => SolverStatus::SolvedOptimal,
            Status::Feasible => SolverStatus::SolvedFeasible,
            Status::Infeasible => SolverStatus::Unsolvable,
            Status::NoSolution | Status::Error => SolverStatus::Error,
        };
        info!("solve finished with status {:?}", self.status);
        Ok(self.status)
    }

    /// Forces (or un-forces) a node's inclusion in the chosen assignment by
    /// adding (or removing) a named `x = 1` constraint on the underlying
    /// MILP model, then marks the current solve stale.
    pub fn force(&mut self, node_ref: NodeRef, on: bool) -> Result<()> {
        if node_ref >= self.builder.nodes().len() {
            return Err(Error::InvalidInput(format!("no such node ref {node_ref}")));
        }

        let var = self.builder.nodes()[node_ref].mip_var();
        let name = format!("manual_{}", self.builder.milp.var_name(var));

        if on {
            self.builder.milp.add_linear_constraint(vec![(var, 1.0)], Relation::Equal, 1.0, Some(&name));
        } else {
            self.builder.milp.remove_constraint(&name);
        }
        self.builder.nodes[node_ref].header_mut().force_inclusion = on;

        self.status = SolverStatus::Initialised;
        Ok(())
    }

    /// Returns whether `node_ref` currently carries a forced-inclusion
    /// constraint (for display by a constraint editor UI).
    pub fn is_forced(&self, node_ref: NodeRef) -> bool {
        self.builder.nodes()[node_ref].header().force_inclusion
    }

    /// Extracts the lineage forest from the last solve and assembles the
    /// persisted solution. Fails if the last solve did not produce at least
    /// a feasible assignment.
    pub fn solution(&self) -> Result<TrackingSolution> {
        match self.status {
            SolverStatus::SolvedOptimal | SolverStatus::SolvedFeasible => {}
            _ => {
                return Err(Error::Solver(format!(
                    "cannot extract a solution in status {:?}",
                    self.status
                )))
            }
        }

        let cells = extract_lineage(&self.builder)?;
        let frames = self.builder.frames();
        Ok(TrackingSolution {
            total_frames: frames.len() as u32,
            root_directory: self.root_directory.clone(),
            image_filenames: frames.iter().map(|f| f.image_names.clone()).collect(),
            cells,
        })
    }
}
