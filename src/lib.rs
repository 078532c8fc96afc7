// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A joint segmentation-selection and cell-tracking engine for microscopy
//! time-lapse image stacks.
//!
//! Given, for each frame, one or more competing candidate segmentations of
//! that frame (possibly overlapping, possibly produced by different
//! segmenters), this crate formulates a binary integer program that chooses
//! a single non-overlapping subset of candidate segments per frame and
//! links the chosen segments across frames into cell lineages —
//! appearances, disappearances, continuations, and divisions.
//!
//! The pipeline has five stages, roughly one module each:
//!
//! - [`segment`] — the immutable input: candidate segments, segmentations,
//!   and processed frames.
//! - [`cost`] — pure numeric cost functions over those segments.
//! - [`node`] and [`graph`] — the factor graph's variable nodes and the
//!   builder that enumerates them and posts the corresponding constraints.
//! - [`milp`] — the binary-LP adapter the graph is solved through.
//! - [`lineage`] — walks a solved assignment back into a forest of `Cell`s.
//! - [`solution`] — the persisted, serializable result.
//! - [`engine`] — ties the above together: build, solve, force/un-force a
//!   constraint and re-solve, extract a solution.

pub mod cost;
pub mod engine;
pub mod error;
pub mod graph;
pub mod lineage;
pub mod mask;
pub mod milp;
pub mod node;
pub mod segment;
pub mod solution;

pub use cost::{CostCalculator, CostParameters};
pub use engine::{SolverStatus, TrackingEngine};
pub use error::{Error, Result};
pub use graph::{BuildState, GraphBuilder, SegmentContext};
pub use lineage::{extract_lineage, AssignmentType, Cell, SegmentAssignment};
pub use mask::{pixel_separation, Mask};
pub use milp::{LinearConstraint, MilpModel, Relation, Status, VarId};
pub use node::{NodeHeader, NodeKind, NodeRef, SegmentRef, VariableNode};
pub use segment::{ProcessedFrame, Segment, Segmentation};
pub use solution::TrackingSolution;
