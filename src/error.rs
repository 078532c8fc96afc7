// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::graph::BuildState;

/// Errors that can occur while building, solving or persisting a tracking model.
#[derive(Debug)]
pub enum Error {
    /// The input given to the graph builder was structurally invalid.
    InvalidInput(String),

    /// A method was called on the builder in the wrong build-state.
    ///
    /// `expected` is the state the call required; `actual` is the state the
    /// builder was actually in.
    WrongBuildState { expected: BuildState, actual: BuildState },

    /// The MILP solver reported an internal error.
    Solver(String),

    /// Lineage extraction found a chosen `SegmentNode` without exactly one
    /// chosen outgoing assignment.
    InconsistentSolution(String),

    /// I/O error while saving or loading a persisted record.
    Io(std::io::Error),

    /// Malformed persisted record.
    Decode(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TrackingEngineError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

/// Engine result.
pub type Result<T> = std::result::Result<T, Error>;
