// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Thin adapter around an external binary-LP solver.
//!
//! `MilpModel` does not forward constraint adds/removes straight to the
//! underlying `coin_cbc::Model` — that binding has no notion of removing a
//! row once it has been added. Instead this type owns a small in-memory
//! intermediate representation (variables, named and anonymous linear
//! constraints, an objective) and rebuilds a fresh `coin_cbc::Model` from it
//! on every [`MilpModel::solve`] call. That keeps the constraint editor's
//! force/un-force + re-solve cycle simple and correct; the cost is
//! re-building the CBC model per solve, which is fine since solves are
//! already blocking, synchronous calls with no incremental fast path.

use indexmap::IndexMap;

/// Index of a binary variable in a [`MilpModel`].
pub type VarId = usize;

/// Relation of a linear constraint's left-hand side to its right-hand side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

#[derive(Clone, Debug)]
pub struct LinearConstraint {
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// Outcome of a [`MilpModel::solve`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Optimal,
    Feasible,
    Infeasible,
    NoSolution,
    Error,
}

pub struct MilpModel {
    var_names: Vec<String>,
    named_constraints: IndexMap<String, LinearConstraint>,
    anon_constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, f64)>,
    values: Option<Vec<f64>>,
}

impl Default for MilpModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MilpModel {
    pub fn new() -> Self {
        Self {
            var_names: Vec::new(),
            named_constraints: IndexMap::new(),
            anon_constraints: Vec::new(),
            objective: Vec::new(),
            values: None,
        }
    }

    pub fn add_binary_var(&mut self, name: impl Into<String>) -> VarId {
        let id = self.var_names.len();
        self.var_names.push(name.into());
        self.values = None;
        id
    }

    pub fn add_linear_constraint(
        &mut self,
        terms: Vec<(VarId, f64)>,
        relation: Relation,
        rhs: f64,
        name: Option<&str>,
    ) {
        let constraint = LinearConstraint { terms, relation, rhs };
        match name {
            Some(name) => {
                self.named_constraints.insert(name.to_string(), constraint);
            }
            None => self.anon_constraints.push(constraint),
        }
        self.values = None;
    }

    /// Removes a previously added named constraint. No-op if absent.
    pub fn remove_constraint(&mut self, name: &str) {
        self.named_constraints.shift_remove(name);
        self.values = None;
    }

    pub fn has_constraint(&self, name: &str) -> bool {
        self.named_constraints.contains_key(name)
    }

    /// Sets the objective. The engine always minimizes total assignment
    /// cost; `minimize = false` is accepted for completeness of this
    /// adapter's surface but is unused by the rest of this crate.
    pub fn set_objective(&mut self, terms: Vec<(VarId, f64)>, minimize: bool) {
        self.objective = if minimize {
            terms
        } else {
            terms.into_iter().map(|(v, c)| (v, -c)).collect()
        };
        self.values = None;
    }

    pub fn num_vars(&self) -> usize {
        self.var_names.len()
    }

    /// The name a variable was registered under, for building constraint
    /// names that read back as `manual_<var-name>`.
    pub fn var_name(&self, var: VarId) -> &str {
        &self.var_names[var]
    }

    pub fn num_constraints(&self) -> usize {
        self.named_constraints.len() + self.anon_constraints.len()
    }

    /// Builds a fresh `coin_cbc::Model` from the current IR, runs
    /// branch-and-bound with a `max_seconds` wall-clock budget, and caches
    /// the resulting variable values.
    pub fn solve(&mut self, max_seconds: f64) -> Status {
        let mut model = coin_cbc::Model::default();

        let cols: Vec<coin_cbc::Col> = (0..self.var_names.len()).map(|_| model.add_binary()).collect();

        for constraint in self.named_constraints.values().chain(self.anon_constraints.iter()) {
            let row = model.add_row();
            for &(var, coeff) in &constraint.terms {
                model.set_weight(row, cols[var], coeff);
            }
            match constraint.relation {
                Relation::LessOrEqual => model.set_row_upper(row, constraint.rhs),
                Relation::Equal => model.set_row_equal(row, constraint.rhs),
                Relation::GreaterOrEqual => model.set_row_lower(row, constraint.rhs),
            }
        }

        for &(var, coeff) in &self.objective {
            model.set_obj_coeff(cols[var], coeff);
        }

        model.set_parameter("threads", "0");
        model.set_parameter("seconds", &max_seconds.to_string());

        let solution = model.solve();
        let raw = solution.raw();

        let status = if raw.is_proven_infeasible() {
            Status::Infeasible
        } else if raw.status() == coin_cbc::raw::Status::Finished {
            Status::Optimal
        } else if raw.obj_value().is_finite() {
            Status::Feasible
        } else {
            Status::NoSolution
        };

        if matches!(status, Status::Optimal | Status::Feasible) {
            self.values = Some(cols.iter().map(|&c| solution.col(c)).collect());
        } else {
            self.values = None;
        }

        status
    }

    /// The solved `0|1` value of `var`, after a successful [`solve`]. Panics
    /// if called before a successful solve — the engine never inspects
    /// values before checking the returned status.
    pub fn value(&self, var: VarId) -> u8 {
        let values = self
            .values
            .as_ref()
            .expect("MilpModel::value called before a successful solve");
        if values[var] > 0.5 {
            1
        } else {
            0
        }
    }
}
