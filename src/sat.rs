//! A small DPLL solver with model enumeration and model counting.
//!
//! Feature models rarely exceed a few hundred variables, so the solver keeps
//! things plain: unit propagation by clause scanning, chronological
//! backtracking, and decisions on the lowest unassigned variable with the
//! negative phase first (smaller products are found earlier).

use log::debug;
use num_bigint::BigUint;

use crate::cnf::Cnf;
use crate::types::{Lit, Var};

#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Number of decisions made.
    pub decisions: u64,
    /// Number of conflicts encountered.
    pub conflicts: u64,
    /// Number of propagated literals.
    pub propagations: u64,
    /// Number of models returned or counted.
    pub models: u64,
}

/// A total assignment, indexed by variable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub fn value(&self, var: Var) -> bool {
        self.values[var.index()]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The assignment as literals, one per variable.
    pub fn lits(&self) -> impl Iterator<Item = Lit> + '_ {
        self.values.iter().enumerate().map(|(i, &value)| {
            let var = Var::new(i as u32 + 1);
            if value {
                var.pos()
            } else {
                var.neg()
            }
        })
    }
}

#[derive(Debug, Copy, Clone)]
struct Decision {
    trail_len: usize,
    lit: Lit,
    flipped: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Propagation {
    Conflict,
    Satisfied,
    Open,
}

#[derive(Debug, Clone)]
pub struct Solver {
    clauses: Vec<Vec<Lit>>,
    values: Vec<Option<bool>>,
    trail: Vec<Lit>,
    decisions: Vec<Decision>,
    stats: SolverStats,
}

impl Solver {
    pub fn new(num_vars: usize) -> Self {
        Self {
            clauses: Vec::new(),
            values: vec![None; num_vars],
            trail: Vec::new(),
            decisions: Vec::new(),
            stats: SolverStats::default(),
        }
    }

    pub fn from_cnf(cnf: &Cnf) -> Self {
        let mut solver = Solver::new(cnf.num_vars());
        for clause in cnf.clauses() {
            solver.add_clause(clause.iter().copied());
        }
        solver
    }

    pub fn num_vars(&self) -> usize {
        self.values.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Adds a clause, growing the variable range if needed.
    pub fn add_clause(&mut self, lits: impl IntoIterator<Item = Lit>) {
        let mut clause: Vec<Lit> = Vec::new();
        for lit in lits {
            if !clause.contains(&lit) {
                clause.push(lit);
            }
        }
        if let Some(max) = clause.iter().map(|lit| lit.var().index() + 1).max() {
            if max > self.values.len() {
                self.values.resize(max, None);
            }
        }
        self.clauses.push(clause);
    }

    /// Adds the clause excluding `model` restricted to `projection`.
    pub fn block(&mut self, model: &Assignment, projection: &[Var]) {
        let clause: Vec<Lit> = projection
            .iter()
            .map(|&var| if model.value(var) { var.neg() } else { var.pos() })
            .collect();
        self.add_clause(clause);
    }

    fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.values[lit.var().index()].map(|value| value == lit.is_positive())
    }

    fn assign(&mut self, lit: Lit) {
        self.values[lit.var().index()] = Some(lit.is_positive());
        self.trail.push(lit);
    }

    fn undo_to(&mut self, trail_len: usize) {
        while self.trail.len() > trail_len {
            if let Some(lit) = self.trail.pop() {
                self.values[lit.var().index()] = None;
            }
        }
    }

    fn reset(&mut self) {
        self.undo_to(0);
        self.decisions.clear();
    }

    fn propagate(&mut self) -> Propagation {
        loop {
            let mut changed = false;
            let mut all_satisfied = true;

            for i in 0..self.clauses.len() {
                let mut satisfied = false;
                let mut unassigned = 0;
                let mut last_free = None;
                for &lit in &self.clauses[i] {
                    match self.lit_value(lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            unassigned += 1;
                            last_free = Some(lit);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                all_satisfied = false;
                match (unassigned, last_free) {
                    (0, _) => {
                        self.stats.conflicts += 1;
                        return Propagation::Conflict;
                    }
                    (1, Some(lit)) => {
                        self.assign(lit);
                        self.stats.propagations += 1;
                        changed = true;
                    }
                    _ => {}
                }
            }

            if !changed {
                return if all_satisfied {
                    Propagation::Satisfied
                } else {
                    Propagation::Open
                };
            }
        }
    }

    /// Flips the most recent unflipped decision. Returns `false` when the
    /// search space is exhausted.
    fn backtrack(&mut self) -> bool {
        while let Some(decision) = self.decisions.pop() {
            self.undo_to(decision.trail_len);
            if !decision.flipped {
                let lit = -decision.lit;
                self.decisions.push(Decision {
                    trail_len: decision.trail_len,
                    lit,
                    flipped: true,
                });
                self.assign(lit);
                return true;
            }
        }
        false
    }

    /// Decides the lowest unassigned variable. Returns `false` when every
    /// variable is assigned.
    fn decide(&mut self) -> bool {
        let Some(index) = self.values.iter().position(|v| v.is_none()) else {
            return false;
        };
        let lit = Var::new(index as u32 + 1).neg();
        self.decisions.push(Decision {
            trail_len: self.trail.len(),
            lit,
            flipped: false,
        });
        self.assign(lit);
        self.stats.decisions += 1;
        true
    }

    fn model(&self) -> Assignment {
        Assignment {
            values: self.values.iter().map(|v| v.unwrap_or(false)).collect(),
        }
    }

    /// Finds one model of the current clauses.
    pub fn solve(&mut self) -> Option<Assignment> {
        self.reset();
        loop {
            match self.propagate() {
                Propagation::Conflict => {
                    if !self.backtrack() {
                        return None;
                    }
                }
                Propagation::Satisfied | Propagation::Open => {
                    if !self.decide() {
                        self.stats.models += 1;
                        return Some(self.model());
                    }
                }
            }
        }
    }

    /// Counts models over all variables.
    ///
    /// Whenever the clauses are satisfied by a partial assignment, every
    /// completion is a model, so the remaining free variables contribute a
    /// factor of two each.
    pub fn count_models(&mut self) -> BigUint {
        self.reset();
        let mut total = BigUint::ZERO;
        loop {
            let exhausted = match self.propagate() {
                Propagation::Conflict => !self.backtrack(),
                Propagation::Satisfied => {
                    let free = self.values.iter().filter(|v| v.is_none()).count();
                    total += BigUint::from(1u32) << free;
                    self.stats.models += 1;
                    !self.backtrack()
                }
                Propagation::Open => !self.decide() && !self.backtrack(),
            };
            if exhausted {
                debug!("Counted {} models with {:?}", total, self.stats);
                self.reset();
                return total;
            }
        }
    }

    /// Iterates over models distinct on `projection`, at most `limit` of them.
    pub fn enumerate(self, projection: Vec<Var>, limit: Option<usize>) -> Models {
        Models {
            solver: self,
            projection,
            limit,
            found: 0,
            done: false,
        }
    }
}

/// Model iterator; every returned model is blocked on the projection.
#[derive(Debug)]
pub struct Models {
    solver: Solver,
    projection: Vec<Var>,
    limit: Option<usize>,
    found: usize,
    done: bool,
}

impl Models {
    pub fn stats(&self) -> &SolverStats {
        self.solver.stats()
    }
}

impl Iterator for Models {
    type Item = Assignment;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.limit.is_some_and(|limit| self.found >= limit) {
            return None;
        }
        match self.solver.solve() {
            Some(model) => {
                self.solver.block(&model, &self.projection);
                self.found += 1;
                Some(model)
            }
            None => {
                debug!("Enumeration finished after {} models", self.found);
                self.done = true;
                None
            }
        }
    }
}

/// Solves `cnf`, returning one model if it is satisfiable.
pub fn solve(cnf: &Cnf) -> Option<Assignment> {
    Solver::from_cnf(cnf).solve()
}

/// Enumerates models of `cnf` that differ on the atom variables.
pub fn enumerate(cnf: &Cnf, limit: Option<usize>) -> Models {
    Solver::from_cnf(cnf).enumerate(cnf.atom_vars(), limit)
}

/// Number of distinct atom assignments satisfying `cnf`.
///
/// Relies on every auxiliary variable being defined by an equivalence, which
/// [`Cnf`] guarantees.
pub fn count(cnf: &Cnf) -> BigUint {
    Solver::from_cnf(cnf).count_models()
}
