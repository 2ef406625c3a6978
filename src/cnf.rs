//! Clause encoding of rules.
//!
//! Atoms `0..n` of the rule universe map to variables `1..=n`; sub-formulas
//! get fresh auxiliary variables above `n` via the Tseitin transformation.
//! Every auxiliary variable is defined by a full equivalence, so each
//! assignment of the atoms extends to exactly one model of the clauses. That
//! is what lets the solver enumerate products by blocking atom literals only.

use crate::ast::Expr;
use crate::types::{Lit, Var};

#[derive(Debug, Clone, Default)]
pub struct Cnf {
    num_atoms: usize,
    num_vars: u32,
    clauses: Vec<Vec<Lit>>,
}

impl Cnf {
    pub fn new(num_atoms: usize) -> Self {
        Self {
            num_atoms,
            num_vars: num_atoms as u32,
            clauses: Vec::new(),
        }
    }

    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars as usize
    }

    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// Variable of the atom with universe index `atom`.
    pub fn atom_var(&self, atom: usize) -> Var {
        assert!(atom < self.num_atoms, "atom index {} out of range", atom);
        Var::new(atom as u32 + 1)
    }

    pub fn atom_vars(&self) -> Vec<Var> {
        (0..self.num_atoms).map(|i| self.atom_var(i)).collect()
    }

    fn fresh(&mut self) -> Var {
        self.num_vars += 1;
        Var::new(self.num_vars)
    }

    /// Adds a clause. An empty clause makes the formula unsatisfiable.
    pub fn add_clause(&mut self, lits: impl IntoIterator<Item = Lit>) {
        self.clauses.push(lits.into_iter().collect());
    }

    /// Asserts that `expr` holds.
    ///
    /// Top-level conjunctions, disjunctions and implications become clauses
    /// directly; only nested sub-formulas get auxiliary variables.
    pub fn assert_expr(&mut self, expr: &Expr<usize>) {
        match expr {
            Expr::Const(true) => {}
            Expr::Const(false) => self.add_clause([]),
            Expr::And(a, b) => {
                self.assert_expr(a);
                self.assert_expr(b);
            }
            Expr::Or(a, b) => {
                let a = self.encode(a);
                let b = self.encode(b);
                self.add_clause([a, b]);
            }
            Expr::Implies(a, b) => {
                let a = self.encode(a);
                let b = self.encode(b);
                self.add_clause([-a, b]);
            }
            _ => {
                let lit = self.encode(expr);
                self.add_clause([lit]);
            }
        }
    }

    /// Returns a literal equivalent to `expr`, defining auxiliaries as needed.
    fn encode(&mut self, expr: &Expr<usize>) -> Lit {
        match expr {
            Expr::Var(atom) => self.atom_var(*atom).pos(),
            Expr::Not(a) => -self.encode(a),
            Expr::Const(b) => {
                let x = self.fresh().pos();
                self.add_clause([if *b { x } else { -x }]);
                x
            }
            Expr::And(a, b) => {
                let a = self.encode(a);
                let b = self.encode(b);
                let x = self.fresh().pos();
                self.add_clause([-x, a]);
                self.add_clause([-x, b]);
                self.add_clause([x, -a, -b]);
                x
            }
            Expr::Or(a, b) => {
                let a = self.encode(a);
                let b = self.encode(b);
                self.or_gate(a, b)
            }
            Expr::Implies(a, b) => {
                let a = self.encode(a);
                let b = self.encode(b);
                self.or_gate(-a, b)
            }
        }
    }

    fn or_gate(&mut self, a: Lit, b: Lit) -> Lit {
        let x = self.fresh().pos();
        self.add_clause([x, -a]);
        self.add_clause([x, -b]);
        self.add_clause([-x, a, b]);
        x
    }

    /// DIMACS CNF rendering, with atom names as `c feature <id> <name>` comments.
    pub fn to_dimacs(&self, names: &[String]) -> String {
        let mut out = String::new();
        for (i, name) in names.iter().enumerate().take(self.num_atoms) {
            out.push_str(&format!("c feature {} {}\n", i + 1, name));
        }
        out.push_str(&format!("p cnf {} {}\n", self.num_vars, self.clauses.len()));
        for clause in &self.clauses {
            for lit in clause {
                out.push_str(&format!("{} ", lit.to_dimacs()));
            }
            out.push_str("0\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> Expr<usize> {
        Expr::var(i)
    }

    #[test]
    fn test_top_level_implication_is_one_clause() {
        let mut cnf = Cnf::new(2);
        cnf.assert_expr(&Expr::implies(v(0), v(1)));
        assert_eq!(cnf.num_vars(), 2);
        assert_eq!(cnf.clauses(), &[vec![Lit::from(-1), Lit::from(2)]]);
    }

    #[test]
    fn test_top_level_conjunction_splits() {
        let mut cnf = Cnf::new(2);
        cnf.assert_expr(&Expr::and(v(0), Expr::not(v(1))));
        assert_eq!(cnf.clauses(), &[vec![Lit::from(1)], vec![Lit::from(-2)]]);
    }

    #[test]
    fn test_nested_formula_gets_auxiliaries() {
        let mut cnf = Cnf::new(3);
        // 0 -> (1 & !2)
        cnf.assert_expr(&Expr::implies(v(0), Expr::and(v(1), Expr::not(v(2)))));
        assert_eq!(cnf.num_vars(), 4);
        assert_eq!(cnf.clauses().len(), 4);
        assert_eq!(cnf.clauses()[3], vec![Lit::from(-1), Lit::from(4)]);
    }

    #[test]
    fn test_false_is_empty_clause() {
        let mut cnf = Cnf::new(1);
        cnf.assert_expr(&Expr::Const(false));
        assert_eq!(cnf.clauses(), &[Vec::<Lit>::new()]);
    }

    #[test]
    fn test_dimacs() {
        let mut cnf = Cnf::new(2);
        cnf.assert_expr(&Expr::implies(v(0), v(1)));
        let text = cnf.to_dimacs(&["A".to_string(), "B".to_string()]);
        assert_eq!(text, "c feature 1 A\nc feature 2 B\np cnf 2 1\n-1 2 0\n");
    }
}
