//! Propositional formulas over feature atoms.
//!
//! [`Expr`] is the boxed tree produced by the rule parser. For the hot loop of
//! the search engine the tree is flattened into an [`ExprArena`] whose nodes
//! are topologically sorted, so evaluation is a single reverse sweep with no
//! recursion and no allocation per candidate.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use crate::bitset::BitSet;
use crate::error::RuleError;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expr<T = String> {
    Const(bool),
    Var(T),
    Not(Box<Expr<T>>),
    And(Box<Expr<T>>, Box<Expr<T>>),
    Or(Box<Expr<T>>, Box<Expr<T>>),
    Implies(Box<Expr<T>>, Box<Expr<T>>),
}

impl<T> Expr<T> {
    pub fn var(value: T) -> Self {
        Expr::Var(value)
    }

    pub fn not(value: Self) -> Self {
        match value {
            Expr::Const(b) => Expr::Const(!b),
            Expr::Not(inner) => *inner,
            _ => Expr::Not(Box::new(value)),
        }
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn implies(lhs: Self, rhs: Self) -> Self {
        Expr::Implies(Box::new(lhs), Box::new(rhs))
    }

    /// Left-folded conjunction; `true` when empty.
    pub fn and_many(items: impl IntoIterator<Item = Self>) -> Self {
        items.into_iter().reduce(Expr::and).unwrap_or(Expr::Const(true))
    }

    /// Left-folded disjunction; `false` when empty.
    pub fn or_many(items: impl IntoIterator<Item = Self>) -> Self {
        items.into_iter().reduce(Expr::or).unwrap_or(Expr::Const(false))
    }

    /// Distinct atoms in order of first occurrence (left to right).
    pub fn atoms(&self) -> Vec<&T>
    where
        T: PartialEq,
    {
        let mut out: Vec<&T> = Vec::new();
        let mut stack = vec![self];
        while let Some(e) = stack.pop() {
            match e {
                Expr::Const(_) => {}
                Expr::Var(v) => {
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
                Expr::Not(a) => stack.push(a),
                Expr::And(a, b) | Expr::Or(a, b) | Expr::Implies(a, b) => {
                    stack.push(b);
                    stack.push(a);
                }
            }
        }
        out
    }

    /// Rewrites every atom, failing on the first atom `f` rejects.
    pub fn try_map_vars<U, E, F>(&self, f: &mut F) -> Result<Expr<U>, E>
    where
        F: FnMut(&T) -> Result<U, E>,
    {
        Ok(match self {
            Expr::Const(b) => Expr::Const(*b),
            Expr::Var(v) => Expr::Var(f(v)?),
            Expr::Not(a) => Expr::Not(Box::new(a.try_map_vars(f)?)),
            Expr::And(a, b) => Expr::And(Box::new(a.try_map_vars(f)?), Box::new(b.try_map_vars(f)?)),
            Expr::Or(a, b) => Expr::Or(Box::new(a.try_map_vars(f)?), Box::new(b.try_map_vars(f)?)),
            Expr::Implies(a, b) => {
                Expr::Implies(Box::new(a.try_map_vars(f)?), Box::new(b.try_map_vars(f)?))
            }
        })
    }

    /// Structural evaluation with `->` as material implication.
    pub fn eval_with<E, F>(&self, lookup: &mut F) -> Result<bool, E>
    where
        F: FnMut(&T) -> Result<bool, E>,
    {
        Ok(match self {
            Expr::Const(b) => *b,
            Expr::Var(v) => lookup(v)?,
            Expr::Not(a) => !a.eval_with(lookup)?,
            Expr::And(a, b) => a.eval_with(lookup)? && b.eval_with(lookup)?,
            Expr::Or(a, b) => a.eval_with(lookup)? || b.eval_with(lookup)?,
            Expr::Implies(a, b) => !a.eval_with(lookup)? || b.eval_with(lookup)?,
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Implies(..) => 0,
            Expr::Or(..) => 1,
            Expr::And(..) => 2,
            Expr::Not(_) => 3,
            Expr::Const(_) | Expr::Var(_) => 4,
        }
    }
}

impl Expr<String> {
    /// Evaluates against a valuation; atoms it does not know are an error.
    pub fn eval(&self, valuation: &impl Valuation) -> Result<bool, RuleError> {
        self.eval_with(&mut |atom: &String| {
            valuation
                .value(atom)
                .ok_or_else(|| RuleError::UnknownAtom(atom.clone()))
        })
    }
}

impl<T: fmt::Display> fmt::Display for Expr<T> {
    /// Renders in the rule syntax (`->`, `|`, `&`, `!`) with minimal parentheses.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn child<T: fmt::Display>(e: &Expr<T>, min: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            if e.precedence() < min {
                write!(f, "({})", e)
            } else {
                write!(f, "{}", e)
            }
        }

        match self {
            Expr::Const(b) => write!(f, "{}", b),
            Expr::Var(v) => write!(f, "{}", v),
            Expr::Not(a) => {
                write!(f, "!")?;
                child(&**a, 3, f)
            }
            Expr::And(a, b) => {
                child(&**a, 2, f)?;
                write!(f, " & ")?;
                child(&**b, 3, f)
            }
            Expr::Or(a, b) => {
                child(&**a, 1, f)?;
                write!(f, " | ")?;
                child(&**b, 2, f)
            }
            Expr::Implies(a, b) => {
                child(&**a, 1, f)?;
                write!(f, " -> ")?;
                child(&**b, 0, f)
            }
        }
    }
}

/// Truth values for named atoms.
pub trait Valuation {
    /// `None` when the atom is unknown to this valuation.
    fn value(&self, atom: &str) -> Option<bool>;
}

impl Valuation for HashMap<String, bool> {
    fn value(&self, atom: &str) -> Option<bool> {
        self.get(atom).copied()
    }
}

impl Valuation for BTreeMap<String, bool> {
    fn value(&self, atom: &str) -> Option<bool> {
        self.get(atom).copied()
    }
}

/// A selected-name set is closed-world: every other atom is false.
impl Valuation for HashSet<String> {
    fn value(&self, atom: &str) -> Option<bool> {
        Some(self.contains(atom))
    }
}

impl Valuation for BTreeSet<String> {
    fn value(&self, atom: &str) -> Option<bool> {
        Some(self.contains(atom))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Idx(usize);

#[derive(Debug)]
enum Node {
    Const(bool),
    Term(usize),
    Not(Idx),
    And(Idx, Idx),
    Or(Idx, Idx),
    Implies(Idx, Idx),
}

/// Queues a child and returns the slot it will occupy once popped.
fn enqueue<'a>(frontier: &mut VecDeque<&'a Expr<usize>>, done: usize, child: &'a Expr<usize>) -> Idx {
    frontier.push_back(child);
    Idx(done + frontier.len())
}

// See: https://recursion.wtf/posts/rust_schemes/
/// Flattened formula over atom indices.
#[derive(Debug)]
pub struct ExprArena {
    /// Topology sorted nodes, by construction: children follow their parent.
    nodes: Vec<Node>,
}

impl ExprArena {
    pub fn from_boxed(ast: &Expr<usize>) -> Self {
        let mut frontier: VecDeque<&Expr<usize>> = VecDeque::from([ast]);
        let mut nodes: Vec<Node> = Vec::new();

        while let Some(expr) = frontier.pop_front() {
            let done = nodes.len();
            let node = match expr {
                Expr::Const(b) => Node::Const(*b),
                Expr::Var(i) => Node::Term(*i),
                Expr::Not(a) => Node::Not(enqueue(&mut frontier, done, a)),
                Expr::And(a, b) => {
                    let a = enqueue(&mut frontier, done, a);
                    Node::And(a, enqueue(&mut frontier, done, b))
                }
                Expr::Or(a, b) => {
                    let a = enqueue(&mut frontier, done, a);
                    Node::Or(a, enqueue(&mut frontier, done, b))
                }
                Expr::Implies(a, b) => {
                    let a = enqueue(&mut frontier, done, a);
                    Node::Implies(a, enqueue(&mut frontier, done, b))
                }
            };
            nodes.push(node);
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluates with the atoms in `selection` true and every other atom false.
    pub fn eval(&self, selection: &BitSet) -> bool {
        let mut values = vec![false; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate().rev() {
            values[i] = match *node {
                Node::Const(b) => b,
                Node::Term(atom) => selection.contains(atom),
                Node::Not(a) => !values[a.0],
                Node::And(a, b) => values[a.0] && values[b.0],
                Node::Or(a, b) => values[a.0] || values[b.0],
                Node::Implies(a, b) => !values[a.0] || values[b.0],
            };
        }
        values.first().copied().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> Expr {
        Expr::var(name.to_string())
    }

    #[test]
    fn test_double_negation_collapses() {
        let e = Expr::not(Expr::not(v("A")));
        assert_eq!(e, v("A"));
        assert_eq!(Expr::<String>::not(Expr::Const(true)), Expr::Const(false));
    }

    #[test]
    fn test_display_minimal_parens() {
        let e = Expr::implies(v("A"), Expr::or(v("B"), Expr::and(v("C"), Expr::not(v("D")))));
        assert_eq!(e.to_string(), "A -> B | C & !D");

        let e = Expr::and(Expr::or(v("A"), v("B")), v("C"));
        assert_eq!(e.to_string(), "(A | B) & C");

        let e = Expr::implies(Expr::implies(v("A"), v("B")), v("C"));
        assert_eq!(e.to_string(), "(A -> B) -> C");

        let e = Expr::not(Expr::and(v("A"), v("B")));
        assert_eq!(e.to_string(), "!(A & B)");
    }

    #[test]
    fn test_atoms_first_occurrence() {
        let e = Expr::implies(v("B"), Expr::or(v("A"), Expr::and(v("B"), v("C"))));
        let atoms: Vec<&str> = e.atoms().into_iter().map(|s| s.as_str()).collect();
        assert_eq!(atoms, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_eval_material_implication() {
        let e = Expr::implies(v("A"), v("B"));
        let mut val: HashMap<String, bool> = HashMap::new();
        for (a, b, expected) in [(false, false, true), (false, true, true), (true, false, false), (true, true, true)] {
            val.insert("A".to_string(), a);
            val.insert("B".to_string(), b);
            assert_eq!(e.eval(&val), Ok(expected), "A={} B={}", a, b);
        }
    }

    #[test]
    fn test_eval_unknown_atom() {
        let e = Expr::and(v("A"), v("Z"));
        let val: HashMap<String, bool> = [("A".to_string(), true)].into_iter().collect();
        assert_eq!(e.eval(&val), Err(RuleError::UnknownAtom("Z".to_string())));
    }

    #[test]
    fn test_eval_selection_is_closed_world() {
        let e = Expr::implies(v("A"), Expr::not(v("B")));
        let sel: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        assert_eq!(e.eval(&sel), Ok(true));
        let sel: BTreeSet<String> = ["A".to_string(), "B".to_string()].into_iter().collect();
        assert_eq!(e.eval(&sel), Ok(false));
    }

    #[test]
    fn test_arena_matches_boxed_eval() {
        // (0 & !1) | (1 & !0), i.e. exactly one of {0, 1}
        let e: Expr<usize> = Expr::or(
            Expr::and(Expr::var(0), Expr::not(Expr::var(1))),
            Expr::and(Expr::var(1), Expr::not(Expr::var(0))),
        );
        let arena = ExprArena::from_boxed(&e);
        assert_eq!(arena.len(), 9);

        for bits in 0..4usize {
            let sel: BitSet = (0..2).filter(|i| bits & (1 << i) != 0).collect();
            let expected = e
                .eval_with(&mut |i: &usize| Ok::<_, ()>(sel.contains(*i)))
                .unwrap();
            assert_eq!(arena.eval(&sel), expected, "bits={:02b}", bits);
        }
    }

    #[test]
    fn test_try_map_vars() {
        let e = Expr::implies(v("A"), v("B"));
        let idx: Expr<usize> = e
            .try_map_vars(&mut |s: &String| match s.as_str() {
                "A" => Ok(0),
                "B" => Ok(1),
                other => Err(other.to_string()),
            })
            .unwrap();
        assert_eq!(idx, Expr::implies(Expr::var(0), Expr::var(1)));

        let bad = Expr::and(v("A"), v("Q")).try_map_vars(&mut |s: &String| {
            if s == "A" {
                Ok(0)
            } else {
                Err(s.clone())
            }
        });
        assert_eq!(bad, Err("Q".to_string()));
    }
}
