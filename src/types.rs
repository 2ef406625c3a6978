//! Solver variables and literals.
//!
//! When rules are lowered to clauses, atom `i` of the universe becomes
//! variable `i + 1` and Tseitin auxiliaries follow. Literals are stored as
//! signed DIMACS integers.

use std::fmt;
use std::ops::Neg;

/// A 1-indexed solver variable. Zero is the DIMACS clause terminator and is
/// never a variable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// # Panics
    ///
    /// Panics if `id` is zero.
    pub fn new(id: u32) -> Self {
        assert!(id > 0, "solver variables start at 1");
        Var(id)
    }

    /// Position in per-variable tables.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    pub fn pos(self) -> Lit {
        Lit(self.0 as i32)
    }

    pub fn neg(self) -> Lit {
        Lit(-(self.0 as i32))
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(i32);

impl Lit {
    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Signed DIMACS form.
    pub fn to_dimacs(self) -> i32 {
        self.0
    }
}

impl Neg for Lit {
    type Output = Lit;

    fn neg(self) -> Lit {
        Lit(-self.0)
    }
}

impl From<i32> for Lit {
    /// # Panics
    ///
    /// Panics on zero.
    fn from(dimacs: i32) -> Self {
        assert!(dimacs != 0, "zero is not a literal");
        Lit(dimacs)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_positive() { "" } else { "!" };
        write!(f, "{}{}", sign, self.var())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_numbering() {
        let first = Var::new(1);
        assert_eq!(first.index(), 0);
        assert!(first < Var::new(2));
    }

    #[test]
    #[should_panic(expected = "solver variables start at 1")]
    fn test_zero_is_not_a_variable() {
        Var::new(0);
    }

    #[test]
    fn test_polarity() {
        let gold = Var::new(3);
        assert!(gold.pos().is_positive());
        assert!(!gold.neg().is_positive());
        assert_eq!(-gold.pos(), gold.neg());
        assert_eq!(gold.neg().var(), gold);
        assert_eq!(Lit::from(-3), gold.neg());
        assert_eq!(gold.neg().to_dimacs(), -3);
        assert_eq!(gold.neg().to_string(), "!v3");
    }
}
