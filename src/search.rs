//! Minimum Working Product search.
//!
//! Rules are parsed once into a [`RuleBase`]: the atom universe (in order of
//! first occurrence across the rule buckets) plus one compiled formula per
//! rule. Two strategies enumerate the valid feature sets:
//!
//! - [`Strategy::BruteForce`] walks candidate subsets by increasing size, and
//!   within one size in lexicographic order of atom indices, rejecting a
//!   candidate on the first rule it violates. This order is the reference.
//! - [`Strategy::Sat`] encodes the rules as clauses and enumerates models with
//!   blocking clauses, then sorts them into the reference order. Both produce
//!   the same sequence.
//!
//! A mandatory hint restricts candidates to supersets of the hinted names. The
//! hint must name only features present in every valid product (see
//! [`Feature::forced_names`](crate::feature::Feature::forced_names)); then the
//! result is unchanged and only the number of explored candidates drops.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use num_bigint::BigUint;
use serde::{Serialize, Serializer};

use crate::ast::{Expr, ExprArena};
use crate::bitset::BitSet;
use crate::cnf::Cnf;
use crate::error::{Diagnostic, RuleError};
use crate::parser::parse_rule;
use crate::sat;
use crate::translate::{Category, RuleSet};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Strategy {
    /// Subset enumeration; exponential, reference semantics.
    BruteForce,
    /// Clause encoding with solver-driven model enumeration.
    #[default]
    Sat,
}

/// Configuration for one search.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mwp_rs::search::{SearchConfig, Strategy};
///
/// let config = SearchConfig::default()
///     .with_strategy(Strategy::BruteForce)
///     .with_candidate_budget(10_000)
///     .with_time_budget(Duration::from_secs(5));
/// assert!(config.use_mandatory_pruning);
/// assert!(!config.minimal_only);
/// ```
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub strategy: Strategy,
    /// Only enumerate supersets of the mandatory hint.
    pub use_mandatory_pruning: bool,
    /// Maximum number of candidates (brute force) or models (SAT) examined.
    pub candidate_budget: Option<u64>,
    /// Wall-clock limit for the enumeration.
    pub time_budget: Option<Duration>,
    /// Keep only the products of smallest cardinality.
    pub minimal_only: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Sat,
            use_mandatory_pruning: true,
            candidate_budget: None,
            time_budget: None,
            minimal_only: false,
        }
    }
}

impl SearchConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_mandatory_pruning(mut self, enabled: bool) -> Self {
        self.use_mandatory_pruning = enabled;
        self
    }

    pub fn with_candidate_budget(mut self, budget: u64) -> Self {
        self.candidate_budget = Some(budget);
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_minimal_only(mut self, enabled: bool) -> Self {
        self.minimal_only = enabled;
        self
    }
}

/// A set of selected feature names. Serializes as a sorted list.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<String>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SearchStatus {
    Complete,
    /// A budget ran out; the products found so far are still valid.
    BudgetExceeded { explored: u64 },
}

fn serialize_big<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Number of atoms referenced by the rules.
    pub universe: usize,
    /// Number of atoms fixed by the mandatory hint.
    pub pruned: usize,
    /// Candidate space size, `2^(universe - pruned)`.
    #[serde(serialize_with = "serialize_big")]
    pub search_space: BigUint,
    pub candidates_explored: u64,
    /// Candidates rejected because a rule could not be evaluated.
    pub evaluation_failures: u64,
    /// Rules that failed to compile.
    pub broken_rules: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Outcome of one search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    /// Atom universe in index order.
    pub universe: Vec<String>,
    /// Valid feature sets by increasing size, then lexicographic atom index.
    pub products: Vec<FeatureSet>,
    pub status: SearchStatus,
    pub stats: SearchStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl SearchReport {
    pub fn is_complete(&self) -> bool {
        self.status == SearchStatus::Complete
    }

    pub fn min_cardinality(&self) -> Option<usize> {
        self.products.iter().map(FeatureSet::len).min()
    }

    /// Products of smallest cardinality.
    pub fn minimal(&self) -> Vec<&FeatureSet> {
        let min = self.min_cardinality();
        self.products.iter().filter(|p| Some(p.len()) == min).collect()
    }

    /// Atoms present in every product, in universe order.
    ///
    /// With no products, every atom is vacuously core.
    pub fn core_features(&self) -> Vec<&str> {
        self.universe
            .iter()
            .filter(|atom| self.products.iter().all(|p| p.contains(atom)))
            .map(|s| s.as_str())
            .collect()
    }

    /// Atoms present in no product, in universe order.
    pub fn dead_features(&self) -> Vec<&str> {
        self.universe
            .iter()
            .filter(|atom| !self.products.iter().any(|p| p.contains(atom)))
            .map(|s| s.as_str())
            .collect()
    }

    /// Fraction of products containing each atom, in universe order.
    pub fn commonality(&self) -> Vec<(&str, f64)> {
        let total = self.products.len();
        self.universe
            .iter()
            .map(|atom| {
                let with = self.products.iter().filter(|p| p.contains(atom)).count();
                let ratio = if total == 0 { 0.0 } else { with as f64 / total as f64 };
                (atom.as_str(), ratio)
            })
            .collect()
    }
}

#[derive(Debug)]
enum Compiled {
    Ready { expr: Expr<usize>, arena: ExprArena },
    Broken,
}

#[derive(Debug)]
struct CompiledRule {
    category: Category,
    text: String,
    compiled: Compiled,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Verdict {
    Accept,
    Reject,
    Failed,
}

/// Rules compiled against their atom universe.
#[derive(Debug)]
pub struct RuleBase {
    universe: Vec<String>,
    index: HashMap<String, usize>,
    rules: Vec<CompiledRule>,
    diagnostics: Vec<Diagnostic>,
}

impl RuleBase {
    /// Parses every rule. A rule that does not parse is kept as broken: it
    /// rejects every candidate and is reported as a diagnostic.
    pub fn compile(rules: &RuleSet) -> Self {
        let mut base = RuleBase {
            universe: Vec::new(),
            index: HashMap::new(),
            rules: Vec::new(),
            diagnostics: Vec::new(),
        };

        for (category, text) in rules.iter() {
            let compiled = match parse_rule(text) {
                Ok(expr) => {
                    for atom in expr.atoms() {
                        base.intern(atom);
                    }
                    expr.try_map_vars(&mut |atom: &String| {
                        base.index
                            .get(atom)
                            .copied()
                            .ok_or_else(|| RuleError::UnknownAtom(atom.clone()))
                    })
                }
                Err(e) => Err(e),
            };
            let compiled = match compiled {
                Ok(expr) => Compiled::Ready {
                    arena: ExprArena::from_boxed(&expr),
                    expr,
                },
                Err(e) => {
                    warn!("Rule {:?} ({}) cannot be evaluated: {}", text, category, e);
                    base.diagnostics.push(Diagnostic::RuleEvaluation {
                        rule: text.to_string(),
                        reason: e.to_string(),
                    });
                    Compiled::Broken
                }
            };
            base.rules.push(CompiledRule {
                category,
                text: text.to_string(),
                compiled,
            });
        }

        debug!(
            "Compiled {} rules over {} atoms ({} broken)",
            base.rules.len(),
            base.universe.len(),
            base.broken_rules()
        );
        base
    }

    fn intern(&mut self, atom: &str) -> usize {
        if let Some(&i) = self.index.get(atom) {
            return i;
        }
        let i = self.universe.len();
        self.universe.push(atom.to_string());
        self.index.insert(atom.to_string(), i);
        i
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn atom(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of rules, broken ones included.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn broken_rules(&self) -> usize {
        self.rules
            .iter()
            .filter(|r| matches!(r.compiled, Compiled::Broken))
            .count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Selection over the universe. Names outside it are ignored.
    pub fn selection<S: AsRef<str>>(&self, names: impl IntoIterator<Item = S>) -> BitSet {
        let mut bits = BitSet::with_capacity(self.universe.len());
        for name in names {
            match self.atom(name.as_ref()) {
                Some(i) => {
                    bits.insert(i);
                }
                None => debug!("Ignoring '{}': not referenced by any rule", name.as_ref()),
            }
        }
        bits
    }

    fn names(&self, bits: &BitSet) -> FeatureSet {
        bits.iter().map(|i| self.universe[i].as_str()).collect()
    }

    fn check(&self, selection: &BitSet) -> Verdict {
        for rule in &self.rules {
            match &rule.compiled {
                Compiled::Ready { arena, .. } => {
                    if !arena.eval(selection) {
                        return Verdict::Reject;
                    }
                }
                Compiled::Broken => return Verdict::Failed,
            }
        }
        Verdict::Accept
    }

    /// Rules not satisfied by `selection`, in rule order, with their bucket.
    /// Broken rules are always reported.
    pub fn violations(&self, selection: &BitSet) -> Vec<(Category, &str)> {
        self.rules
            .iter()
            .filter(|rule| match &rule.compiled {
                Compiled::Ready { arena, .. } => !arena.eval(selection),
                Compiled::Broken => true,
            })
            .map(|rule| (rule.category, rule.text.as_str()))
            .collect()
    }

    /// Clause form of the conjoined rules; a broken rule is an empty clause.
    pub fn to_cnf(&self) -> Cnf {
        let mut cnf = Cnf::new(self.universe.len());
        for rule in &self.rules {
            match &rule.compiled {
                Compiled::Ready { expr, .. } => cnf.assert_expr(expr),
                Compiled::Broken => cnf.add_clause([]),
            }
        }
        cnf
    }

    /// Number of valid products.
    pub fn count(&self) -> BigUint {
        sat::count(&self.to_cnf())
    }

    fn hint(&self, mandatory: &[&str]) -> BitSet {
        let mut bits = BitSet::with_capacity(self.universe.len());
        for &name in mandatory {
            match self.atom(name) {
                Some(i) => {
                    bits.insert(i);
                }
                None => warn!("Mandatory hint '{}' is not referenced by any rule", name),
            }
        }
        bits
    }

    /// Enumerates the valid products.
    pub fn search(&self, mandatory: &[&str], config: &SearchConfig) -> SearchReport {
        let hint = if config.use_mandatory_pruning {
            self.hint(mandatory)
        } else {
            BitSet::default()
        };
        let free = self.universe.len() - hint.len();
        info!(
            "Searching {} atoms ({} fixed) with {:?}",
            self.universe.len(),
            hint.len(),
            config.strategy
        );

        let mut collector = Collector::new(config);
        let status = match config.strategy {
            Strategy::BruteForce => self.brute_force(&hint, &mut collector),
            Strategy::Sat => self.sat_enumerate(&hint, &mut collector),
        };

        let mut found = collector.found;
        if config.minimal_only {
            if let Some(min) = found.iter().map(BitSet::len).min() {
                found.retain(|s| s.len() == min);
            }
        }

        let stats = SearchStats {
            universe: self.universe.len(),
            pruned: hint.len(),
            search_space: BigUint::from(1u32) << free,
            candidates_explored: collector.explored,
            evaluation_failures: collector.failures,
            broken_rules: self.broken_rules(),
            elapsed: collector.started.elapsed(),
        };

        if let SearchStatus::BudgetExceeded { explored } = status {
            warn!("Search budget exceeded after {} candidates", explored);
        }
        if stats.evaluation_failures > 0 {
            warn!("{} candidates rejected by rules that failed to evaluate", stats.evaluation_failures);
        }
        info!(
            "Found {} products ({} candidates explored in {:?})",
            found.len(),
            stats.candidates_explored,
            stats.elapsed
        );

        SearchReport {
            universe: self.universe.clone(),
            products: found.iter().map(|bits| self.names(bits)).collect(),
            status,
            stats,
            diagnostics: self.diagnostics.clone(),
        }
    }

    fn brute_force(&self, hint: &BitSet, collector: &mut Collector<'_>) -> SearchStatus {
        let optional: Vec<usize> = (0..self.universe.len()).filter(|&i| !hint.contains(i)).collect();
        for size in 0..=optional.len() {
            for combination in Combinations::new(optional.len(), size) {
                if collector.exhausted() {
                    return SearchStatus::BudgetExceeded {
                        explored: collector.explored,
                    };
                }
                let mut candidate: BitSet = combination.into_iter().map(|p| optional[p]).collect();
                candidate.union_with(hint);
                collector.explored += 1;
                match self.check(&candidate) {
                    Verdict::Accept => collector.accept(candidate),
                    Verdict::Reject => {}
                    Verdict::Failed => collector.failures += 1,
                }
            }
        }
        SearchStatus::Complete
    }

    fn sat_enumerate(&self, hint: &BitSet, collector: &mut Collector<'_>) -> SearchStatus {
        let mut cnf = self.to_cnf();
        for i in hint.iter() {
            let lit = cnf.atom_var(i).pos();
            cnf.add_clause([lit]);
        }
        let atoms = cnf.atom_vars();

        let mut status = SearchStatus::Complete;
        let mut models = sat::enumerate(&cnf, None);
        for model in models.by_ref() {
            if collector.exhausted() {
                status = SearchStatus::BudgetExceeded {
                    explored: collector.explored,
                };
                break;
            }
            collector.explored += 1;
            let bits: BitSet = atoms
                .iter()
                .enumerate()
                .filter(|&(_, &var)| model.value(var))
                .map(|(i, _)| i)
                .collect();
            collector.accept(bits);
        }
        debug!("Solver stats: {:?}", models.stats());

        // Same order as the subset walk: by size, then by sorted atom indices.
        collector
            .found
            .sort_by_cached_key(|bits| (bits.len(), bits.iter().collect::<Vec<_>>()));
        status
    }
}

struct Collector<'a> {
    config: &'a SearchConfig,
    started: Instant,
    explored: u64,
    failures: u64,
    found: Vec<BitSet>,
    seen: HashSet<BitSet>,
}

impl<'a> Collector<'a> {
    fn new(config: &'a SearchConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            explored: 0,
            failures: 0,
            found: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn exhausted(&self) -> bool {
        self.config.candidate_budget.is_some_and(|b| self.explored >= b)
            || self.config.time_budget.is_some_and(|t| self.started.elapsed() >= t)
    }

    fn accept(&mut self, bits: BitSet) {
        if self.seen.insert(bits.clone()) {
            self.found.push(bits);
        }
    }
}

/// `k`-element subsets of `0..n` in lexicographic order.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }
        let k = self.indices.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                return None;
            }
            i -= 1;
            if self.indices[i] < self.n - k + i {
                break;
            }
        }
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

/// Compiles `rules` and enumerates the valid products.
pub fn find_mwps(rules: &RuleSet, mandatory: &[&str], config: &SearchConfig) -> SearchReport {
    RuleBase::compile(rules).search(mandatory, config)
}

/// Number of valid products of `rules`, without enumerating them.
pub fn count_products(rules: &RuleSet) -> BigUint {
    RuleBase::compile(rules).count()
}
