//! # mwp-rs: Feature-model analysis in Rust
//!
//! **`mwp-rs`** turns a software product line's feature model into propositional logic and enumerates
//! its **Minimum Working Products (MWPs)**: the feature selections that satisfy every structural and
//! cross-tree constraint.
//!
//! ## What is a feature model?
//!
//! A feature model is a tree of named features. A child may be mandatory (present whenever its parent
//! is), and a parent may group its children as OR (at least one), XOR (exactly one) or AND (all).
//! Cross-tree constraints such as *"ByLocation requires Location"* relate features anywhere in the tree.
//! Every feature name is an **atom**: a boolean variable that is true when the feature is selected.
//!
//! ## Key Features
//!
//! - **One implication per relationship**: the [`translate`] module emits categorized rules
//!   (`root`, `mandatory`, `children_to_parent`, `xor`, `or`, `constraints`), each independently checkable.
//! - **Structural evaluation**: rules are tokenized and parsed into an [`Expr`][crate::ast::Expr] tree,
//!   never evaluated by text substitution, so names that are substrings of each other stay distinct.
//! - **Two search strategies**: a brute-force reference walk and a clause-based SAT enumeration that
//!   reproduces the same output sequence.
//! - **Diagnostics, not panics**: dropped constraints, broken rules and inconsistent groups are collected
//!   and reported next to whatever result is still valid.
//!
//! ## Basic Usage
//!
//! ```rust
//! use mwp_rs::feature::{Feature, GroupType};
//! use mwp_rs::search::{find_mwps, SearchConfig};
//! use mwp_rs::translate::translate;
//!
//! // 1. Build the tree
//! let root = Feature::new("App").mandatory().with_child(
//!     Feature::new("Filtered")
//!         .mandatory()
//!         .with_group(GroupType::Or)
//!         .with_child(Feature::new("ByDiscount"))
//!         .with_child(Feature::new("ByLocation")),
//! );
//!
//! // 2. Translate it into rules, adding a cross-tree constraint
//! let rules = translate(&root).with_constraints(["ByLocation -> ByDiscount".to_string()]);
//!
//! // 3. Enumerate the valid products
//! let report = find_mwps(&rules, &root.forced_names(), &SearchConfig::default());
//! assert_eq!(report.products.len(), 2);
//! assert!(report.products.iter().all(|p| p.contains("ByDiscount")));
//! ```
//!
//! ## Core Components
//!
//! - **[`analysis`]**: One request end to end: document, tree, rules, products and diagnostics.
//! - **[`search`]**: The MWP search engine and its [`SearchConfig`][crate::search::SearchConfig].
//! - **[`validate`]**: Fast structural check of a selection against the declared groups.
//! - **[`sat`]**: A small DPLL solver with model enumeration and counting.
//!
//! For the rule syntax, check the [`parser`] module documentation.

pub mod analysis;
pub mod ast;
pub mod bitset;
pub mod cnf;
pub mod constraint;
pub mod error;
pub mod feature;
pub mod parser;
pub mod record;
pub mod sat;
pub mod search;
pub mod translate;
pub mod types;
pub mod validate;
pub mod xml;
