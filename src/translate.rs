//! Feature tree to propositional logic.
//!
//! The translator is a pure fold over the tree: every subtree yields its own
//! [`RuleSet`] and parents concatenate their children's sets. Each structural
//! relationship becomes one implication, so rules can be checked and reported
//! one at a time.
//!
//! - root `r`: `r` (`root`)
//! - mandatory child `c` of `f`: `f -> c` (`mandatory`)
//! - any child `c` of `f`: `c -> f` (`children_to_parent`)
//! - AND group `g` over `c`: `g -> c` (`mandatory`)
//! - OR group `g` over `a, b`: `g -> (a | b)` (`or`)
//! - XOR group `g` over `a, b`: `g -> ((a & !b) | (b & !a))` (`xor`)
//! - cross-tree constraints: as parsed (`constraints`)

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::feature::{Feature, GroupType};

/// Rule bucket.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Root,
    Mandatory,
    ChildrenToParent,
    Xor,
    Or,
    Constraints,
}

impl Category {
    /// Fixed bucket order used for iteration and display.
    pub const ALL: [Category; 6] = [
        Category::Root,
        Category::Mandatory,
        Category::ChildrenToParent,
        Category::Xor,
        Category::Or,
        Category::Constraints,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Root => "root",
            Category::Mandatory => "mandatory",
            Category::ChildrenToParent => "children_to_parent",
            Category::Xor => "xor",
            Category::Or => "or",
            Category::Constraints => "constraints",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Categorized implication rules. For solving, all buckets are conjoined.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct RuleSet {
    pub root: Vec<String>,
    pub mandatory: Vec<String>,
    pub children_to_parent: Vec<String>,
    pub xor: Vec<String>,
    pub or: Vec<String>,
    pub constraints: Vec<String>,
}

impl RuleSet {
    pub fn bucket(&self, category: Category) -> &[String] {
        match category {
            Category::Root => &self.root,
            Category::Mandatory => &self.mandatory,
            Category::ChildrenToParent => &self.children_to_parent,
            Category::Xor => &self.xor,
            Category::Or => &self.or,
            Category::Constraints => &self.constraints,
        }
    }

    pub fn bucket_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Root => &mut self.root,
            Category::Mandatory => &mut self.mandatory,
            Category::ChildrenToParent => &mut self.children_to_parent,
            Category::Xor => &mut self.xor,
            Category::Or => &mut self.or,
            Category::Constraints => &mut self.constraints,
        }
    }

    /// Appends every bucket of `other` after the matching bucket of `self`.
    pub fn merge(mut self, mut other: RuleSet) -> RuleSet {
        for category in Category::ALL {
            let rules = std::mem::take(other.bucket_mut(category));
            self.bucket_mut(category).extend(rules);
        }
        self
    }

    pub fn with_constraints(mut self, rules: impl IntoIterator<Item = String>) -> RuleSet {
        self.constraints.extend(rules);
        self
    }

    /// All rules, bucket by bucket in [`Category::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        Category::ALL
            .into_iter()
            .flat_map(move |c| self.bucket(c).iter().map(move |r| (c, r.as_str())))
    }

    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|&c| self.bucket(c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for RuleSet {
    /// One header per non-empty bucket, one indented rule per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for category in Category::ALL {
            let rules = self.bucket(category);
            if rules.is_empty() {
                continue;
            }
            writeln!(f, "{}:", category)?;
            for rule in rules {
                writeln!(f, "  {}", rule)?;
            }
        }
        Ok(())
    }
}

/// Translates the tree rooted at `root` into categorized rules.
pub fn translate(root: &Feature) -> RuleSet {
    let rules = RuleSet {
        root: vec![root.name.clone()],
        ..RuleSet::default()
    };
    let rules = rules.merge(translate_subtree(root));
    debug!("Translated '{}' into {} rules", root.name, rules.len());
    rules
}

fn translate_subtree(feature: &Feature) -> RuleSet {
    let mut rules = group_rules(feature);
    for child in &feature.children {
        if child.mandatory {
            rules.mandatory.push(implies(&feature.name, &child.name));
        }
        rules.children_to_parent.push(implies(&child.name, &feature.name));
        rules = rules.merge(translate_subtree(child));
    }
    rules
}

/// Rules for the group `feature` declares over its own children.
///
/// Groups on features without children are skipped.
fn group_rules(feature: &Feature) -> RuleSet {
    let mut rules = RuleSet::default();
    if feature.is_leaf() {
        return rules;
    }

    let names: Vec<&str> = feature.children.iter().map(|c| c.name.as_str()).collect();
    match feature.group_type {
        GroupType::None => {}
        GroupType::And => {
            // Children already marked mandatory have their rule in the walk.
            for child in feature.children.iter().filter(|c| !c.mandatory) {
                rules.mandatory.push(implies(&feature.name, &child.name));
            }
        }
        GroupType::Or => {
            rules.or.push(format!("{} -> ({})", feature.name, names.join(" | ")));
        }
        GroupType::Xor => {
            let terms: Vec<String> = names
                .iter()
                .enumerate()
                .map(|(i, chosen)| {
                    let mut parts = vec![chosen.to_string()];
                    parts.extend(
                        names
                            .iter()
                            .enumerate()
                            .filter(|&(j, _)| j != i)
                            .map(|(_, other)| format!("!{}", other)),
                    );
                    format!("({})", parts.join(" & "))
                })
                .collect();
            rules.xor.push(format!("{} -> ({})", feature.name, terms.join(" | ")));
        }
    }
    rules
}

fn implies(lhs: &str, rhs: &str) -> String {
    format!("{} -> {}", lhs, rhs)
}
