//! Feature tree model.
//!
//! A [`Feature`] owns its children, so the whole model is a single value
//! rooted at the application feature. Trees are built once (by the document
//! reader or by hand through the builder methods) and only queried afterwards.
//!
//! # Example
//!
//! ```
//! use mwp_rs::feature::{Feature, GroupType};
//!
//! let root = Feature::new("App").mandatory().with_child(
//!     Feature::new("Tier")
//!         .mandatory()
//!         .with_group(GroupType::Xor)
//!         .with_child(Feature::new("Gold"))
//!         .with_child(Feature::new("Silver")),
//! );
//!
//! assert_eq!(root.atoms(), vec!["App", "Tier", "Gold", "Silver"]);
//! assert_eq!(root.mandatory_names(), vec!["App", "Tier"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::Diagnostic;

/// How a feature's *children* relate to the feature itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum GroupType {
    /// Each child is independently optional or mandatory per its own flag.
    #[default]
    None,
    /// All children are required when the parent is selected.
    And,
    /// At least one child is required when the parent is selected.
    Or,
    /// Exactly one child is required when the parent is selected.
    Xor,
}

impl GroupType {
    /// Parses the `group` attribute of a document element.
    ///
    /// Returns `None` for unknown values; a missing attribute is [`GroupType::None`].
    pub fn from_attr(value: Option<&str>) -> Option<GroupType> {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            None => Some(GroupType::None),
            Some(v) if v.is_empty() || v == "none" => Some(GroupType::None),
            Some(v) if v == "and" => Some(GroupType::And),
            Some(v) if v == "or" => Some(GroupType::Or),
            Some(v) if v == "xor" => Some(GroupType::Xor),
            Some(_) => None,
        }
    }

    /// Attribute spelling, or `None` for ungrouped features.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            GroupType::None => None,
            GroupType::And => Some("and"),
            GroupType::Or => Some("or"),
            GroupType::Xor => Some("xor"),
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::None => write!(f, "NONE"),
            GroupType::And => write!(f, "AND"),
            GroupType::Or => write!(f, "OR"),
            GroupType::Xor => write!(f, "XOR"),
        }
    }
}

/// A node in the feature tree.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Feature {
    /// Unique atom identifier, used directly as a propositional variable.
    pub name: String,
    /// Must be present whenever the parent is present.
    pub mandatory: bool,
    pub group_type: GroupType,
    /// Ordered children; the order only affects output ordering.
    pub children: Vec<Feature>,
}

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mandatory: false,
            group_type: GroupType::None,
            children: Vec::new(),
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_group(mut self, group_type: GroupType) -> Self {
        self.group_type = group_type;
        self
    }

    pub fn with_child(mut self, child: Feature) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: Feature) {
        self.children.push(child);
    }

    pub fn children(&self) -> impl Iterator<Item = &Feature> {
        self.children.iter()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_group(&self, group_type: GroupType) -> bool {
        self.group_type == group_type
    }

    /// Pre-order traversal of the subtree rooted at `self`.
    pub fn iter(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// Pre-order traversal yielding each feature with its parent.
    pub fn iter_with_parent(&self) -> impl Iterator<Item = (Option<&Feature>, &Feature)> {
        let mut stack: Vec<(Option<&Feature>, &Feature)> = vec![(None, self)];
        std::iter::from_fn(move || {
            let (parent, node) = stack.pop()?;
            stack.extend(node.children.iter().rev().map(|c| (Some(node), c)));
            Some((parent, node))
        })
    }

    /// Names of all mandatory features in the subtree, in pre-order.
    pub fn mandatory_names(&self) -> Vec<&str> {
        self.iter().filter(|f| f.mandatory).map(|f| f.name.as_str()).collect()
    }

    /// Names forced into every product that selects `self`: `self`, then
    /// mandatory children and AND-group children, transitively.
    ///
    /// Unlike [`Feature::mandatory_names`], a mandatory feature below an
    /// optional one is not included. Called on the root, this is a sound
    /// pruning hint for the search engine.
    pub fn forced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(f) = stack.pop() {
            names.push(f.name.as_str());
            let forced = f
                .children
                .iter()
                .rev()
                .filter(|c| c.mandatory || f.group_type == GroupType::And);
            stack.extend(forced);
        }
        names
    }

    /// Names of all features in the subtree, in pre-order.
    pub fn atoms(&self) -> Vec<&str> {
        self.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Feature> {
        self.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Names that occur more than once in the subtree.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut dups = Vec::new();
        for f in self.iter() {
            if !seen.insert(f.name.as_str()) && !dups.contains(&f.name.as_str()) {
                dups.push(f.name.as_str());
            }
        }
        dups
    }

    /// Groups declared on features that have no children to group.
    pub fn group_inconsistencies(&self) -> Vec<Diagnostic> {
        self.iter()
            .filter(|f| f.group_type != GroupType::None && f.is_leaf())
            .map(|f| Diagnostic::GroupInconsistency {
                group: f.name.clone(),
                reason: format!("{} group declared on a feature without children", f.group_type),
            })
            .collect()
    }

    /// Collects the mandatory set and the group membership of the subtree.
    ///
    /// Groups declared on leaves are left out; see [`Feature::group_inconsistencies`].
    pub fn group_catalog(&self) -> GroupCatalog {
        let mut catalog = GroupCatalog::default();
        for f in self.iter() {
            if f.mandatory {
                catalog.mandatory.insert(f.name.clone());
            }
            if f.is_leaf() {
                continue;
            }
            let children = || -> Vec<String> { f.children.iter().map(|c| c.name.clone()).collect() };
            match f.group_type {
                GroupType::None => {}
                GroupType::And => {
                    catalog.and.insert(f.name.clone(), children());
                }
                GroupType::Or => {
                    catalog.or.insert(f.name.clone(), children());
                }
                GroupType::Xor => {
                    catalog.xor.insert(f.name.clone(), children());
                }
            }
        }
        catalog
    }
}

impl fmt::Display for Feature {
    /// Indented hierarchy, one feature per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn go(node: &Feature, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:indent$}{}", "", node.name, indent = depth * 2)?;
            if node.mandatory {
                write!(f, " (mandatory)")?;
            }
            if node.group_type != GroupType::None {
                write!(f, " [{}]", node.group_type)?;
            }
            writeln!(f)?;
            for child in &node.children {
                go(child, depth + 1, f)?;
            }
            Ok(())
        }
        go(self, 0, f)
    }
}

/// Pre-order iterator over a feature subtree.
pub struct Preorder<'a> {
    stack: Vec<&'a Feature>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Feature;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Canonical mandatory set and group definitions of a model.
///
/// Group maps go from the group (parent) feature name to its children's names.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct GroupCatalog {
    pub mandatory: BTreeSet<String>,
    pub or: BTreeMap<String, Vec<String>>,
    pub xor: BTreeMap<String, Vec<String>>,
    pub and: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_tree() -> Feature {
        Feature::new("App")
            .mandatory()
            .with_child(
                Feature::new("Catalog").mandatory().with_child(
                    Feature::new("Filtered")
                        .mandatory()
                        .with_group(GroupType::Or)
                        .with_child(Feature::new("ByDiscount"))
                        .with_child(Feature::new("ByWeather"))
                        .with_child(Feature::new("ByLocation")),
                ),
            )
            .with_child(Feature::new("Location"))
    }

    #[test]
    fn test_preorder_atoms() {
        let root = catalog_tree();
        assert_eq!(
            root.atoms(),
            vec!["App", "Catalog", "Filtered", "ByDiscount", "ByWeather", "ByLocation", "Location"]
        );
        assert_eq!(root.len(), 7);
    }

    #[test]
    fn test_mandatory_names() {
        let root = catalog_tree();
        assert_eq!(root.mandatory_names(), vec!["App", "Catalog", "Filtered"]);
    }

    #[test]
    fn test_forced_names_skip_optional_subtrees() {
        let root = catalog_tree().with_child(
            Feature::new("Payments")
                .with_group(GroupType::And)
                .with_child(Feature::new("Card"))
                .with_child(Feature::new("Ledger").mandatory()),
        );
        assert_eq!(root.forced_names(), vec!["App", "Catalog", "Filtered"]);
        let payments = root.find("Payments").unwrap();
        assert_eq!(payments.forced_names(), vec!["Payments", "Card", "Ledger"]);
        assert!(root.mandatory_names().contains(&"Ledger"));
    }

    #[test]
    fn test_iter_with_parent() {
        let root = catalog_tree();
        let pairs: Vec<_> = root
            .iter_with_parent()
            .map(|(p, f)| (p.map(|p| p.name.as_str()), f.name.as_str()))
            .collect();
        assert_eq!(pairs[0], (None, "App"));
        assert_eq!(pairs[3], (Some("Filtered"), "ByDiscount"));
        assert_eq!(pairs[6], (Some("App"), "Location"));
    }

    #[test]
    fn test_group_catalog() {
        let root = catalog_tree();
        let catalog = root.group_catalog();
        assert!(catalog.mandatory.contains("Filtered"));
        assert_eq!(catalog.or["Filtered"], vec!["ByDiscount", "ByWeather", "ByLocation"]);
        assert!(catalog.xor.is_empty());
        assert!(catalog.and.is_empty());
    }

    #[test]
    fn test_group_on_leaf_is_inconsistent() {
        let root = Feature::new("App").with_child(Feature::new("Leaf").with_group(GroupType::Xor));
        let diags = root.group_inconsistencies();
        assert_eq!(diags.len(), 1);
        assert!(matches!(&diags[0], Diagnostic::GroupInconsistency { group, .. } if group == "Leaf"));
        assert!(root.group_catalog().xor.is_empty());
    }

    #[test]
    fn test_duplicate_names() {
        let root = Feature::new("App")
            .with_child(Feature::new("A"))
            .with_child(Feature::new("B").with_child(Feature::new("A")));
        assert_eq!(root.duplicate_names(), vec!["A"]);
        assert!(catalog_tree().duplicate_names().is_empty());
    }

    #[test]
    fn test_group_type_from_attr() {
        assert_eq!(GroupType::from_attr(None), Some(GroupType::None));
        assert_eq!(GroupType::from_attr(Some("XOR")), Some(GroupType::Xor));
        assert_eq!(GroupType::from_attr(Some(" or ")), Some(GroupType::Or));
        assert_eq!(GroupType::from_attr(Some("and")), Some(GroupType::And));
        assert_eq!(GroupType::from_attr(Some("alternative")), None);
    }

    #[test]
    fn test_display_hierarchy() {
        let root = Feature::new("App").mandatory().with_child(Feature::new("X"));
        assert_eq!(root.to_string(), "App (mandatory)\n  X\n");
    }
}
