//! Feature-model documents.
//!
//! ```xml
//! <featureModel>
//!   <feature name="App">
//!     <feature name="Tier" mandatory="true" group="xor">
//!       <feature name="Gold"/>
//!       <feature name="Silver"/>
//!     </feature>
//!   </feature>
//!   <constraints>
//!     <constraint>
//!       <englishStatement>Gold requires Tier</englishStatement>
//!     </constraint>
//!   </constraints>
//! </featureModel>
//! ```
//!
//! The document element must contain exactly one top-level `feature`; a
//! document whose own element is a `feature` is taken as the root directly.
//! The root is always mandatory.

use log::debug;
use roxmltree::Node;

use crate::constraint::ConstraintEntry;
use crate::error::{Error, Result};
use crate::feature::{Feature, GroupType};

/// A parsed feature-model document.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Document {
    pub root: Feature,
    /// Constraint entries in document order.
    pub constraints: Vec<ConstraintEntry>,
}

fn malformed(details: impl Into<String>) -> Error {
    Error::MalformedInput { details: details.into() }
}

fn position(node: Node<'_, '_>) -> String {
    let pos = node.document().text_pos_at(node.range().start);
    format!("{}:{}", pos.row, pos.col)
}

/// Parses a document from its text.
pub fn parse_document(text: &str) -> Result<Document> {
    let doc = roxmltree::Document::parse(text).map_err(|e| malformed(e.to_string()))?;
    let top = doc.root_element();

    let root_node = if top.has_tag_name("feature") {
        top
    } else {
        let features: Vec<Node<'_, '_>> = top.children().filter(|n| n.has_tag_name("feature")).collect();
        match features.as_slice() {
            [] => return Err(Error::MissingRootFeature),
            [single] => *single,
            many => {
                return Err(malformed(format!(
                    "expected exactly one top-level feature, found {} (second at {})",
                    many.len(),
                    position(many[1])
                )))
            }
        }
    };

    let mut root = parse_feature(root_node)?;
    root.mandatory = true;

    let duplicates = root.duplicate_names();
    if !duplicates.is_empty() {
        return Err(malformed(format!("duplicate feature names: {}", duplicates.join(", "))));
    }

    let constraints = top
        .children()
        .filter(|n| n.has_tag_name("constraints"))
        .flat_map(|section| section.children().filter(|n| n.has_tag_name("constraint")))
        .map(parse_constraint)
        .collect::<Vec<_>>();

    debug!(
        "Parsed document: {} features, {} constraint entries",
        root.len(),
        constraints.len()
    );
    Ok(Document { root, constraints })
}

/// Names must lex as a single identifier in rule text and not shadow a constant.
fn is_rule_identifier(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || c == '_') && name != "true" && name != "false"
}

fn parse_feature(node: Node<'_, '_>) -> Result<Feature> {
    let name = node
        .attribute("name")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed(format!("feature without a name at {}", position(node))))?;
    if !is_rule_identifier(name) {
        return Err(malformed(format!(
            "feature name {:?} at {} is not usable in rules",
            name,
            position(node)
        )));
    }

    let mandatory = match node.attribute("mandatory").map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) if v == "true" => true,
        Some(v) if v == "false" => false,
        Some(v) => {
            return Err(malformed(format!(
                "feature '{}' has invalid mandatory value {:?}",
                name, v
            )))
        }
    };

    let group = node.attribute("group");
    let group_type = GroupType::from_attr(group).ok_or_else(|| {
        malformed(format!(
            "feature '{}' has unknown group {:?}",
            name,
            group.unwrap_or_default()
        ))
    })?;

    let mut feature = Feature::new(name).with_mandatory(mandatory).with_group(group_type);
    for child in node.children().filter(|n| n.has_tag_name("feature")) {
        feature.add_child(parse_feature(child)?);
    }
    Ok(feature)
}

fn parse_constraint(node: Node<'_, '_>) -> ConstraintEntry {
    let text_of = |tag: &str| -> Option<String> {
        node.children()
            .find(|n| n.has_tag_name(tag))
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    };
    ConstraintEntry {
        english: text_of("englishStatement"),
        boolean: text_of("booleanExpression"),
    }
}
