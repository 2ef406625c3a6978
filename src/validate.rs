//! Structural, group-local check of a caller's selection.
//!
//! This does not consult the rule set. It compares what the caller reports as
//! selected, bucketed like the model's group definitions, against the
//! [`GroupCatalog`], and reports every violation it finds.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::feature::GroupCatalog;

/// The caller's selection, shaped like the group definitions: group maps go
/// from the group feature to its selected children.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionReport {
    pub mandatory: Vec<String>,
    pub or: BTreeMap<String, Vec<String>>,
    pub xor: BTreeMap<String, Vec<String>>,
    pub and: BTreeMap<String, Vec<String>>,
}

impl SelectionReport {
    /// Buckets a flat set of selected names the way an interactive client
    /// reports them.
    ///
    /// An OR group is listed once any child is selected and an AND group once
    /// all of them are. An XOR group is listed as soon as the group feature or
    /// any child is selected, so zero or several choices show up as such.
    pub fn from_selection<S: AsRef<str>>(catalog: &GroupCatalog, selected: impl IntoIterator<Item = S>) -> Self {
        let selected: BTreeSet<String> = selected.into_iter().map(|s| s.as_ref().to_string()).collect();
        let chosen = |children: &Vec<String>| -> Vec<String> {
            children.iter().filter(|c| selected.contains(*c)).cloned().collect()
        };

        let mut report = SelectionReport {
            mandatory: catalog.mandatory.iter().filter(|m| selected.contains(*m)).cloned().collect(),
            ..SelectionReport::default()
        };
        for (group, children) in &catalog.or {
            let picked = chosen(children);
            if !picked.is_empty() {
                report.or.insert(group.clone(), picked);
            }
        }
        for (group, children) in &catalog.xor {
            let picked = chosen(children);
            if selected.contains(group) || !picked.is_empty() {
                report.xor.insert(group.clone(), picked);
            }
        }
        for (group, children) in &catalog.and {
            let picked = chosen(children);
            if picked.len() == children.len() {
                report.and.insert(group.clone(), picked);
            }
        }
        report
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Human-readable violations, in check order.
    pub messages: Vec<String>,
}

/// Runs every check and accumulates all violations.
///
/// Checks, in order:
/// - each reported mandatory name is a declared mandatory feature;
/// - each declared OR group is reported with at least one child;
/// - each reported XOR group is declared and has exactly one child;
/// - each declared AND group is reported with all of its children;
/// - reported children of OR and XOR groups belong to that group.
pub fn validate(catalog: &GroupCatalog, selection: &SelectionReport) -> ValidationReport {
    let mut messages = Vec::new();

    for name in &selection.mandatory {
        if !catalog.mandatory.contains(name) {
            messages.push(format!("Missing mandatory node: {}", name));
        }
    }

    for (group, children) in &catalog.or {
        match selection.or.get(group) {
            Some(picked) if !picked.is_empty() => {
                foreign_children("OR", group, children, picked, &mut messages);
            }
            _ => messages.push(format!("Invalid OR group: {} requires one child to be selected.", group)),
        }
    }

    for (group, picked) in &selection.xor {
        let Some(children) = catalog.xor.get(group) else {
            messages.push(format!("Invalid XOR group: {} is not a declared XOR group.", group));
            continue;
        };
        let distinct: BTreeSet<&String> = picked.iter().collect();
        if distinct.len() != 1 {
            messages.push(format!(
                "Invalid XOR group: {} requires exactly one child to be selected.",
                group
            ));
        }
        foreign_children("XOR", group, children, picked, &mut messages);
    }

    for (group, children) in &catalog.and {
        let complete = selection
            .and
            .get(group)
            .is_some_and(|picked| children.iter().all(|c| picked.contains(c)));
        if !complete {
            messages.push(format!(
                "Invalid AND group: {} requires all children to be selected.",
                group
            ));
        }
    }

    debug!("Validation found {} violations", messages.len());
    ValidationReport {
        is_valid: messages.is_empty(),
        messages,
    }
}

fn foreign_children(kind: &str, group: &str, children: &[String], picked: &[String], messages: &mut Vec<String>) {
    for name in picked.iter().filter(|p| !children.contains(*p)) {
        messages.push(format!("Invalid {} group: {} is not a child of {}.", kind, name, group));
    }
}
