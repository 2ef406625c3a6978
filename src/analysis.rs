//! One analysis request, end to end.
//!
//! An [`Analysis`] owns everything derived from one document: the feature
//! tree, the parsed cross-tree constraints, the categorized rules and their
//! compiled form. Nothing is shared between analyses. Parsing-stage failures
//! are returned as [`Error`](crate::error::Error); everything later is
//! collected as [`Diagnostic`]s and reported next to the results.
//!
//! ```
//! use mwp_rs::analysis::Analysis;
//! use mwp_rs::search::SearchConfig;
//!
//! let xml = r#"
//! <featureModel>
//!   <feature name="App">
//!     <feature name="Tier" mandatory="true" group="xor">
//!       <feature name="Gold"/>
//!       <feature name="Silver"/>
//!     </feature>
//!   </feature>
//! </featureModel>"#;
//!
//! let analysis = Analysis::from_xml(xml).unwrap();
//! let report = analysis.search(&SearchConfig::default());
//! let products: Vec<String> = report.products.iter().map(|p| p.to_string()).collect();
//! assert_eq!(products, vec!["{App, Gold, Tier}", "{App, Silver, Tier}"]);
//! ```

use log::{info, warn};
use num_bigint::BigUint;
use serde::Serialize;

use crate::constraint::{ConstraintEntry, ConstraintParser, ParsedConstraint};
use crate::error::{Diagnostic, Result};
use crate::feature::{Feature, GroupCatalog};
use crate::record::{ParseResponse, TreeRecord};
use crate::search::{RuleBase, SearchConfig, SearchReport};
use crate::translate::{translate, RuleSet};
use crate::validate::{validate, SelectionReport, ValidationReport};
use crate::xml::parse_document;

#[derive(Debug)]
pub struct Analysis {
    root: Feature,
    constraints: Vec<ParsedConstraint>,
    rules: RuleSet,
    base: RuleBase,
    diagnostics: Vec<Diagnostic>,
}

/// Result of checking one concrete selection against the full rule set.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCheck {
    pub is_valid: bool,
    /// Violated rules, in rule order.
    pub violated: Vec<String>,
    /// Selected names that no rule references.
    pub unknown: Vec<String>,
}

/// Everything one request produces, ready to serialize.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub tree_data: TreeRecord,
    pub rules: RuleSet,
    pub constraints: Vec<ParsedConstraint>,
    pub search: SearchReport,
}

impl Analysis {
    /// Analyzes a document with the default constraint parser.
    pub fn from_xml(text: &str) -> Result<Self> {
        Self::from_xml_with(text, ConstraintParser::new())
    }

    /// Analyzes a document, translating constraint prose with `parser`.
    pub fn from_xml_with(text: &str, parser: ConstraintParser) -> Result<Self> {
        let doc = parse_document(text)?;
        Ok(Self::new(doc.root, &doc.constraints, parser))
    }

    pub fn new(root: Feature, entries: &[ConstraintEntry], parser: ConstraintParser) -> Self {
        let mut diagnostics = root.group_inconsistencies();
        for diag in &diagnostics {
            warn!("{}", diag);
        }

        let parsed = parser.with_atoms(root.atoms()).parse_entries(entries);
        diagnostics.extend(parsed.diagnostics.iter().cloned());

        let rules = translate(&root).with_constraints(parsed.rules());
        let base = RuleBase::compile(&rules);
        diagnostics.extend(base.diagnostics().iter().cloned());

        info!(
            "Analysis of '{}': {} features, {} rules, {} diagnostics",
            root.name,
            root.len(),
            rules.len(),
            diagnostics.len()
        );
        Self {
            root,
            constraints: parsed.constraints,
            rules,
            base,
            diagnostics,
        }
    }

    pub fn root(&self) -> &Feature {
        &self.root
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn constraints(&self) -> &[ParsedConstraint] {
        &self.constraints
    }

    pub fn rule_base(&self) -> &RuleBase {
        &self.base
    }

    /// Group inconsistencies, dropped constraints and broken rules, in that order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn catalog(&self) -> GroupCatalog {
        self.root.group_catalog()
    }

    pub fn parse_response(&self) -> ParseResponse {
        ParseResponse {
            tree_data: TreeRecord::from(&self.root),
            constraints: self.rules.constraints.clone(),
        }
    }

    /// Enumerates products, pruned by the features forced from the root.
    pub fn search(&self, config: &SearchConfig) -> SearchReport {
        let forced = self.root.forced_names();
        let mut report = self.base.search(&forced, config);
        report.diagnostics = self.diagnostics.clone();
        report
    }

    pub fn count(&self) -> BigUint {
        self.base.count()
    }

    /// Evaluates every rule against one selection.
    pub fn check_selection<S: AsRef<str>>(&self, names: impl IntoIterator<Item = S>) -> SelectionCheck {
        let names: Vec<S> = names.into_iter().collect();
        let unknown: Vec<String> = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| self.base.atom(n).is_none())
            .map(str::to_string)
            .collect();
        let selection = self.base.selection(names.iter().map(|n| n.as_ref()));
        let violated: Vec<String> = self
            .base
            .violations(&selection)
            .into_iter()
            .map(|(_, rule)| rule.to_string())
            .collect();
        SelectionCheck {
            is_valid: violated.is_empty() && unknown.is_empty(),
            violated,
            unknown,
        }
    }

    /// Structural group check of a caller's report.
    pub fn validate(&self, selection: &SelectionReport) -> ValidationReport {
        validate(&self.catalog(), selection)
    }

    pub fn report(&self, config: &SearchConfig) -> AnalysisReport {
        AnalysisReport {
            tree_data: TreeRecord::from(&self.root),
            rules: self.rules.clone(),
            constraints: self.constraints.clone(),
            search: self.search(config),
        }
    }
}
