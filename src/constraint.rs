//! Cross-tree constraint parsing.
//!
//! Constraint entries arrive either as a raw boolean expression, taken
//! verbatim, or as an English statement such as `"ByLocation requires
//! Location"`. Statements are split on the first keyword and each side is
//! reduced to an atom by picking out its run of capitalized words. That
//! reduction is a best-effort guess, so every heuristic result is marked as
//! such, and a [`ConstraintOverride`] can supply an exact translation per
//! statement instead.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use log::{debug, warn};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::Diagnostic;

/// One `constraint` element of a feature-model document.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConstraintEntry {
    pub english: Option<String>,
    pub boolean: Option<String>,
}

impl ConstraintEntry {
    pub fn english(text: impl Into<String>) -> Self {
        Self {
            english: Some(text.into()),
            boolean: None,
        }
    }

    pub fn boolean(text: impl Into<String>) -> Self {
        Self {
            english: None,
            boolean: Some(text.into()),
        }
    }
}

/// A cross-tree rule, independent of the tree structure.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Constraint {
    /// `A -> B`
    Requires(String, String),
    /// `A -> !B`, i.e. `!A | !B`
    Excludes(String, String),
    /// Raw propositional expression, taken verbatim.
    Boolean(String),
}

impl Constraint {
    /// The rule string in propositional syntax.
    pub fn to_rule(&self) -> String {
        match self {
            Constraint::Requires(a, b) => format!("{} -> {}", a, b),
            Constraint::Excludes(a, b) => format!("{} -> !{}", a, b),
            Constraint::Boolean(expr) => expr.trim().to_string(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rule())
    }
}

/// Where a parsed constraint's rule came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    /// A boolean expression passed through unchanged.
    Verbatim,
    /// Extracted from prose. `resolved` is true when both sides matched known atoms.
    Heuristic { resolved: bool },
    /// Supplied by a [`ConstraintOverride`].
    Override,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedConstraint {
    /// The entry text the constraint was derived from.
    pub source: String,
    pub constraint: Constraint,
    pub provenance: Provenance,
}

impl ParsedConstraint {
    pub fn rule(&self) -> String {
        self.constraint.to_rule()
    }

    /// True when the rule was guessed from prose without matching known atoms.
    pub fn is_best_effort(&self) -> bool {
        matches!(self.provenance, Provenance::Heuristic { resolved: false })
    }
}

impl Serialize for ParsedConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ParsedConstraint", 3)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("rule", &self.rule())?;
        state.serialize_field("provenance", &self.provenance)?;
        state.end()
    }
}

/// Result of parsing a batch of entries: kept constraints plus dropped-entry diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ConstraintParse {
    pub constraints: Vec<ParsedConstraint>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConstraintParse {
    pub fn rules(&self) -> Vec<String> {
        self.constraints.iter().map(|c| c.rule()).collect()
    }
}

/// Human-in-the-loop translation of an English statement.
///
/// `suggested` is the heuristic translation, if the heuristic produced one.
/// Returning `None` keeps the heuristic result.
pub trait ConstraintOverride {
    fn translate(&self, statement: &str, suggested: Option<&str>) -> Option<String>;
}

impl<F> ConstraintOverride for F
where
    F: Fn(&str, Option<&str>) -> Option<String>,
{
    fn translate(&self, statement: &str, suggested: Option<&str>) -> Option<String> {
        self(statement, suggested)
    }
}

/// Lookup table of exact translations, keyed by the trimmed statement text.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable(pub HashMap<String, String>);

impl OverrideTable {
    pub fn insert(&mut self, statement: impl Into<String>, rule: impl Into<String>) {
        self.0.insert(statement.into().trim().to_string(), rule.into());
    }
}

impl FromIterator<(String, String)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut table = OverrideTable::default();
        for (statement, rule) in iter {
            table.insert(statement, rule);
        }
        table
    }
}

impl ConstraintOverride for OverrideTable {
    fn translate(&self, statement: &str, _suggested: Option<&str>) -> Option<String> {
        self.0.get(statement.trim()).cloned()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Keyword {
    Requires,
    Required,
    Excludes,
}

impl Keyword {
    /// Checked in this order: `requires` before `required` before `excludes`.
    const ALL: [Keyword; 3] = [Keyword::Requires, Keyword::Required, Keyword::Excludes];

    fn text(self) -> &'static str {
        match self {
            Keyword::Requires => "requires",
            Keyword::Required => "required",
            Keyword::Excludes => "excludes",
        }
    }
}

/// Words dropped from the front of a fragment before picking out the identifier,
/// unless they name a known atom or end the fragment.
const LEADING_NOISE: &[&str] = &["The", "A", "An", "Feature", "If", "When", "Selecting"];

#[derive(Default)]
pub struct ConstraintParser {
    known_atoms: BTreeSet<String>,
    overrides: Option<Box<dyn ConstraintOverride>>,
}

impl ConstraintParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atoms of the model; extracted identifiers are resolved against them.
    pub fn with_atoms<I, S>(mut self, atoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_atoms = atoms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_override(mut self, hook: impl ConstraintOverride + 'static) -> Self {
        self.overrides = Some(Box::new(hook));
        self
    }

    pub fn parse_entries<'e>(&self, entries: impl IntoIterator<Item = &'e ConstraintEntry>) -> ConstraintParse {
        let mut result = ConstraintParse::default();
        for entry in entries {
            match self.parse_entry(entry) {
                Ok(Some(parsed)) => result.constraints.push(parsed),
                Ok(None) => {}
                Err(diag) => {
                    warn!("Dropping constraint: {}", diag);
                    result.diagnostics.push(diag);
                }
            }
        }
        result
    }

    /// Parses one entry. A boolean expression wins over an English statement.
    ///
    /// `Ok(None)` means the entry is empty.
    pub fn parse_entry(&self, entry: &ConstraintEntry) -> Result<Option<ParsedConstraint>, Diagnostic> {
        let non_blank = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(expr) = non_blank(&entry.boolean) {
            debug!("Boolean constraint: {}", expr);
            return Ok(Some(ParsedConstraint {
                source: expr.clone(),
                constraint: Constraint::Boolean(expr),
                provenance: Provenance::Verbatim,
            }));
        }

        match non_blank(&entry.english) {
            Some(statement) => self.parse_statement(&statement).map(Some),
            None => Ok(None),
        }
    }

    /// Parses one English statement, consulting the override hook if configured.
    pub fn parse_statement(&self, statement: &str) -> Result<ParsedConstraint, Diagnostic> {
        let heuristic = self.extract(statement);
        let suggested = heuristic.as_ref().ok().map(|(c, _)| c.to_rule());

        if let Some(hook) = &self.overrides {
            if let Some(rule) = hook.translate(statement, suggested.as_deref()) {
                debug!("Override for {:?}: {}", statement, rule);
                return Ok(ParsedConstraint {
                    source: statement.to_string(),
                    constraint: Constraint::Boolean(rule),
                    provenance: Provenance::Override,
                });
            }
        }

        let (constraint, resolved) = heuristic.map_err(|reason| Diagnostic::UnparsableConstraint {
            entry: statement.to_string(),
            reason,
        })?;
        if !resolved {
            warn!("Best-effort translation of {:?}: {}", statement, constraint);
        }
        Ok(ParsedConstraint {
            source: statement.to_string(),
            constraint,
            provenance: Provenance::Heuristic { resolved },
        })
    }

    fn extract(&self, statement: &str) -> Result<(Constraint, bool), String> {
        let lowered = statement.to_ascii_lowercase();
        let keyword = Keyword::ALL
            .into_iter()
            .find(|k| lowered.contains(k.text()))
            .ok_or_else(|| "no 'requires', 'required' or 'excludes' keyword".to_string())?;

        let occurrences = lowered.matches(keyword.text()).count();
        if occurrences != 1 {
            return Err(format!(
                "'{}' splits the statement into {} fragments, expected 2",
                keyword.text(),
                occurrences + 1
            ));
        }

        // ASCII lowercasing keeps byte offsets, so the index is valid in `statement`.
        let at = lowered.find(keyword.text()).unwrap_or_default();
        let left = &statement[..at];
        let right = &statement[at + keyword.text().len()..];

        let (a, a_known) = self
            .identifier(left)
            .ok_or_else(|| format!("no feature name before '{}'", keyword.text()))?;
        let (b, b_known) = self
            .identifier(right)
            .ok_or_else(|| format!("no feature name after '{}'", keyword.text()))?;

        let constraint = match keyword {
            Keyword::Requires | Keyword::Required => Constraint::Requires(a, b),
            Keyword::Excludes => Constraint::Excludes(a, b),
        };
        Ok((constraint, a_known && b_known))
    }

    /// Reduces a prose fragment to a feature name.
    ///
    /// The first run of capitalized words (after leading noise words) is joined
    /// into one identifier. With known atoms, a run or single word naming an atom
    /// is preferred. Returns the name and whether it is a known atom.
    fn identifier(&self, fragment: &str) -> Option<(String, bool)> {
        let words: Vec<&str> = fragment
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();
        let is_capitalized = |w: &str| w.chars().next().is_some_and(|c| c.is_uppercase() || c.is_ascii_digit());

        if let Some(&w) = words.iter().find(|&&w| self.known_atoms.contains(w)) {
            return Some((w.to_string(), true));
        }

        // A noise word is only dropped when another capitalized word follows it.
        let mut skip = 0;
        while skip + 1 < words.len() && LEADING_NOISE.contains(&words[skip]) && is_capitalized(words[skip + 1]) {
            skip += 1;
        }
        let words = &words[skip..];

        let run: String = words
            .iter()
            .copied()
            .skip_while(|&w| !is_capitalized(w))
            .take_while(|&w| is_capitalized(w))
            .collect();
        if run.is_empty() {
            return None;
        }
        let known = self.known_atoms.contains(&run);
        Some((run, known))
    }
}
