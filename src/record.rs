//! Serializable records exchanged with clients.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::feature::Feature;

/// One node of the tree view. `label` and `value` both carry the name.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRecord {
    pub label: String,
    pub value: String,
    /// `"or"`, `"xor"`, `"and"`, or `null` for ungrouped features.
    pub group_type: Option<String>,
    pub mandatory: bool,
    pub children: Vec<TreeRecord>,
}

impl From<&Feature> for TreeRecord {
    fn from(feature: &Feature) -> Self {
        TreeRecord {
            label: feature.name.clone(),
            value: feature.name.clone(),
            group_type: feature.group_type.as_attr().map(str::to_string),
            mandatory: feature.mandatory,
            children: feature.children.iter().map(TreeRecord::from).collect(),
        }
    }
}

/// Tree plus cross-tree rules, as returned for a parsed document.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub tree_data: TreeRecord,
    pub constraints: Vec<String>,
}

/// Categorical failure report.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        let error = match err {
            Error::MalformedInput { .. } => "Invalid XML file",
            Error::MissingRootFeature => "Missing root feature",
            Error::Rule(_) => "Invalid rule",
        };
        let details = match err {
            Error::MalformedInput { details } => details.clone(),
            other => other.to_string(),
        };
        ErrorResponse {
            error: error.to_string(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::feature::GroupType;

    #[test]
    fn test_tree_record_json() {
        let root = Feature::new("App").mandatory().with_child(
            Feature::new("Tier")
                .with_group(GroupType::Xor)
                .with_child(Feature::new("Gold")),
        );
        let response = ParseResponse {
            tree_data: TreeRecord::from(&root),
            constraints: vec!["Gold -> Tier".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "treeData": {
                    "label": "App",
                    "value": "App",
                    "groupType": null,
                    "mandatory": true,
                    "children": [{
                        "label": "Tier",
                        "value": "Tier",
                        "groupType": "xor",
                        "mandatory": false,
                        "children": [{
                            "label": "Gold",
                            "value": "Gold",
                            "groupType": null,
                            "mandatory": false,
                            "children": []
                        }]
                    }]
                },
                "constraints": ["Gold -> Tier"]
            })
        );
    }

    #[test]
    fn test_error_response() {
        let err = Error::MalformedInput {
            details: "unexpected end of stream".to_string(),
        };
        let response = ErrorResponse::from(&err);
        assert_eq!(response.error, "Invalid XML file");
        assert_eq!(response.details, "unexpected end of stream");
        assert_eq!(
            ErrorResponse::from(&Error::MissingRootFeature).details,
            "document has no root feature"
        );
    }
}
