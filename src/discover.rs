//! Lambda identifier discovery inside state machine definitions
//!
//! A definition document is an arbitrarily nested JSON tree of states. Any
//! object whose `Resource` field holds a Lambda ARN marks an invoked
//! function; everything else (including `Resource` fields of other
//! services) is noise.

use indexmap::IndexSet;
use serde_json::Value;

/// Infix that marks a qualified reference as a Lambda resource
const LAMBDA_ARN_MARKER: &str = ":lambda:";

/// Field of a workflow state that names the invoked resource
const RESOURCE_FIELD: &str = "Resource";

/// Collect the distinct Lambda resource strings of a definition document
///
/// Depth-first; first-occurrence order is preserved so repeated runs
/// produce identical logs. A document with no matches yields an empty set.
pub fn lambda_resources(definition: &Value) -> Vec<String> {
    let mut found = IndexSet::new();
    walk(definition, &mut found);
    found.into_iter().collect()
}

fn walk(value: &Value, found: &mut IndexSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(resource)) = map.get(RESOURCE_FIELD) {
                if resource.contains(LAMBDA_ARN_MARKER) {
                    found.insert(resource.clone());
                }
            }
            for child in map.values() {
                walk(child, found);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk(child, found);
            }
        }
        // Scalars carry no nested states
        _ => {}
    }
}

/// Derive the artifact key for a function identifier
///
/// The trailing `:`-segment of a qualified ARN, or the identifier itself
/// when it is already a bare name. All cache paths are keyed on this.
pub fn artifact_key(identifier: &str) -> &str {
    identifier.rsplit(':').next().unwrap_or(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_nested_lambda_resources() {
        let definition = json!({
            "StartAt": "First",
            "States": {
                "First": {
                    "Type": "Task",
                    "Resource": "arn:aws:lambda:us-east-1:123456789012:function:first-fn",
                    "Next": "Branch"
                },
                "Branch": {
                    "Type": "Parallel",
                    "Branches": [
                        {
                            "StartAt": "Inner",
                            "States": {
                                "Inner": {
                                    "Type": "Task",
                                    "Resource": "arn:aws:lambda:us-east-1:123456789012:function:inner-fn",
                                    "End": true
                                }
                            }
                        }
                    ]
                }
            }
        });

        let resources = lambda_resources(&definition);
        assert_eq!(
            resources,
            vec![
                "arn:aws:lambda:us-east-1:123456789012:function:first-fn",
                "arn:aws:lambda:us-east-1:123456789012:function:inner-fn"
            ]
        );
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let arn = "arn:aws:lambda:us-east-1:123456789012:function:shared-fn";
        let definition = json!({
            "States": {
                "A": { "Resource": arn },
                "B": { "Resource": arn }
            }
        });

        assert_eq!(lambda_resources(&definition), vec![arn]);
    }

    #[test]
    fn non_lambda_resources_are_decoys() {
        let definition = json!({
            "States": {
                "Publish": {
                    "Type": "Task",
                    "Resource": "arn:aws:states:::sns:publish",
                    "End": true
                },
                "Wait": { "Type": "Wait", "Seconds": 5 }
            }
        });

        assert!(lambda_resources(&definition).is_empty());
    }

    #[test]
    fn non_string_resource_fields_are_skipped() {
        let definition = json!({
            "States": {
                "Odd": { "Resource": 42 },
                "Null": { "Resource": null },
                "Real": {
                    "Resource": "arn:aws:lambda:us-east-1:123456789012:function:real-fn"
                }
            }
        });

        assert_eq!(
            lambda_resources(&definition),
            vec!["arn:aws:lambda:us-east-1:123456789012:function:real-fn"]
        );
    }

    #[test]
    fn empty_document_yields_empty_set() {
        assert!(lambda_resources(&json!({})).is_empty());
        assert!(lambda_resources(&json!(null)).is_empty());
    }

    #[test]
    fn artifact_key_is_trailing_segment() {
        assert_eq!(
            artifact_key("arn:aws:lambda:us-east-1:123456789012:function:order-handler"),
            "order-handler"
        );
        assert_eq!(artifact_key("order-handler"), "order-handler");
    }
}
