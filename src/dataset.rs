//! Local dataset parsing and validation.
//!
//! Datasets reach the client as user-pasted JSON. They are validated here,
//! before any request leaves the process: a run that would be rejected by the
//! backend minimum never starts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{errors as config_errors, limits};

/// One supervised example: what goes in, what should come out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetExample {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{}: dataset is not valid JSON: {0}", config_errors::DETAIL_DATASET_PARSE)]
    Parse(#[from] serde_json::Error),
    #[error("{}: {0}", config_errors::DETAIL_DATASET_SHAPE)]
    Shape(String),
    #[error(
        "{}: orchestration needs at least {min} examples, got {got}",
        config_errors::DETAIL_DATASET_TOO_SMALL
    )]
    TooSmall { min: usize, got: usize },
}

/// Parse a JSON array of `{input, output}` pairs. Every element must be an
/// object with both fields as strings; anything else is a shape error naming
/// the offending index.
pub fn parse_examples(raw: &str) -> Result<Vec<DatasetExample>, DatasetError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let items = value
        .as_array()
        .ok_or_else(|| DatasetError::Shape("dataset must be a JSON array".to_string()))?;
    if items.is_empty() {
        return Err(DatasetError::Shape("dataset must not be empty".to_string()));
    }

    let mut examples = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| DatasetError::Shape(format!("item {idx} is not an object")))?;
        let input = obj
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DatasetError::Shape(format!("item {idx} is missing string 'input'")))?;
        let output = obj
            .get("output")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DatasetError::Shape(format!("item {idx} is missing string 'output'")))?;
        examples.push(DatasetExample {
            input: input.to_string(),
            output: output.to_string(),
        });
    }
    Ok(examples)
}

/// Enforce the backend's orchestration minimum locally.
pub fn ensure_orchestration_size(examples: &[DatasetExample]) -> Result<(), DatasetError> {
    if examples.len() < limits::MIN_ORCHESTRATION_EXAMPLES {
        return Err(DatasetError::TooSmall {
            min: limits::MIN_ORCHESTRATION_EXAMPLES,
            got: examples.len(),
        });
    }
    Ok(())
}

/// Stable fingerprint over the canonical serialization, recorded alongside
/// runs so a result can be traced back to the exact data it saw.
pub fn fingerprint(examples: &[DatasetExample]) -> String {
    let mut hasher = Sha256::new();
    for example in examples {
        hasher.update(example.input.as_bytes());
        hasher.update([0u8]);
        hasher.update(example.output.as_bytes());
        hasher.update([0xff]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_dataset() {
        let raw = r#"[{"input":"2+2","output":"4"},{"input":"3+3","output":"6"}]"#;
        let examples = parse_examples(raw).expect("parse");
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].input, "2+2");
        assert_eq!(examples[1].output, "6");
    }

    #[test]
    fn rejects_non_array_and_empty() {
        assert!(matches!(parse_examples("{}"), Err(DatasetError::Shape(_))));
        assert!(matches!(parse_examples("[]"), Err(DatasetError::Shape(_))));
        assert!(matches!(parse_examples("nope"), Err(DatasetError::Parse(_))));
    }

    #[test]
    fn rejects_items_with_wrong_fields() {
        let missing = r#"[{"input":"x"}]"#;
        let err = parse_examples(missing).unwrap_err();
        assert!(err.to_string().contains("item 0"));

        let non_string = r#"[{"input":"x","output":7}]"#;
        assert!(parse_examples(non_string).is_err());
    }

    #[test]
    fn orchestration_minimum_is_enforced() {
        let few: Vec<DatasetExample> = (0..4)
            .map(|i| DatasetExample {
                input: format!("q{i}"),
                output: format!("a{i}"),
            })
            .collect();
        assert!(matches!(
            ensure_orchestration_size(&few),
            Err(DatasetError::TooSmall { min: 5, got: 4 })
        ));

        let enough: Vec<DatasetExample> = (0..5)
            .map(|i| DatasetExample {
                input: format!("q{i}"),
                output: format!("a{i}"),
            })
            .collect();
        assert!(ensure_orchestration_size(&enough).is_ok());
    }

    #[test]
    fn fingerprint_is_stable_and_separator_safe() {
        let a = vec![DatasetExample {
            input: "ab".to_string(),
            output: "c".to_string(),
        }];
        let b = vec![DatasetExample {
            input: "a".to_string(),
            output: "bc".to_string(),
        }];
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }
}
