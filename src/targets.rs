//! Target lists: the shared input of the destructive pipelines, and the
//! flexible JSON shapes accepted from scripts.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

/// A directory selected for deletion or archival. `size` is advisory,
/// carried through to summaries for accounting; it is not re-verified
/// before the operation runs.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    #[serde(rename = "Path")]
    pub path: PathBuf,
    #[serde(rename = "Size")]
    pub size: u64,
}

/// The input was not one of the accepted target-list shapes.
#[derive(Debug)]
pub struct ParseTargetsError;

impl fmt::Display for ParseTargetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported JSON format for target list")
    }
}

impl std::error::Error for ParseTargetsError {}

/// Parse a target list from JSON. Accepted shapes:
///
/// - `["/path/one", "/path/two"]`
/// - `[{"path": "/p", "size": 123}, ...]`
/// - `{"targets": [ ...either of the above... ]}`
///
/// Unknown entries inside an array are silently ignored rather than
/// rejected.
pub fn parse_targets(value: &Value) -> Result<Vec<Target>, ParseTargetsError> {
    match value {
        Value::Array(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    Value::String(path) => out.push(Target {
                        path: PathBuf::from(path),
                        size: 0,
                    }),
                    Value::Object(fields) => {
                        let path = fields.get("path").and_then(Value::as_str).unwrap_or("");
                        if !path.is_empty() {
                            let size = fields.get("size").and_then(Value::as_u64).unwrap_or(0);
                            out.push(Target {
                                path: PathBuf::from(path),
                                size,
                            });
                        }
                    }
                    _ => {}
                }
            }
            Ok(out)
        }
        Value::Object(fields) => match fields.get("targets") {
            Some(inner) => parse_targets(inner),
            None => Err(ParseTargetsError),
        },
        _ => Err(ParseTargetsError),
    }
}

/// Parse a target list from a JSON document.
pub fn parse_targets_str(input: &str) -> anyhow::Result<Vec<Target>> {
    let value: Value = serde_json::from_str(input)?;
    Ok(parse_targets(&value)?)
}
