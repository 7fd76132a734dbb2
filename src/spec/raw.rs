//! Serde mirror of the specification document.
//!
//! These structs accept the document exactly as written: every optional key is
//! an `Option` or a `#[serde(default)]`. The loader turns them into the
//! fully-populated model in a single defaulting pass.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct RawGroup {
    #[serde(default, deserialize_with = "scalar_strings")]
    pub tags: Vec<String>,
    pub desc: Option<String>,
    pub panic: Option<f64>,
    pub runs: Option<Vec<RawRun>>,
}

#[derive(Debug, Deserialize)]
pub struct RawRun {
    pub exec: String,
    pub compile: Option<RawCompile>,
    #[serde(default)]
    pub tests: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
pub struct RawCompile {
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default, deserialize_with = "scalar_strings")]
    pub args: Vec<String>,
    #[serde(default)]
    pub fail: bool,
    pub asm: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct RawCase {
    #[serde(default, deserialize_with = "scalar_strings")]
    pub args: Vec<String>,
    #[serde(rename = "return")]
    pub return_code: Option<i32>,
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub fail: bool,
}

/// Accepts a sequence of YAML scalars and stringifies each one, so that
/// `args: [1, -v, true]` is read as `["1", "-v", "true"]`. A null list is
/// treated as empty.
fn scalar_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    values
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(D::Error::custom(format!(
                "expected a scalar argument, found {other:?}"
            ))),
        })
        .collect()
}
