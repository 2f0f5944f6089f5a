//! Common types shared by the fetchers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::version::error::SelectionRuleError;

/// One deployable build as reported by the server.
///
/// Only `timestamp` and `branch` are interpreted; every other field is kept
/// verbatim in `fields` so callers get the server's object back.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VersionDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl VersionDescriptor {
    /// The timestamp as a float, for ranking
    pub fn timestamp_value(&self) -> Option<f64> {
        self.timestamp.as_ref().and_then(Number::as_f64)
    }

    /// The `version` field, when the server sent one as a string
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }
}

/// Full catalog of candidate versions returned by the versions URL
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VersionCatalog {
    #[serde(default)]
    pub prs: Vec<VersionDescriptor>,
    #[serde(default)]
    pub branches: Vec<VersionDescriptor>,
}

/// Response of the latest-version URL
#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersionResponse {
    pub version: String,
}

/// Which part of a [`VersionCatalog`] to extract
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSelectionRule")]
pub enum SelectionRule {
    /// The `n` most recent pull-request builds (`{ "prs": n }`)
    TopPrs(usize),
    /// Every build of the named branch (`{ "branch": "name" }`)
    Branch(String),
}

#[derive(Deserialize)]
struct RawSelectionRule {
    prs: Option<usize>,
    branch: Option<String>,
}

impl TryFrom<RawSelectionRule> for SelectionRule {
    type Error = SelectionRuleError;

    fn try_from(raw: RawSelectionRule) -> Result<Self, Self::Error> {
        match (raw.prs, raw.branch) {
            (Some(count), _) => Ok(SelectionRule::TopPrs(count)),
            (None, Some(branch)) => Ok(SelectionRule::Branch(branch)),
            (None, None) => Err(SelectionRuleError::Unrecognized(
                "expected `prs` or `branch`".to_string(),
            )),
        }
    }
}

/// Parses the command-line form: `prs=N` or `branch=NAME`
impl FromStr for SelectionRule {
    type Err = SelectionRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((kind, value)) = s.split_once('=') else {
            return Err(SelectionRuleError::Unrecognized(s.to_string()));
        };

        match kind.trim() {
            "prs" => value
                .trim()
                .parse()
                .map(SelectionRule::TopPrs)
                .map_err(|_| SelectionRuleError::Unrecognized(s.to_string())),
            "branch" if !value.trim().is_empty() => {
                Ok(SelectionRule::Branch(value.trim().to_string()))
            }
            _ => Err(SelectionRuleError::Unrecognized(s.to_string())),
        }
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::TopPrs(count) => write!(f, "prs={count}"),
            SelectionRule::Branch(name) => write!(f, "branch={name}"),
        }
    }
}
