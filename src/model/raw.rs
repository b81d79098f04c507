//! Serde shapes of the ProjectV2 GraphQL payloads.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldRef {
    pub name: Option<String>,
}

/// One typed value attached to a project item, tagged by `__typename`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__typename")]
pub enum RawFieldValue {
    #[serde(rename = "ProjectV2ItemFieldSingleSelectValue")]
    SingleSelect {
        name: Option<String>,
        #[serde(default, deserialize_with = "field_name")]
        field: Option<String>,
    },
    #[serde(rename = "ProjectV2ItemFieldTextValue")]
    Text {
        text: Option<String>,
        #[serde(default, deserialize_with = "field_name")]
        field: Option<String>,
    },
    #[serde(rename = "ProjectV2ItemFieldNumberValue")]
    Number {
        number: Option<f64>,
        #[serde(default, deserialize_with = "field_name")]
        field: Option<String>,
    },
    #[serde(rename = "ProjectV2ItemFieldDateValue")]
    Date {
        date: Option<String>,
        #[serde(default, deserialize_with = "field_name")]
        field: Option<String>,
    },
    #[serde(rename = "ProjectV2ItemFieldIterationValue")]
    Iteration {
        title: Option<String>,
        #[serde(default, deserialize_with = "field_name")]
        field: Option<String>,
    },
    /// Labels, milestones, reviewers and any kind added remotely later.
    #[serde(other)]
    Unsupported,
}

fn field_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let field = Option::<FieldRef>::deserialize(deserializer)?;
    Ok(field.and_then(|f| f.name))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssueContent {
    pub title: Option<String>,
    pub number: Option<u64>,
    pub url: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub assignees: Connection<Login>,
    #[serde(default)]
    pub labels: Connection<RawLabel>,
    pub repository: Option<Named>,
    pub issue_type: Option<Named>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPullRequestContent {
    pub title: Option<String>,
    pub number: Option<u64>,
    pub url: Option<String>,
    pub state: Option<String>,
    pub merged: Option<bool>,
    #[serde(default)]
    pub assignees: Connection<Login>,
    #[serde(default)]
    pub labels: Connection<RawLabel>,
    pub repository: Option<Named>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDraftContent {
    pub title: Option<String>,
    #[serde(default)]
    pub assignees: Connection<Login>,
}

/// Polymorphic item content.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum RawContent {
    Issue(RawIssueContent),
    PullRequest(RawPullRequestContent),
    DraftIssue(RawDraftContent),
    #[serde(other)]
    Unknown,
}

/// A project item as returned by the `items` connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemRecord {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_field_values")]
    pub field_values: Vec<RawFieldValue>,
    #[serde(default, deserialize_with = "lenient_content")]
    pub content: Option<RawContent>,
}

/// Keeps every field value node that decodes and drops the rest.
fn lenient_field_values<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<RawFieldValue>, D::Error> {
    let connection = Option::<Connection<Value>>::deserialize(deserializer)?;
    Ok(connection
        .unwrap_or_default()
        .nodes
        .into_iter()
        .filter_map(|node| serde_json::from_value(node).ok())
        .collect())
}

/// Item nodes of one page. A null or malformed node is dropped instead of
/// failing the whole page.
pub fn lenient_records<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<RawItemRecord>, D::Error> {
    let nodes = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = nodes.len();
    let records: Vec<RawItemRecord> = nodes
        .into_iter()
        .filter_map(|node| serde_json::from_value(node).ok())
        .collect();
    if records.len() < total {
        debug!(dropped = total - records.len(), "skipped malformed project items");
    }
    Ok(records)
}

fn lenient_content<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<RawContent>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(serde_json::from_value(v).unwrap_or(RawContent::Unknown)),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssueDetails {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
}
