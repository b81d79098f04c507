use tracing::debug;

use super::status::StatusOrderIndex;
use super::ProjectRef;
use crate::model::item::{FieldMap, ItemKind, ItemLabel, ItemState, NormalizedItem};
use crate::model::raw::{Connection, Login, RawContent, RawFieldValue, RawItemRecord, RawLabel};

pub const UNTITLED: &str = "Untitled";

const STATUS_FIELD: &str = "Status";

/// Field name and display text for a single typed value, or `None` when the
/// entry carries no field name or no value.
fn extract_field(value: &RawFieldValue) -> Option<(&str, String)> {
    match value {
        RawFieldValue::SingleSelect { name, field } => Some((field.as_deref()?, name.clone()?)),
        RawFieldValue::Text { text, field } => Some((field.as_deref()?, text.clone()?)),
        RawFieldValue::Number { number, field } => {
            Some((field.as_deref()?, number.map(|n| n.to_string())?))
        }
        RawFieldValue::Date { date, field } => Some((field.as_deref()?, date.clone()?)),
        RawFieldValue::Iteration { title, field } => Some((field.as_deref()?, title.clone()?)),
        RawFieldValue::Unsupported => None,
    }
}

fn extract_fields(values: &[RawFieldValue]) -> FieldMap {
    let mut fields = FieldMap::new();
    for value in values {
        if let Some((name, text)) = extract_field(value) {
            fields.insert(name, text);
        }
    }
    fields
}

fn lifecycle_state(state: Option<&str>, merged: Option<bool>) -> Option<ItemState> {
    let state = state?;
    if merged == Some(true) {
        Some(ItemState::Merged)
    } else if state == "OPEN" {
        Some(ItemState::Open)
    } else {
        Some(ItemState::Closed)
    }
}

fn logins(assignees: Connection<Login>) -> Vec<String> {
    assignees.nodes.into_iter().map(|a| a.login).collect()
}

fn labels(labels: Connection<RawLabel>) -> Vec<ItemLabel> {
    labels
        .nodes
        .into_iter()
        .map(|l| ItemLabel {
            name: l.name,
            color: l.color,
        })
        .collect()
}

/// Flattens one raw record. Records without content (deleted issues still
/// listed on the board) yield `None`.
pub fn normalize_item(
    raw: RawItemRecord,
    project: &ProjectRef,
    statuses: &StatusOrderIndex,
) -> Option<NormalizedItem> {
    let content = raw.content?;
    let fields = extract_fields(&raw.field_values);
    let status = fields.get(STATUS_FIELD).map(String::from);
    let status_index = statuses.rank(status.as_deref());

    let mut item = NormalizedItem {
        id: raw.id,
        title: UNTITLED.to_string(),
        number: None,
        kind: ItemKind::Draft,
        issue_type: None,
        status,
        status_index,
        state: None,
        assignees: Vec::new(),
        labels: Vec::new(),
        repository: None,
        url: None,
        project_id: project.id.clone(),
        project_title: project.title.clone(),
        fields,
    };

    match content {
        RawContent::Issue(issue) => {
            item.kind = ItemKind::Issue;
            item.state = lifecycle_state(issue.state.as_deref(), None);
            item.title = issue.title.unwrap_or(item.title);
            item.number = issue.number;
            item.url = issue.url;
            item.assignees = logins(issue.assignees);
            item.labels = labels(issue.labels);
            item.repository = issue.repository.map(|r| r.name);
            item.issue_type = issue.issue_type.map(|t| t.name);
        }
        RawContent::PullRequest(pr) => {
            item.kind = ItemKind::PullRequest;
            item.state = lifecycle_state(pr.state.as_deref(), pr.merged);
            item.title = pr.title.unwrap_or(item.title);
            item.number = pr.number;
            item.url = pr.url;
            item.assignees = logins(pr.assignees);
            item.labels = labels(pr.labels);
            item.repository = pr.repository.map(|r| r.name);
        }
        RawContent::DraftIssue(draft) => {
            item.title = draft.title.unwrap_or(item.title);
            item.assignees = logins(draft.assignees);
        }
        RawContent::Unknown => {}
    }

    Some(item)
}

pub fn normalize_items(
    raw: Vec<RawItemRecord>,
    project: &ProjectRef,
    statuses: &StatusOrderIndex,
) -> Vec<NormalizedItem> {
    let total = raw.len();
    let items: Vec<NormalizedItem> = raw
        .into_iter()
        .filter_map(|r| normalize_item(r, project, statuses))
        .collect();
    if items.len() < total {
        debug!(
            project = %project.id,
            dropped = total - items.len(),
            "skipped items without content"
        );
    }
    items
}

/// Stable sort by status rank; unranked items end up last.
pub fn sort_by_status(items: &mut [NormalizedItem]) {
    items.sort_by_key(|item| item.status_index);
}
