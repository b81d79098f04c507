use serde::Deserialize;

use super::metadata::IssueMetadata;

/// What an explicitly empty `labels`/`assignees` override means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyListPolicy {
    /// An empty override leaves the stored list alone.
    #[default]
    Ignore,
    /// An empty override clears the stored list.
    Clear,
}

fn merge_list(stored: &[String], override_list: &[String], policy: EmptyListPolicy) -> Vec<String> {
    if !override_list.is_empty() || policy == EmptyListPolicy::Clear {
        override_list.to_vec()
    } else {
        stored.to_vec()
    }
}

/// Combines metadata read from an issue body with caller overrides.
///
/// `type` is overridden whenever the override carries one, even an empty
/// string. Fields merge key by key; keys only present in `stored` survive.
pub fn merge_metadata(
    stored: &IssueMetadata,
    overrides: &IssueMetadata,
    policy: EmptyListPolicy,
) -> IssueMetadata {
    let mut fields = stored.fields.clone();
    for (key, value) in overrides.fields.iter() {
        fields.insert(key, value);
    }

    IssueMetadata {
        labels: merge_list(&stored.labels, &overrides.labels, policy),
        assignees: merge_list(&stored.assignees, &overrides.assignees, policy),
        issue_type: overrides
            .issue_type
            .clone()
            .or_else(|| stored.issue_type.clone()),
        fields,
    }
}
