use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::item::FieldMap;

/// Leading `---` block, then whatever follows as the body.
static FRONTMATTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A---\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)(.*)\z")
        .expect("valid frontmatter regex")
});

static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+):(.*)$").expect("valid frontmatter entry regex"));

/// Structured metadata stored at the head of an issue body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueMetadata {
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub issue_type: Option<String>,
    /// Project field values keyed by the remote field name, casing preserved.
    pub fields: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBody {
    pub metadata: IssueMetadata,
    pub body: String,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Splits `text` into frontmatter metadata and the remaining body.
///
/// Text that doesn't open with a `---` block comes back untouched with empty
/// metadata. Lines inside the block that aren't `key: value` are ignored.
pub fn parse_metadata(text: &str) -> ParsedBody {
    let Some(caps) = FRONTMATTER_RE.captures(text.trim_start()) else {
        return ParsedBody {
            metadata: IssueMetadata::default(),
            body: text.to_string(),
        };
    };

    let block = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();

    let mut metadata = IssueMetadata::default();
    for line in block.lines() {
        let Some(entry) = ENTRY_RE.captures(line) else {
            continue;
        };
        let key = &entry[1];
        let value = entry[2].trim();
        match key.to_lowercase().as_str() {
            "labels" => metadata.labels = split_list(value),
            "assignees" => metadata.assignees = split_list(value),
            "type" => metadata.issue_type = (!value.is_empty()).then(|| value.to_string()),
            _ => metadata.fields.insert(key, value),
        }
    }

    ParsedBody { metadata, body }
}

/// Renders a frontmatter block. Reserved keys are always written, even when
/// blank, so the block doubles as an editable template.
pub fn serialize_metadata(existing: Option<&IssueMetadata>) -> String {
    let empty = IssueMetadata::default();
    let meta = existing.unwrap_or(&empty);

    let mut lines = vec![
        "---".to_string(),
        format!("labels: {}", meta.labels.join(", ")),
        format!("assignees: {}", meta.assignees.join(", ")),
        format!("type: {}", meta.issue_type.as_deref().unwrap_or("")),
    ];
    lines.extend(meta.fields.iter().map(|(k, v)| format!("{k}: {v}")));
    lines.push("---".to_string());
    lines.join("\n")
}

/// Frontmatter block followed by the body, ready to open in an editor.
pub fn editable_template(existing: Option<&IssueMetadata>, body: &str) -> String {
    let block = serialize_metadata(existing);
    let body = body.trim();
    if body.is_empty() {
        format!("{block}\n")
    } else {
        format!("{block}\n\n{body}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text_passes_through() {
        let parsed = parse_metadata("hello world");
        assert_eq!(parsed.metadata, IssueMetadata::default());
        assert_eq!(parsed.body, "hello world");
    }

    #[test]
    fn pass_through_keeps_original_whitespace() {
        let text = "  \n  indented body\n";
        assert_eq!(parse_metadata(text).body, text);
    }

    #[test]
    fn parses_reserved_keys() {
        let parsed = parse_metadata("---\nlabels: bug, urgent\ntype: Feature\n---\nBody text");
        assert_eq!(parsed.metadata.labels, vec!["bug", "urgent"]);
        assert_eq!(parsed.metadata.issue_type.as_deref(), Some("Feature"));
        assert!(parsed.metadata.assignees.is_empty());
        assert_eq!(parsed.body, "Body text");
    }

    #[test]
    fn leading_whitespace_before_block_is_allowed() {
        let parsed = parse_metadata("\n\n---\nassignees: alice,, bob ,\n---\nBody");
        assert_eq!(parsed.metadata.assignees, vec!["alice", "bob"]);
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn reserved_keys_match_any_case_and_fields_keep_casing() {
        let parsed = parse_metadata("---\nLabels: a\nTYPE: Bug\nPriority: High\nstory_points: 3\n---\n");
        assert_eq!(parsed.metadata.labels, vec!["a"]);
        assert_eq!(parsed.metadata.issue_type.as_deref(), Some("Bug"));
        let fields: Vec<_> = parsed.metadata.fields.iter().collect();
        assert_eq!(fields, vec![("Priority", "High"), ("story_points", "3")]);
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn ignores_lines_that_are_not_entries() {
        let parsed = parse_metadata("---\njust prose\nmulti word: nope\n- item\nSize: M\n---\nbody");
        let fields: Vec<_> = parsed.metadata.fields.iter().collect();
        assert_eq!(fields, vec![("Size", "M")]);
    }

    #[test]
    fn unterminated_block_is_not_frontmatter() {
        let text = "---\nlabels: bug\nno closing line";
        let parsed = parse_metadata(text);
        assert_eq!(parsed.metadata, IssueMetadata::default());
        assert_eq!(parsed.body, text);
    }

    #[test]
    fn empty_block_parses() {
        let parsed = parse_metadata("---\n---\nBody");
        assert_eq!(parsed.metadata, IssueMetadata::default());
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn serializes_blank_template() {
        assert_eq!(
            serialize_metadata(None),
            "---\nlabels: \nassignees: \ntype: \n---"
        );
    }

    #[test]
    fn serialize_then_parse_is_stable() {
        let meta = IssueMetadata {
            labels: vec!["bug".into(), "ui".into()],
            assignees: vec!["alice".into()],
            issue_type: Some("Bug".into()),
            fields: [("Priority", "High"), ("Size", "S")].into_iter().collect(),
        };
        let text = editable_template(Some(&meta), "Steps to reproduce");
        let parsed = parse_metadata(&text);
        assert_eq!(parsed.metadata, meta);
        assert_eq!(parsed.body, "Steps to reproduce");

        let again = editable_template(Some(&parsed.metadata), &parsed.body);
        assert_eq!(again, text);
    }

    #[test]
    fn blank_template_parses_to_empty_metadata() {
        let parsed = parse_metadata(&editable_template(None, ""));
        assert_eq!(parsed.metadata, IssueMetadata::default());
        assert_eq!(parsed.body, "");
    }
}
