//! Codecs for state kept inside issue bodies: frontmatter metadata and the
//! hidden branch marker. Both operate on the same text and never overlap.

pub mod branch_link;
pub mod merge;
pub mod metadata;

pub use branch_link::{parse_branch_link, remove_branch_link, set_branch_link};
pub use merge::{merge_metadata, EmptyListPolicy};
pub use metadata::{editable_template, parse_metadata, IssueMetadata};
