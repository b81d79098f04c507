pub mod normalize;
pub mod status;

pub use normalize::{normalize_items, sort_by_status};
pub use status::StatusOrderIndex;

/// Identity of the project board items are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: String,
    pub title: String,
}
