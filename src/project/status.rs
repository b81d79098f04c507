use std::collections::HashMap;

use crate::model::raw::StatusOption;

/// Rank given to items with no status or a status the project doesn't list.
pub const UNRANKED: u32 = 999;

/// Lower-cased status name to its position in the project's option list.
#[derive(Debug, Clone, Default)]
pub struct StatusOrderIndex {
    ranks: HashMap<String, u32>,
}

impl StatusOrderIndex {
    pub fn new(options: &[StatusOption]) -> Self {
        let ranks = options
            .iter()
            .enumerate()
            .map(|(i, opt)| (opt.name.to_lowercase(), i as u32))
            .collect();
        Self { ranks }
    }

    /// Project without a status field: every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, status: &str) -> Option<u32> {
        self.ranks.get(&status.to_lowercase()).copied()
    }

    pub fn rank(&self, status: Option<&str>) -> u32 {
        status.and_then(|s| self.get(s)).unwrap_or(UNRANKED)
    }
}
