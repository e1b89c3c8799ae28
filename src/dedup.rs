use std::collections::HashSet;

/// Dedup key for a recipe name: lowercased, trimmed, spaces and hyphens removed.
///
/// Other punctuation is kept, so "Mom's Chili" and "Moms Chili" stay distinct.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

/// Normalized names seen during one aggregation run.
#[derive(Debug, Default)]
pub struct DedupSet {
    keys: HashSet<String>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` on first sight and returns false; returns true for any
    /// later name with the same key.
    pub fn is_duplicate(&mut self, name: &str) -> bool {
        !self.keys.insert(normalize(name))
    }

    /// Read-only check, used to skip detail requests for names already taken.
    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}
