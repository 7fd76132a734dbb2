//! Tag-based group selection.

use std::collections::BTreeSet;

use crate::spec::TestGroup;

/// Decides which groups take part in a session.
///
/// In the default (inclusive) mode a group is selected when no tags were
/// requested or when it shares at least one tag with the request. In inverted
/// (exclusive) mode a group is selected only when it shares none. Tags compare
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TagSelector {
    requested: BTreeSet<String>,
    invert: bool,
}

impl TagSelector {
    pub fn new<I, S>(requested: I, invert: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            requested: requested
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
            invert,
        }
    }

    pub fn requested(&self) -> &BTreeSet<String> {
        &self.requested
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Checks a raw tag set; tags need not be lower-cased already.
    pub fn matches_tags<'a, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let intersects = tags
            .into_iter()
            .any(|t| self.requested.contains(&t.to_lowercase()));
        if self.invert {
            !intersects
        } else {
            self.requested.is_empty() || intersects
        }
    }

    pub fn selects(&self, group: &TestGroup) -> bool {
        self.matches_tags(&group.tags)
    }
}
