//! Label search.
//!
//! Search terms are user text, so they are matched literally: no character in
//! the term has pattern meaning. Matching ignores case.

use crate::id::NodeId;

/// Active search mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    /// Lowercased term.
    pub needle: String,
    /// Selection at the moment search began.
    pub previous: Option<NodeId>,
}

impl SearchState {
    pub fn new(term: &str, previous: Option<NodeId>) -> Self {
        Self {
            needle: term.to_lowercase(),
            previous,
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        label.to_lowercase().contains(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_substring() {
        let s = SearchState::new("ReAd", None);
        assert!(s.matches("README.md"));
        assert!(s.matches("thread"));
        assert!(!s.matches("rea d"));
    }

    #[test]
    fn metacharacters_are_literal() {
        let s = SearchState::new("a.b", None);
        assert!(s.matches("file a.b"));
        assert!(!s.matches("axb"));

        let s = SearchState::new("(*)", None);
        assert!(s.matches("x(*)y"));
        assert!(!s.matches("xy"));
    }

    #[test]
    fn empty_term_matches_everything() {
        assert!(SearchState::new("", None).matches("anything"));
    }
}
