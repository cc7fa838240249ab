//! Case-insensitive term matching.
//!
//! Used twice per municipality: to pick the ethics chapter out of a table of
//! contents, and to flag discretionary phrases in extracted text.

use std::collections::BTreeSet;

/// A fixed list of terms matched as case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatcher {
    /// Lowercased terms, in configured order.
    terms: Vec<String>,
}

impl TermMatcher {
    /// Build a matcher. Blank terms are ignored.
    ///
    /// # Examples
    /// ```
    /// use ethics_harvester::terms::TermMatcher;
    ///
    /// let matcher = TermMatcher::new(["Ethic", "code of conduct"]);
    /// assert!(matcher.matches("CHAPTER 2.30 ETHICS"));
    /// assert!(!matcher.matches("Parks and Recreation"));
    /// ```
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    /// Configured terms, lowercased.
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether any term occurs in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.terms.iter().any(|t| haystack.contains(t.as_str()))
    }

    /// Every term that occurs in `text`.
    #[must_use]
    pub fn matched_terms(&self, text: &str) -> BTreeSet<String> {
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .filter(|t| haystack.contains(t.as_str()))
            .cloned()
            .collect()
    }
}
