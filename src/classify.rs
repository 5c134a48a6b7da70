// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Verdict assignment for discovered paths.
//!
//! Classification is a pure function of a relative path and the three rule
//! lists. It touches no disk, so the same inputs always produce the same
//! verdict, and a dry run previews exactly what a real run would decide.
//!
//! # Priority
//!
//! The sensitive list strictly dominates the ignore list, which dominates the
//! adopt list. A path matching rules in two lists is resolved purely by this
//! list order, never by pattern specificity. The sensitive check runs first
//! and short-circuits, so sensitive material can never be relocated no matter
//! what else matches.

use crate::pattern::PatternStore;

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Classification outcome for a discovered path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Must never be relocated.
    Sensitive,

    /// Deliberately left alone.
    Ignore,

    /// Eligible for adoption into the package store.
    Adopt,

    /// No rule list matched; the safe fallback is to do nothing.
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sensitive => "sensitive",
            Self::Ignore => "ignore",
            Self::Adopt => "adopt",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Map relative paths to verdicts through a pattern store.
#[derive(Clone, Debug)]
pub struct Classifier<'a> {
    store: &'a PatternStore,
}

impl<'a> Classifier<'a> {
    /// Construct new classifier over a loaded pattern store.
    pub fn new(store: &'a PatternStore) -> Self {
        Self { store }
    }

    /// Classify a path relative to the home directory.
    pub fn classify(&self, path: &str) -> Verdict {
        // INVARIANT: Sensitive is checked first and short-circuits.
        if self.store.sensitive().first_match(path).is_some() {
            return Verdict::Sensitive;
        }

        if self.store.ignore().first_match(path).is_some() {
            return Verdict::Ignore;
        }

        if self.store.adopt().first_match(path).is_some() {
            return Verdict::Adopt;
        }

        Verdict::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RuleList;
    use simple_test_case::test_case;

    fn store() -> PatternStore {
        PatternStore::new(
            RuleList::parse("*token*\n.ssh/*\n.gnupg/*\n"),
            RuleList::parse("*.cache/*\n.Trash/*\n*.swp\n"),
            RuleList::parse(".zshrc\n.config/*\n.*rc\n"),
        )
    }

    #[test_case(".ssh/id_ed25519", Verdict::Sensitive; "sensitive dir")]
    #[test_case("api_token_file", Verdict::Sensitive; "sensitive substring")]
    #[test_case("foo.cache/data", Verdict::Ignore; "ignored cache")]
    #[test_case(".Trash", Verdict::Ignore; "ignored bare dir")]
    #[test_case(".zshrc", Verdict::Adopt; "adopt literal")]
    #[test_case(".config/starship/config.toml", Verdict::Adopt; "adopt grouped")]
    #[test_case(".weirdfile", Verdict::Unknown; "unknown fallback")]
    #[test]
    fn classify_by_list_priority(path: &str, expect: Verdict) {
        let store = store();
        let classifier = Classifier::new(&store);
        assert_eq!(classifier.classify(path), expect);
    }

    #[test]
    fn sensitive_dominates_other_lists() {
        // The same pattern sits in all three lists; sensitive must win.
        let store = PatternStore::new(
            RuleList::parse(".netrc\n"),
            RuleList::parse(".netrc\n"),
            RuleList::parse(".netrc\n"),
        );
        let classifier = Classifier::new(&store);
        assert_eq!(classifier.classify(".netrc"), Verdict::Sensitive);

        // Specificity never beats list priority.
        let store = PatternStore::new(
            RuleList::parse("*token*\n"),
            RuleList::parse("\n"),
            RuleList::parse(".github_token_rc\n"),
        );
        let classifier = Classifier::new(&store);
        assert_eq!(classifier.classify(".github_token_rc"), Verdict::Sensitive);
    }

    #[test]
    fn classification_is_deterministic() {
        let store = store();
        let classifier = Classifier::new(&store);
        let first = classifier.classify(".config/git/config");
        let second = classifier.classify(".config/git/config");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_store_yields_unknown() {
        let store = PatternStore::default();
        let classifier = Classifier::new(&store);
        assert_eq!(classifier.classify(".zshrc"), Verdict::Unknown);
    }
}
