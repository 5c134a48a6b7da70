// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pattern rule handling.
//!
//! Utilities to load and match the ordered rule lists that drive path
//! classification.
//!
//! # Rule File Layout
//!
//! Rules live in three plain-text files inside the pattern directory:
//! "sensitive.rules", "ignore.rules", and "adopt.rules". Each rule sits on
//! its own line. Blank lines and lines starting with '#' are skipped. A rule
//! may carry an explicit package name after a ':' delimiter, e.g.
//! `.config/nvim/*:neovim`, which the name resolver honors verbatim.
//!
//! # Matching Semantics
//!
//! Rule matching is user-facing behavior, so the semantics are pinned down
//! exactly rather than delegated wholesale to a glob library:
//!
//! 1. A rule of the form `*substring*` with no other metacharacters inside is
//!    a pure containment test: `*token*` matches `api_token_file` the same
//!    way it matches `my_token`.
//! 2. Otherwise the rule is a shell glob matched against the full relative
//!    path, where `*` crosses path separators.
//! 3. A rule ending in `/*` additionally matches the bare directory name
//!    with no suffix, so `dir/*` covers both `dir` and `dir/anything`.
//!
//! The first matching rule within a list wins. There is no scoring and no
//! longest-match preference; priority between lists is decided by the
//! classifier, never here.

use glob::Pattern;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};
use tracing::info;

/// One parsed rule, with an optional explicit package mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternRule {
    pattern: String,
    package_hint: Option<String>,
}

impl PatternRule {
    /// Parse a single rule line.
    ///
    /// Returns [`None`] for blank lines and '#' comments.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        match line.split_once(':') {
            Some((pattern, package)) if !package.trim().is_empty() => Some(Self {
                pattern: pattern.trim().to_owned(),
                package_hint: Some(package.trim().to_owned()),
            }),
            _ => Some(Self {
                pattern: line.to_owned(),
                package_hint: None,
            }),
        }
    }

    /// Construct a rule directly from its parts.
    pub fn new(pattern: impl Into<String>, package_hint: Option<String>) -> Self {
        Self {
            pattern: pattern.into(),
            package_hint,
        }
    }

    /// The raw pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Explicit package mapping, if the rule declared one.
    pub fn package_hint(&self) -> Option<&str> {
        self.package_hint.as_deref()
    }

    /// Match a relative path against this rule.
    pub fn matches(&self, path: &str) -> bool {
        if let Some(inner) = substring_form(&self.pattern) {
            return path.contains(inner);
        }

        if glob_match(&self.pattern, path) {
            return true;
        }

        // INVARIANT: `dir/*` also matches the bare directory name itself.
        if let Some(stem) = self.pattern.strip_suffix("/*") {
            return glob_match(stem, path);
        }

        false
    }
}

/// Extract the inner text of a `*substring*` rule.
///
/// Only counts when the wildcards sit at both ends and the interior carries
/// no further metacharacters and no path separator. A rule like `*.cache/*`
/// spans directories, so it keeps ordinary glob semantics plus the bare
/// directory rule below.
fn substring_form(pattern: &str) -> Option<&str> {
    let inner = pattern.strip_prefix('*')?.strip_suffix('*')?;
    if inner.is_empty() || inner.contains(['*', '?', '[', '/']) {
        return None;
    }

    Some(inner)
}

fn glob_match(pattern: &str, path: &str) -> bool {
    Pattern::new(pattern)
        .map(|glob| glob.matches(path))
        .unwrap_or(false)
}

/// One ordered rule list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleList {
    rules: Vec<PatternRule>,
}

impl RuleList {
    /// Parse a rule list from file content.
    pub fn parse(content: &str) -> Self {
        Self {
            rules: content.lines().filter_map(PatternRule::parse).collect(),
        }
    }

    /// First rule that matches the given relative path, if any.
    ///
    /// Remaining rules are not evaluated once a match is found.
    pub fn first_match(&self, path: &str) -> Option<&PatternRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    /// Iterate over rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<PatternRule>> for RuleList {
    fn from(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }
}

/// The three ordered rule lists that drive classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternStore {
    sensitive: RuleList,
    ignore: RuleList,
    adopt: RuleList,
}

impl PatternStore {
    /// Construct a store directly from rule lists.
    pub fn new(sensitive: RuleList, ignore: RuleList, adopt: RuleList) -> Self {
        Self {
            sensitive,
            ignore,
            adopt,
        }
    }

    /// Load the three rule lists from a pattern directory.
    ///
    /// A missing rule file degrades to an empty list so the system keeps
    /// working without configuration. A missing directory is only fatal when
    /// the caller explicitly requires it.
    ///
    /// # Errors
    ///
    /// - Return [`PatternError::MissingStore`] if `required` is set and the
    ///   directory does not exist.
    /// - Return [`PatternError::ReadRules`] if a rule file exists but cannot
    ///   be read.
    pub fn load(dir: impl AsRef<Path>, required: bool) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            if required {
                return Err(PatternError::MissingStore {
                    pattern_dir: dir.to_path_buf(),
                });
            }

            info!("pattern directory {:?} absent, using empty rule lists", dir.display());
            return Ok(Self::default());
        }

        Ok(Self {
            sensitive: load_list(&dir.join("sensitive.rules"))?,
            ignore: load_list(&dir.join("ignore.rules"))?,
            adopt: load_list(&dir.join("adopt.rules"))?,
        })
    }

    pub fn sensitive(&self) -> &RuleList {
        &self.sensitive
    }

    pub fn ignore(&self) -> &RuleList {
        &self.ignore
    }

    pub fn adopt(&self) -> &RuleList {
        &self.adopt
    }
}

fn load_list(path: &Path) -> Result<RuleList> {
    if !path.is_file() {
        info!("rule file {:?} absent, using empty list", path.display());
        return Ok(RuleList::default());
    }

    let content = read_to_string(path).map_err(|err| PatternError::ReadRules {
        source: err,
        rule_path: path.to_path_buf(),
    })?;

    Ok(RuleList::parse(&content))
}

/// Pattern store error types.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// Pattern directory explicitly required but absent.
    #[error("pattern directory {:?} is required but does not exist", pattern_dir.display())]
    MissingStore { pattern_dir: PathBuf },

    /// Rule file exists but cannot be read.
    #[error("failed to read rule file at {:?}", rule_path.display())]
    ReadRules {
        #[source]
        source: std::io::Error,
        rule_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PatternError> = std::result::Result<T, E>;
