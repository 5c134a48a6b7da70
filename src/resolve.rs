// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package name resolution.
//!
//! Infer the managed package a path adopts into. The heuristics overlap, so
//! their precedence is load-bearing and pinned by tests:
//!
//! 1. An explicit `pattern:package` mapping from the adopt rule list wins
//!    verbatim.
//! 2. A path under the grouped-config directory takes its second segment:
//!    `.config/starship/config.toml` groups under `starship`.
//! 3. A leading segment shaped like `.<name>rc` or `.<name>.conf` strips down
//!    to `<name>`: `.zshrc` gives `zsh`, `.tmux.conf` gives `tmux`.
//! 4. Otherwise the leading segment is dot-stripped and cut at the first `.`
//!    or `_`: `.claude/CLAUDE.md` gives `claude`.
//!
//! Resolution can fail; an empty or degenerate name means the candidate is
//! skipped with a warning, never adopted under a junk package name.

use crate::pattern::PatternStore;

/// Resolve the package name for a home-relative path.
///
/// Returns [`None`] when every heuristic yields an empty or degenerate name,
/// in which case the caller must skip adoption.
pub fn resolve_package_name(path: &str, store: &PatternStore, grouped_dir: &str) -> Option<String> {
    if let Some(hint) = explicit_mapping(path, store) {
        return sanitize(hint);
    }

    let mut segments = path.split('/');
    let leading = segments.next()?;

    if leading == grouped_dir {
        if let Some(group) = segments.next() {
            return sanitize(group);
        }
    }

    if let Some(name) = dotfile_shape(leading) {
        return sanitize(name);
    }

    let token = leading.trim_start_matches('.');
    let token = token.split(['.', '_']).next().unwrap_or(token);
    sanitize(token)
}

/// First adopt rule with an explicit mapping that matches the path.
fn explicit_mapping<'a>(path: &'a str, store: &'a PatternStore) -> Option<&'a str> {
    store
        .adopt()
        .iter()
        .filter(|rule| rule.package_hint().is_some())
        .find(|rule| rule.matches(path))
        .and_then(|rule| rule.package_hint())
}

/// Strip `.<name>rc` and `.<name>.conf` shapes down to `<name>`.
fn dotfile_shape(segment: &str) -> Option<&str> {
    let body = segment.strip_prefix('.')?;
    if let Some(name) = body.strip_suffix(".conf") {
        return Some(name);
    }

    body.strip_suffix("rc")
}

fn sanitize(name: &str) -> Option<String> {
    let name = name.trim().trim_matches('.');
    if name.is_empty() {
        return None;
    }

    Some(name.to_owned())
}
