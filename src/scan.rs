// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Home directory scanning.
//!
//! Discover unmanaged candidates for classification. The scan covers dotted
//! entries at the top level of the home directory, plus one level under the
//! grouped-config directory so per-tool directories like `.config/starship`
//! surface as their own candidates.
//!
//! Scanning only observes; it never mutates. Each discovered path becomes a
//! [`Candidate`] carrying a `managed` flag so the planner can keep already
//! adopted entries out of a second adoption (the idempotence contract: adopt
//! once, then every later scan sees the link and leaves it alone).

use ignore::WalkBuilder;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// A discovered filesystem path relative to home.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Path relative to the home directory, `/`-separated.
    pub path: String,

    /// Absolute location of the entry.
    pub full_path: PathBuf,

    /// Whether the entry is a directory.
    pub is_dir: bool,

    /// Whether the entry is already under managed storage.
    pub managed: bool,
}

/// Walk the home directory for classification candidates.
#[derive(Clone, Debug)]
pub struct HomeScanner {
    home: PathBuf,
    store_root: PathBuf,
    audit_log: PathBuf,
    grouped_dir: String,
}

impl HomeScanner {
    /// Construct new scanner rooted at the given home directory.
    pub fn new(
        home: impl Into<PathBuf>,
        store_root: impl Into<PathBuf>,
        audit_log: impl Into<PathBuf>,
        grouped_dir: impl Into<String>,
    ) -> Self {
        Self {
            home: home.into(),
            store_root: store_root.into(),
            audit_log: audit_log.into(),
            grouped_dir: grouped_dir.into(),
        }
    }

    /// Scan the home directory for candidates.
    ///
    /// # Errors
    ///
    /// - Return [`ScanError::HomeUnreadable`] if the home directory cannot be
    ///   listed at all. This is the one fatal condition of a scan.
    #[instrument(skip(self), level = "debug")]
    pub fn scan(&self) -> Result<Vec<Candidate>> {
        if fs::read_dir(&self.home).is_err() {
            return Err(ScanError::HomeUnreadable {
                home: self.home.clone(),
            });
        }

        let mut candidates = Vec::new();
        for entry in self.walk_level(&self.home) {
            let name = match entry.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };

            if !name.starts_with('.') {
                continue;
            }

            if name == self.grouped_dir {
                // Per-tool directories under the grouped dir are candidates
                // of their own; the grouped dir itself never is.
                for child in self.walk_level(&entry) {
                    candidates.push(self.candidate(child));
                }
                continue;
            }

            candidates.push(self.candidate(entry));
        }

        // INVARIANT: Stable ordering keeps plans and previews reproducible.
        candidates.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("scan found {} candidates", candidates.len());
        Ok(candidates)
    }

    fn walk_level(&self, dir: &Path) -> Vec<PathBuf> {
        WalkBuilder::new(dir)
            .standard_filters(false)
            .hidden(false)
            .max_depth(Some(1))
            .build()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().to_path_buf())
            .filter(|path| path != dir)
            .collect()
    }

    fn candidate(&self, full_path: PathBuf) -> Candidate {
        let relative = full_path
            .strip_prefix(&self.home)
            .unwrap_or(&full_path)
            .to_string_lossy()
            .into_owned();
        let is_dir = full_path.is_dir();
        let managed = self.is_managed(&full_path);

        Candidate {
            path: relative,
            full_path,
            is_dir,
            managed,
        }
    }

    /// An entry counts as managed when it is a link resolving into the store,
    /// or when it contains the store or audit log themselves. The store must
    /// never adopt itself.
    fn is_managed(&self, full_path: &Path) -> bool {
        if self.store_root.starts_with(full_path) || self.audit_log.starts_with(full_path) {
            return true;
        }

        let Ok(metadata) = fs::symlink_metadata(full_path) else {
            return false;
        };
        if !metadata.file_type().is_symlink() {
            return false;
        }

        let Ok(target) = fs::read_link(full_path) else {
            return false;
        };
        let target = if target.is_absolute() {
            target
        } else {
            full_path.parent().unwrap_or(Path::new("/")).join(target)
        };

        target.starts_with(&self.store_root)
            || fs::canonicalize(&target)
                .map(|resolved| {
                    fs::canonicalize(&self.store_root)
                        .map(|store| resolved.starts_with(store))
                        .unwrap_or(false)
                })
                .unwrap_or(false)
    }
}

/// Scan error types.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Home directory cannot be listed.
    #[error("cannot read home directory at {:?}", home.display())]
    HomeUnreadable { home: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = ScanError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::symlink;

    fn scanner(home: &Path, store: &Path) -> HomeScanner {
        HomeScanner::new(home, store, store.join("audit.log"), ".config")
    }

    #[test]
    fn finds_dotted_entries_and_grouped_children() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path();
        fs::write(home.join(".zshrc"), "export EDITOR=vim\n").unwrap();
        fs::write(home.join("visible.txt"), "not a dotfile\n").unwrap();
        fs::create_dir_all(home.join(".config/starship")).unwrap();
        fs::write(home.join(".config/starship/config.toml"), "").unwrap();

        let store = tmp.path().join("store");
        let mut found: Vec<String> = scanner(home, &store)
            .scan()
            .unwrap()
            .into_iter()
            .map(|candidate| candidate.path)
            .collect();
        found.sort();

        assert_eq!(found, vec![".config/starship".to_owned(), ".zshrc".to_owned()]);
    }

    #[test]
    fn links_into_store_are_managed() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        let store = tmp.path().join("store");
        fs::create_dir_all(home.join(".config")).unwrap();
        fs::create_dir_all(store.join("zsh")).unwrap();
        fs::write(store.join("zsh/.zshrc"), "").unwrap();
        symlink(store.join("zsh/.zshrc"), home.join(".zshrc")).unwrap();
        fs::write(home.join(".vimrc"), "").unwrap();

        let candidates = scanner(&home, &store).scan().unwrap();
        let zshrc = candidates.iter().find(|c| c.path == ".zshrc").unwrap();
        let vimrc = candidates.iter().find(|c| c.path == ".vimrc").unwrap();

        assert!(zshrc.managed);
        assert!(!vimrc.managed);
    }

    #[test]
    fn store_inside_home_is_never_a_candidate_for_adoption() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path();
        let store = home.join(".local/share/dotwarden-store");
        fs::create_dir_all(&store).unwrap();

        let candidates = scanner(home, &store).scan().unwrap();
        let local = candidates.iter().find(|c| c.path == ".local").unwrap();
        assert!(local.managed);
    }

    #[test]
    fn unreadable_home_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let result = scanner(&missing, &tmp.path().join("store")).scan();
        assert!(matches!(result, Err(ScanError::HomeUnreadable { .. })));
    }
}
