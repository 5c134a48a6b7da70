// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package store management.
//!
//! Dotwarden groups adopted files into named __packages__ under one central
//! directory called the __package store__. Each package mirrors the
//! home-relative layout of the files it owns, so `~/.zshrc` adopted into the
//! "zsh" package lands at `<store>/zsh/.zshrc` and a symlink farm tool can
//! materialize the whole package back into the home directory.
//!
//! Packages are created lazily the first time any path adopts into them, and
//! they live until the user removes them by hand. Nothing here deletes.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// A named grouping of adopted files under the store root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedPackage {
    pub name: String,
    pub root: PathBuf,
}

/// The central directory holding every managed package.
#[derive(Clone, Debug)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Open the package store, creating its root if missing.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateStore`] if the root cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        mkdirp::mkdirp(&root).map_err(|err| StoreError::CreateStore {
            source: err,
            store_root: root.clone(),
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location a package would occupy, whether or not it exists yet.
    pub fn package_root(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create the package directory on first use and hand it back.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreatePackage`] if the directory cannot be
    ///   created.
    pub fn ensure_package(&self, name: &str) -> Result<ManagedPackage> {
        let root = self.package_root(name);
        mkdirp::mkdirp(&root).map_err(|err| StoreError::CreatePackage {
            source: err,
            package_root: root.clone(),
        })?;

        Ok(ManagedPackage {
            name: name.to_owned(),
            root,
        })
    }

    /// Names of every package currently in the store.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::ReadStore`] if the root cannot be listed.
    pub fn packages(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|err| StoreError::ReadStore {
            source: err,
            store_root: self.root.clone(),
        })?;

        let mut names = Vec::new();
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(names)
    }

    /// Whether a path lives inside the store.
    pub fn owns(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().starts_with(&self.root)
    }
}

/// Package store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store root cannot be created.
    #[error("failed to create package store at {:?}", store_root.display())]
    CreateStore {
        #[source]
        source: std::io::Error,
        store_root: PathBuf,
    },

    /// Store root cannot be listed.
    #[error("failed to read package store at {:?}", store_root.display())]
    ReadStore {
        #[source]
        source: std::io::Error,
        store_root: PathBuf,
    },

    /// Package directory cannot be created.
    #[error("failed to create package at {:?}", package_root.display())]
    CreatePackage {
        #[source]
        source: std::io::Error,
        package_root: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn open_creates_root_and_packages_appear_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("store");

        let store = PackageStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.packages().unwrap(), Vec::<String>::new());

        let package = store.ensure_package("zsh").unwrap();
        assert_eq!(package.name, "zsh");
        assert!(package.root.is_dir());
        assert_eq!(store.packages().unwrap(), vec!["zsh".to_owned()]);

        // Idempotent on second use.
        store.ensure_package("zsh").unwrap();
        assert_eq!(store.packages().unwrap(), vec!["zsh".to_owned()]);
    }

    #[test]
    fn ownership_is_prefix_based() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PackageStore::open(tmp.path().join("store")).unwrap();

        assert!(store.owns(store.package_root("zsh").join(".zshrc")));
        assert!(!store.owns(tmp.path().join("elsewhere")));
    }
}
