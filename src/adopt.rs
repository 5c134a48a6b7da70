// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Adoption engine.
//!
//! Adoption relocates an unmanaged home-directory entry into the package
//! store and leaves a link behind at its original location, so the file keeps
//! working while its contents live under version control.
//!
//! # Two Phases
//!
//! The engine splits deciding from acting. [`plan_scan`] is pure: it
//! classifies and resolves every candidate into a [`Decision`] without
//! touching the disk, which is what makes `--dry-run` previews trustworthy —
//! the plan a dry run prints is byte-for-byte the plan a real run executes
//! against the same input state.
//!
//! [`AdoptionEngine::apply`] then walks the plan and performs the side
//! effects. Each adoption either fully lands (moved content, link back, audit
//! entry) or rolls the original path back into place. One failing candidate
//! never aborts the rest of the batch; failures surface in the returned
//! [`ScanReport`] instead of being swallowed.
//!
//! # Safety Rails
//!
//! A sensitive verdict is terminal. The planner maps it to
//! [`Decision::Sensitive`] and the engine refuses to relocate it no matter
//! what else matched. Already-managed entries are recognized up front so a
//! second run over an adopted file converges to no action.

use crate::{
    audit::{AuditError, AuditKind, AuditLog},
    classify::{Classifier, Verdict},
    pattern::PatternStore,
    resolve::resolve_package_name,
    scan::Candidate,
    store::{PackageStore, StoreError},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// What the planner decided to do with one candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Relocate into the named package.
    Adopt { package: String },

    /// Matched the sensitive list; must never be relocated.
    Sensitive,

    /// Matched the ignore list; deliberately left alone.
    Ignore,

    /// Already a link into the store, or contains managed state.
    AlreadyManaged,

    /// Adopt verdict, but no usable package name could be resolved.
    SkipUnresolved,

    /// No rule list matched.
    Unknown,
}

/// One planned candidate with its decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanItem {
    pub candidate: Candidate,
    pub decision: Decision,
}

/// The full decided-but-not-acted scan plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanPlan {
    pub items: Vec<PlanItem>,
}

impl ScanPlan {
    /// Number of adoptions the plan would perform.
    pub fn adoption_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.decision, Decision::Adopt { .. }))
            .count()
    }
}

/// Decide what to do with every candidate. Pure; no filesystem access.
pub fn plan_scan(candidates: Vec<Candidate>, store: &PatternStore, grouped_dir: &str) -> ScanPlan {
    let classifier = Classifier::new(store);
    let mut items = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let decision = if candidate.managed {
            Decision::AlreadyManaged
        } else {
            match classifier.classify(&candidate.path) {
                Verdict::Sensitive => Decision::Sensitive,
                Verdict::Ignore => Decision::Ignore,
                Verdict::Unknown => Decision::Unknown,
                Verdict::Adopt => match resolve_package_name(&candidate.path, store, grouped_dir) {
                    Some(package) => Decision::Adopt { package },
                    None => Decision::SkipUnresolved,
                },
            }
        };

        items.push(PlanItem {
            candidate,
            decision,
        });
    }

    ScanPlan { items }
}

/// Batch outcome of an applied scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub adopted: usize,
    pub sensitive: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub already_managed: usize,
    pub failed: Vec<(String, String)>,
}

impl Display for ScanReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "adopted: {}, sensitive: {}, ignored: {}, skipped: {}, managed: {}, failed: {}",
            self.adopted,
            self.sensitive,
            self.ignored,
            self.skipped,
            self.already_managed,
            self.failed.len(),
        )
    }
}

/// Layer of indirection for the filesystem moves adoption performs.
pub trait Relocation {
    /// Move content from its original location to the store destination.
    fn relocate(&self, source: &Path, dest: &Path, is_dir: bool) -> Result<()>;

    /// Leave a link at the original location pointing at the destination.
    fn link_back(&self, original: &Path, dest: &Path) -> Result<()>;

    /// Best-effort rollback: put relocated content back where it came from.
    fn restore(&self, original: &Path, dest: &Path, is_dir: bool);
}

/// Relocation through plain filesystem operations.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsRelocator;

impl Relocation for FsRelocator {
    /// Files are moved; directories are copied recursively, then removed, so
    /// a partial copy never destroys the original.
    fn relocate(&self, source: &Path, dest: &Path, is_dir: bool) -> Result<()> {
        if is_dir {
            copy_dir_all(source, dest)?;
            fs::remove_dir_all(source).map_err(|err| AdoptError::Move {
                source: err,
                from: source.to_path_buf(),
                to: dest.to_path_buf(),
            })?;
            return Ok(());
        }

        if fs::rename(source, dest).is_ok() {
            return Ok(());
        }

        // Rename across filesystems fails; fall back to copy then delete.
        fs::copy(source, dest)
            .and_then(|_| fs::remove_file(source))
            .map_err(|err| AdoptError::Move {
                source: err,
                from: source.to_path_buf(),
                to: dest.to_path_buf(),
            })?;

        Ok(())
    }

    fn link_back(&self, original: &Path, dest: &Path) -> Result<()> {
        std::os::unix::fs::symlink(dest, original).map_err(|err| AdoptError::Link {
            source: err,
            original: original.to_path_buf(),
            dest: dest.to_path_buf(),
        })
    }

    fn restore(&self, original: &Path, dest: &Path, is_dir: bool) {
        if fs::symlink_metadata(original)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false)
        {
            let _ = fs::remove_file(original);
        }

        let result = if is_dir {
            copy_dir_all(dest, original)
                .map_err(|err| err.to_string())
                .and_then(|_| fs::remove_dir_all(dest).map_err(|err| err.to_string()))
        } else {
            fs::rename(dest, original).map_err(|err| err.to_string())
        };

        if let Err(error) = result {
            warn!(
                "rollback of {:?} left the tree inconsistent: {error}",
                original.display()
            );
        }
    }
}

fn copy_dir_all(source: &Path, dest: &Path) -> Result<()> {
    let copy_err = |err: std::io::Error| AdoptError::Move {
        source: err,
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
    };

    mkdirp::mkdirp(dest).map_err(copy_err)?;
    for entry in fs::read_dir(source).map_err(copy_err)? {
        let entry = entry.map_err(copy_err)?;
        let target = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(copy_err)?;

        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(copy_err)?;
            std::os::unix::fs::symlink(link, &target).map_err(copy_err)?;
        } else {
            fs::copy(entry.path(), &target).map_err(copy_err)?;
        }
    }

    Ok(())
}

/// Execute adoption plans against the package store.
#[derive(Debug)]
pub struct AdoptionEngine<R = FsRelocator>
where
    R: Relocation,
{
    store: PackageStore,
    audit: AuditLog,
    relocator: R,
    overwrite: bool,
}

impl AdoptionEngine<FsRelocator> {
    /// Construct the engine with the default filesystem relocator.
    pub fn new(store: PackageStore, audit: AuditLog, overwrite: bool) -> Self {
        Self::with_relocator(store, audit, FsRelocator, overwrite)
    }
}

impl<R> AdoptionEngine<R>
where
    R: Relocation,
{
    pub fn with_relocator(store: PackageStore, audit: AuditLog, relocator: R, overwrite: bool) -> Self {
        Self {
            store,
            audit,
            relocator,
            overwrite,
        }
    }

    /// Apply a scan plan, adopting what the planner decided to adopt.
    ///
    /// Per-candidate failures are collected into the report; the batch always
    /// runs to completion.
    #[instrument(skip(self, plan), level = "debug")]
    pub fn apply(&self, plan: &ScanPlan) -> ScanReport {
        let mut report = ScanReport::default();

        for item in &plan.items {
            let path = item.candidate.path.as_str();
            match &item.decision {
                Decision::Adopt { package } => match self.adopt_one(&item.candidate, package) {
                    Ok(()) => {
                        info!("adopted {path} into package {package}");
                        report.adopted += 1;
                    }
                    Err(error) => {
                        warn!("failed to adopt {path}: {error}");
                        let _ = self.audit.append(AuditKind::Warn, path, None);
                        report.failed.push((path.to_owned(), error.to_string()));
                    }
                },
                Decision::Sensitive => {
                    let _ = self.audit.append(AuditKind::Sensitive, path, None);
                    report.sensitive += 1;
                }
                Decision::Ignore => report.ignored += 1,
                Decision::AlreadyManaged => report.already_managed += 1,
                Decision::SkipUnresolved => {
                    warn!("no usable package name for {path}, skipping");
                    let _ = self.audit.append(AuditKind::Warn, path, None);
                    report.skipped += 1;
                }
                Decision::Unknown => {
                    debug!("no rule matched {path}");
                    let _ = self.audit.append(AuditKind::Skipped, path, None);
                    report.skipped += 1;
                }
            }
        }

        report
    }

    /// Relocate one candidate into its package and link it back.
    ///
    /// # Errors
    ///
    /// - Return [`AdoptError::Conflict`] if the destination exists and
    ///   overwrite was not requested.
    /// - Return [`AdoptError::Move`] or [`AdoptError::Link`] if a filesystem
    ///   step fails; the original path is restored best-effort.
    fn adopt_one(&self, candidate: &Candidate, package: &str) -> Result<()> {
        let dest = self
            .store
            .ensure_package(package)?
            .root
            .join(&candidate.path);

        if let Ok(meta) = fs::symlink_metadata(&dest) {
            if !self.overwrite {
                return Err(AdoptError::Conflict { dest });
            }

            // INVARIANT: Overwrite replaces the stale copy wholesale.
            let removed = if meta.is_dir() {
                fs::remove_dir_all(&dest)
            } else {
                fs::remove_file(&dest)
            };
            removed.map_err(|err| AdoptError::Move {
                source: err,
                from: candidate.full_path.clone(),
                to: dest.clone(),
            })?;
        }

        if let Some(parent) = dest.parent() {
            mkdirp::mkdirp(parent).map_err(|err| AdoptError::Move {
                source: err,
                from: candidate.full_path.clone(),
                to: dest.clone(),
            })?;
        }

        self.relocator
            .relocate(&candidate.full_path, &dest, candidate.is_dir)?;

        if let Err(error) = self.relocator.link_back(&candidate.full_path, &dest) {
            self.relocator
                .restore(&candidate.full_path, &dest, candidate.is_dir);
            return Err(error);
        }

        // INVARIANT: The audit entry is part of the action; if it cannot be
        // recorded the whole adoption unwinds.
        if let Err(error) = self.audit.append(
            AuditKind::Adopted,
            candidate.path.as_str(),
            Some(package.to_owned()),
        ) {
            self.relocator
                .restore(&candidate.full_path, &dest, candidate.is_dir);
            return Err(error.into());
        }

        Ok(())
    }
}

/// Adoption error types.
#[derive(Debug, thiserror::Error)]
pub enum AdoptError {
    /// Destination already holds a conflicting entry.
    #[error("destination {:?} already exists (pass overwrite to replace)", dest.display())]
    Conflict { dest: PathBuf },

    /// Content could not be moved into the store.
    #[error("failed to move {:?} to {:?}", from.display(), to.display())]
    Move {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Link at the original location could not be created.
    #[error("failed to link {:?} to {:?}", original.display(), dest.display())]
    Link {
        #[source]
        source: std::io::Error,
        original: PathBuf,
        dest: PathBuf,
    },

    /// Package store interaction fails.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Audit entry cannot be recorded.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Friendly result alias :3
pub type Result<T, E = AdoptError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RuleList;
    use pretty_assertions::assert_eq;

    fn rules() -> PatternStore {
        PatternStore::new(
            RuleList::parse(".ssh/*\n"),
            RuleList::parse("*.cache/*\n"),
            RuleList::parse(".zshrc\n.config/*\n"),
        )
    }

    fn candidate(home: &Path, path: &str, is_dir: bool) -> Candidate {
        Candidate {
            path: path.to_owned(),
            full_path: home.join(path),
            is_dir,
            managed: false,
        }
    }

    #[test]
    fn plan_maps_verdicts_to_decisions() {
        let home = Path::new("/home/user");
        let candidates = vec![
            candidate(home, ".zshrc", false),
            candidate(home, ".ssh", true),
            candidate(home, "foo.cache", true),
            candidate(home, ".mystery", false),
            Candidate {
                managed: true,
                ..candidate(home, ".vimrc", false)
            },
        ];

        let plan = plan_scan(candidates, &rules(), ".config");
        let decisions: Vec<_> = plan.items.iter().map(|item| item.decision.clone()).collect();

        assert_eq!(
            decisions,
            vec![
                Decision::Adopt {
                    package: "zsh".into()
                },
                Decision::Sensitive,
                Decision::Ignore,
                Decision::Unknown,
                Decision::AlreadyManaged,
            ]
        );
        assert_eq!(plan.adoption_count(), 1);
    }

    #[test]
    fn adopt_moves_links_and_audits() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".zshrc"), "export EDITOR=vim\n").unwrap();

        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let audit = AuditLog::open(tmp.path().join("audit.log")).unwrap();
        let engine = AdoptionEngine::new(store, audit, false);

        let plan = plan_scan(vec![candidate(&home, ".zshrc", false)], &rules(), ".config");
        let report = engine.apply(&plan);

        assert_eq!(report.adopted, 1);
        assert!(report.failed.is_empty());

        let dest = tmp.path().join("store/zsh/.zshrc");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "export EDITOR=vim\n");

        let link = home.join(".zshrc");
        let meta = fs::symlink_metadata(&link).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), dest);

        let log = fs::read_to_string(tmp.path().join("audit.log")).unwrap();
        assert!(log.contains("ADOPTED .zshrc -> zsh"));
    }

    #[test]
    fn adopt_directory_mirrors_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        fs::create_dir_all(home.join(".config/starship")).unwrap();
        fs::write(home.join(".config/starship/config.toml"), "add_newline = false\n").unwrap();

        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let audit = AuditLog::open(tmp.path().join("audit.log")).unwrap();
        let engine = AdoptionEngine::new(store, audit, false);

        let plan = plan_scan(
            vec![candidate(&home, ".config/starship", true)],
            &rules(),
            ".config",
        );
        let report = engine.apply(&plan);

        assert_eq!(report.adopted, 1);
        let dest = tmp.path().join("store/starship/.config/starship");
        assert!(dest.join("config.toml").is_file());
        assert!(fs::symlink_metadata(home.join(".config/starship"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn conflict_fails_candidate_and_leaves_original() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".zshrc"), "current\n").unwrap();

        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        fs::create_dir_all(tmp.path().join("store/zsh")).unwrap();
        fs::write(tmp.path().join("store/zsh/.zshrc"), "stale\n").unwrap();

        let audit = AuditLog::open(tmp.path().join("audit.log")).unwrap();
        let engine = AdoptionEngine::new(store, audit, false);

        let plan = plan_scan(vec![candidate(&home, ".zshrc", false)], &rules(), ".config");
        let report = engine.apply(&plan);

        assert_eq!(report.adopted, 0);
        assert_eq!(report.failed.len(), 1);
        // Original untouched, stale store copy untouched.
        assert_eq!(fs::read_to_string(home.join(".zshrc")).unwrap(), "current\n");
        assert_eq!(
            fs::read_to_string(tmp.path().join("store/zsh/.zshrc")).unwrap(),
            "stale\n"
        );
    }

    #[test]
    fn overwrite_replaces_stale_store_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".zshrc"), "current\n").unwrap();

        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        fs::create_dir_all(tmp.path().join("store/zsh")).unwrap();
        fs::write(tmp.path().join("store/zsh/.zshrc"), "stale\n").unwrap();

        let audit = AuditLog::open(tmp.path().join("audit.log")).unwrap();
        let engine = AdoptionEngine::new(store, audit, true);

        let plan = plan_scan(vec![candidate(&home, ".zshrc", false)], &rules(), ".config");
        let report = engine.apply(&plan);

        assert_eq!(report.adopted, 1);
        assert_eq!(
            fs::read_to_string(tmp.path().join("store/zsh/.zshrc")).unwrap(),
            "current\n"
        );
    }

    #[test]
    fn sensitive_is_never_relocated() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        fs::create_dir_all(home.join(".ssh")).unwrap();
        fs::write(home.join(".ssh/id_ed25519"), "secret\n").unwrap();

        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let audit = AuditLog::open(tmp.path().join("audit.log")).unwrap();
        let engine = AdoptionEngine::new(store, audit, false);

        let plan = plan_scan(vec![candidate(&home, ".ssh", true)], &rules(), ".config");
        let report = engine.apply(&plan);

        assert_eq!(report.sensitive, 1);
        assert_eq!(report.adopted, 0);
        assert!(home.join(".ssh/id_ed25519").is_file());
        assert!(!fs::symlink_metadata(home.join(".ssh"))
            .unwrap()
            .file_type()
            .is_symlink());
    }
}
