// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Desired-state convergence.
//!
//! Reconcile the declared package manifest against observed install state,
//! and invoke the package manager only for the delta. The reconciliation is a
//! miniature configuration-management step: snapshot what is installed,
//! compute the minimal action set, act, report.
//!
//! # Verification Ladder
//!
//! For each desired entry, in order:
//!
//! 1. The package manager already records it as installed: already satisfied.
//! 2. The entry's install artifact is independently observable on disk (an
//!    application bundle, matched case-insensitively and through symlink
//!    aliases): already satisfied, without invoking the installer.
//! 3. The artifact cannot be determined ahead of time (App Store entries
//!    install outside the observable location): unverifiable, skipped rather
//!    than risking a duplicate side-effecting install.
//! 4. Otherwise: to install.
//!
//! Both snapshots are immutable per run. A second run whose observed state
//! covers the manifest computes an empty delta, which is the whole point.
//!
//! # External Commands
//!
//! The package manager stays a black box behind the [`PackageManager`] trait;
//! the Homebrew adapter shells out and never reimplements resolution,
//! download, or install logic.

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    collections::HashSet,
    ffi::OsStr,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info, instrument, warn};

/// How a desired entry installs, which decides how it can be verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// Command-line formula; verified through the package manager only.
    Formula,

    /// Application cask; its bundle is observable on disk.
    Cask,

    /// Mac App Store entry; installs outside any observable location.
    AppStore,
}

/// One declared entry from the desired-state manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredPackage {
    pub name: String,
    pub kind: PackageKind,
}

impl DesiredPackage {
    pub fn new(name: impl Into<String>, kind: PackageKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl Display for DesiredPackage {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.name)
    }
}

/// Immutable snapshot of install state at the start of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservedState {
    /// Names the package manager reports as installed.
    pub installed: HashSet<String>,

    /// Application bundle names found on disk, lowercased, ".app" stripped.
    pub applications: HashSet<String>,
}

impl ObservedState {
    /// Snapshot installed names plus the application directories.
    ///
    /// Bundle names are collected through `fs::metadata`, which follows
    /// symlinks, so an aliased bundle still counts as observed.
    ///
    /// # Errors
    ///
    /// - Return [`ConvergeError::Syscall`] if the package manager query fails.
    pub fn snapshot(
        manager: &impl PackageManager,
        applications_dirs: &[PathBuf],
    ) -> Result<Self> {
        let installed = manager.installed()?;
        let mut applications = HashSet::new();

        for dir in applications_dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                debug!("applications directory {:?} unreadable, skipping", dir.display());
                continue;
            };
            for entry in entries.flatten() {
                // INVARIANT: Follow symlinks so aliased bundles count.
                if !fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false) {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if let Some(stem) = name.strip_suffix(".app") {
                    applications.insert(stem.to_lowercase());
                }
            }
        }

        Ok(Self {
            installed,
            applications,
        })
    }

    /// Whether a cask's derived bundle name is observable on disk.
    pub fn has_application(&self, bundle_name: &str) -> bool {
        self.applications.contains(&bundle_name.to_lowercase())
    }
}

/// Minimal action set computed from desired versus observed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvergencePlan {
    pub to_install: Vec<DesiredPackage>,
    pub already_satisfied: Vec<DesiredPackage>,
    pub unverifiable: Vec<DesiredPackage>,
}

impl ConvergencePlan {
    pub fn is_converged(&self) -> bool {
        self.to_install.is_empty()
    }
}

/// Compute the minimal install delta. Pure; acts on snapshots only.
pub fn plan_convergence(desired: &[DesiredPackage], observed: &ObservedState) -> ConvergencePlan {
    let mut plan = ConvergencePlan::default();

    for package in desired {
        if observed.installed.contains(&package.name) {
            plan.already_satisfied.push(package.clone());
            continue;
        }

        match package.kind {
            PackageKind::Cask if observed.has_application(&bundle_name(&package.name)) => {
                plan.already_satisfied.push(package.clone());
            }
            PackageKind::AppStore => plan.unverifiable.push(package.clone()),
            _ => plan.to_install.push(package.clone()),
        }
    }

    plan
}

/// Derive the application bundle name a cask token would produce.
///
/// Hyphen-separated tokens title-case into the conventional bundle name:
/// "visual-studio-code" becomes "Visual Studio Code".
pub fn bundle_name(cask_token: &str) -> String {
    cask_token
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Layer of indirection for the package manager CLI.
pub trait PackageManager {
    /// Names the manager currently records as installed.
    fn installed(&self) -> Result<HashSet<String>>;

    /// Parse the desired-state manifest into declared entries.
    fn desired(&self, manifest: &Path) -> Result<Vec<DesiredPackage>>;

    /// Install one entry.
    fn install(&self, package: &DesiredPackage) -> Result<String>;
}

/// Homebrew behind a [`PackageManager`] face.
#[derive(Clone, Debug)]
pub struct BrewCli {
    bin: String,
}

impl Default for BrewCli {
    fn default() -> Self {
        Self { bin: "brew".into() }
    }
}

impl BrewCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Parse the Brewfile subset dotwarden cares about.
    ///
    /// Recognized forms, one per line: `brew "name"`, `cask "name"`, and
    /// `mas "Name", id: ...`. Comments and anything else (taps, options) are
    /// skipped; the manifest belongs to Homebrew, not to us.
    fn parse_manifest(content: &str) -> Vec<DesiredPackage> {
        let mut desired = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let kind = if line.starts_with("brew ") {
                PackageKind::Formula
            } else if line.starts_with("cask ") {
                PackageKind::Cask
            } else if line.starts_with("mas ") {
                PackageKind::AppStore
            } else {
                continue;
            };

            if let Some(name) = quoted_token(line) {
                desired.push(DesiredPackage::new(name, kind));
            }
        }

        desired
    }
}

fn quoted_token(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let len = line[start..].find('"')?;
    let token = &line[start..start + len];
    if token.is_empty() {
        return None;
    }

    Some(token)
}

impl PackageManager for BrewCli {
    fn installed(&self) -> Result<HashSet<String>> {
        let mut installed = HashSet::new();
        for args in [["list", "--formula", "-1"], ["list", "--cask", "-1"]] {
            let output = syscall_non_interactive(&self.bin, args)?;
            installed.extend(output.lines().map(|line| line.trim().to_owned()));
        }
        installed.retain(|name| !name.is_empty());

        Ok(installed)
    }

    fn desired(&self, manifest: &Path) -> Result<Vec<DesiredPackage>> {
        let content = fs::read_to_string(manifest).map_err(|err| ConvergeError::ReadManifest {
            source: err,
            manifest: manifest.to_path_buf(),
        })?;

        Ok(Self::parse_manifest(&content))
    }

    #[instrument(skip(self), level = "debug")]
    fn install(&self, package: &DesiredPackage) -> Result<String> {
        let args: Vec<&str> = match package.kind {
            PackageKind::Cask => vec!["install", "--cask", &package.name],
            _ => vec!["install", &package.name],
        };

        syscall_non_interactive(&self.bin, args)
    }
}

/// Batch outcome of an applied convergence plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub already_satisfied: usize,
    pub unverifiable: usize,
}

impl Display for InstallReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "installed: {}, satisfied: {}, unverifiable: {}, failed: {}",
            self.installed.len(),
            self.already_satisfied,
            self.unverifiable,
            self.failed.len(),
        )
    }
}

/// Execute a convergence plan, one entry at a time.
///
/// A failing entry is recorded and the batch continues; one bad package must
/// not block the rest.
///
/// # Errors
///
/// - Return [`ConvergeError::ProgressStyle`] if the progress bar template is
///   invalid.
#[instrument(skip(manager, plan), level = "debug")]
pub fn apply_convergence(
    manager: &impl PackageManager,
    plan: &ConvergencePlan,
) -> Result<InstallReport> {
    let mut report = InstallReport {
        already_satisfied: plan.already_satisfied.len(),
        unverifiable: plan.unverifiable.len(),
        ..InstallReport::default()
    };

    for package in &plan.unverifiable {
        warn!("cannot verify install state of {package}, skipping");
    }

    let bar = ProgressBar::new(plan.to_install.len() as u64);
    let style =
        ProgressStyle::with_template("{elapsed_precise:.green}  {msg:<30}  [{wide_bar:.yellow/blue}] {pos}/{len}")?
            .progress_chars("-Cco.");
    bar.set_style(style);

    for package in &plan.to_install {
        bar.set_message(package.name.clone());
        match manager.install(package) {
            Ok(_) => {
                info!("installed {package}");
                report.installed.push(package.name.clone());
            }
            Err(error) => {
                warn!("failed to install {package}: {error}");
                report.failed.push((package.name.clone(), error.to_string()));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    Ok(report)
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref())
        .args(args)
        .output()
        .map_err(ConvergeError::Syscall)?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(&stdout);
    }

    if !stderr.is_empty() {
        message.push_str(&stderr);
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(ConvergeError::Syscall(std::io::Error::other(format!(
            "command {:?} failed:\n{message}",
            cmd.as_ref()
        ))));
    }

    Ok(message)
}

/// Convergence error types.
#[derive(Debug, thiserror::Error)]
pub enum ConvergeError {
    /// Desired-state manifest cannot be read.
    #[error("failed to read manifest at {:?}", manifest.display())]
    ReadManifest {
        #[source]
        source: std::io::Error,
        manifest: PathBuf,
    },

    /// External command invocation fails.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    ProgressStyle(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = ConvergeError> = std::result::Result<T, E>;
