// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotwarden keeps a home directory converged.
//!
//! Two engines share this crate. The __adoption engine__ scans the home
//! directory for unmanaged configuration files, classifies each one through
//! ordered pattern lists (sensitive, ignore, adopt), and relocates adoptable
//! files into a central package store with a link left behind. The
//! __convergence checker__ compares a declared package manifest against
//! observed install state and drives the package manager through only the
//! missing delta.
//!
//! Everything heavyweight stays external: Homebrew installs packages, a
//! symlink farm materializes whole packages, and a scheduler triggers
//! periodic runs. Dotwarden is the decision core in between.

pub mod adopt;
pub mod audit;
pub mod classify;
pub mod config;
pub mod converge;
pub mod path;
pub mod pattern;
pub mod resolve;
pub mod scan;
pub mod store;

pub use adopt::{plan_scan, AdoptionEngine, Decision, FsRelocator, PlanItem, ScanPlan, ScanReport};
pub use audit::{AuditKind, AuditLog, AuditSummary};
pub use classify::{Classifier, Verdict};
pub use config::{Config, Settings};
pub use converge::{
    apply_convergence, plan_convergence, BrewCli, ConvergencePlan, DesiredPackage, InstallReport,
    ObservedState, PackageKind, PackageManager,
};
pub use path::{default_config_file, home_dir};
pub use pattern::{PatternRule, PatternStore, RuleList};
pub use resolve::resolve_package_name;
pub use scan::{Candidate, HomeScanner};
pub use store::{ManagedPackage, PackageStore};
