// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way. Nothing here checks that the
//! returned paths actually exist.

use std::path::PathBuf;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to the package store.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/dotwarden-store` as the
/// default location for managed packages.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_store_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("dotwarden-store"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the pattern rule directory.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_pattern_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("dotwarden").join("patterns"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the configuration file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("dotwarden").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the audit log.
///
/// The audit log lives under the data directory rather than a state
/// directory, because `dirs::state_dir` resolves to nothing on macOS.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_audit_log() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("dotwarden").join("audit.log"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the desired-state manifest.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_manifest() -> Result<PathBuf> {
    home_dir().map(|path| path.join(".Brewfile"))
}

/// Determine default application bundle directories to observe.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_applications_dirs() -> Result<Vec<PathBuf>> {
    let home = home_dir()?;
    Ok(vec![PathBuf::from("/Applications"), home.join("Applications")])
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
