// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the dotwarden settings file, and resolve it into the
//! explicit [`Config`] handed to every component. There is no ambient lookup:
//! whatever directory roots a component needs, it receives at construction.
//!
//! # General Layout
//!
//! The settings file is TOML with two small tables. Every field is optional;
//! anything omitted falls back to an XDG-flavored default:
//!
//! ```toml
//! [paths]
//! store = "~/.local/share/dotwarden-store"
//! patterns = "~/.config/dotwarden/patterns"
//! audit_log = "~/.local/share/dotwarden/audit.log"
//! manifest = "~/.Brewfile"
//! applications = ["/Applications", "~/Applications"]
//!
//! [scan]
//! grouped_dir = ".config"
//! require_patterns = false
//! overwrite = false
//! ```
//!
//! Path fields go through shell expansion at parse time, so `~` and
//! environment variables behave the way they do in the shell scripts this
//! replaces.

use crate::path::{
    default_audit_log, default_applications_dirs, default_manifest, default_pattern_dir,
    default_store_dir, home_dir,
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::info;

/// Raw settings file layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Directory roots and file locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// Scan behavior knobs.
    #[serde(default)]
    pub scan: ScanSettings,
}

/// Overridable locations.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PathSettings {
    /// Package store root.
    pub store: Option<PathBuf>,

    /// Pattern rule directory.
    pub patterns: Option<PathBuf>,

    /// Audit log location.
    pub audit_log: Option<PathBuf>,

    /// Desired-state manifest consumed by the convergence checker.
    pub manifest: Option<PathBuf>,

    /// Application bundle directories the convergence checker observes.
    pub applications: Option<Vec<PathBuf>>,
}

/// Scan behavior knobs.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ScanSettings {
    /// Directory whose second path segment names the package group.
    pub grouped_dir: Option<String>,

    /// Treat a missing pattern directory as fatal instead of degrading.
    #[serde(default)]
    pub require_patterns: bool,

    /// Allow adoption to replace stale store copies.
    #[serde(default)]
    pub overwrite: bool,
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        settings.paths.store = settings.paths.store.map(expand_path).transpose()?;
        settings.paths.patterns = settings.paths.patterns.map(expand_path).transpose()?;
        settings.paths.audit_log = settings.paths.audit_log.map(expand_path).transpose()?;
        settings.paths.manifest = settings.paths.manifest.map(expand_path).transpose()?;
        settings.paths.applications = settings
            .paths
            .applications
            .map(|dirs| dirs.into_iter().map(expand_path).collect::<Result<Vec<_>, _>>())
            .transpose()?;

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand_path(path: PathBuf) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy().into_owned();
    let expanded = shellexpand::full(raw.as_str())
        .map_err(ConfigError::ShellExpansion)?
        .into_owned();

    Ok(PathBuf::from(expanded))
}

impl Settings {
    /// Load settings from an explicit or default location.
    ///
    /// An explicitly given path must exist. The default location is allowed
    /// to be absent, in which case built-in defaults apply.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadConfig`] if an explicit path cannot be
    ///   read.
    /// - Return [`ConfigError::Deserialize`] if the file is not valid TOML.
    pub fn load(explicit: Option<&Path>, fallback: &Path) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(path) => (path, true),
            None => (fallback, false),
        };

        if !path.is_file() {
            if required {
                return Err(ConfigError::ReadConfig {
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                    config_path: path.to_path_buf(),
                });
            }

            info!("no settings file at {:?}, using defaults", path.display());
            return Ok(Self::default());
        }

        read_to_string(path)
            .map_err(|err| ConfigError::ReadConfig {
                source: err,
                config_path: path.to_path_buf(),
            })?
            .parse()
    }

    /// Fill every omitted field with its default and produce the resolved
    /// configuration passed into components.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if the home directory cannot be
    ///   determined for defaulting.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        Ok(Config {
            home: home_dir()?,
            store: match self.paths.store {
                Some(path) => path,
                None => default_store_dir()?,
            },
            patterns: match self.paths.patterns {
                Some(path) => path,
                None => default_pattern_dir()?,
            },
            audit_log: match self.paths.audit_log {
                Some(path) => path,
                None => default_audit_log()?,
            },
            manifest: match self.paths.manifest {
                Some(path) => path,
                None => default_manifest()?,
            },
            applications: match self.paths.applications {
                Some(dirs) => dirs,
                None => default_applications_dirs()?,
            },
            grouped_dir: self.scan.grouped_dir.unwrap_or_else(|| ".config".into()),
            require_patterns: self.scan.require_patterns,
            overwrite: self.scan.overwrite,
        })
    }
}

/// Fully resolved configuration handed to every component.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub store: PathBuf,
    pub patterns: PathBuf,
    pub audit_log: PathBuf,
    pub manifest: PathBuf,
    pub applications: Vec<PathBuf>,
    pub grouped_dir: String,
    pub require_patterns: bool,
    pub overwrite: bool,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Explicit settings file cannot be read.
    #[error("failed to read settings file at {:?}", config_path.display())]
    ReadConfig {
        #[source]
        source: std::io::Error,
        config_path: PathBuf,
    },

    /// Home directory cannot be determined for defaulting.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("WARDEN_ROOT", "/home/blah/dotfiles")])]
    fn deserialize_settings_with_expansion() -> anyhow::Result<()> {
        let result: Settings = r#"
            [paths]
            store = "$WARDEN_ROOT/store"
            audit_log = "$WARDEN_ROOT/audit.log"

            [scan]
            grouped_dir = ".config"
            overwrite = true
        "#
        .parse()?;

        let expect = Settings {
            paths: PathSettings {
                store: Some(PathBuf::from("/home/blah/dotfiles/store")),
                patterns: None,
                audit_log: Some(PathBuf::from("/home/blah/dotfiles/audit.log")),
                manifest: None,
                applications: None,
            },
            scan: ScanSettings {
                grouped_dir: Some(".config".into()),
                require_patterns: false,
                overwrite: true,
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn empty_settings_parse_to_defaults() {
        let result: Settings = "".parse().unwrap();
        assert_eq!(result, Settings::default());
    }

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn resolve_fills_defaults() -> anyhow::Result<()> {
        let config = Settings::default().resolve()?;

        assert_eq!(config.home, PathBuf::from("/home/blah"));
        assert_eq!(config.manifest, PathBuf::from("/home/blah/.Brewfile"));
        assert_eq!(config.grouped_dir, ".config");
        assert!(!config.overwrite);
        assert!(config.store.ends_with("dotwarden-store"));

        Ok(())
    }

    #[test]
    fn explicit_missing_settings_file_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.toml");
        let result = Settings::load(Some(&missing), &missing);
        assert!(matches!(result, Err(ConfigError::ReadConfig { .. })));
    }

    #[test]
    fn absent_default_settings_file_degrades() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Settings::load(None, &tmp.path().join("nope.toml")).unwrap();
        assert_eq!(result, Settings::default());
    }
}
