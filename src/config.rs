// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the user's configuration file to simplify the
//! process of serialization and deserialization. The configuration file is
//! optional. Every setting has a sane default, so a missing file is treated
//! like an empty one.
//!
//! # General Layout
//!
//! ```toml
//! working_copy_root = "$HOME/src/packages"
//! packages_dir = "Packages"
//! store_file = "PackageOverrides.txt"
//! git = "git"
//! platform = "auto"
//! ```
//!
//! Path settings go through shell expansion, so environment variables and
//! `~` can be used freely.

use crate::{
    path::{PACKAGES_DIR, STORE_FILE},
    process::Platform,
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs,
    io,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// User settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory that houses working copies. Defaults to a folder in the
    /// user's documents directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_copy_root: Option<PathBuf>,

    /// Package manager's packages directory.
    pub packages_dir: PathBuf,

    /// Name of override store file inside packages directory.
    pub store_file: String,

    /// Git binary to use.
    pub git: String,

    /// Platform command conventions to use.
    pub platform: Platform,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            working_copy_root: None,
            packages_dir: PathBuf::from(PACKAGES_DIR),
            store_file: STORE_FILE.into(),
            git: "git".into(),
            platform: Platform::default(),
        }
    }
}

impl Settings {
    /// Load settings from configuration file at target path.
    ///
    /// Return default settings if the file does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Io`] if file exists, but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file contents are invalid.
    /// - Return [`ConfigError::ShellExpansion`] if path settings cannot be
    ///   expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(data) => data.parse(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io {
                source: err,
                path: path.to_path_buf(),
            }),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path fields.
        settings.packages_dir = expand(&settings.packages_dir)?;
        if let Some(root) = &settings.working_copy_root {
            settings.working_copy_root = Some(expand(root)?);
        }

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

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
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

    /// Failed to read configuration file.
    #[error("failed to read configuration file {}", path.display())]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
