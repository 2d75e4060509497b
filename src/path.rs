// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use crate::config::Settings;

use std::path::{Path, PathBuf};

/// Name of the directory that houses working copies inside the user's
/// document directory.
pub const WORKING_COPY_DIR: &str = "UnityGitPackages";

/// Default directory of the package manager's install slots.
pub const PACKAGES_DIR: &str = "Packages";

/// Default name of the override store file inside the packages directory.
pub const STORE_FILE: &str = "PackageOverrides.txt";

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

/// Determine default absolute path to the working copy root.
///
/// Uses `<documents>/UnityGitPackages`. Platforms without a known document
/// directory fall back to `$HOME/Documents`. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_working_copy_root() -> Result<PathBuf> {
    dirs::document_dir()
        .or_else(|| home_dir().ok().map(|home| home.join("Documents")))
        .map(|path| path.join(WORKING_COPY_DIR))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the configuration file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("pkgedit").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Locations of everything pkgedit touches on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    working_copy_root: PathBuf,
    packages_dir: PathBuf,
    store_file: String,
}

impl Layout {
    /// Construct new layout with default store file name.
    pub fn new(working_copy_root: impl Into<PathBuf>, packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_copy_root: working_copy_root.into(),
            packages_dir: packages_dir.into(),
            store_file: STORE_FILE.into(),
        }
    }

    /// Resolve layout from user settings.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if settings leave the working copy root unset,
    ///   and the default cannot be determined.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let working_copy_root = match &settings.working_copy_root {
            Some(path) => path.clone(),
            None => default_working_copy_root()?,
        };

        Ok(Self {
            working_copy_root,
            packages_dir: settings.packages_dir.clone(),
            store_file: settings.store_file.clone(),
        })
    }

    /// Directory that houses all working copies.
    pub fn working_copy_root(&self) -> &Path {
        &self.working_copy_root
    }

    /// Directory of the package manager's install slots.
    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    /// Working copy of target package.
    pub fn working_copy(&self, name: &str) -> PathBuf {
        self.working_copy_root.join(name)
    }

    /// Install slot of target package.
    pub fn install_slot(&self, name: &str) -> PathBuf {
        self.packages_dir.join(name)
    }

    /// Backing file of the override store.
    pub fn store_path(&self) -> PathBuf {
        self.packages_dir.join(&self.store_file)
    }
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
