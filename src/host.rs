// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External package manager collaborator.
//!
//! Pkgedit never resolves or downloads packages by itself. Whatever package
//! manager owns the project is asked to drop a pinned package before its
//! install slot is replaced by a local working copy, and to reinstall it from
//! its original url afterwards.
//!
//! # Manifest Host
//!
//! [`ManifestHost`] drives a package manager that reads its dependencies from
//! a `manifest.json` file inside the packages directory, and records resolved
//! git revisions in a `packages-lock.json` file next to it:
//!
//! ```json
//! {
//!   "dependencies": {
//!     "com.demo.pkg": "https://example.com/demo.git?path=Runtime#v1.0.0"
//!   }
//! }
//! ```
//!
//! Packages living directly inside the packages directory are picked up by
//! the package manager without a manifest entry, which is exactly what a
//! symlinked working copy relies on.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Where the package manager gets a package from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Installed from its url at a pinned revision.
    RemotePinned,

    /// Install slot is a symlink to a local working copy.
    LocalWorkingCopy,
}

/// What the package manager knows about a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Logical name of package.
    pub name: String,

    /// Full `<name>@<url>` identifier of package.
    pub identifier: String,

    /// Version the package itself claims to be at.
    pub installed_version: Option<String>,

    /// Commit the package manager resolved the pinned url to.
    pub resolved_revision: Option<String>,

    /// Where the package is installed from.
    pub source: SourceKind,
}

/// Layer of indirection for package manager access.
pub trait PackageHost {
    /// Install package from url.
    fn install_from_url(&mut self, name: &str, url: &str) -> Result<()>;

    /// Drop registration of remotely pinned package.
    fn remove_pinned(&mut self, name: &str) -> Result<()>;

    /// Describe target package. Return `None` if the package is unknown.
    fn package_descriptor(&self, name: &str) -> Result<Option<PackageDescriptor>>;

    /// Ask package manager to rescan its packages.
    fn refresh(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Deserialize)]
struct PackagesLock {
    #[serde(default)]
    dependencies: HashMap<String, LockEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct LockEntry {
    hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    version: Option<String>,
}

/// Package manager driven through `manifest.json`.
#[derive(Debug, Clone)]
pub struct ManifestHost {
    packages_dir: PathBuf,
}

impl ManifestHost {
    /// Construct new manifest host for target packages directory.
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }

    /// Path to `manifest.json`.
    pub fn manifest_path(&self) -> PathBuf {
        self.packages_dir.join("manifest.json")
    }

    /// Path to `packages-lock.json`.
    pub fn lock_path(&self) -> PathBuf {
        self.packages_dir.join("packages-lock.json")
    }

    fn read_manifest(&self) -> Result<Map<String, Value>> {
        read_json(&self.manifest_path())?.ok_or_else(|| HostError::Io {
            source: io::Error::from(io::ErrorKind::NotFound),
            path: self.manifest_path(),
        })
    }

    fn write_manifest(&self, manifest: &Map<String, Value>) -> Result<()> {
        let path = self.manifest_path();
        let mut contents =
            serde_json::to_string_pretty(manifest).map_err(|err| HostError::Json {
                source: err,
                path: path.clone(),
            })?;
        contents.push('\n');

        fs::write(&path, contents).map_err(|err| HostError::Io { source: err, path })
    }
}

impl PackageHost for ManifestHost {
    #[instrument(skip(self), level = "debug")]
    fn install_from_url(&mut self, name: &str, url: &str) -> Result<()> {
        let mut manifest = self.read_manifest()?;
        let dependencies = manifest
            .entry("dependencies")
            .or_insert_with(|| Value::Object(Map::new()));
        dependencies_of(dependencies, name)?
            .insert(name.into(), Value::String(url.into()));
        self.write_manifest(&manifest)?;
        info!("added {name} to {}", self.manifest_path().display());

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn remove_pinned(&mut self, name: &str) -> Result<()> {
        let mut manifest = self.read_manifest()?;
        let removed = match manifest.get_mut("dependencies") {
            Some(dependencies) => dependencies_of(dependencies, name)?.shift_remove(name),
            None => None,
        };
        if removed.is_none() {
            debug!("{name} is not pinned in {}", self.manifest_path().display());
            return Ok(());
        }

        self.write_manifest(&manifest)?;
        info!("removed {name} from {}", self.manifest_path().display());

        Ok(())
    }

    fn package_descriptor(&self, name: &str) -> Result<Option<PackageDescriptor>> {
        let slot = self.packages_dir.join(name);
        let is_link = slot
            .symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_symlink());

        if is_link {
            let package: Option<PackageJson> = read_json(&slot.join("package.json"))?;
            return Ok(Some(PackageDescriptor {
                name: name.into(),
                identifier: format!("{name}@file:{}", slot.display()),
                installed_version: package.and_then(|package| package.version),
                resolved_revision: None,
                source: SourceKind::LocalWorkingCopy,
            }));
        }

        let manifest = self.read_manifest()?;
        let url = manifest
            .get("dependencies")
            .and_then(|dependencies| dependencies.get(name))
            .and_then(Value::as_str);
        let Some(url) = url else {
            return Ok(None);
        };

        let lock: PackagesLock = read_json(&self.lock_path())?.unwrap_or_default();
        let resolved_revision = lock
            .dependencies
            .get(name)
            .and_then(|entry| entry.hash.clone());

        Ok(Some(PackageDescriptor {
            name: name.into(),
            identifier: format!("{name}@{url}"),
            installed_version: None,
            resolved_revision,
            source: SourceKind::RemotePinned,
        }))
    }

    fn refresh(&mut self) -> Result<()> {
        // The package manager watches the packages directory on its own.
        debug!("refresh requested for {}", self.packages_dir.display());
        Ok(())
    }
}

// INVARIANT: Edits happen in place, so key order of the manifest survives.
fn dependencies_of<'a>(value: &'a mut Value, name: &str) -> Result<&'a mut Map<String, Value>> {
    value.as_object_mut().ok_or_else(|| HostError::Rejected {
        name: name.into(),
        reason: "manifest dependencies are not a JSON object".into(),
    })
}

fn read_json<T>(path: &Path) -> Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(HostError::Io {
                source: err,
                path: path.to_path_buf(),
            })
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|err| HostError::Json {
            source: err,
            path: path.to_path_buf(),
        })
}

/// All possible errors for package manager interaction.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Package manager files cannot be read or written.
    #[error("failed to access {}", path.display())]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Package manager files contain invalid JSON.
    #[error("invalid JSON in {}", path.display())]
    Json {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Package manager files cannot hold request.
    #[error("package manager rejected {name:?}: {reason}")]
    Rejected { name: String, reason: String },
}

/// Friendly result alias :3
type Result<T, E = HostError> = std::result::Result<T, E>;
