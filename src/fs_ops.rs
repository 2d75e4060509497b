// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File system side effects of switching packages.
//!
//! Materialize working copies through git, point install slots at them
//! through directory symlinks, and tear those symlinks down again.
//!
//! # Working Copy Cache
//!
//! A working copy is never deleted once cloned. If the target directory of a
//! clone already exists and is not empty, pkgedit assumes it holds a previous
//! clone of the same repository, and simply checks out the requested revision
//! in place instead of cloning again.

use crate::process::{CommandFormatter, Invocation, Platform, ProcessRunner, SystemRunner};

use std::{
    ffi::OsString,
    fs,
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Create directory and all of its parents if missing.
///
/// # Errors
///
/// - Return [`FsError::Io`] if directory cannot be created.
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path.as_ref()).map_err(|err| FsError::Io {
        source: err,
        path: path.as_ref().to_path_buf(),
    })
}

/// Check if path is a directory with at least one entry.
pub fn is_populated(path: impl AsRef<Path>) -> bool {
    fs::read_dir(path.as_ref())
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// File system operations backed by external programs.
#[derive(Debug)]
pub struct FileSystemOps<R = SystemRunner>
where
    R: ProcessRunner,
{
    runner: R,
    formatter: Box<dyn CommandFormatter>,
    git: OsString,
}

impl Default for FileSystemOps<SystemRunner> {
    fn default() -> Self {
        Self::new(SystemRunner, Platform::Auto.formatter())
    }
}

impl<R> FileSystemOps<R>
where
    R: ProcessRunner,
{
    /// Construct new file system operations using "git" from `$PATH`.
    pub fn new(runner: R, formatter: Box<dyn CommandFormatter>) -> Self {
        Self {
            runner,
            formatter,
            git: "git".into(),
        }
    }

    /// Use different git binary.
    pub fn with_git(mut self, git: impl Into<OsString>) -> Self {
        self.git = git.into();
        self
    }

    /// Process runner in use.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Clone repository, or check out revision of cached clone.
    ///
    /// If `working_root/target_dir_name` exists and is not empty, then the
    /// revision is checked out inside of it. Otherwise, the repository is
    /// cloned into `target_dir_name` from inside `working_root`, and the
    /// revision is checked out in the fresh clone afterwards. Without a
    /// revision, the default branch is left as-is.
    ///
    /// Return path to the working copy.
    ///
    /// # Errors
    ///
    /// - Return [`FsError::CloneFailed`] if the working copy is missing or
    ///   empty after git ran. A partial clone is left on disk.
    /// - Return [`FsError::Process`] if git cannot be launched.
    #[instrument(skip(self), level = "debug")]
    pub fn clone_or_checkout(
        &self,
        repo_url: &str,
        revision: Option<&str>,
        target_dir_name: &str,
        working_root: &Path,
    ) -> Result<PathBuf> {
        let target = working_root.join(target_dir_name);

        if is_populated(&target) {
            info!("reuse cached working copy {}", target.display());
            if let Some(revision) = revision {
                self.checkout(&target, revision)?;
            }
        } else {
            info!("clone {repo_url} into {}", target.display());
            let invocation = Invocation::new(&self.git)
                .arg("clone")
                .arg(repo_url)
                .arg(target_dir_name);
            self.runner.run(&invocation, Some(working_root))?;

            if let (Some(revision), true) = (revision, is_populated(&target)) {
                self.checkout(&target, revision)?;
            }
        }

        // INVARIANT: A usable working copy is never empty.
        if !is_populated(&target) {
            return Err(FsError::CloneFailed {
                repo_url: repo_url.into(),
                target,
            });
        }

        Ok(target)
    }

    /// Replace whatever sits at `link` with a directory symlink to `target`.
    ///
    /// Existing symlinks are removed as links, directories are removed
    /// recursively, and files are unlinked. Replacement is not atomic. A
    /// failure between removal and creation leaves `link` absent.
    ///
    /// # Errors
    ///
    /// - Return [`FsError::Io`] if existing entry cannot be removed.
    /// - Return [`FsError::LinkFailed`] if no symlink exists afterwards.
    /// - Return [`FsError::Process`] if link program cannot be launched.
    #[instrument(skip(self), level = "debug")]
    pub fn replace_symlink(&self, target: &Path, link: &Path) -> Result<()> {
        if link.symlink_metadata().is_ok() {
            debug!("remove existing install slot {}", link.display());
            remove_path(link).map_err(|err| FsError::Io {
                source: err,
                path: link.to_path_buf(),
            })?;
        }

        let invocation = self.formatter.symlink(target, link);
        self.runner.run(&invocation, None)?;

        let linked = link
            .symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_symlink());
        if !linked {
            return Err(FsError::LinkFailed {
                link: link.to_path_buf(),
                target: target.to_path_buf(),
            });
        }

        info!("linked {} to {}", link.display(), target.display());
        Ok(())
    }

    /// Remove install slot.
    ///
    /// Symlinks are removed as links, so the working copy they point at
    /// survives. Directories are removed recursively.
    ///
    /// # Errors
    ///
    /// - Return [`FsError::PathNotFound`] if path does not exist.
    /// - Return [`FsError::Io`] if path cannot be removed.
    #[instrument(skip(self), level = "debug")]
    pub fn remove_directory(&self, path: &Path) -> Result<()> {
        if let Err(err) = path.symlink_metadata() {
            return match err.kind() {
                io::ErrorKind::NotFound => Err(FsError::PathNotFound(path.to_path_buf())),
                _ => Err(FsError::Io {
                    source: err,
                    path: path.to_path_buf(),
                }),
            };
        }

        remove_path(path).map_err(|err| FsError::Io {
            source: err,
            path: path.to_path_buf(),
        })?;
        info!("removed {}", path.display());

        Ok(())
    }

    /// Open directory in the platform's file browser.
    ///
    /// # Errors
    ///
    /// - Return [`FsError::PathNotFound`] if path does not exist.
    /// - Return [`FsError::Process`] if file browser cannot be launched.
    pub fn open_folder(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(FsError::PathNotFound(path.to_path_buf()));
        }

        let output = self.runner.run(&self.formatter.open_folder(path), None)?;
        if !output.success {
            warn!("file browser could not open {}", path.display());
        }

        Ok(())
    }

    fn checkout(&self, working_copy: &Path, revision: &str) -> Result<()> {
        debug!("checkout {revision} in {}", working_copy.display());
        let invocation = Invocation::new(&self.git).arg("checkout").arg(revision);
        let output = self.runner.run(&invocation, Some(working_copy))?;
        if !output.success {
            warn!(
                "could not check out {revision} in {}, keeping current revision",
                working_copy.display()
            );
        }

        Ok(())
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    let file_type = path.symlink_metadata()?.file_type();
    if file_type.is_symlink() {
        remove_link(path)
    } else if file_type.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(windows)]
fn remove_link(path: &Path) -> io::Result<()> {
    // Directory symlinks must be removed as directories on Windows.
    fs::remove_dir(path).or_else(|_| fs::remove_file(path))
}

#[cfg(not(windows))]
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// All possible errors for file system operations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Working copy is missing or empty after git ran.
    #[error("failed to clone {repo_url} into {}", target.display())]
    CloneFailed { repo_url: String, target: PathBuf },

    /// Removal target does not exist.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Symlink does not exist after link program ran.
    #[error("failed to link {} to {}", link.display(), target.display())]
    LinkFailed { link: PathBuf, target: PathBuf },

    /// Plain file system I/O failed.
    #[error("failed to access {}", path.display())]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// External program could not be launched.
    #[error(transparent)]
    Process(#[from] crate::process::ProcessError),
}

/// Friendly result alias :3
type Result<T, E = FsError> = std::result::Result<T, E>;
