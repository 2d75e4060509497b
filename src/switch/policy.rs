// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Revision reconciliation when leaving local mode.
//!
//! While a package lives in a local working copy, the user is free to move
//! the working copy to another revision. By the time the package is
//! reverted, the version it reports may no longer match the revision its
//! recorded url is pinned to. Resolving that conflict is a user decision
//! between three candidate urls:
//!
//! 1. Keep the stored revision.
//! 2. Adopt the installed version as the new pinned revision.
//! 3. Drop the pin entirely, and track the latest revision.

use crate::url::{replace_revision, CompositeUrl, UrlError};

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Choice of url to reinstall a package from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RevisionPolicy {
    /// Reinstall from the recorded url as-is.
    #[default]
    KeepStored,

    /// Pin recorded url to the installed version.
    AdoptInstalled,

    /// Strip revision from recorded url.
    TrackLatest,
}

impl RevisionPolicy {
    /// All policies in prompt order.
    pub const ALL: [Self; 3] = [Self::KeepStored, Self::AdoptInstalled, Self::TrackLatest];
}

impl Display for RevisionPolicy {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::KeepStored => "keep stored revision",
            Self::AdoptInstalled => "adopt installed version",
            Self::TrackLatest => "track latest revision",
        })
    }
}

/// Candidate urls for a conflicting revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertCandidates {
    /// Revision the recorded url is pinned to.
    pub stored_revision: Option<String>,

    /// Version reported by the working copy.
    pub installed_version: String,

    /// Recorded url unchanged.
    pub keep: String,

    /// Recorded url pinned to installed version.
    pub adopt: String,

    /// Recorded url without revision.
    pub latest: String,
}

impl RevertCandidates {
    /// Detect conflict between recorded url and installed version.
    ///
    /// Return `None` if there is no conflict, i.e., the installed version is
    /// unknown, or matches the stored revision.
    ///
    /// # Errors
    ///
    /// - Return [`UrlError`] if recorded url cannot be decomposed.
    /// - Return [`UrlError::MalformedUrl`] if installed version cannot be used
    ///   as a revision, e.g., it contains `#` or `?`.
    pub fn detect(
        stored_url: &str,
        installed_version: Option<&str>,
    ) -> Result<Option<Self>, UrlError> {
        let composite: CompositeUrl = stored_url.parse()?;
        let stored = composite.revision();

        let installed = match installed_version.map(str::trim) {
            Some(version) if !version.is_empty() && Some(version) != stored => version,
            _ => return Ok(None),
        };

        let old = stored.unwrap_or_default();
        Ok(Some(Self {
            stored_revision: stored.map(str::to_owned),
            installed_version: installed.into(),
            keep: stored_url.into(),
            adopt: replace_revision(stored_url, old, installed)?,
            latest: replace_revision(stored_url, old, "")?,
        }))
    }

    /// Url selected by policy.
    pub fn select(&self, policy: RevisionPolicy) -> &str {
        match policy {
            RevisionPolicy::KeepStored => &self.keep,
            RevisionPolicy::AdoptInstalled => &self.adopt,
            RevisionPolicy::TrackLatest => &self.latest,
        }
    }
}
