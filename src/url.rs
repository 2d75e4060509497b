// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git-style package url handling.
//!
//! Packages installed from git are identified by a __package identifier__ of
//! the form `<name>@<url>`. The url part is a __composite url__ that bundles
//! three pieces of information together:
//!
//! 1. The repository url, which must end with `.git`, and must be an absolute
//!    URI.
//! 2. An optional subpath to the package root inside the repository, given as
//!    a `?path=<subpath>` query.
//! 3. An optional revision, i.e., a commit hash, tag, or branch, given after a
//!    literal `#`.
//!
//! # Grammar
//!
//! The path query may either come before the revision, or after it, but
//! never both:
//!
//! ```text
//! https://example.com/repo.git?path=src/pkg#v1.2.0
//! https://example.com/repo.git#v1.2.0?path=src/pkg
//! ```
//!
//! A url without a revision is not pinned to anything. A url without a
//! subpath means the package lives at the root of the repository.
//!
//! Decomposing and composing a url are inverses of each other modulo
//! separator normalization of the subpath. Subpaths are stored with the host
//! path separator, but always composed with `/`.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};
use url::Url;

/// Decompose full package identifier into its composite url.
///
/// # Errors
///
/// - Return [`UrlError::MalformedUrl`] if identifier or its url part cannot
///   be parsed.
/// - Return [`UrlError::InvalidUri`] if repository url is not an absolute
///   URI.
pub fn decompose(identifier: &str) -> Result<CompositeUrl> {
    identifier.parse::<PackageId>()?.decompose()
}

/// Replace revision of composite url.
///
/// Performs textual substitution of `#old` with `#new`. An empty `new`
/// removes the revision suffix entirely, i.e., the url tracks the latest
/// revision. An empty `old` means the url is currently unpinned, so a
/// non-empty `new` is appended to the end of the url. Everything else about
/// the url is left untouched.
///
/// # Errors
///
/// - Return [`UrlError::RevisionMismatch`] if current revision of url is not
///   `old`.
/// - Return [`UrlError::MalformedUrl`] if `new` contains whitespace, `#`, or
///   `?`, or if url cannot be decomposed.
/// - Return [`UrlError::InvalidUri`] if repository url of url is not an
///   absolute URI.
pub fn replace_revision(url: &str, old: &str, new: &str) -> Result<String> {
    if new.contains(|c: char| c.is_whitespace() || c == '#' || c == '?') {
        return Err(UrlError::MalformedUrl {
            url: url.into(),
            reason: "revision cannot contain whitespace, '#', or '?'",
        });
    }

    let composite: CompositeUrl = url.parse()?;
    let current = composite.revision().unwrap_or_default();
    if current != old {
        return Err(UrlError::RevisionMismatch {
            url: url.into(),
            expected: old.into(),
            found: current.into(),
        });
    }

    let marker = match new {
        "" => String::new(),
        revision => format!("#{revision}"),
    };

    // INVARIANT: Repository url and leading path query never contain '#'.
    match url.find('#') {
        Some(start) => {
            let end = url[start..]
                .find('?')
                .map_or(url.len(), |offset| start + offset);
            Ok(format!("{}{marker}{}", &url[..start], &url[end..]))
        }
        None => Ok(format!("{url}{marker}")),
    }
}

/// Package identifier.
///
/// Splits `<name>@<url>` on the first `@`. The url part is kept verbatim so
/// it can be recorded and handed back to the package manager as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageId {
    name: String,
    url: String,
}

impl PackageId {
    /// Logical name of package.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Composite url of package, i.e., everything after the first `@`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Decompose url part of identifier.
    ///
    /// # Errors
    ///
    /// - Return [`UrlError::MalformedUrl`] if url cannot be parsed.
    /// - Return [`UrlError::InvalidUri`] if repository url is not an absolute
    ///   URI.
    pub fn decompose(&self) -> Result<CompositeUrl> {
        self.url.parse()
    }
}

impl FromStr for PackageId {
    type Err = UrlError;

    fn from_str(identifier: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| UrlError::MalformedUrl {
            url: identifier.into(),
            reason,
        };

        let (name, url) = identifier
            .split_once('@')
            .ok_or_else(|| malformed("missing '@' between package name and url"))?;

        if name.trim().is_empty() {
            return Err(malformed("empty package name"));
        }

        if url.trim().is_empty() {
            return Err(malformed("empty package url"));
        }

        Ok(Self {
            name: name.into(),
            url: url.into(),
        })
    }
}

impl Display for PackageId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}@{}", self.name, self.url)
    }
}

/// Where the path query sits relative to the revision.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PathPlacement {
    /// `repo.git?path=<subpath>#<revision>`
    #[default]
    BeforeRevision,

    /// `repo.git#<revision>?path=<subpath>`
    AfterRevision,
}

/// Decomposed composite url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeUrl {
    repo_url: String,
    subpath: Option<PathBuf>,
    revision: Option<String>,
    placement: PathPlacement,
}

impl CompositeUrl {
    /// Construct new composite url without subpath or revision.
    ///
    /// # Errors
    ///
    /// - Return [`UrlError::MalformedUrl`] if repository url does not end
    ///   with `.git`, or contains `?` or `#`.
    /// - Return [`UrlError::InvalidUri`] if repository url is not an absolute
    ///   URI.
    pub fn new(repo_url: impl Into<String>) -> Result<Self> {
        let repo_url = repo_url.into();
        if repo_url.contains(['?', '#']) {
            return Err(UrlError::MalformedUrl {
                url: repo_url,
                reason: "repository url cannot carry a query or revision",
            });
        }

        repo_url.parse()
    }

    /// Repository url, always ending with `.git`.
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Subpath to package root inside repository using host separators.
    pub fn subpath(&self) -> Option<&Path> {
        self.subpath.as_deref()
    }

    /// Pinned revision.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Placement of the path query.
    pub fn placement(&self) -> PathPlacement {
        self.placement
    }

    /// Set subpath, normalizing its separators.
    ///
    /// # Errors
    ///
    /// - Return [`UrlError::MalformedUrl`] if subpath leaves the repository,
    ///   i.e., contains `..` or a drive prefix.
    pub fn with_subpath(mut self, subpath: impl AsRef<str>) -> Result<Self> {
        let subpath = subpath.as_ref();
        self.subpath = normalize_subpath(subpath).map_err(|reason| UrlError::MalformedUrl {
            url: subpath.into(),
            reason,
        })?;

        Ok(self)
    }

    /// Set pinned revision. Empty revision means no pin.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        let revision = revision.into();
        self.revision = (!revision.is_empty()).then_some(revision);
        self
    }

    /// Package root inside a clone of the repository.
    pub fn package_dir(&self, working_copy: impl AsRef<Path>) -> PathBuf {
        match &self.subpath {
            Some(subpath) => working_copy.as_ref().join(subpath),
            None => working_copy.as_ref().to_path_buf(),
        }
    }
}

impl FromStr for CompositeUrl {
    type Err = UrlError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| UrlError::MalformedUrl {
            url: url.into(),
            reason,
        };

        let repo_end = url.find(['?', '#']).unwrap_or(url.len());
        let (repo_url, mut rest) = url.split_at(repo_end);
        if repo_url.len() <= ".git".len() || !repo_url.ends_with(".git") {
            return Err(malformed("no '.git' terminated repository url"));
        }

        let mut leading_path = None;
        if let Some(query) = rest.strip_prefix('?') {
            let end = query.find('#').unwrap_or(query.len());
            let (query, tail) = query.split_at(end);
            leading_path = parse_path_query(query, '?')
                .ok_or_else(|| malformed("query must be of the form 'path=<subpath>'"))?;
            rest = tail;
        }

        let mut revision = None;
        if let Some(tail) = rest.strip_prefix('#') {
            let end = tail.find('?').unwrap_or(tail.len());
            let (marker, tail) = tail.split_at(end);
            if marker.is_empty() {
                return Err(malformed("empty revision after '#'"));
            }
            revision = Some(marker.to_string());
            rest = tail;
        }

        let mut trailing_path = None;
        if let Some(query) = rest.strip_prefix('?') {
            trailing_path = parse_path_query(query, '#')
                .ok_or_else(|| malformed("query must be of the form 'path=<subpath>'"))?;
        }

        // INVARIANT: Both path query encodings are mutually exclusive.
        let (raw_subpath, placement) = match (leading_path, trailing_path) {
            (Some(_), Some(_)) => {
                return Err(malformed("path given both before and after revision"));
            }
            (None, Some(path)) => (Some(path), PathPlacement::AfterRevision),
            (path, None) => (path, PathPlacement::BeforeRevision),
        };

        let subpath = match raw_subpath {
            Some(raw) => normalize_subpath(raw).map_err(malformed)?,
            None => None,
        };

        // INVARIANT: Url parser tolerates whitespace that git urls never carry.
        if repo_url.contains(char::is_whitespace) {
            return Err(UrlError::InvalidUri {
                url: repo_url.into(),
                source: url::ParseError::InvalidDomainCharacter,
            });
        }

        let parsed = Url::parse(repo_url).map_err(|source| UrlError::InvalidUri {
            url: repo_url.into(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(UrlError::InvalidUri {
                url: repo_url.into(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }

        Ok(Self {
            repo_url: repo_url.into(),
            subpath,
            revision,
            placement,
        })
    }
}

impl Display for CompositeUrl {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.repo_url)?;

        let query = self.subpath.as_ref().map(|subpath| {
            let segments = subpath
                .iter()
                .map(|segment| segment.to_string_lossy())
                .collect::<Vec<_>>();
            format!("?path={}", segments.join("/"))
        });
        let revision = self
            .revision
            .as_ref()
            .map(|revision| format!("#{revision}"));

        let (first, second) = match self.placement {
            PathPlacement::BeforeRevision => (query, revision),
            PathPlacement::AfterRevision => (revision, query),
        };

        for part in [first, second].into_iter().flatten() {
            fmt.write_str(&part)?;
        }

        Ok(())
    }
}

// Empty query is legal and means "no path". Otherwise we expect exactly
// `path=<subpath>` with a non-empty subpath free of `forbidden`.
fn parse_path_query(query: &str, forbidden: char) -> Option<Option<&str>> {
    if query.is_empty() {
        return Some(None);
    }

    let subpath = query.strip_prefix("path=")?;
    if subpath.is_empty() || subpath.contains(forbidden) {
        return None;
    }

    Some(Some(subpath))
}

// INVARIANT: Subpath always stays inside the repository.
fn normalize_subpath(raw: &str) -> Result<Option<PathBuf>, &'static str> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let segments = raw
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>();

    if segments.contains(&"..") {
        return Err("subpath cannot leave the repository through '..'");
    }

    if segments.iter().any(|segment| segment.contains(':')) {
        return Err("subpath cannot carry a drive prefix");
    }

    let path = segments.into_iter().collect::<PathBuf>();
    Ok((!path.as_os_str().is_empty()).then_some(path))
}

/// All possible errors for package url handling.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    /// Url does not follow composite url grammar.
    #[error("malformed package url {url:?}: {reason}")]
    MalformedUrl { url: String, reason: &'static str },

    /// Repository url is not an absolute well-formed URI.
    #[error("repository url {url:?} is not a valid absolute URI")]
    InvalidUri {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Url is not pinned to expected revision.
    #[error("url {url:?} is pinned to {found:?}, expected {expected:?}")]
    RevisionMismatch {
        url: String,
        expected: String,
        found: String,
    },
}

/// Friendly result alias :3
type Result<T, E = UrlError> = std::result::Result<T, E>;
