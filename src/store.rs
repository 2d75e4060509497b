// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Override store management and manipulation.
//!
//! Every package that currently lives in a local working copy has an
//! __override record__ in the __override store__. A record maps the package's
//! name to the url it was originally installed from, so that the package can
//! be reinstalled from that url when it leaves local mode.
//!
//! # Store Layout
//!
//! The store is a plain text file, by default `Packages/PackageOverrides.txt`,
//! with one `<name>: <url>` record per line. Names are unique. The store is
//! loaded once, and flushed back to disk right after every mutation that
//! actually changes something. An empty store is encoded by removing the
//! file entirely.
//!
//! # Pitfalls
//!
//! Neither `: ` nor newlines are escaped. Names containing `: `, or names and
//! urls containing newlines, cannot be represented, so they are rejected
//! instead of silently producing a store that parses differently.

use std::{
    collections::BTreeMap,
    fs,
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

const DELIMITER: &str = ": ";

/// Durable storage of the serialized store.
pub trait StoreBackend {
    /// Where the store lives, for diagnostics.
    fn location(&self) -> &Path;

    /// Read serialized store. Return `None` if nothing was stored yet.
    fn read(&self) -> io::Result<Option<String>>;

    /// Replace serialized store.
    fn write(&mut self, contents: &str) -> io::Result<()>;

    /// Remove serialized store.
    fn clear(&mut self) -> io::Result<()>;
}

/// Store backed by a plain text file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Construct new file backend at target path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StoreBackend for FileBackend {
    fn location(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        fs::write(&self.path, contents.as_bytes())
    }

    fn clear(&mut self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// Single override record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRecord {
    /// Package name.
    pub name: String,

    /// Url the package was installed from before entering local mode.
    pub url: String,
}

/// Mapping of package names to the urls they were originally installed from.
#[derive(Debug)]
pub struct OverrideStore<B = FileBackend>
where
    B: StoreBackend,
{
    backend: B,
    entries: BTreeMap<String, String>,
}

impl OverrideStore<FileBackend> {
    /// Open override store file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CorruptStore`] if store file cannot be parsed.
    /// - Return [`StoreError::Io`] if store file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load(FileBackend::new(path))
    }
}

impl<B> OverrideStore<B>
where
    B: StoreBackend,
{
    /// Load override store from backend.
    ///
    /// A missing or empty store yields an empty override store.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CorruptStore`] if any line is malformed.
    /// - Return [`StoreError::Io`] if backend cannot be read.
    #[instrument(skip(backend), level = "debug")]
    pub fn load(backend: B) -> Result<Self> {
        let mut store = Self {
            backend,
            entries: BTreeMap::new(),
        };
        store.reload()?;

        Ok(store)
    }

    /// Discard in-memory records, and read them again from backend.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CorruptStore`] if any line is malformed.
    /// - Return [`StoreError::Io`] if backend cannot be read.
    pub fn reload(&mut self) -> Result<()> {
        let location = self.backend.location().to_path_buf();
        let contents = self.backend.read().map_err(|err| StoreError::Io {
            source: err,
            location: location.clone(),
        })?;

        self.entries = match contents {
            Some(contents) => parse_records(&contents, &location)?,
            None => BTreeMap::new(),
        };
        debug!(
            "loaded {} override records from {}",
            self.entries.len(),
            location.display()
        );

        Ok(())
    }

    /// Url recorded for target package.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Check if target package has an override record.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of override records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no override records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate through override records sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, url)| (name.as_str(), url.as_str()))
    }

    /// Copy out all override records sorted by name.
    pub fn records(&self) -> Vec<OverrideRecord> {
        self.iter()
            .map(|(name, url)| OverrideRecord {
                name: name.into(),
                url: url.into(),
            })
            .collect()
    }

    /// Backend in use.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Record url of target package, and flush.
    ///
    /// Does nothing if the exact same record already exists. A failed flush
    /// leaves the in-memory records untouched.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Unrepresentable`] if record cannot be encoded.
    /// - Return [`StoreError::Io`] if store cannot be flushed.
    #[instrument(skip(self), level = "debug")]
    pub fn add(&mut self, name: &str, url: &str) -> Result<()> {
        if self.get(name) == Some(url) {
            debug!("override for {name} already recorded");
            return Ok(());
        }

        check_representable(name, url)?;
        let previous = self.entries.insert(name.into(), url.into());
        if let Err(error) = self.flush() {
            match previous {
                Some(previous) => self.entries.insert(name.into(), previous),
                None => self.entries.remove(name),
            };
            return Err(error);
        }

        info!("recorded override {name}: {url}");
        Ok(())
    }

    /// Forget override of target package, and flush.
    ///
    /// Does nothing if there is no such record. A failed flush leaves the
    /// in-memory records untouched.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Io`] if store cannot be flushed.
    #[instrument(skip(self), level = "debug")]
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let Some(previous) = self.entries.remove(name) else {
            debug!("no override recorded for {name}");
            return Ok(());
        };

        if let Err(error) = self.flush() {
            self.entries.insert(name.into(), previous);
            return Err(error);
        }

        info!("removed override {name}");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let result = if self.entries.is_empty() {
            self.backend.clear()
        } else {
            self.backend.write(&serialize_records(&self.entries))
        };

        result.map_err(|err| StoreError::Io {
            source: err,
            location: self.backend.location().to_path_buf(),
        })
    }
}

fn parse_records(contents: &str, location: &Path) -> Result<BTreeMap<String, String>> {
    let mut entries = BTreeMap::new();

    // INVARIANT: Lines are split on "\n" with a trailing "\r" dropped.
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let corrupt = |reason| StoreError::CorruptStore {
            location: location.to_path_buf(),
            line: index + 1,
            reason,
        };

        let (name, url) = line
            .split_once(DELIMITER)
            .ok_or_else(|| corrupt("missing ': ' delimiter"))?;

        if name.is_empty() {
            return Err(corrupt("empty package name"));
        }

        if url.is_empty() {
            return Err(corrupt("empty url"));
        }

        if entries.insert(name.to_string(), url.to_string()).is_some() {
            return Err(corrupt("duplicate package name"));
        }
    }

    Ok(entries)
}

fn serialize_records(entries: &BTreeMap<String, String>) -> String {
    entries
        .iter()
        .map(|(name, url)| format!("{name}{DELIMITER}{url}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_representable(name: &str, url: &str) -> Result<()> {
    let unrepresentable = |reason| StoreError::Unrepresentable {
        name: name.into(),
        reason,
    };

    if name.is_empty() {
        return Err(unrepresentable("package name is empty"));
    }

    if name.contains(DELIMITER) {
        return Err(unrepresentable("package name contains ': '"));
    }

    if url.is_empty() {
        return Err(unrepresentable("url is empty"));
    }

    if name.contains(['\n', '\r']) || url.contains(['\n', '\r']) {
        return Err(unrepresentable("record contains a line break"));
    }

    Ok(())
}

/// All possible errors for override store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store contents cannot be parsed.
    #[error("corrupt override store {}:{line}: {reason}", location.display())]
    CorruptStore {
        location: PathBuf,
        line: usize,
        reason: &'static str,
    },

    /// Record cannot be encoded in store format.
    #[error("cannot record override for {name:?}: {reason}")]
    Unrepresentable { name: String, reason: &'static str },

    /// Backend cannot be read or written.
    #[error("failed to access override store {}", location.display())]
    Io {
        #[source]
        source: io::Error,
        location: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = StoreError> = std::result::Result<T, E>;
