// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package transitions between remote and local mode.
//!
//! Every package the package manager knows about is in one of two states:
//!
//! - __Remote__: installed by the package manager from its pinned url.
//! - __Local__: install slot is a symlink into a working copy, and an override
//!   record remembers the url to go back to.
//!
//! [`SwitchController`] drives a package from one state to the other as a
//! sequence of steps, each reported through a [`ProgressReporter`].
//!
//! # Failure Policy
//!
//! A failed step aborts the transition. Nothing is rolled back, because every
//! piece of state touched along the way is either a cache (working copies),
//! or idempotent to re-enter (install slot symlink, override store). The
//! error is logged and returned to the caller.
//!
//! No matter how a transition ends, the progress display is cleared and the
//! package manager is asked to rescan its packages.
//!
//! # See Also
//!
//! 1. [`policy`] for revision conflicts on the way back to remote mode.

pub mod policy;
pub mod progress;

use crate::{
    fs_ops::{ensure_directory, FileSystemOps, FsError},
    host::{HostError, PackageHost},
    path::Layout,
    process::{ProcessRunner, SystemRunner},
    store::{FileBackend, OverrideRecord, OverrideStore, StoreBackend, StoreError},
    switch::{
        policy::{RevertCandidates, RevisionPolicy},
        progress::{ProgressReporter, SilentProgress, Steps},
    },
    url::{CompositeUrl, UrlError},
};

use tracing::{error, info, instrument, warn};

const ENTER_STEPS: u64 = 7;
const LEAVE_STEPS: u64 = 6;

/// Orchestrate package transitions.
#[derive(Debug)]
pub struct SwitchController<H, R = SystemRunner, B = FileBackend, P = SilentProgress>
where
    H: PackageHost,
    R: ProcessRunner,
    B: StoreBackend,
    P: ProgressReporter,
{
    layout: Layout,
    fs: FileSystemOps<R>,
    store: OverrideStore<B>,
    host: H,
    progress: P,
}

impl<H, R, B, P> SwitchController<H, R, B, P>
where
    H: PackageHost,
    R: ProcessRunner,
    B: StoreBackend,
    P: ProgressReporter,
{
    /// Construct new switch controller.
    pub fn new(
        layout: Layout,
        fs: FileSystemOps<R>,
        store: OverrideStore<B>,
        host: H,
        progress: P,
    ) -> Self {
        Self {
            layout,
            fs,
            store,
            host,
            progress,
        }
    }

    /// Disk layout in use.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Override store in use.
    pub fn store(&self) -> &OverrideStore<B> {
        &self.store
    }

    /// Package manager in use.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Progress reporter in use.
    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// Move package into local mode.
    ///
    /// Takes the full `<name>@<url>` identifier of the package, and the
    /// revision to check out in its working copy. The url part of the
    /// identifier is recorded as-is, so it can be handed back to the package
    /// manager when leaving local mode.
    ///
    /// # Errors
    ///
    /// - Return [`SwitchError::InvalidPackageInfo`] if name, url, or revision
    ///   is missing. Nothing is touched in this case.
    /// - Return [`SwitchError::Url`] if url cannot be decomposed.
    /// - Return [`SwitchError::FileSystem`] if working copy cannot be cloned,
    ///   or install slot cannot be linked.
    /// - Return [`SwitchError::Store`] if override cannot be recorded.
    #[instrument(skip(self), level = "debug")]
    pub fn enter_local(&mut self, identifier: &str, resolved_revision: &str) -> Result<()> {
        let result = self.try_enter_local(identifier, resolved_revision);
        if let Err(error) = &result {
            error!("failed to enter local mode with {identifier}: {error:?}");
        }
        self.teardown();

        result
    }

    /// Move package back into remote mode.
    ///
    /// If the version installed from the working copy conflicts with the
    /// revision of the recorded url, then `selector` picks which url the
    /// package manager reinstalls the package from. The selector is never
    /// called without a conflict.
    ///
    /// # Errors
    ///
    /// - Return [`SwitchError::InvalidPackageInfo`] if name is invalid.
    /// - Return [`SwitchError::NoOverrideRecorded`] if package is not in
    ///   local mode. Nothing is touched in this case.
    /// - Return [`SwitchError::FileSystem`] if install slot cannot be removed.
    /// - Return [`SwitchError::Host`] if package cannot be reinstalled.
    /// - Return [`SwitchError::Store`] if override cannot be forgotten.
    #[instrument(skip(self, selector), level = "debug")]
    pub fn leave_local<F>(&mut self, name: &str, selector: F) -> Result<()>
    where
        F: FnOnce(&RevertCandidates) -> RevisionPolicy,
    {
        let result = self.try_leave_local(name, selector);
        if let Err(error) = &result {
            error!("failed to leave local mode for {name}: {error:?}");
        }
        self.teardown();

        result
    }

    /// Move every package in local mode back into remote mode.
    ///
    /// Conflicts are all resolved through the same `policy`. A failure for
    /// one package does not stop the others.
    ///
    /// Return list of packages that failed to leave local mode.
    #[instrument(skip(self), level = "debug")]
    pub fn leave_all(&mut self, policy: RevisionPolicy) -> Vec<(String, SwitchError)> {
        let names: Vec<String> = self.store.iter().map(|(name, _)| name.to_owned()).collect();
        let mut failures = Vec::new();

        for name in names {
            if let Err(error) = self.try_leave_local(&name, |_| policy) {
                error!("failed to leave local mode for {name}: {error:?}");
                failures.push((name, error));
            }
        }
        self.teardown();

        failures
    }

    /// Candidate urls to reinstall package from.
    ///
    /// Return `None` if the installed version does not conflict with the
    /// recorded revision.
    ///
    /// # Errors
    ///
    /// - Return [`SwitchError::NoOverrideRecorded`] if package is not in
    ///   local mode.
    /// - Return [`SwitchError::Host`] if installed version cannot be queried.
    /// - Return [`SwitchError::Url`] if recorded url cannot be decomposed.
    pub fn revert_candidates(&self, name: &str) -> Result<Option<RevertCandidates>> {
        let stored = self
            .store
            .get(name)
            .ok_or_else(|| SwitchError::NoOverrideRecorded { name: name.into() })?;
        let installed = self
            .host
            .package_descriptor(name)?
            .and_then(|descriptor| descriptor.installed_version);

        Ok(RevertCandidates::detect(stored, installed.as_deref())?)
    }

    /// Open install slot of local package in file browser.
    ///
    /// # Errors
    ///
    /// - Return [`SwitchError::NoOverrideRecorded`] if package is not in
    ///   local mode.
    /// - Return [`SwitchError::FileSystem`] if install slot is missing, or
    ///   the file browser cannot be launched.
    pub fn open_folder(&self, name: &str) -> Result<()> {
        check_name(name)?;
        if !self.store.contains(name) {
            return Err(SwitchError::NoOverrideRecorded { name: name.into() });
        }

        self.fs.open_folder(&self.layout.install_slot(name))?;
        Ok(())
    }

    /// All packages currently in local mode.
    pub fn status(&self) -> Vec<OverrideRecord> {
        self.store.records()
    }

    fn try_enter_local(&mut self, identifier: &str, resolved_revision: &str) -> Result<()> {
        let mut steps = Steps::new(&mut self.progress, ENTER_STEPS);

        steps.next("validate package info");
        let Some((name, url)) = identifier.split_once('@') else {
            return Err(SwitchError::InvalidPackageInfo {
                field: "identifier",
                reason: "missing '@' separator",
            });
        };
        check_name(name)?;
        if url.trim().is_empty() {
            return Err(SwitchError::InvalidPackageInfo {
                field: "url",
                reason: "is empty",
            });
        }
        if resolved_revision.trim().is_empty() {
            return Err(SwitchError::InvalidPackageInfo {
                field: "revision",
                reason: "is empty",
            });
        }

        steps.next("decompose package url");
        let composite: CompositeUrl = url.parse()?;

        steps.next("prepare working copy root");
        let root = self.layout.working_copy_root();
        ensure_directory(root)?;

        steps.next("clone working copy");
        let working_copy = self.fs.clone_or_checkout(
            composite.repo_url(),
            Some(resolved_revision),
            name,
            root,
        )?;

        steps.next("link install slot");
        let package_dir = composite.package_dir(&working_copy);
        if !package_dir.is_dir() {
            return Err(FsError::PathNotFound(package_dir).into());
        }
        self.fs
            .replace_symlink(&package_dir, &self.layout.install_slot(name))?;

        steps.next("record override");
        self.store.add(name, url)?;

        steps.next("drop pinned package");
        if let Err(error) = self.host.remove_pinned(name) {
            warn!("package manager kept pinned {name}: {error}");
        }

        info!("{name} is now in local mode");
        Ok(())
    }

    fn try_leave_local<F>(&mut self, name: &str, selector: F) -> Result<()>
    where
        F: FnOnce(&RevertCandidates) -> RevisionPolicy,
    {
        let mut steps = Steps::new(&mut self.progress, LEAVE_STEPS);

        steps.next("validate package name");
        check_name(name)?;

        steps.next("look up override");
        let stored = self
            .store
            .get(name)
            .ok_or_else(|| SwitchError::NoOverrideRecorded { name: name.into() })?
            .to_owned();

        steps.next("reconcile revision");
        let installed = self
            .host
            .package_descriptor(name)?
            .and_then(|descriptor| descriptor.installed_version);
        let url = match RevertCandidates::detect(&stored, installed.as_deref())? {
            Some(candidates) => {
                let policy = selector(&candidates);
                info!("resolve revision conflict of {name}: {policy}");
                candidates.select(policy).to_owned()
            }
            None => stored,
        };

        steps.next("remove install slot");
        self.fs.remove_directory(&self.layout.install_slot(name))?;

        steps.next("reinstall package");
        self.host.install_from_url(name, &url)?;

        steps.next("forget override");
        self.store.remove(name)?;

        info!("{name} is now in remote mode");
        Ok(())
    }

    fn teardown(&mut self) {
        self.progress.clear();
        if let Err(error) = self.host.refresh() {
            warn!("package manager refresh failed: {error}");
        }
    }
}

// INVARIANT: Names double as directory names of working copies and slots.
fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SwitchError::InvalidPackageInfo {
            field: "name",
            reason: "is empty",
        });
    }

    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(SwitchError::InvalidPackageInfo {
            field: "name",
            reason: "must be a single path component",
        });
    }

    Ok(())
}

/// All possible errors for package transitions.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    /// Required package information is missing or unusable.
    #[error("invalid package {field}: {reason}")]
    InvalidPackageInfo {
        field: &'static str,
        reason: &'static str,
    },

    /// Package is not in local mode.
    #[error("no override recorded for {name:?}")]
    NoOverrideRecorded { name: String },

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    FileSystem(#[from] FsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Friendly result alias :3
type Result<T, E = SwitchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::{PackageDescriptor, SourceKind},
        process::UnixCommands,
        testing::{FakeHost, MemoryBackend, RecordingProgress, RecordingRunner},
    };

    use pretty_assertions::assert_eq;
    use std::{fs, path::Path};
    use tempfile::TempDir;

    const NAME: &str = "com.demo.pkg";
    const URL: &str = "https://example.com/demo.git?path=Runtime#v1.0.0";
    const IDENTIFIER: &str = "com.demo.pkg@https://example.com/demo.git?path=Runtime#v1.0.0";

    type TestController =
        SwitchController<FakeHost, RecordingRunner, MemoryBackend, RecordingProgress>;

    struct Fixture {
        root: TempDir,
        runner: RecordingRunner,
        backend: MemoryBackend,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            Self::with(RecordingRunner::default(), MemoryBackend::default())
        }

        fn with(runner: RecordingRunner, backend: MemoryBackend) -> anyhow::Result<Self> {
            let root = tempfile::tempdir()?;
            fs::create_dir(root.path().join("Packages"))?;
            Ok(Self {
                root,
                runner,
                backend,
            })
        }

        fn controller(&self, host: FakeHost) -> anyhow::Result<TestController> {
            let layout = Layout::new(self.copies(), self.root.path().join("Packages"));
            let fs = FileSystemOps::new(self.runner.clone(), Box::new(UnixCommands));
            let store = OverrideStore::load(self.backend.clone())?;
            Ok(SwitchController::new(
                layout,
                fs,
                store,
                host,
                RecordingProgress::default(),
            ))
        }

        fn copies(&self) -> std::path::PathBuf {
            self.root.path().join("copies")
        }

        fn slot(&self, name: &str) -> std::path::PathBuf {
            self.root.path().join("Packages").join(name)
        }
    }

    fn is_symlink(path: &Path) -> bool {
        path.symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_symlink())
    }

    fn installed_at(version: &str) -> FakeHost {
        let descriptor = PackageDescriptor {
            name: NAME.into(),
            identifier: IDENTIFIER.into(),
            installed_version: Some(version.into()),
            resolved_revision: None,
            source: SourceKind::LocalWorkingCopy,
        };

        FakeHost {
            descriptors: [(NAME.to_owned(), descriptor)].into(),
            ..FakeHost::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn enter_local_links_install_slot() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;

        controller.enter_local(IDENTIFIER, "4f2a9c1d0e")?;

        let slot = fixture.slot(NAME);
        assert!(is_symlink(&slot));
        assert_eq!(
            fs::read_link(&slot)?,
            fixture.copies().join(NAME).join("Runtime")
        );
        assert_eq!(controller.store().get(NAME), Some(URL));
        assert_eq!(controller.host().removed, vec![NAME.to_owned()]);
        assert_eq!(fixture.runner.git_subcommands(), vec!["clone", "checkout"]);

        let checkout = &fixture.runner.calls()[1];
        assert_eq!(checkout.args, vec!["checkout", "4f2a9c1d0e"]);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn enter_local_reports_monotonic_progress_then_tears_down() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;

        controller.enter_local(IDENTIFIER, "v1.0.0")?;

        let steps: Vec<u64> = controller
            .progress()
            .reports
            .iter()
            .map(|(_, step, total)| {
                assert_eq!(*total, ENTER_STEPS);
                *step
            })
            .collect();
        assert_eq!(steps, (1..=ENTER_STEPS).collect::<Vec<_>>());
        assert_eq!(controller.progress().clears, 1);
        assert_eq!(controller.host().refreshes, 1);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn enter_local_twice_reuses_working_copy() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;

        controller.enter_local(IDENTIFIER, "v1.0.0")?;
        controller.enter_local(IDENTIFIER, "v1.0.0")?;

        assert_eq!(
            fixture.runner.git_subcommands(),
            vec!["clone", "checkout", "checkout"]
        );
        let slot = fixture.slot(NAME);
        assert!(is_symlink(&slot));
        assert_eq!(
            fs::read_link(&slot)?,
            fixture.copies().join(NAME).join("Runtime")
        );
        assert_eq!(fixture.backend.writes(), 1);

        Ok(())
    }

    #[test]
    fn enter_local_rejects_missing_info_before_side_effects() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;

        let cases = [
            ("https://example.com/demo.git#v1.0.0", "v1.0.0", "identifier"),
            ("@https://example.com/demo.git#v1.0.0", "v1.0.0", "name"),
            ("../escape@https://example.com/demo.git", "v1.0.0", "name"),
            ("com.demo.pkg@", "v1.0.0", "url"),
            (IDENTIFIER, " ", "revision"),
        ];
        for (identifier, revision, expect) in cases {
            let result = controller.enter_local(identifier, revision);
            assert!(
                matches!(
                    result,
                    Err(SwitchError::InvalidPackageInfo { field, .. }) if field == expect
                ),
                "{identifier:?} should fail on {expect}"
            );
        }

        assert!(fixture.runner.calls().is_empty());
        assert!(!fixture.copies().exists());
        assert_eq!(controller.host().refreshes, cases.len());
        assert_eq!(controller.progress().clears, cases.len());

        Ok(())
    }

    #[test]
    fn enter_local_rejects_relative_repository_url() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;

        let result = controller.enter_local("com.demo.pkg@relative/demo.git#v1.0.0", "v1.0.0");
        assert!(matches!(result, Err(SwitchError::Url(UrlError::InvalidUri { .. }))));
        assert!(!fixture.copies().exists());
        assert!(fixture.runner.calls().is_empty());

        Ok(())
    }

    #[test]
    fn enter_local_rejects_subpath_leaving_working_copy() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;

        let identifier = "com.demo.pkg@https://example.com/demo.git?path=../..#v1";
        let result = controller.enter_local(identifier, "v1");
        assert!(matches!(
            result,
            Err(SwitchError::Url(UrlError::MalformedUrl { .. }))
        ));
        assert!(fixture.runner.calls().is_empty());
        assert!(fixture.slot(NAME).symlink_metadata().is_err());
        assert!(controller.store().is_empty());

        Ok(())
    }

    #[test]
    fn enter_local_records_nothing_when_clone_fails() -> anyhow::Result<()> {
        let fixture = Fixture::with(RecordingRunner::failing_clone(), MemoryBackend::default())?;
        let mut controller = fixture.controller(FakeHost::default())?;

        let result = controller.enter_local(IDENTIFIER, "v1.0.0");
        assert!(matches!(
            result,
            Err(SwitchError::FileSystem(FsError::CloneFailed { .. }))
        ));
        assert!(controller.store().is_empty());
        assert!(controller.host().removed.is_empty());
        assert_eq!(controller.host().refreshes, 1);

        Ok(())
    }

    #[test]
    fn enter_local_requires_subpath_inside_working_copy() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;

        let result = controller.enter_local(
            "com.demo.pkg@https://example.com/demo.git?path=Missing#v1.0.0",
            "v1.0.0",
        );
        assert!(matches!(
            result,
            Err(SwitchError::FileSystem(FsError::PathNotFound(_)))
        ));
        assert!(fixture.slot(NAME).symlink_metadata().is_err());
        assert!(controller.store().is_empty());

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn enter_local_tolerates_host_refusing_removal() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let host = FakeHost {
            fail_remove: true,
            ..FakeHost::default()
        };
        let mut controller = fixture.controller(host)?;

        controller.enter_local(IDENTIFIER, "v1.0.0")?;
        assert_eq!(controller.store().get(NAME), Some(URL));

        Ok(())
    }

    #[test]
    fn leave_local_without_override_touches_nothing() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        fs::create_dir(fixture.slot(NAME))?;
        let mut controller = fixture.controller(installed_at("1.2.0"))?;

        let result = controller.leave_local(NAME, |_| RevisionPolicy::TrackLatest);
        assert!(matches!(result, Err(SwitchError::NoOverrideRecorded { name }) if name == NAME));
        assert!(fixture.slot(NAME).is_dir());
        assert!(fixture.runner.calls().is_empty());
        assert!(controller.host().installed.is_empty());
        assert_eq!(controller.host().refreshes, 1);

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn leave_local_reinstalls_recorded_url() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let mut controller = fixture.controller(FakeHost::default())?;
        controller.enter_local(IDENTIFIER, "v1.0.0")?;

        controller.leave_local(NAME, |_| panic!("selector called without conflict"))?;

        assert!(fixture.slot(NAME).symlink_metadata().is_err());
        assert!(fixture.copies().join(NAME).join("README.md").exists());
        assert_eq!(
            controller.host().installed,
            vec![(NAME.to_owned(), URL.to_owned())]
        );
        assert!(controller.store().is_empty());
        assert_eq!(fixture.backend.clears(), 1);

        let result = controller.leave_local(NAME, |_| RevisionPolicy::KeepStored);
        assert!(matches!(result, Err(SwitchError::NoOverrideRecorded { .. })));

        Ok(())
    }

    #[test]
    fn leave_local_resolves_conflict_through_selector() -> anyhow::Result<()> {
        let backend = MemoryBackend::with_contents(&format!("{NAME}: {URL}\n"));
        let fixture = Fixture::with(RecordingRunner::default(), backend)?;
        fs::create_dir(fixture.slot(NAME))?;
        let mut controller = fixture.controller(installed_at("1.2.0"))?;

        let mut offered = None;
        controller.leave_local(NAME, |candidates| {
            offered = Some(candidates.clone());
            RevisionPolicy::AdoptInstalled
        })?;

        let offered = offered.ok_or_else(|| anyhow::anyhow!("selector was not called"))?;
        assert_eq!(offered.installed_version, "1.2.0");
        assert_eq!(offered.keep, URL);
        assert_eq!(
            controller.host().installed,
            vec![(
                NAME.to_owned(),
                "https://example.com/demo.git?path=Runtime#1.2.0".to_owned()
            )]
        );
        assert_eq!(fixture.backend.contents(), None);

        Ok(())
    }

    #[test]
    fn leave_local_refuses_unrepresentable_installed_version() -> anyhow::Result<()> {
        let backend = MemoryBackend::with_contents(&format!("{NAME}: {URL}\n"));
        let fixture = Fixture::with(RecordingRunner::default(), backend)?;
        fs::create_dir(fixture.slot(NAME))?;
        let mut controller = fixture.controller(installed_at("2.0?path=Other"))?;

        let result = controller.leave_local(NAME, |_| RevisionPolicy::AdoptInstalled);
        assert!(matches!(
            result,
            Err(SwitchError::Url(UrlError::MalformedUrl { .. }))
        ));
        assert!(fixture.slot(NAME).is_dir());
        assert!(controller.host().installed.is_empty());
        assert_eq!(controller.store().get(NAME), Some(URL));

        Ok(())
    }

    #[test]
    fn leave_local_keeps_override_when_slot_is_missing() -> anyhow::Result<()> {
        let backend = MemoryBackend::with_contents(&format!("{NAME}: {URL}\n"));
        let fixture = Fixture::with(RecordingRunner::default(), backend)?;
        let mut controller = fixture.controller(FakeHost::default())?;

        let result = controller.leave_local(NAME, |_| RevisionPolicy::KeepStored);
        assert!(matches!(
            result,
            Err(SwitchError::FileSystem(FsError::PathNotFound(_)))
        ));
        assert_eq!(controller.store().get(NAME), Some(URL));
        assert!(controller.host().installed.is_empty());

        Ok(())
    }

    #[test]
    fn leave_all_continues_past_failures() -> anyhow::Result<()> {
        let backend = MemoryBackend::with_contents(
            "com.demo.a: https://example.com/a.git\ncom.demo.b: https://example.com/b.git#v2\n",
        );
        let fixture = Fixture::with(RecordingRunner::default(), backend)?;
        fs::create_dir(fixture.slot("com.demo.b"))?;
        let mut controller = fixture.controller(FakeHost::default())?;

        let failures = controller.leave_all(RevisionPolicy::TrackLatest);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "com.demo.a");
        assert!(matches!(failures[0].1, SwitchError::FileSystem(FsError::PathNotFound(_))));
        assert_eq!(
            controller.host().installed,
            vec![(
                "com.demo.b".to_owned(),
                "https://example.com/b.git#v2".to_owned()
            )]
        );
        assert_eq!(
            controller.status(),
            vec![OverrideRecord {
                name: "com.demo.a".into(),
                url: "https://example.com/a.git".into(),
            }]
        );
        assert_eq!(controller.host().refreshes, 1);
        assert_eq!(controller.progress().clears, 1);

        Ok(())
    }

    #[test]
    fn revert_candidates_only_on_conflict() -> anyhow::Result<()> {
        let backend = MemoryBackend::with_contents(&format!("{NAME}: {URL}\n"));
        let fixture = Fixture::with(RecordingRunner::default(), backend)?;

        let controller = fixture.controller(installed_at("v1.0.0"))?;
        assert_eq!(controller.revert_candidates(NAME)?, None);

        let controller = fixture.controller(installed_at("1.2.0"))?;
        let candidates = controller
            .revert_candidates(NAME)?
            .ok_or_else(|| anyhow::anyhow!("expected conflict"))?;
        assert_eq!(
            candidates.select(RevisionPolicy::TrackLatest),
            "https://example.com/demo.git?path=Runtime"
        );

        assert!(matches!(
            controller.revert_candidates("com.demo.other"),
            Err(SwitchError::NoOverrideRecorded { .. })
        ));

        Ok(())
    }

    #[test]
    fn open_folder_requires_local_package() -> anyhow::Result<()> {
        let backend = MemoryBackend::with_contents(&format!("{NAME}: {URL}\n"));
        let fixture = Fixture::with(RecordingRunner::default(), backend)?;
        fs::create_dir(fixture.slot(NAME))?;
        let controller = fixture.controller(FakeHost::default())?;

        assert!(matches!(
            controller.open_folder("com.demo.other"),
            Err(SwitchError::NoOverrideRecorded { .. })
        ));
        controller.open_folder(NAME)?;

        let calls = fixture.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "xdg-open");
        assert_eq!(
            calls[0].args,
            vec![fixture.slot(NAME).display().to_string()]
        );

        Ok(())
    }
}
