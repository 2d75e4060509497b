// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fakes shared by unit tests.

use crate::{
    host::{HostError, PackageDescriptor, PackageHost},
    process::{Invocation, ProcessError, ProcessOutput, ProcessRunner},
    store::StoreBackend,
    switch::progress::ProgressReporter,
};

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: Option<PathBuf>,
}

/// Record invocations, and fake the side effects of "git clone" and "ln".
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingRunner {
    calls: Rc<RefCell<Vec<RecordedCall>>>,
    fail_clone: bool,
}

impl RecordingRunner {
    pub(crate) fn failing_clone() -> Self {
        Self {
            fail_clone: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn git_subcommands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.program == "git")
            .filter_map(|call| call.args.first().cloned())
            .collect()
    }

    fn fake_clone(&self, call: &RecordedCall) -> io::Result<bool> {
        if self.fail_clone {
            return Ok(false);
        }

        let Some(cwd) = &call.cwd else {
            return Ok(false);
        };
        let target = cwd.join(&call.args[2]);
        fs::create_dir_all(target.join("Runtime"))?;
        fs::write(target.join("README.md"), "fixture")?;
        fs::write(
            target.join("Runtime").join("package.json"),
            r#"{ "name": "com.demo.pkg", "version": "1.0.0" }"#,
        )?;

        Ok(true)
    }

    #[cfg(unix)]
    fn fake_link(&self, call: &RecordedCall) -> io::Result<bool> {
        std::os::unix::fs::symlink(&call.args[1], &call.args[2])?;
        Ok(true)
    }

    #[cfg(not(unix))]
    fn fake_link(&self, _: &RecordedCall) -> io::Result<bool> {
        Ok(false)
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(
        &self,
        invocation: &Invocation,
        cwd: Option<&Path>,
    ) -> Result<ProcessOutput, ProcessError> {
        let call = RecordedCall {
            program: invocation.program().to_string_lossy().into_owned(),
            args: invocation
                .arguments()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
            cwd: cwd.map(Path::to_path_buf),
        };

        let outcome = match (call.program.as_str(), call.args.first().map(String::as_str)) {
            ("git", Some("clone")) => self.fake_clone(&call),
            ("ln", _) => self.fake_link(&call),
            _ => Ok(true),
        };
        self.calls.borrow_mut().push(call);

        let success = outcome.map_err(|err| ProcessError::Spawn {
            program: invocation.program().to_string_lossy().into_owned(),
            source: err,
        })?;

        Ok(ProcessOutput {
            success,
            stderr: String::new(),
        })
    }
}

/// In-memory store backend that counts flushes.
///
/// Clones share contents, so loading a new store from a clone simulates a
/// process restart.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryBackend {
    contents: Rc<RefCell<Option<String>>>,
    writes: Rc<Cell<usize>>,
    clears: Rc<Cell<usize>>,
}

impl MemoryBackend {
    pub(crate) fn with_contents(contents: &str) -> Self {
        let backend = Self::default();
        backend.contents.replace(Some(contents.into()));
        backend
    }

    pub(crate) fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.get()
    }

    pub(crate) fn clears(&self) -> usize {
        self.clears.get()
    }
}

impl StoreBackend for MemoryBackend {
    fn location(&self) -> &Path {
        Path::new("memory")
    }

    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.contents())
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.contents.replace(Some(contents.into()));
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.clears.set(self.clears.get() + 1);
        self.contents.replace(None);
        Ok(())
    }
}

/// Package host that remembers every request.
#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub(crate) descriptors: HashMap<String, PackageDescriptor>,
    pub(crate) installed: Vec<(String, String)>,
    pub(crate) removed: Vec<String>,
    pub(crate) refreshes: usize,
    pub(crate) fail_remove: bool,
}

impl PackageHost for FakeHost {
    fn install_from_url(&mut self, name: &str, url: &str) -> Result<(), HostError> {
        self.installed.push((name.into(), url.into()));
        Ok(())
    }

    fn remove_pinned(&mut self, name: &str) -> Result<(), HostError> {
        if self.fail_remove {
            return Err(HostError::Rejected {
                name: name.into(),
                reason: "package manager is busy".into(),
            });
        }

        self.removed.push(name.into());
        Ok(())
    }

    fn package_descriptor(&self, name: &str) -> Result<Option<PackageDescriptor>, HostError> {
        Ok(self.descriptors.get(name).cloned())
    }

    fn refresh(&mut self) -> Result<(), HostError> {
        self.refreshes += 1;
        Ok(())
    }
}

/// Progress reporter that keeps every report.
#[derive(Debug, Default)]
pub(crate) struct RecordingProgress {
    pub(crate) reports: Vec<(String, u64, u64)>,
    pub(crate) clears: usize,
}

impl ProgressReporter for RecordingProgress {
    fn report(&mut self, message: &str, step: u64, total: u64) {
        self.reports.push((message.into(), step, total));
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}
