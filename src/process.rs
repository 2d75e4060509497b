// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External process invocation.
//!
//! Everything pkgedit does to the outside world that is not plain file I/O
//! goes through an external program: git for cloning and checking out
//! working copies, and the host platform's shell utilities for creating
//! directory symlinks or opening a folder in the file browser.
//!
//! # Tolerant Execution
//!
//! A [`ProcessRunner`] only fails when the program cannot be launched at all.
//! A non-zero exit status is reported back to the caller through
//! [`ProcessOutput`], and any standard error text is logged as a diagnostic.
//! Callers decide whether the command actually did its job by inspecting the
//! file system afterwards.
//!
//! # Platform Strategy
//!
//! Commands that differ per platform are built by a [`CommandFormatter`]. The
//! formatter is selected once at startup through [`Platform`], instead of
//! branching at every call site.

use serde::{Deserialize, Serialize};
use std::{
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    process::{Command, Stdio},
};
use tracing::{debug, info, instrument, warn};

/// Program with arguments ready to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    /// Construct new invocation of target program without arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append list of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program to execute.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments to pass to program.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }
}

impl Display for Invocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(fmt, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Result of running an external program to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Program exited successfully.
    pub success: bool,

    /// Standard error text with trailing whitespace chomped.
    pub stderr: String,
}

/// Layer of indirection for running external programs.
pub trait ProcessRunner {
    /// Run invocation to completion in optional working directory.
    ///
    /// Blocks until the program exits. No timeout is enforced.
    ///
    /// # Errors
    ///
    /// - Return [`ProcessError::Spawn`] if program cannot be launched.
    fn run(&self, invocation: &Invocation, cwd: Option<&Path>) -> Result<ProcessOutput>;
}

/// Run external programs as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    #[instrument(skip(self, invocation), level = "debug")]
    fn run(&self, invocation: &Invocation, cwd: Option<&Path>) -> Result<ProcessOutput> {
        debug!("run {invocation}");
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = command.output().map_err(|err| ProcessError::Spawn {
            program: invocation.program.to_string_lossy().into_owned(),
            source: err,
        })?;

        // INVARIANT: Chomp trailing newlines.
        let stderr = String::from_utf8_lossy(output.stderr.as_slice())
            .trim_end()
            .to_string();
        let success = output.status.success();

        if !stderr.is_empty() {
            if success {
                info!("{}: {stderr}", invocation.program.to_string_lossy());
            } else {
                warn!("{}: {stderr}", invocation.program.to_string_lossy());
            }
        }

        if !success {
            warn!("command {invocation:?} exited with {}", output.status);
        }

        Ok(ProcessOutput { success, stderr })
    }
}

/// Build platform specific commands.
pub trait CommandFormatter: std::fmt::Debug {
    /// Make `link` a directory symlink pointing at `target`.
    fn symlink(&self, target: &Path, link: &Path) -> Invocation;

    /// Open directory in the platform's file browser.
    fn open_folder(&self, path: &Path) -> Invocation;
}

/// Linux and other Unix-likes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixCommands;

impl CommandFormatter for UnixCommands {
    fn symlink(&self, target: &Path, link: &Path) -> Invocation {
        Invocation::new("ln").arg("-s").arg(target).arg(link)
    }

    fn open_folder(&self, path: &Path) -> Invocation {
        Invocation::new("xdg-open").arg(path)
    }
}

/// macOS.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacCommands;

impl CommandFormatter for MacCommands {
    fn symlink(&self, target: &Path, link: &Path) -> Invocation {
        Invocation::new("ln").arg("-s").arg(target).arg(link)
    }

    fn open_folder(&self, path: &Path) -> Invocation {
        Invocation::new("open").arg(path)
    }
}

/// Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsCommands;

impl CommandFormatter for WindowsCommands {
    fn symlink(&self, target: &Path, link: &Path) -> Invocation {
        Invocation::new("cmd.exe")
            .args(["/c", "mklink", "/D"])
            .arg(link)
            .arg(target)
    }

    fn open_folder(&self, path: &Path) -> Invocation {
        Invocation::new("explorer.exe").arg(path)
    }
}

/// Platform whose command conventions should be used.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Detect from host operating system.
    #[default]
    Auto,
    Unix,
    Mac,
    Windows,
}

impl Platform {
    /// Detect platform of host operating system.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Mac
        } else {
            Self::Unix
        }
    }

    /// Select command formatter for platform.
    pub fn formatter(self) -> Box<dyn CommandFormatter> {
        match self {
            Self::Auto => Self::detect().formatter(),
            Self::Unix => Box::new(UnixCommands),
            Self::Mac => Box::new(MacCommands),
            Self::Windows => Box::new(WindowsCommands),
        }
    }
}

/// All possible errors for running external programs.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Program could not be launched.
    #[error("failed to launch {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Friendly result alias :3
type Result<T, E = ProcessError> = std::result::Result<T, E>;
