// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use pkgedit::{
    config::Settings,
    fs_ops::FileSystemOps,
    host::{ManifestHost, PackageHost, SourceKind},
    path::{default_config_path, Layout},
    process::SystemRunner,
    store::{FileBackend, OverrideStore},
    switch::{
        policy::{RevertCandidates, RevisionPolicy},
        progress::BarProgress,
        SwitchController,
    },
    url::decompose,
};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::Select;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Controller = SwitchController<ManifestHost, SystemRunner, FileBackend, BarProgress>;

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "pkgedit [options] <pkgedit-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Package manager's packages directory.
    #[arg(short, long, global = true, value_name = "path")]
    pub packages_dir: Option<PathBuf>,

    /// Directory that houses working copies.
    #[arg(short, long, global = true, value_name = "path")]
    pub working_copy_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let mut controller = self.controller()?;
        match self.command {
            Command::Enter(opts) => run_enter(&mut controller, opts),
            Command::Leave(opts) => run_leave(&mut controller, opts),
            Command::LeaveAll(opts) => run_leave_all(&mut controller, opts),
            Command::Open(opts) => run_open(&controller, opts),
            Command::Status => run_status(&controller),
        }
    }

    fn controller(&self) -> Result<Controller> {
        let config = match &self.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let mut settings = Settings::load(config)?;
        if let Some(packages_dir) = &self.packages_dir {
            settings.packages_dir = packages_dir.clone();
        }
        if let Some(working_copy_root) = &self.working_copy_root {
            settings.working_copy_root = Some(working_copy_root.clone());
        }

        let layout = Layout::from_settings(&settings)?;
        let fs = FileSystemOps::new(SystemRunner, settings.platform.formatter())
            .with_git(&settings.git);
        let store = OverrideStore::open(layout.store_path())?;
        let host = ManifestHost::new(layout.packages_dir());

        Ok(SwitchController::new(
            layout,
            fs,
            store,
            host,
            BarProgress::new()?,
        ))
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Replace pinned package with local working copy.
    #[command(override_usage = "pkgedit enter [options] <package_name>")]
    Enter(EnterOptions),

    /// Revert local package back to its pinned url.
    #[command(override_usage = "pkgedit leave [options] <package_name>")]
    Leave(LeaveOptions),

    /// Revert every local package back to its pinned url.
    #[command(override_usage = "pkgedit leave-all [options]")]
    LeaveAll(LeaveAllOptions),

    /// Open install slot of local package in file browser.
    #[command(override_usage = "pkgedit open [options] <package_name>")]
    Open(OpenOptions),

    /// List packages in local mode.
    #[command(override_usage = "pkgedit status [options]")]
    Status,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EnterOptions {
    /// Name of package to work on locally.
    #[arg(required = true, value_name = "package_name")]
    pub package_name: String,

    /// Revision to check out instead of the resolved one.
    #[arg(short, long, value_name = "revision")]
    pub revision: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LeaveOptions {
    /// Name of package to revert.
    #[arg(required = true, value_name = "package_name")]
    pub package_name: String,

    /// Resolve revision conflict without prompting.
    #[arg(short = 'P', long, value_enum, value_name = "policy")]
    pub policy: Option<PolicyArg>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LeaveAllOptions {
    /// Resolve revision conflicts of all packages.
    #[arg(short = 'P', long, value_enum, value_name = "policy", default_value = "keep")]
    pub policy: PolicyArg,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct OpenOptions {
    /// Name of local package to open.
    #[arg(required = true, value_name = "package_name")]
    pub package_name: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Keep stored revision.
    Keep,

    /// Pin installed version.
    Adopt,

    /// Track latest revision.
    Latest,
}

impl From<PolicyArg> for RevisionPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Keep => RevisionPolicy::KeepStored,
            PolicyArg::Adopt => RevisionPolicy::AdoptInstalled,
            PolicyArg::Latest => RevisionPolicy::TrackLatest,
        }
    }
}

struct PolicyChoice<'a> {
    policy: RevisionPolicy,
    url: &'a str,
}

impl Display for PolicyChoice<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} ({})", self.policy, self.url)
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = Cli::parse().run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run_enter(controller: &mut Controller, opts: EnterOptions) -> Result<()> {
    let name = opts.package_name;
    let descriptor = controller
        .host()
        .package_descriptor(&name)?
        .ok_or_else(|| anyhow!("package {name:?} is not installed from a git url"))?;
    if descriptor.source == SourceKind::LocalWorkingCopy || controller.store().contains(&name) {
        bail!("package {name:?} is already in local mode");
    }

    let revision = match opts.revision.or(descriptor.resolved_revision) {
        Some(revision) => revision,
        None => decompose(&descriptor.identifier)?
            .revision()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("no revision known for {name:?}, use --revision"))?,
    };

    controller.enter_local(&descriptor.identifier, &revision)?;
    Ok(())
}

fn run_leave(controller: &mut Controller, opts: LeaveOptions) -> Result<()> {
    let name = opts.package_name;
    let policy = match opts.policy {
        Some(policy) => policy.into(),
        None => match controller.revert_candidates(&name)? {
            Some(candidates) => prompt_policy(&name, &candidates)?,
            None => RevisionPolicy::KeepStored,
        },
    };

    controller.leave_local(&name, |_| policy)?;
    Ok(())
}

fn run_leave_all(controller: &mut Controller, opts: LeaveAllOptions) -> Result<()> {
    let failures = controller.leave_all(opts.policy.into());
    if failures.is_empty() {
        return Ok(());
    }

    for (name, error) in &failures {
        warn!("{name} is still in local mode: {error}");
    }
    bail!("{} package(s) failed to leave local mode", failures.len())
}

fn run_open(controller: &Controller, opts: OpenOptions) -> Result<()> {
    controller.open_folder(&opts.package_name)?;
    Ok(())
}

fn run_status(controller: &Controller) -> Result<()> {
    let records = controller.status();
    if records.is_empty() {
        info!("no packages in local mode");
        return Ok(());
    }

    for record in records {
        let working_copy = controller.layout().working_copy(&record.name);
        println!("{}: {}", record.name, record.url);
        println!("    working copy: {}", working_copy.display());
    }

    Ok(())
}

fn prompt_policy(name: &str, candidates: &RevertCandidates) -> Result<RevisionPolicy> {
    let choices = RevisionPolicy::ALL
        .into_iter()
        .map(|policy| PolicyChoice {
            policy,
            url: candidates.select(policy),
        })
        .collect();
    let message = format!(
        "{name} is at version {}, but pinned to {}",
        candidates.installed_version,
        candidates.stored_revision.as_deref().unwrap_or("latest")
    );

    let choice = Select::new(&message, choices).prompt()?;
    Ok(choice.policy)
}
