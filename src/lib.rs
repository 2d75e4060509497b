// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Swap pinned git packages for local working copies.
//!
//! A package manager that installs packages straight from git repositories
//! identifies each one through a __package identifier__ of the form
//! `<name>@<url>`, where the url may carry a subpath inside the repository
//! and a pinned revision. Pkgedit lets the user temporarily replace such a
//! package with a writable clone of its repository, and later revert back to
//! the pinned remote form.
//!
//! # Local Mode
//!
//! Entering local mode clones the package's repository into a shared
//! __working copy root__, replaces the package's install slot with a symbolic
//! link into that clone, and records an __override__ so that the original
//! url can be restored later. Leaving local mode removes the symbolic link,
//! asks the package manager to reinstall the package from the recorded url,
//! and forgets the override. The clone itself is kept around as a cache for
//! the next time the package enters local mode.
//!
//! # See Also
//!
//! 1. [`url`] for the package url grammar.
//! 2. [`switch`] for the state machine driving both transitions.

pub mod config;
pub mod fs_ops;
pub mod host;
pub mod path;
pub mod process;
pub mod store;
pub mod switch;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;
