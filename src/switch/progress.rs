// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Progress reporting for package transitions.
//!
//! Progress is purely advisory. Reporters never influence control flow, and
//! steps only ever move forward within a single transition.

use indicatif::{ProgressBar, ProgressStyle};

/// Layer of indirection for progress display.
pub trait ProgressReporter {
    /// Report that step `step` out of `total` has started.
    fn report(&mut self, message: &str, step: u64, total: u64);

    /// Clear progress display.
    fn clear(&mut self);
}

/// Discard all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&mut self, _message: &str, _step: u64, _total: u64) {}

    fn clear(&mut self) {}
}

/// Display progress through a terminal progress bar.
///
/// A fresh bar is drawn for every transition, and cleared once the
/// transition is over.
#[derive(Clone)]
pub struct BarProgress {
    style: ProgressStyle,
    bar: Option<ProgressBar>,
}

impl BarProgress {
    /// Construct new progress bar display.
    ///
    /// # Errors
    ///
    /// - Return [`indicatif::style::TemplateError`] if style template is
    ///   invalid.
    pub fn new() -> Result<Self, indicatif::style::TemplateError> {
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}] {pos}/{len}",
        )?
        .progress_chars("-Cco.");

        Ok(Self { style, bar: None })
    }

    /// Progress bar of the current transition, if any.
    pub fn bar(&self) -> Option<&ProgressBar> {
        self.bar.as_ref()
    }
}

impl ProgressReporter for BarProgress {
    fn report(&mut self, message: &str, step: u64, total: u64) {
        let style = &self.style;
        let bar = self
            .bar
            .get_or_insert_with(|| ProgressBar::new(total).with_style(style.clone()));
        bar.set_length(total);
        bar.set_position(step);
        bar.set_message(message.to_string());
    }

    fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Monotonic step counter over a progress reporter.
#[derive(Debug)]
pub(crate) struct Steps<'a, P>
where
    P: ProgressReporter,
{
    reporter: &'a mut P,
    current: u64,
    total: u64,
}

impl<'a, P> Steps<'a, P>
where
    P: ProgressReporter,
{
    pub(crate) fn new(reporter: &'a mut P, total: u64) -> Self {
        Self {
            reporter,
            current: 0,
            total,
        }
    }

    /// Advance to next step.
    pub(crate) fn next(&mut self, message: &str) {
        // INVARIANT: Never report past the last step.
        self.current = (self.current + 1).min(self.total);
        self.reporter.report(message, self.current, self.total);
    }
}
