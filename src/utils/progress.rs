//! Shared progress counter for a stage.
//!
//! Provides a count-style indicatif bar on an interactive terminal and a log
//! line roughly every tenth of the way otherwise.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Counts completed items across workers.
pub struct Progress {
    label: String,
    total: usize,
    step: usize,
    done: AtomicUsize,
    bar: ProgressBar,
}

impl Progress {
    /// Counter with a bar drawn to stderr when it is a terminal.
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        let target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self::with_target(label, total, target)
    }

    /// Counter that never draws; only the log lines remain.
    pub fn hidden(label: impl Into<String>, total: usize) -> Self {
        Self::with_target(label, total, ProgressDrawTarget::hidden())
    }

    fn with_target(label: impl Into<String>, total: usize, target: ProgressDrawTarget) -> Self {
        let label = label.into();
        let bar = ProgressBar::with_draw_target(Some(total as u64), target);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
             it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
        ) {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        bar.set_message(label.clone());
        if !bar.is_hidden() {
            bar.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            label,
            total,
            step: (total / 10).max(1),
            done: AtomicUsize::new(0),
            bar,
        }
    }

    /// Record one finished item and return the new count.
    pub fn inc(&self) -> usize {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.inc(1);
        if self.bar.is_hidden() && (done % self.step == 0 || done == self.total) {
            log::info!(
                "{}: {}/{} ({:.0}%)",
                self.label,
                done,
                self.total,
                done as f64 * 100.0 / self.total.max(1) as f64
            );
        }
        done
    }

    /// Stop drawing and leave a final count in the log.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
        log::info!("{}: {}/{} done", self.label, self.done(), self.total);
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Position shown by the bar.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}
