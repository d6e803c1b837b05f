//! Progress reporting utilities using indicatif.
//!
//! The fingerprint engine talks to a [`ProgressSink`]; [`Progress`] draws it
//! as a spinner while trees are scanned and as a byte-based bar (rate, ETA,
//! current path) while leaves are hashed. [`NoProgress`] discards everything
//! and is what quiet mode and the tests use.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};

/// Phases of a run that report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Building tree snapshots
    Scanning,
    /// Reading and digesting leaf files
    Hashing,
    /// Re-reading files while checking a duplicate group
    Verifying,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Self::Scanning => "Scanning",
            Self::Hashing => "Hashing",
            Self::Verifying => "Verifying",
        }
    }
}

/// Receiver of progress updates.
///
/// All methods may be called from hashing worker threads.
pub trait ProgressSink: Send + Sync {
    /// A phase starts; `total_bytes` is 0 when the amount of work is unknown.
    fn on_phase_start(&self, phase: Phase, total_bytes: u64);

    /// A new file is about to be read.
    fn on_file(&self, path: &Path);

    /// `bytes` more bytes were read.
    fn on_bytes(&self, bytes: u64);

    /// The phase completed.
    fn on_phase_end(&self, phase: Phase);
}

/// Sink that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_phase_start(&self, _phase: Phase, _total_bytes: u64) {}
    fn on_file(&self, _path: &Path) {}
    fn on_bytes(&self, _bytes: u64) {}
    fn on_phase_end(&self, _phase: Phase) {}
}

/// Terminal progress reporter.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Examples
    ///
    /// ```
    /// use treedupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bytes_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] [{bar:40.green/blue}] {bytes}/{total_bytes} {bytes_per_sec} (ETA: {eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = guard.as_ref() {
            f(pb);
        }
    }
}

impl ProgressSink for Progress {
    fn on_phase_start(&self, phase: Phase, total_bytes: u64) {
        if self.quiet {
            return;
        }
        let pb = if total_bytes == 0 {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = ProgressBar::new(total_bytes);
            pb.set_style(Self::bytes_style());
            pb
        };
        pb.set_prefix(phase.label());
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn on_file(&self, path: &Path) {
        if self.quiet {
            return;
        }
        self.with_bar(|pb| pb.set_message(truncate_path(&path.to_string_lossy(), 40)));
    }

    fn on_bytes(&self, bytes: u64) {
        if self.quiet {
            return;
        }
        self.with_bar(|pb| pb.inc(bytes));
    }

    fn on_phase_end(&self, phase: Phase) {
        if self.quiet {
            return;
        }
        let taken = self.bar.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pb) = taken {
            let done = ByteSize::b(pb.position());
            pb.finish_and_clear();
            log::debug!("{} complete ({})", phase.label(), done);
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
