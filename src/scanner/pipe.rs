//! Piping byte streams through external filter commands.
//!
//! # Overview
//!
//! [`pipe`] runs a command through the platform shell, feeds a
//! [`ByteStream`] to its stdin and hands back a [`PipeStream`] that yields
//! the command's stdout. The three pipes are serviced concurrently:
//!
//! - a writer thread pulls the input stream and writes it to stdin, then
//!   closes stdin;
//! - a reader thread drains stderr so the child never blocks on it;
//! - stdout is read by whoever pulls the [`PipeStream`].
//!
//! A nonzero exit status is not an error for the consumer: the bytes the
//! command produced are kept, the failure is logged together with the
//! captured stderr, and it is recorded in the stream's [`ExitWatch`].

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use super::stream::{ByteStream, CHUNK_SIZE};

/// Exit status the POSIX shell uses for "command not found".
pub const SHELL_NOT_FOUND: i32 = 127;
/// Exit status the POSIX shell uses for "found but not executable".
pub const SHELL_NOT_EXECUTABLE: i32 = 126;

/// Errors raised by filter pipes.
#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    /// The command could not be started at all.
    #[error("Failed to launch filter '{command}': {source}")]
    Launch {
        /// Command line as configured
        command: String,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },

    /// The shell reported that the filter program does not exist or cannot run.
    #[error("Filter '{command}' could not be run (exit status {status}): {stderr}")]
    NotRunnable {
        /// Command line as configured
        command: String,
        /// Shell exit status (126 or 127)
        status: i32,
        /// Captured standard error
        stderr: String,
    },
}

/// How a filter command ended when it did not exit cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFailure {
    /// Command line as configured
    pub command: String,
    /// Exit code, or `None` when the child was terminated by a signal
    pub code: Option<i32>,
    /// Captured standard error, lossily decoded
    pub stderr: String,
}

impl FilterFailure {
    /// Whether the shell could not find or execute the program.
    #[must_use]
    pub fn is_not_runnable(&self) -> bool {
        cfg!(unix) && matches!(self.code, Some(SHELL_NOT_FOUND | SHELL_NOT_EXECUTABLE))
    }

    /// Convert into the fatal error used when the program is missing.
    #[must_use]
    pub fn into_error(self) -> FilterError {
        FilterError::NotRunnable {
            command: self.command,
            status: self.code.unwrap_or_default(),
            stderr: self.stderr.trim().to_string(),
        }
    }
}

/// Shared handle that receives a filter's failure once the child exits.
///
/// Clones observe the same slot. The slot stays empty for clean exits and
/// for streams that were dropped before the child finished.
#[derive(Debug, Clone, Default)]
pub struct ExitWatch {
    slot: Arc<OnceLock<FilterFailure>>,
}

impl ExitWatch {
    /// Create an empty watch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&FilterFailure> {
        self.slot.get()
    }

    fn record(&self, failure: FilterFailure) {
        let _ = self.slot.set(failure);
    }
}

/// Build the platform shell invocation for a command line.
#[must_use]
pub fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Run `command` through the shell with `input` on stdin.
///
/// # Errors
///
/// Returns [`FilterError::Launch`] if the shell cannot be spawned.
pub fn pipe(input: ByteStream, command: &str) -> Result<PipeStream, FilterError> {
    pipe_command(input, shell_command(command), command)
}

/// Run a prepared [`Command`] with `input` on stdin.
///
/// `label` is the name used in logs and errors.
///
/// # Errors
///
/// Returns [`FilterError::Launch`] if the process cannot be spawned.
pub fn pipe_command(
    input: ByteStream,
    mut command: Command,
    label: &str,
) -> Result<PipeStream, FilterError> {
    let launch_error = |source| FilterError::Launch {
        command: label.to_string(),
        source,
    };

    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(launch_error)?;

    let (Some(stdin), Some(stdout), Some(mut stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(launch_error(io::Error::other("child pipes unavailable")));
    };

    log::trace!("Started filter '{}' (pid {})", label, child.id());

    let writer = std::thread::spawn(move || feed(input, stdin));
    let stderr_reader = std::thread::spawn(move || {
        let mut captured = Vec::new();
        let _ = stderr.read_to_end(&mut captured);
        captured
    });

    Ok(PipeStream {
        command: label.to_string(),
        child: Some(child),
        stdout: Some(stdout),
        writer: Some(writer),
        stderr_reader: Some(stderr_reader),
        watch: ExitWatch::new(),
    })
}

/// Write the whole input stream to the child's stdin, then close it.
///
/// A broken pipe means the child stopped reading; that is the child's
/// business and not an input error.
fn feed(input: ByteStream, mut stdin: std::process::ChildStdin) -> io::Result<()> {
    for chunk in input {
        let chunk = chunk?;
        match stdin.write_all(&chunk) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e),
        }
    }
    match stdin.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

/// Stdout of a running filter command.
///
/// Yields chunks of up to [`CHUNK_SIZE`] bytes. Dropping the stream before
/// it is exhausted kills and reaps the child.
pub struct PipeStream {
    command: String,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    writer: Option<JoinHandle<io::Result<()>>>,
    stderr_reader: Option<JoinHandle<Vec<u8>>>,
    watch: ExitWatch,
}

impl PipeStream {
    /// Handle that reports a nonzero exit once the stream is exhausted.
    #[must_use]
    pub fn exit_watch(&self) -> ExitWatch {
        self.watch.clone()
    }

    /// Convert into a [`ByteStream`] for further composition.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        ByteStream::new(self)
    }

    /// Reap the child after stdout closed.
    ///
    /// Returns an input error from the writer thread, if there was one.
    fn finish(&mut self) -> Option<io::Error> {
        self.stdout = None;

        let input_error = self
            .writer
            .take()
            .and_then(|handle| match handle.join() {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some(io::Error::other("filter input thread panicked")),
            });

        let stderr = self
            .stderr_reader
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        let status = match self.child.take().map(|mut child| child.wait()) {
            Some(Ok(status)) => status,
            Some(Err(e)) => return Some(input_error.unwrap_or(e)),
            None => return input_error,
        };

        if !status.success() {
            self.report_failure(status, &stderr);
        }
        input_error
    }

    fn report_failure(&self, status: ExitStatus, stderr: &[u8]) {
        let stderr = String::from_utf8_lossy(stderr).into_owned();
        log::warn!(
            "Filter '{}' exited with {}{}",
            self.command,
            status,
            if stderr.trim().is_empty() {
                String::new()
            } else {
                format!(": {}", stderr.trim())
            }
        );
        self.watch.record(FilterFailure {
            command: self.command.clone(),
            code: status.code(),
            stderr,
        });
    }
}

impl Iterator for PipeStream {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let stdout = self.stdout.as_mut()?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match stdout.read(&mut buf) {
                Ok(0) => return self.finish().map(Err),
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.abort();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl PipeStream {
    fn abort(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            log::debug!("Killed unfinished filter '{}'", self.command);
        }
        // The helper threads end once the child's pipes close; they are
        // detached rather than joined so a stuck grandchild cannot hang us.
        self.writer = None;
        self.stderr_reader = None;
    }
}

impl Drop for PipeStream {
    fn drop(&mut self) {
        self.abort();
    }
}

impl std::fmt::Debug for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeStream")
            .field("command", &self.command)
            .field("running", &self.child.is_some())
            .finish_non_exhaustive()
    }
}
