//! Running the external verifier.
//!
//! The compiled specification and the query are written into a scratch
//! directory and handed to the verifier through the shell. While it runs, a
//! wait thread reports its exit over a channel and a cancel thread polls the
//! caller's [`CancelCheck`]; the calling thread only listens on that channel
//! (and on the optional deadline). On cancellation or timeout the verifier is
//! killed and reaped before returning.

mod cancel;
pub mod timeout;

pub use cancel::{CancelCheck, CancellationToken, NeverCancel};

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{AnalysisError, ProcessError};
use timeout::{deadline_after, deadline_exceeded, next_wait};

pub const DEFAULT_VERIFIER: &str = "verifyta";

/// Flags for a concrete run whose trace is printed on stderr.
const SIMULATION_FLAGS: &str = "-t0 -o2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub verifier_path: PathBuf,
    /// Falls back to `verifier_path` when unset.
    pub smc_verifier_path: Option<PathBuf>,
}

impl VerifierConfig {
    pub fn new(verifier_path: impl Into<PathBuf>) -> Self {
        Self {
            verifier_path: verifier_path.into(),
            smc_verifier_path: None,
        }
    }

    pub fn with_smc_verifier(mut self, path: impl Into<PathBuf>) -> Self {
        self.smc_verifier_path = Some(path.into());
        self
    }

    pub fn smc_path(&self) -> &Path {
        self.smc_verifier_path
            .as_deref()
            .unwrap_or(&self.verifier_path)
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFIER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// How often the cancellation check is consulted.
    pub cancel: Duration,
    /// How long the caller blocks between looks at the deadline.
    pub wait: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            cancel: Duration::from_millis(500),
            wait: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierMode {
    /// One concrete run; the trace is the verifier's stderr.
    Simulation,
    /// Statistical model checking; the report is the combined output.
    Smc,
}

impl VerifierMode {
    fn as_str(self) -> &'static str {
        match self {
            VerifierMode::Simulation => "simulation",
            VerifierMode::Smc => "smc",
        }
    }
}

/// A resolved verifier installation plus run settings.
#[derive(Debug, Clone)]
pub struct Verifier {
    simulation: PathBuf,
    smc: PathBuf,
    poll: PollIntervals,
    timeout: Option<Duration>,
    keep_files: bool,
}

enum Event {
    Exited(io::Result<ExitStatus>),
    Cancelled,
}

enum Outcome {
    Exited(ExitStatus),
    Cancelled,
    TimedOut,
}

impl Verifier {
    pub fn new(config: &VerifierConfig) -> Result<Self, ProcessError> {
        Ok(Self {
            simulation: resolve_executable(&config.verifier_path)?,
            smc: resolve_executable(config.smc_path())?,
            poll: PollIntervals::default(),
            timeout: None,
            keep_files: false,
        })
    }

    pub fn with_poll(mut self, poll: PollIntervals) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Leave the scratch directory in place after the run.
    pub fn keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }

    pub fn executable(&self, mode: VerifierMode) -> &Path {
        match mode {
            VerifierMode::Simulation => &self.simulation,
            VerifierMode::Smc => &self.smc,
        }
    }

    /// Run the verifier on `specification` and `query` and return its raw
    /// result text: the trace for a simulation, the report for SMC.
    pub fn run(
        &self,
        mode: VerifierMode,
        specification: &str,
        query: &str,
        cancel: &dyn CancelCheck,
    ) -> Result<String, AnalysisError> {
        let dir = tempfile::Builder::new()
            .prefix("ANIMO")
            .keep(self.keep_files)
            .tempdir()
            .map_err(ProcessError::Io)?;
        let stem = dir
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ANIMO".to_string());
        let model_file = dir.path().join(format!("{stem}.xml"));
        let query_file = dir.path().join(format!("{stem}.q"));
        let output_file = dir.path().join(format!("{stem}.output"));
        std::fs::write(&model_file, specification).map_err(ProcessError::Io)?;
        std::fs::write(&query_file, query).map_err(ProcessError::Io)?;
        debug!(
            model = %model_file.display(),
            query = %query_file.display(),
            keep = self.keep_files,
            "Wrote verifier input"
        );

        let line = match mode {
            VerifierMode::Simulation => format!(
                "{} {SIMULATION_FLAGS} {} {}",
                quoted(&self.simulation),
                quoted(&model_file),
                quoted(&query_file)
            ),
            VerifierMode::Smc => format!(
                "{} {} {} > {} 2>&1",
                quoted(&self.smc),
                quoted(&model_file),
                quoted(&query_file),
                quoted(&output_file)
            ),
        };

        info!(mode = mode.as_str(), "Running verifier");
        let started = Instant::now();
        let (outcome, stderr) = self.supervise(&line, cancel)?;
        info!(
            mode = mode.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Verifier finished"
        );

        let status = match outcome {
            Outcome::Exited(status) => status,
            Outcome::Cancelled => {
                info!("Verifier run cancelled");
                return Err(AnalysisError::Cancelled);
            }
            Outcome::TimedOut => {
                return Err(ProcessError::TimedOut {
                    after: self.timeout.unwrap_or_default(),
                }
                .into());
            }
        };

        let result = match mode {
            VerifierMode::Simulation => stderr.clone(),
            VerifierMode::Smc => std::fs::read(&output_file)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default(),
        };

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            let usable = match mode {
                VerifierMode::Simulation => result.contains("State"),
                VerifierMode::Smc => result.contains("Property is"),
            };
            if !usable {
                let detail = if stderr.trim().is_empty() { result } else { stderr };
                return Err(ProcessError::Failed {
                    model_file: model_file.display().to_string(),
                    code,
                    stderr: detail,
                    cwd: current_dir(),
                }
                .into());
            }
            warn!(code, "Verifier exited with an error but produced a result");
        }
        Ok(result)
    }

    /// Spawn `line` through the shell and wait for it to exit, be cancelled,
    /// or run out of time. Returns the outcome and the captured stderr.
    fn supervise(
        &self,
        line: &str,
        cancel: &dyn CancelCheck,
    ) -> Result<(Outcome, String), ProcessError> {
        let mut child = shell(line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessError::Spawn(format!("failed to start verifier: {e}")))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::Spawn("verifier stdout unavailable".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessError::Spawn("verifier stderr unavailable".into()))?;

        let child = Mutex::new(child);
        let deadline = deadline_after(self.timeout);
        let poll = self.poll;

        thread::scope(|scope| {
            let drain = scope.spawn(move || io::copy(&mut stdout, &mut io::sink()));
            let capture = scope.spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok::<_, io::Error>(String::from_utf8_lossy(&bytes).into_owned())
            });

            let (events, inbox) = mpsc::channel();
            let (stop, stopped) = mpsc::channel::<()>();

            let exit_events = events.clone();
            let child_ref = &child;
            scope.spawn(move || loop {
                let polled = match child_ref.lock() {
                    Ok(mut guard) => guard.try_wait(),
                    Err(_) => Err(io::Error::other("verifier handle poisoned")),
                };
                match polled {
                    Ok(Some(status)) => {
                        let _ = exit_events.send(Event::Exited(Ok(status)));
                        return;
                    }
                    Ok(None) => thread::sleep(poll.wait),
                    Err(e) => {
                        let _ = exit_events.send(Event::Exited(Err(e)));
                        return;
                    }
                }
            });

            scope.spawn(move || loop {
                match stopped.recv_timeout(poll.cancel) {
                    Err(RecvTimeoutError::Timeout) => {
                        if cancel.is_cancelled() {
                            let _ = events.send(Event::Cancelled);
                            return;
                        }
                    }
                    _ => return,
                }
            });

            let outcome = loop {
                if deadline_exceeded(deadline) {
                    break Ok(Outcome::TimedOut);
                }
                match inbox.recv_timeout(next_wait(poll.wait, deadline)) {
                    Ok(Event::Exited(Ok(status))) => break Ok(Outcome::Exited(status)),
                    Ok(Event::Exited(Err(e))) => break Err(ProcessError::Io(e)),
                    Ok(Event::Cancelled) => break Ok(Outcome::Cancelled),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        break Err(ProcessError::Io(io::Error::other(
                            "verifier supervision threads stopped unexpectedly",
                        )))
                    }
                }
            };
            drop(stop);

            if !matches!(outcome, Ok(Outcome::Exited(_))) {
                kill(&child);
            }

            let drained = drain
                .join()
                .map_err(|_| ProcessError::Io(io::Error::other("stdout reader panicked")))?;
            let captured = capture
                .join()
                .map_err(|_| ProcessError::Io(io::Error::other("stderr reader panicked")))?;
            let outcome = outcome?;
            drained?;
            Ok((outcome, captured?))
        })
    }
}

fn kill(child: &Mutex<Child>) {
    if let Ok(mut child) = child.lock() {
        if let Err(e) = child.kill() {
            debug!(error = %e, "Verifier already gone");
        }
        let _ = child.wait();
    }
}

#[cfg(unix)]
fn shell(line: &str) -> Command {
    let mut cmd = Command::new("bash");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/c").arg(line);
    cmd
}

fn quoted(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

fn current_dir() -> String {
    std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

/// Check that `path` names an executable file. A bare name is looked up on
/// the `PATH`.
pub fn resolve_executable(path: &Path) -> Result<PathBuf, ProcessError> {
    let bare = path.components().count() == 1 && !path.is_absolute();
    if !bare || path.is_file() {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ProcessError::VerifierNotFound {
                path: path.to_path_buf(),
            })
        };
    }
    let search = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&search) {
        let candidate = dir.join(path);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Ok(exe);
            }
        }
    }
    Err(ProcessError::VerifierNotFound {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smc_path_falls_back_to_simulation_path() {
        let config = VerifierConfig::new("/opt/uppaal/verifyta");
        assert_eq!(config.smc_path(), Path::new("/opt/uppaal/verifyta"));
        let config = config.with_smc_verifier("/opt/uppaal-smc/verifyta");
        assert_eq!(config.smc_path(), Path::new("/opt/uppaal-smc/verifyta"));
    }

    #[test]
    fn default_poll_intervals() {
        let poll = PollIntervals::default();
        assert_eq!(poll.cancel, Duration::from_millis(500));
        assert_eq!(poll.wait, Duration::from_millis(100));
    }

    #[test]
    fn missing_verifier_is_reported() {
        let err = Verifier::new(&VerifierConfig::new("/definitely/not/here/verifyta")).unwrap_err();
        assert!(matches!(err, ProcessError::VerifierNotFound { .. }));
    }

    #[test]
    fn unknown_bare_name_is_reported() {
        let err = resolve_executable(Path::new("animo-no-such-verifier-xyz")).unwrap_err();
        assert!(matches!(err, ProcessError::VerifierNotFound { .. }));
    }

    #[test]
    fn existing_file_resolves_to_itself() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(resolve_executable(file.path()).unwrap(), file.path());
    }

    #[test]
    fn paths_are_quoted_for_the_shell() {
        assert_eq!(quoted(Path::new("/tmp/my dir/a.xml")), "\"/tmp/my dir/a.xml\"");
    }
}
