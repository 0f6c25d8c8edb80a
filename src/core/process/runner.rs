use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::models::ArchiveError;

/// How often a process with a deadline is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Launches the archiver executable
///
/// Arguments are passed as a vector, never through a shell. Standard input is
/// closed, standard output and standard error are piped back to the caller.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the process if it has not exited this long after launch
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Start the process and hand back its output stream
    ///
    /// # Errors
    /// * `Launch` if the executable cannot be found or started
    pub fn spawn<I, S>(&self, args: I) -> Result<RunningProcess, ArchiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        debug!("Running {} {:?}", self.program.display(), args);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = command.spawn().map_err(|source| ArchiveError::Launch {
            program: self.program.clone(),
            source,
        })?;

        // Drained in the background so a chatty archiver never blocks on a full pipe
        let stderr = child.stderr.take().map(drain);
        let stdout = child.stdout.take();

        Ok(RunningProcess {
            program: self.program.clone(),
            child,
            stdout,
            stderr,
            timeout: self.timeout,
            started: Instant::now(),
            finished: false,
        })
    }

    /// Start the process, capture everything it prints and wait for it
    pub fn run<I, S>(&self, args: I) -> Result<ProcessOutput, ArchiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.spawn(args)?.wait()
    }
}

/// A started archiver process
///
/// Dropping it before [`wait`](Self::wait) kills and reaps the child.
pub struct RunningProcess {
    program: PathBuf,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    timeout: Option<Duration>,
    started: Instant,
    finished: bool,
}

impl RunningProcess {
    /// Standard output for incremental reads
    pub fn stdout(&mut self) -> Option<&mut ChildStdout> {
        self.stdout.as_mut()
    }

    /// Wait for exit, collecting whatever output has not been read yet
    ///
    /// # Errors
    /// * `Timeout` if the configured deadline passes first; the process is killed
    pub fn wait(mut self) -> Result<ProcessOutput, ArchiveError> {
        let stdout = self.stdout.take().map(drain);
        let status = self.wait_for_exit()?;

        let output = ProcessOutput {
            code: status.code().unwrap_or(-1),
            stdout: collect(stdout),
            stderr: collect(self.stderr.take()),
        };
        debug!("{} exited with code {}", self.program.display(), output.code);
        Ok(output)
    }

    fn wait_for_exit(&mut self) -> Result<ExitStatus, ArchiveError> {
        let Some(timeout) = self.timeout else {
            let status = self.child.wait()?;
            self.finished = true;
            return Ok(status);
        };

        loop {
            if let Some(status) = self.child.try_wait()? {
                self.finished = true;
                return Ok(status);
            }
            if self.started.elapsed() >= timeout {
                warn!("Killing {} after {:?}", self.program.display(), timeout);
                self.kill();
                return Err(ArchiveError::Timeout {
                    program: self.program.clone(),
                    after: timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("Failed to kill {}: {}", self.program.display(), e);
        }
        let _ = self.child.wait();
        self.finished = true;
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        if !self.finished {
            self.kill();
        }
    }
}

/// Exit code and captured text of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` when terminated by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Standard output followed by standard error
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }

    /// Turn a non-zero exit into [`ArchiveError::Backend`]
    pub fn check(self) -> Result<Self, ArchiveError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ArchiveError::Backend {
                code: self.code,
                output: self.combined(),
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buffer) {
            warn!("Failed to read archiver output: {}", e);
        }
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Read;

    fn sh() -> ProcessRunner {
        ProcessRunner::new("sh")
    }

    #[test]
    fn test_captures_stdout_stderr_and_code() {
        let output = sh()
            .run(["-c", "printf hello; printf oops >&2; exit 3"])
            .unwrap();

        assert_eq!(output.code, 3);
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.stderr, "oops");
        assert!(!output.success());
    }

    #[test]
    fn test_check_turns_failure_into_backend_error() {
        let output = sh().run(["-c", "echo listing; echo broken >&2; exit 2"]).unwrap();
        match output.check() {
            Err(ArchiveError::Backend { code, output }) => {
                assert_eq!(code, 2);
                assert_eq!(output, "listing\nbroken\n");
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[test]
    fn test_arguments_are_not_shell_interpreted() {
        let output = sh()
            .run(["-c", "printf '%s' \"$1\"", "sh", "two words; $(echo nope)"])
            .unwrap()
            .check()
            .unwrap();
        assert_eq!(output.stdout, "two words; $(echo nope)");
    }

    #[test]
    fn test_missing_binary_is_launch_error() {
        let result = ProcessRunner::new("/nonexistent/archiver-binary").run(["l"]);
        match result {
            Err(ArchiveError::Launch { program, .. }) => {
                assert_eq!(program, PathBuf::from("/nonexistent/archiver-binary"));
            }
            other => panic!("Expected Launch error, got {:?}", other),
        }
    }

    #[test]
    fn test_streamed_stdout() {
        let mut process = sh().spawn(["-c", "printf 'abc'; printf 'def'"]).unwrap();
        let mut streamed = Vec::new();
        process.stdout().unwrap().read_to_end(&mut streamed).unwrap();
        let output = process.wait().unwrap();

        assert_eq!(streamed, b"abcdef");
        assert!(output.stdout.is_empty());
        assert!(output.success());
    }

    #[test]
    fn test_large_stderr_does_not_block() {
        let output = sh()
            .run(["-c", "head -c 300000 /dev/zero >&2; echo done"])
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "done\n");
        assert_eq!(output.stderr.len(), 300000);
    }

    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let result = sh()
            .with_timeout(Some(Duration::from_millis(100)))
            .run(["-c", "exec sleep 10"]);

        assert!(matches!(result, Err(ArchiveError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_not_hit() {
        let output = sh()
            .with_timeout(Some(Duration::from_secs(10)))
            .run(["-c", "exit 0"])
            .unwrap();
        assert!(output.success());
    }

    #[test]
    fn test_drop_kills_unwaited_process() {
        let started = Instant::now();
        let process = sh().spawn(["-c", "exec sleep 10"]).unwrap();
        drop(process);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
