//! Process Invoker
//!
//! Runs external programs with captured output and an optional deadline. A non-zero exit code is
//! data, not an error: callers classify failures from `exit_code` and the captured text because the
//! wrapped CLI has no structured error protocol.
//!
//! On unix each child leads its own process group. A timed-out or abandoned invocation kills the
//! whole group, so `npx` wrappers and `sh -c` scripts do not leave their own children running.

use crate::error::ProcessError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Per-invocation options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Kill the child and fail with [`ProcessError::Timeout`] after this long.
    pub timeout: Option<Duration>,
    /// Working directory; inherits the current directory when `None`.
    pub cwd: Option<PathBuf>,
}

impl ExecOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cwd: None,
        }
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `-1` when the child was terminated by a signal.
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout and stderr joined by a newline, for URL scraping.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Most useful failure text: stderr if present, else stdout, else the exit code.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.exit_code)
    }
}

/// Executes a named program with arguments.
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput, ProcessError>;
}

/// Kills a child's process group when dropped while still armed.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    leader: Option<u32>,
}

impl ProcessGroup {
    fn led_by(leader: Option<u32>) -> Self {
        Self { leader }
    }

    /// The child exited on its own; leave any background members alone.
    fn release(&mut self) {
        self.leader = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.leader.take().and_then(|pid| i32::try_from(pid).ok()) {
            // SAFETY: kill(2) with a negative pid signals the group; no memory is shared.
            let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
            if rc != 0 {
                debug!(pgid, error = %std::io::Error::last_os_error(), "Process group already gone");
            } else {
                debug!(pgid, "Killed process group");
            }
        }
    }
}

/// [`ProcessInvoker`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessInvoker {
    cwd: Option<PathBuf>,
}

impl TokioProcessInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command in `cwd` unless an invocation overrides it.
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
        }
    }
}

#[async_trait]
impl ProcessInvoker for TokioProcessInvoker {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput, ProcessError> {
        debug!(program, ?args, timeout = ?options.timeout, "Executing process");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = options.cwd.as_ref().or(self.cwd.as_ref()) {
            command.current_dir(cwd);
        }
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NotFound {
                program: program.to_string(),
            },
            _ => ProcessError::Io {
                program: program.to_string(),
                source,
            },
        })?;

        // Armed until the child exits on its own; a timeout or dropped future kills the group.
        let mut group = ProcessGroup::led_by(child.id());
        let wait = child.wait_with_output();
        let output = match options.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, wait).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ProcessError::Timeout {
                        program: program.to_string(),
                        timeout,
                    })
                }
            },
            None => wait.await,
        }
        .map_err(|source| ProcessError::Io {
            program: program.to_string(),
            source,
        })?;
        group.release();

        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        debug!(program, exit_code = result.exit_code, "Process finished");
        Ok(result)
    }
}

/// Quote a value for POSIX `sh`. Plain words pass through unchanged.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '='));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// A command line run through `sh -c`, for environment prefixes and redirection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
    env: Vec<(String, String)>,
    words: Vec<String>,
    redirect_stdout: Option<PathBuf>,
    discard_stderr: bool,
}

impl ShellCommand {
    pub fn new(program: &str) -> Self {
        Self {
            words: vec![program.to_string()],
            ..Self::default()
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.words.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words.extend(args.into_iter().map(Into::into));
        self
    }

    /// Send stdout to `path` and discard stderr.
    pub fn redirect_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.redirect_stdout = Some(path.into());
        self.discard_stderr = true;
        self
    }

    /// The `sh -c` script text.
    pub fn script(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(key, value)| format!("{}={}", key, shell_quote(value)))
            .collect();
        parts.extend(self.words.iter().map(|word| shell_quote(word)));
        if let Some(path) = &self.redirect_stdout {
            parts.push(">".to_string());
            parts.push(shell_quote(&path.to_string_lossy()));
        }
        if self.discard_stderr {
            parts.push("2>/dev/null".to_string());
        }
        parts.join(" ")
    }

    /// Program and argv for a [`ProcessInvoker`].
    pub fn into_invocation(self) -> Invocation {
        Invocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), self.script()],
        }
    }
}

/// A fully-resolved program + argv pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable command line, for logs and notices.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub async fn run(
        &self,
        invoker: &dyn ProcessInvoker,
        options: &ExecOptions,
    ) -> Result<ExecOutput, ProcessError> {
        invoker.execute(&self.program, &self.args, options).await
    }
}
