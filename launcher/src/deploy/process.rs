//! External process execution

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use crate::errors::LauncherError;
use crate::utils::tail_lines;

/// Number of stderr lines kept in error summaries
const STDERR_SUMMARY_LINES: usize = 20;

/// A single command invocation
///
/// Environment values are applied to the child only and are kept secret so
/// credentials never show up in `Debug` output.
#[derive(Debug)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, SecretString)>,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), SecretString::from(value.into())));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Program and arguments, for logging
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short description of why the process failed
    pub fn stderr_summary(&self) -> String {
        let summary = tail_lines(&self.stderr, STDERR_SUMMARY_LINES);
        if !summary.is_empty() {
            return summary;
        }
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    /// Turn a non-zero exit into a [`LauncherError::ProcessExecutionError`]
    pub fn into_success(self, program: &str) -> Result<ProcessOutput, LauncherError> {
        if self.success() {
            Ok(self)
        } else {
            Err(LauncherError::ProcessExecutionError {
                program: program.to_string(),
                stderr: self.stderr_summary(),
            })
        }
    }
}

/// Runs external commands to completion
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation and capture its output
    ///
    /// A non-zero exit is not an error at this level; callers decide via
    /// [`ProcessOutput::into_success`].
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, LauncherError>;
}

/// Production runner backed by `tokio::process`
pub struct TokioProcessRunner {
    timeout: Duration,
}

impl TokioProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, LauncherError> {
        debug!("Running: {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &invocation.env {
            command.env(key, value.expose_secret());
        }
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| LauncherError::ProcessSpawnError {
                program: invocation.program.clone(),
                reason: e.to_string(),
            })?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    read_pipe(stdout_handle.as_mut()),
                    read_pipe(stderr_handle.as_mut()),
                );
                let status = status?;
                let (stdout, stderr) = (stdout?, stderr?);
                Ok::<_, LauncherError>(ProcessOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code: status.code(),
                })
            } => result,
            _ = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                Err(LauncherError::Timeout(format!(
                    "{} did not finish within {}s",
                    invocation.program,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Drain a child pipe; a missing pipe reads as empty
async fn read_pipe<R>(pipe: Option<&mut R>) -> Result<Vec<u8>, LauncherError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
