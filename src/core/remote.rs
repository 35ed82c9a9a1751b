//! Structured remote command execution.
//!
//! Steps describe what to run as a [`RemoteCommand`] (argv, working directory,
//! optional virtualenv). A [`Transport`] carries it to the target and a
//! [`Session`] turns failures into errors so the workflow stops at the first
//! failing command.

use std::fmt;
use std::path::Path;

use crate::error::{Error, RemoteCommandFailedDetails, Result, TargetDetails};
use crate::utils::command::CommandOutput;
use crate::utils::shell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub venv: Option<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            venv: None,
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

    pub fn in_dir(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Activate the virtualenv rooted at `venv_dir` before running.
    pub fn with_venv(mut self, venv_dir: impl Into<String>) -> Self {
        self.venv = Some(venv_dir.into());
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Render as a single POSIX shell line with every argument quoted.
    pub fn to_shell(&self) -> String {
        let mut parts = Vec::new();
        if let Some(dir) = &self.cwd {
            parts.push(format!("cd {}", shell::quote_path(dir)));
        }
        if let Some(venv) = &self.venv {
            let activate = format!("{}/bin/activate", venv.trim_end_matches('/'));
            parts.push(format!(". {}", shell::quote_path(&activate)));
        }
        parts.push(shell::join_command(&self.program, &self.args));
        parts.join(" && ")
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell())
    }
}

/// Options for a directory mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Remove files on the destination that are absent locally.
    pub delete: bool,
    pub exclude: Vec<String>,
}

/// Carries commands, files and directory mirrors to a deployment target.
pub trait Transport {
    fn target(&self) -> TargetDetails;

    fn execute(&self, command: &RemoteCommand) -> CommandOutput;

    /// Write `contents` to `remote_path`, replacing any existing file.
    fn upload(&self, contents: &[u8], remote_path: &str) -> CommandOutput;

    fn sync_dir(&self, local_path: &Path, remote_path: &str, options: &SyncOptions)
        -> CommandOutput;
}

/// Fail-fast wrapper over a [`Transport`].
pub struct Session<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Session<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Run a command and return its trimmed stdout.
    pub fn run(&self, command: &RemoteCommand) -> Result<String> {
        log_status!("run", "{}", command);
        let output = self.transport.execute(command);
        if !output.success {
            return Err(self.failure(command.to_shell(), output));
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Run a command whose failure is acceptable. Failures are logged, not raised.
    pub fn run_tolerant(&self, command: &RemoteCommand) -> CommandOutput {
        log_status!("run", "{}", command);
        let output = self.transport.execute(command);
        if !output.success {
            log_status!(
                "warn",
                "Ignoring failure (exit {}): {}",
                output.exit_code,
                output.error_text()
            );
        }
        output
    }

    /// Whether `path` exists on the target.
    pub fn exists(&self, path: &str) -> Result<bool> {
        let command = RemoteCommand::new("test").args(["-e", path]);
        let output = self.transport.execute(&command);
        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ => Err(self.failure(command.to_shell(), output)),
        }
    }

    pub fn upload(&self, contents: &[u8], remote_path: &str) -> Result<()> {
        log_status!("put", "{} ({} bytes)", remote_path, contents.len());
        let output = self.transport.upload(contents, remote_path);
        if !output.success {
            return Err(self.failure(format!("upload {}", remote_path), output));
        }
        Ok(())
    }

    pub fn sync_dir(&self, local_path: &Path, remote_path: &str, options: &SyncOptions) -> Result<()> {
        log_status!("rsync", "{} -> {}", local_path.display(), remote_path);
        let output = self.transport.sync_dir(local_path, remote_path, options);
        if !output.success {
            return Err(self.failure(
                format!("rsync {} {}", local_path.display(), remote_path),
                output,
            ));
        }
        Ok(())
    }

    fn failure(&self, command: String, output: CommandOutput) -> Error {
        Error::remote_command_failed(RemoteCommandFailedDetails {
            command,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            target: self.transport.target(),
        })
    }
}
