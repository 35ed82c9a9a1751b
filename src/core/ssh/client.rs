use std::path::Path;
use std::process::Command;

use crate::config::TargetConfig;
use crate::error::{Error, Result, TargetDetails};
use crate::remote::{RemoteCommand, SyncOptions, Transport};
use crate::utils::command::{self, CommandOutput};
use crate::utils::shell;

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

impl SshClient {
    pub fn from_target(target: &TargetConfig) -> Result<Self> {
        let identity_file = match &target.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(expanded));
                }
                Some(expanded)
            }
            _ => None,
        };

        let is_local = is_local_host(&target.host);
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", target.host);
        }

        Ok(Self {
            host: target.host.clone(),
            user: target.user.clone(),
            port: target.port,
            identity_file,
            is_local,
        })
    }

    /// Client that runs everything on this machine.
    pub fn local(user: &str) -> Self {
        Self {
            host: "localhost".to_string(),
            user: user.to_string(),
            port: 22,
            identity_file: None,
            is_local: true,
        }
    }

    fn connection_options(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Never prompt; fail stalled connections instead of hanging.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.connection_options();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Value for rsync's `-e` option.
    fn rsync_shell(&self) -> String {
        std::iter::once("ssh".to_string())
            .chain(self.connection_options().iter().map(|a| shell::quote_arg(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn rsync_args(
        &self,
        local_path: &Path,
        remote_path: &str,
        options: &SyncOptions,
    ) -> Vec<String> {
        let mut args = vec!["-az".to_string()];
        if options.delete {
            args.push("--delete".to_string());
        }
        for pattern in &options.exclude {
            args.push(format!("--exclude={}", pattern));
        }

        if self.is_local {
            args.push(local_path.to_string_lossy().to_string());
            args.push(remote_path.to_string());
        } else {
            args.push("-e".to_string());
            args.push(self.rsync_shell());
            args.push(local_path.to_string_lossy().to_string());
            args.push(format!("{}:{}", self.destination(), remote_path));
        }
        args
    }

    fn execute_line(&self, line: &str, stdin: Option<&[u8]>) -> CommandOutput {
        self.execute_with_retry(line, stdin, 3)
    }

    fn execute_with_retry(&self, line: &str, stdin: Option<&[u8]>, max_attempts: u32) -> CommandOutput {
        let backoff_secs = [0, 2, 5]; // delays before retry 1, 2, 3

        let mut result = self.execute_once(line, stdin);
        for attempt in 1..max_attempts {
            // Only retry on transient connection errors, not command failures
            if result.success || self.is_local || !is_transient_ssh_error(&result) {
                return result;
            }

            let delay = backoff_secs.get(attempt as usize).copied().unwrap_or(5);
            log_status!(
                "ssh",
                "Connection failed (attempt {}/{}), retrying in {}s...",
                attempt,
                max_attempts,
                delay
            );
            std::thread::sleep(std::time::Duration::from_secs(delay));
            result = self.execute_once(line, stdin);
        }
        result
    }

    fn execute_once(&self, line: &str, stdin: Option<&[u8]>) -> CommandOutput {
        let mut cmd = if self.is_local {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", line]);
            cmd
        } else {
            let mut cmd = Command::new("ssh");
            cmd.args(self.build_ssh_args(line));
            cmd
        };

        match stdin {
            Some(bytes) => command::capture_with_stdin(&mut cmd, bytes, "SSH"),
            None => command::capture(&mut cmd, "SSH"),
        }
    }
}

impl Transport for SshClient {
    fn target(&self) -> TargetDetails {
        TargetDetails {
            user: Some(self.user.clone()),
            host: Some(self.host.clone()),
        }
    }

    fn execute(&self, command: &RemoteCommand) -> CommandOutput {
        self.execute_line(&command.to_shell(), None)
    }

    fn upload(&self, contents: &[u8], remote_path: &str) -> CommandOutput {
        let line = format!("cat > {}", shell::quote_path(remote_path));
        self.execute_line(&line, Some(contents))
    }

    fn sync_dir(&self, local_path: &Path, remote_path: &str, options: &SyncOptions) -> CommandOutput {
        let mut cmd = Command::new("rsync");
        cmd.args(self.rsync_args(local_path, remote_path, options));
        command::capture(&mut cmd, "rsync")
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Check if an SSH failure is a transient connection error worth retrying.
fn is_transient_ssh_error(output: &CommandOutput) -> bool {
    let stderr = output.stderr.to_lowercase();
    // SSH exit code 255 = connection error (not a remote command failure)
    let is_connection_exit = output.exit_code == 255;

    let transient_patterns = [
        "connection refused",
        "connection reset",
        "connection timed out",
        "no route to host",
        "network is unreachable",
        "temporary failure in name resolution",
        "could not resolve hostname",
        "broken pipe",
        "ssh_exchange_identification",
        "connection closed by remote host",
    ];

    is_connection_exit || transient_patterns.iter().any(|p| stderr.contains(p))
}
