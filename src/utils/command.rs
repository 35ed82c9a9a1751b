//! Command execution primitives with consistent output capture.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde::Serialize;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }

    /// Stderr if present, otherwise stdout.
    pub fn error_text(&self) -> &str {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.stdout.trim()
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(out: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        }
    }
}

/// Run a prepared command and capture its output.
pub fn capture(cmd: &mut Command, context: &str) -> CommandOutput {
    match cmd.output() {
        Ok(out) => out.into(),
        Err(e) => CommandOutput::failed(-1, format!("{} error: {}", context, e)),
    }
}

/// Run a prepared command, feeding `input` on stdin.
pub fn capture_with_stdin(cmd: &mut Command, input: &[u8], context: &str) -> CommandOutput {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return CommandOutput::failed(-1, format!("{} error: {}", context, e)),
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(input) {
            let _ = child.kill();
            let _ = child.wait();
            return CommandOutput::failed(-1, format!("{} stdin error: {}", context, e));
        }
    }

    match child.wait_with_output() {
        Ok(out) => out.into(),
        Err(e) => CommandOutput::failed(-1, format!("{} error: {}", context, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_reports_exit_code() {
        let out = capture(Command::new("sh").args(["-c", "echo partial; exit 3"]), "sh");
        assert!(!out.success);
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, "partial\n");
    }

    #[test]
    fn capture_reports_spawn_failure() {
        let out = capture(&mut Command::new("nonexistent_command_xyz"), "test");
        assert!(!out.success);
        assert_eq!(out.exit_code, -1);
    }

    #[test]
    fn capture_with_stdin_pipes_input() {
        let mut cmd = Command::new("cat");
        let out = capture_with_stdin(&mut cmd, b"piped", "cat");
        assert!(out.success);
        assert_eq!(out.stdout, "piped");
    }

    #[test]
    fn error_text_prefers_stderr() {
        let out = CommandOutput {
            stdout: "stdout content".to_string(),
            stderr: "stderr content".to_string(),
            success: false,
            exit_code: 1,
        };
        assert_eq!(out.error_text(), "stderr content");
    }

    #[test]
    fn error_text_falls_back_to_stdout() {
        let out = CommandOutput {
            stdout: "stdout content\n".to_string(),
            stderr: String::new(),
            success: false,
            exit_code: 1,
        };
        assert_eq!(out.error_text(), "stdout content");
    }
}
