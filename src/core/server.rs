//! Gunicorn lifecycle keyed by the PID file.
//!
//! `stop` is strict: a missing PID file or a failed signal aborts. `restart`
//! sends a best-effort reload signal and then always starts a new daemon.

use serde::Serialize;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::config::DeployConfig;
use crate::error::{Error, Result};
use crate::paths::RemoteLayout;
use crate::process::{self, ProcessTable};
use crate::remote::{RemoteCommand, Session, Transport};

pub const BIND_HOST: &str = "127.0.0.1";

/// Daemonized gunicorn invocation with explicit PID and log files.
pub fn server_command(config: &DeployConfig, layout: &RemoteLayout) -> RemoteCommand {
    RemoteCommand::new(layout.venv_bin("gunicorn")).args([
        format!("--error-logfile={}", layout.error_log),
        format!("--access-logfile={}", layout.access_log),
        "--capture-output".to_string(),
        "-b".to_string(),
        format!("{}:{}", BIND_HOST, config.server.port),
        "-D".to_string(),
        "-w".to_string(),
        config.server.workers.to_string(),
        "--pid".to_string(),
        layout.pid_file.clone(),
        format!("{}:application", layout.wsgi_module),
    ])
}

fn parse_pid(content: &str, pid_file: &str) -> Result<u32> {
    content.trim().parse().map_err(|_| {
        Error::internal_unexpected(format!(
            "PID file {} does not hold a process id: '{}'",
            pid_file,
            content.trim()
        ))
    })
}

fn read_pid(session: &Session, layout: &RemoteLayout) -> Result<u32> {
    let content = session.run(&RemoteCommand::new("cat").arg(&layout.pid_file))?;
    parse_pid(&content, &layout.pid_file)
}

/// Outcome of launching the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    pub pid: u32,
    /// False when the PID file still named the process from before the launch.
    pub fresh: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartReport {
    /// PID that received the reload signal, if any.
    pub signaled: Option<u32>,
    pub pid: u32,
    pub fresh: bool,
}

/// Launch gunicorn and wait for it to write a PID different from the one
/// recorded before the launch. If the file never changes, the unchanged PID
/// is returned with `fresh: false`.
pub fn webserver_start(
    session: &Session,
    config: &DeployConfig,
    layout: &RemoteLayout,
) -> Result<Launch> {
    let previous = read_pid(session, layout).ok();
    session.run(&server_command(config, layout))?;

    let attempts = config.server.pid_poll_attempts.max(1);
    let interval = Duration::from_millis(config.server.pid_poll_interval_ms);
    let mut unchanged = None;
    let mut last_err = None;
    for attempt in 0..attempts {
        if attempt > 0 {
            thread::sleep(interval);
        }
        match read_pid(session, layout) {
            Ok(pid) if Some(pid) != previous => {
                log_status!("server", "gunicorn running with PID {}", pid);
                return Ok(Launch { pid, fresh: true });
            }
            Ok(pid) => unchanged = Some(pid),
            Err(err) => last_err = Some(err),
        }
    }

    if let Some(pid) = unchanged {
        log_status!(
            "warn",
            "PID file still names {} after launch; gunicorn did not write a new one",
            pid
        );
        return Ok(Launch { pid, fresh: false });
    }
    Err(last_err.unwrap_or_else(|| Error::internal_unexpected("PID file was never read")))
}

pub fn webserver_stop(session: &Session, layout: &RemoteLayout) -> Result<u32> {
    let pid = read_pid(session, layout)?;
    session.run(&RemoteCommand::new("kill").arg(pid.to_string()))?;
    log_status!("server", "Sent TERM to {}", pid);
    Ok(pid)
}

pub fn webserver_restart(
    session: &Session,
    config: &DeployConfig,
    layout: &RemoteLayout,
) -> Result<RestartReport> {
    let signaled = match read_pid(session, layout) {
        Ok(pid) => {
            let hup = RemoteCommand::new("kill").args(["-HUP".to_string(), pid.to_string()]);
            session.run_tolerant(&hup).success.then_some(pid)
        }
        Err(err) => {
            log_status!("warn", "No reload signal sent: {}", err);
            None
        }
    };

    let launch = webserver_start(session, config, layout)?;
    Ok(RestartReport {
        signaled,
        pid: launch.pid,
        fresh: launch.fresh,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum LocalStart {
    AlreadyRunning { pid: u32 },
    Started,
}

/// Start the server on this machine unless the PID file names a live gunicorn
/// owned by the target user.
pub fn local_webserver_start(
    config: &DeployConfig,
    layout: &RemoteLayout,
    local: &dyn Transport,
    table: &dyn ProcessTable,
) -> Result<LocalStart> {
    let pid_file = Path::new(&layout.pid_file);
    if let Some(pid) = process::running_server(pid_file, &config.target.user, table) {
        log_status!("server", "Local gunicorn already running with PID {}", pid);
        return Ok(LocalStart::AlreadyRunning { pid });
    }

    Session::new(local).run(&server_command(config, layout))?;
    Ok(LocalStart::Started)
}
