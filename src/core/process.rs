//! Local process-table lookups for the PID-file liveness check.

use serde::Serialize;
use std::fs;
use std::path::Path;
use sysinfo::{Pid, ProcessRefreshKind, System, Users};

/// Substring that identifies the application server in a command line.
pub const SERVER_SIGNATURE: &str = "gunicorn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub cmdline: Vec<String>,
    pub user: Option<String>,
}

pub trait ProcessTable {
    fn lookup(&self, pid: u32) -> Option<ProcessInfo>;
}

/// The real process table of this machine.
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn lookup(&self, pid: u32) -> Option<ProcessInfo> {
        let sys_pid = Pid::from_u32(pid);
        let mut system = System::new();
        if !system.refresh_process_specifics(sys_pid, ProcessRefreshKind::everything()) {
            return None;
        }
        let process = system.process(sys_pid)?;

        let users = Users::new_with_refreshed_list();
        let user = process
            .user_id()
            .and_then(|uid| users.get_user_by_id(uid))
            .map(|u| u.name().to_string());

        Some(ProcessInfo {
            pid,
            cmdline: process.cmd().to_vec(),
            user,
        })
    }
}

/// PID stored in `path`; `None` when the file is absent, unreadable or malformed.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// PID of a live server owned by `user`, according to the PID file.
pub fn running_server(pid_file: &Path, user: &str, table: &dyn ProcessTable) -> Option<u32> {
    let pid = read_pid_file(pid_file)?;
    let info = table.lookup(pid)?;

    let is_server = info.cmdline.iter().any(|arg| arg.contains(SERVER_SIGNATURE));
    let owned = info.user.as_deref() == Some(user);
    (info.pid == pid && is_server && owned).then_some(pid)
}
