use serde::Serialize;

use webdeploy::process::SystemProcessTable;
use webdeploy::remote::Session;
use webdeploy::server::{self, LocalStart, RestartReport};
use webdeploy::ssh::SshClient;

use super::CmdResult;

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Start,
    Stop,
    Restart,
    LocalStart,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebserverOutput {
    pub command: String,
    pub pid_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<RestartReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalStart>,
}

pub fn run(action: Action, global: &crate::commands::GlobalArgs) -> CmdResult<WebserverOutput> {
    let (config, layout) = global.load()?;

    let mut output = WebserverOutput {
        command: String::new(),
        pid_file: layout.pid_file.clone(),
        pid: None,
        fresh: None,
        restart: None,
        local: None,
    };

    match action {
        Action::Start => {
            let client = SshClient::from_target(&config.target)?;
            let session = Session::new(&client);
            output.command = "webserver.start".to_string();
            let launch = server::webserver_start(&session, &config, &layout)?;
            output.pid = Some(launch.pid);
            output.fresh = Some(launch.fresh);
        }
        Action::Stop => {
            let client = SshClient::from_target(&config.target)?;
            let session = Session::new(&client);
            output.command = "webserver.stop".to_string();
            output.pid = Some(server::webserver_stop(&session, &layout)?);
        }
        Action::Restart => {
            let client = SshClient::from_target(&config.target)?;
            let session = Session::new(&client);
            let report = server::webserver_restart(&session, &config, &layout)?;
            output.command = "webserver.restart".to_string();
            output.pid = Some(report.pid);
            output.fresh = Some(report.fresh);
            output.restart = Some(report);
        }
        Action::LocalStart => {
            let local = SshClient::local(&config.target.user);
            let started =
                server::local_webserver_start(&config, &layout, &local, &SystemProcessTable)?;
            output.command = "webserver.local_start".to_string();
            output.local = Some(started);
        }
    }

    Ok((output, 0))
}
