use std::path::PathBuf;

use webdeploy::config::{self, DeployConfig};
use webdeploy::paths::RemoteLayout;

pub type CmdResult<T> = webdeploy::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config_path: PathBuf,
}

impl GlobalArgs {
    /// Load the deploy config named by `--config` and derive the remote layout.
    pub fn load(&self) -> webdeploy::Result<(DeployConfig, RemoteLayout)> {
        let config = config::load(&self.config_path)?;
        let layout = RemoteLayout::from_config(&config);
        Ok((config, layout))
    }
}

pub mod config_show;
pub mod deploy;
pub mod webserver;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (webdeploy::Result<serde_json::Value>, i32) {
    crate::tty::status("webdeploy is working...");

    match command {
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::WebserverStart => {
            dispatch!(webserver::Action::Start, global, webserver)
        }
        crate::Commands::WebserverStop => dispatch!(webserver::Action::Stop, global, webserver),
        crate::Commands::WebserverRestart => {
            dispatch!(webserver::Action::Restart, global, webserver)
        }
        crate::Commands::LocalWebserverStart => {
            dispatch!(webserver::Action::LocalStart, global, webserver)
        }
        crate::Commands::Config(args) => dispatch!(args, global, config_show),
    }
}
