use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config_show, deploy};
use webdeploy::config::DEFAULT_CONFIG_FILE;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "webdeploy")]
#[command(version = VERSION)]
#[command(about = "Deploy a Django site and its libraries to a gunicorn host")]
struct Cli {
    /// Path to the deploy config
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync source, install dependencies and libraries, then restart gunicorn
    Deploy(deploy::DeployArgs),
    /// Start gunicorn on the target
    #[command(visible_alias = "webserver_start")]
    WebserverStart,
    /// Stop the gunicorn named by the PID file
    #[command(visible_alias = "webserver_stop")]
    WebserverStop,
    /// Signal gunicorn to reload, then start it
    #[command(visible_alias = "webserver_restart")]
    WebserverRestart,
    /// Start gunicorn on this machine unless it is already running
    #[command(visible_alias = "local_webserver_start")]
    LocalWebserverStart,
    /// Show the resolved config and remote layout
    Config(config_show::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        config_path: cli.config,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(exit_code_to_u8(1));
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
