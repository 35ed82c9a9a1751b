use clap::Args;
use serde::Serialize;

use webdeploy::config::DeployConfig;
use webdeploy::paths::RemoteLayout;

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    /// Include the parsed config alongside the derived layout
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOutput {
    pub command: String,
    pub path: String,
    pub local_dir: String,
    pub private_settings: String,
    pub templates_dir: String,
    pub libraries: Vec<String>,
    pub layout: RemoteLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<DeployConfig>,
}

pub fn run(args: ConfigArgs, global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    let (config, layout) = global.load()?;

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            path: global.config_path.display().to_string(),
            local_dir: config.local_dir().display().to_string(),
            private_settings: config.private_settings_path().display().to_string(),
            templates_dir: config.templates_dir().display().to_string(),
            libraries: config.libraries.iter().map(|l| l.name.clone()).collect(),
            layout,
            config: args.full.then_some(config),
        },
        0,
    ))
}
