use clap::Args;

use webdeploy::deploy::{self, DeployReport};
use webdeploy::releases::GithubReleases;
use webdeploy::revision::{RunContext, RunMode, LATEST_TAG};
use webdeploy::ssh::SshClient;

use super::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    /// Run mode: debug tracks library branches, release pins tags
    #[arg(long, default_value = "debug")]
    pub mode: String,

    /// Library tag for release mode ("latest" picks the highest v-tag, "head" tracks the branch)
    #[arg(long, default_value = LATEST_TAG)]
    pub tag: String,
}

pub fn run(args: DeployArgs, global: &crate::commands::GlobalArgs) -> CmdResult<DeployReport> {
    let mode: RunMode = args.mode.parse()?;
    if args.tag.trim().is_empty() {
        return Err(webdeploy::Error::validation_invalid_argument(
            "tag",
            "Tag cannot be empty",
            None,
            None,
        ));
    }
    let ctx = RunContext::new(mode, args.tag);

    let (config, _layout) = global.load()?;
    let client = SshClient::from_target(&config.target)?;
    let feed = GithubReleases::new(&config.releases)?;

    let report = deploy::run(&config, &ctx, &client, &feed)?;
    Ok((report, 0))
}
