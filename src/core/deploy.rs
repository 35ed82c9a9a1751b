//! The full deployment workflow.

use serde::Serialize;

use crate::config::DeployConfig;
use crate::environment;
use crate::error::Result;
use crate::library::{self, LibraryReport};
use crate::paths::RemoteLayout;
use crate::releases::ReleaseFeed;
use crate::remote::{Session, Transport};
use crate::revision::{RunContext, RunMode};
use crate::server::{self, RestartReport};
use crate::sync;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub mode: RunMode,
    pub tag: String,
    pub settings: String,
    pub app_root: String,
    pub libraries: Vec<LibraryReport>,
    pub server: RestartReport,
}

/// Run every step in order, stopping at the first failure. Nothing is rolled back.
pub fn run(
    config: &DeployConfig,
    ctx: &RunContext,
    transport: &dyn Transport,
    feed: &dyn ReleaseFeed,
) -> Result<DeployReport> {
    let layout = RemoteLayout::from_config(config);
    let session = Session::new(transport);

    log_status!("deploy", "Deploying {} in {} mode", config.target.project_name, ctx.mode);
    let settings = sync::copy_settings(config, ctx.mode)?;

    log_status!("deploy", "Syncing source to {}", layout.app_root);
    sync::rsync_source(&session, config, &layout)?;

    log_status!("deploy", "Installing dependencies");
    environment::install_dependencies(&session, config, &layout)?;

    let libraries = library::checkout_and_install_libs(&session, config, &layout, ctx, feed)?;

    log_status!("deploy", "Restarting gunicorn");
    let server = server::webserver_restart(&session, config, &layout)?;

    Ok(DeployReport {
        mode: ctx.mode,
        tag: ctx.tag.clone(),
        settings: settings.display().to_string(),
        app_root: layout.app_root,
        libraries,
        server,
    })
}
