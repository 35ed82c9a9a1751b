//! Local settings staging and source mirroring.

use std::fs;
use std::path::PathBuf;

use crate::config::DeployConfig;
use crate::error::{Error, Result};
use crate::paths::RemoteLayout;
use crate::remote::{Session, SyncOptions};
use crate::revision::RunMode;

/// Local settings file for a mode: `settings_<mode>.py` in the project dir.
pub fn settings_file(config: &DeployConfig, mode: RunMode) -> PathBuf {
    config
        .local_dir()
        .join(format!("settings_{}.py", mode.as_str()))
}

/// Copy the mode's settings file over the private settings module.
pub fn copy_settings(config: &DeployConfig, mode: RunMode) -> Result<PathBuf> {
    let source = settings_file(config, mode);
    if !source.is_file() {
        return Err(Error::local_file_not_found(
            source.display().to_string(),
            Some(format!("{} settings", mode.as_str())),
        )
        .with_hint(format!(
            "Create settings_{}.py next to the deploy config",
            mode.as_str()
        )));
    }

    let dest = config.private_settings_path();
    log_status!("settings", "{} -> {}", source.display(), dest.display());
    fs::copy(&source, &dest).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("copy {} to {}", source.display(), dest.display())),
        )
    })?;
    Ok(dest)
}

/// Mirror the local source directory into the remote app root.
pub fn rsync_source(session: &Session, config: &DeployConfig, layout: &RemoteLayout) -> Result<()> {
    let options = SyncOptions {
        delete: true,
        exclude: config.sync_exclude().to_vec(),
    };
    session.sync_dir(&config.local_source_dir(), &layout.app_root, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::path::Path;

    fn config_in(dir: &Path) -> DeployConfig {
        crate::config::parse(
            r#"
[target]
user = "deploy"
host = "web1"
apps_dir = "/srv"
logs_root = "/var/log/web"
project_name = "site"
app_name = "pages"
"#,
            "deploy.toml",
            dir,
        )
        .unwrap()
    }

    #[test]
    fn copy_settings_overwrites_private_settings() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("site/site")).unwrap();
        fs::write(dir.path().join("settings_release.py"), "DEBUG = False\n").unwrap();
        fs::write(dir.path().join("site/site/private_settings.py"), "old").unwrap();

        let config = config_in(dir.path());
        let dest = copy_settings(&config, RunMode::Release).unwrap();

        assert_eq!(fs::read_to_string(dest).unwrap(), "DEBUG = False\n");
    }

    #[test]
    fn copy_settings_missing_mode_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings_release.py"), "").unwrap();

        let config = config_in(dir.path());
        let err = copy_settings(&config, RunMode::Debug).unwrap_err();

        assert_eq!(err.code, ErrorCode::LocalFileNotFound);
        assert!(err.message.contains("settings_debug.py"));
    }
}
