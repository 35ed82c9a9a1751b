//! Remote directories, virtualenv and Python dependencies.

use crate::config::DeployConfig;
use crate::error::Result;
use crate::paths::{RemoteLayout, VENV_SUBDIR};
use crate::remote::{RemoteCommand, Session};

/// Create `path` unless it exists. Parents are not created.
pub fn ensure_dir(session: &Session, path: &str) -> Result<()> {
    if session.exists(path)? {
        return Ok(());
    }
    session.run(&RemoteCommand::new("mkdir").arg(path))?;
    Ok(())
}

/// Ensure the source dir and the virtualenv exist. Returns whether the venv was created.
pub fn ensure_virtualenv(
    session: &Session,
    config: &DeployConfig,
    layout: &RemoteLayout,
) -> Result<bool> {
    ensure_dir(session, &layout.src_dir)?;
    if session.exists(&layout.venv_dir)? {
        return Ok(false);
    }

    log_status!("venv", "Creating virtualenv with {}", config.python.bin);
    session.run(
        &RemoteCommand::new("virtualenv")
            .arg(format!("--python={}", config.python.bin))
            .arg(VENV_SUBDIR)
            .in_dir(&layout.app_root),
    )?;

    let path_config = format!("{}\n", layout.src_dir);
    session.upload(path_config.as_bytes(), &layout.path_config_file)?;
    Ok(true)
}

/// Upgrade-install the pinned requirements into the virtualenv.
pub fn install_dependencies(
    session: &Session,
    config: &DeployConfig,
    layout: &RemoteLayout,
) -> Result<()> {
    ensure_virtualenv(session, config, layout)?;
    session.run(
        &RemoteCommand::new("pip")
            .args(["install", "-U", "-r", config.python.requirements.as_str()])
            .in_dir(&layout.src_dir)
            .with_venv(&layout.venv_dir),
    )?;
    Ok(())
}
