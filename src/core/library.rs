//! Third-party libraries checked out from GitHub and installed into the venv.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::DeployConfig;
use crate::environment::ensure_dir;
use crate::error::{Error, Result};
use crate::paths::RemoteLayout;
use crate::releases::{self, ChangelogEntry, ReleaseFeed};
use crate::remote::{RemoteCommand, Session, SyncOptions};
use crate::revision::{self, ResolvedVersion, RunContext};
use crate::template::{self, SiteTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDescriptor {
    /// Key for local extras (`<extras>/<name>/...`).
    pub name: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub extras: Vec<AssetCopy>,
}

/// A local file or directory overlaid onto the checkout before install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCopy {
    /// Relative to `<extras>/<library name>/`.
    pub local: String,
    /// Relative to the checkout root.
    pub remote: String,
}

fn default_branch() -> String {
    "master".to_string()
}

impl LibraryDescriptor {
    pub fn web_url(&self, web_base: &str) -> String {
        format!(
            "{}/{}/{}",
            web_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    pub fn clone_url(&self, web_base: &str) -> String {
        format!("{}.git", self.web_url(web_base))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("library.name", &self.name),
            ("library.owner", &self.owner),
            ("library.repo", &self.repo),
            ("library.branch", &self.branch),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_missing_key(key, Some(self.name.clone())));
            }
        }
        if self.repo.contains('/') || self.repo == "." || self.repo == ".." {
            return Err(Error::config_invalid_value(
                "library.repo",
                Some(self.repo.clone()),
                "Repository must be a bare name; put the account in 'owner'",
            ));
        }
        Ok(())
    }
}

/// Outcome of provisioning one library.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryReport {
    pub name: String,
    pub checkout: String,
    pub version: ResolvedVersion,
    pub releases: usize,
    pub rendered: Vec<String>,
}

/// Provision every configured library in declaration order.
pub fn checkout_and_install_libs(
    session: &Session,
    config: &DeployConfig,
    layout: &RemoteLayout,
    ctx: &RunContext,
    feed: &dyn ReleaseFeed,
) -> Result<Vec<LibraryReport>> {
    if config.libraries.is_empty() {
        return Ok(Vec::new());
    }

    ensure_dir(session, &layout.checkout_dir)?;
    config
        .libraries
        .iter()
        .map(|lib| provision(session, config, layout, ctx, feed, lib))
        .collect()
}

fn provision(
    session: &Session,
    config: &DeployConfig,
    layout: &RemoteLayout,
    ctx: &RunContext,
    feed: &dyn ReleaseFeed,
    lib: &LibraryDescriptor,
) -> Result<LibraryReport> {
    let web_base = &config.releases.web_base;
    let repo_dir = layout.checkout(&lib.repo);

    log_status!("library", "Provisioning {} ({}/{})", lib.name, lib.owner, lib.repo);
    if !session.exists(&repo_dir)? {
        session.run(
            &RemoteCommand::new("git")
                .args(["clone", lib.clone_url(web_base).as_str()])
                .in_dir(&layout.checkout_dir),
        )?;
    }
    session.run(
        &RemoteCommand::new("git")
            .args(["fetch", "origin"])
            .in_dir(&repo_dir),
    )?;

    let version = revision::resolve_version(session, ctx, lib, &repo_dir, web_base)?;
    log_status!("library", "{} at {}", lib.name, version.version);

    overlay_extras(session, config, lib, &repo_dir)?;

    session.run(
        &RemoteCommand::new("pip")
            .args(["install", "-U", "."])
            .in_dir(&repo_dir)
            .with_venv(&layout.venv_dir),
    )?;

    let changelog = releases::changelog(feed.fetch(&lib.owner, &lib.repo)?)?;

    let rendered = render_site_templates(session, config, layout, &version, &changelog)?;

    Ok(LibraryReport {
        name: lib.name.clone(),
        checkout: repo_dir,
        version,
        releases: changelog.len(),
        rendered,
    })
}

fn overlay_extras(
    session: &Session,
    config: &DeployConfig,
    lib: &LibraryDescriptor,
    repo_dir: &str,
) -> Result<()> {
    let extras_root = config.extras_dir().join(&lib.name);
    let options = SyncOptions::default();
    for asset in &lib.extras {
        let local = extras_root.join(&asset.local);
        if !local.exists() {
            return Err(Error::local_file_not_found(
                local.display().to_string(),
                Some(format!("extra asset for {}", lib.name)),
            ));
        }
        let remote = crate::paths::join(repo_dir, &asset.remote);
        session.sync_dir(&contents_of(local), &remote, &options)?;
    }
    Ok(())
}

/// rsync copies a directory's contents only when the source ends in `/`.
fn contents_of(local: PathBuf) -> PathBuf {
    if !local.is_dir() || local.as_os_str().to_string_lossy().ends_with('/') {
        return local;
    }
    let mut path = local.into_os_string();
    path.push("/");
    PathBuf::from(path)
}

fn render_site_templates(
    session: &Session,
    config: &DeployConfig,
    layout: &RemoteLayout,
    version: &ResolvedVersion,
    changelog: &[ChangelogEntry],
) -> Result<Vec<String>> {
    let templates_dir = config.templates_dir();
    let mut rendered = Vec::new();
    for site_template in [SiteTemplate::Version, SiteTemplate::Changelog] {
        let body = match site_template {
            SiteTemplate::Version => template::render_version(&templates_dir, version)?,
            SiteTemplate::Changelog => template::render_changelog(&templates_dir, changelog)?,
        };
        let dest = layout.template_file(site_template.name());
        session.upload(body.as_bytes(), &dest)?;
        rendered.push(dest);
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn lib(repo: &str) -> LibraryDescriptor {
        LibraryDescriptor {
            name: "domdiv".to_string(),
            owner: "sumpfork".to_string(),
            repo: repo.to_string(),
            branch: "master".to_string(),
            extras: Vec::new(),
        }
    }

    #[test]
    fn urls_are_built_from_owner_and_repo() {
        let lib = lib("dominiontabs");
        assert_eq!(
            lib.web_url("https://github.com/"),
            "https://github.com/sumpfork/dominiontabs"
        );
        assert_eq!(
            lib.clone_url("https://github.com"),
            "https://github.com/sumpfork/dominiontabs.git"
        );
    }

    #[test]
    fn repo_with_slash_is_rejected() {
        let err = lib("sumpfork/dominiontabs").validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn directory_extras_sync_their_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("fonts")).unwrap();
        std::fs::write(dir.path().join("card.png"), b"png").unwrap();

        let fonts = contents_of(dir.path().join("fonts"));
        assert!(fonts.to_string_lossy().ends_with("fonts/"));

        let already = contents_of(dir.path().join("fonts/"));
        assert!(already.to_string_lossy().ends_with("fonts/"));
        assert!(!already.to_string_lossy().ends_with("//"));

        let file = contents_of(dir.path().join("card.png"));
        assert!(file.to_string_lossy().ends_with("card.png"));
    }

    #[test]
    fn empty_branch_is_rejected() {
        let mut lib = lib("dominiontabs");
        lib.branch = " ".to_string();
        let err = lib.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingKey);
    }
}
