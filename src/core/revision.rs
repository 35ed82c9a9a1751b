//! Run context and library version resolution.
//!
//! `debug` runs (or a `head` tag) track the library branch; `release` runs pin
//! a tag, with `latest` meaning the highest `v<semver>` tag in the repository.

use semver::Version;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::library::LibraryDescriptor;
use crate::remote::{RemoteCommand, Session};

pub const LATEST_TAG: &str = "latest";
pub const HEAD_TAG: &str = "head";
pub const RELEASE_TAG_PATTERN: &str = "v*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Debug,
    Release,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Debug => "debug",
            RunMode::Release => "release",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debug" => Ok(RunMode::Debug),
            "release" => Ok(RunMode::Release),
            other => Err(Error::validation_invalid_argument(
                "mode",
                format!("Unknown mode '{}'", other),
                None,
                Some(vec!["debug".to_string(), "release".to_string()]),
            )),
        }
    }
}

/// Immutable parameters of one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunContext {
    pub mode: RunMode,
    pub tag: String,
}

impl RunContext {
    pub fn new(mode: RunMode, tag: impl Into<String>) -> Self {
        Self {
            mode,
            tag: tag.into(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(RunMode::Debug, LATEST_TAG)
    }
}

/// What to check out for a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Branch(String),
    LatestTag,
    Tag(String),
}

pub fn select_revision(ctx: &RunContext, branch: &str) -> Revision {
    if ctx.mode != RunMode::Release || ctx.tag == HEAD_TAG {
        return Revision::Branch(branch.to_string());
    }
    if ctx.tag == LATEST_TAG {
        Revision::LatestTag
    } else {
        Revision::Tag(ctx.tag.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersion {
    pub version: String,
    pub url: String,
}

/// Version of a `v`-prefixed tag; missing minor/patch components read as 0.
pub fn tag_version(tag: &str) -> Option<Version> {
    let raw = tag.strip_prefix('v')?;
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    let (core, rest) = match raw.find(['-', '+']) {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    Version::parse(&format!("{}{}", padded, rest)).ok()
}

/// Highest version among `v*` tags. Tags that are not versions are ignored.
pub fn latest_release_tag<'a, I>(tags: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tags.into_iter()
        .filter_map(|tag| tag_version(tag).map(|v| (v, tag)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag.to_string())
}

/// Check out the revision the run asks for inside `repo_dir` and describe it.
pub fn resolve_version(
    session: &Session,
    ctx: &RunContext,
    lib: &LibraryDescriptor,
    repo_dir: &str,
    web_base: &str,
) -> Result<ResolvedVersion> {
    let git = |args: &[&str]| {
        RemoteCommand::new("git")
            .args(args.iter().copied())
            .in_dir(repo_dir)
    };

    match select_revision(ctx, &lib.branch) {
        Revision::Branch(branch) => {
            session.run(&git(&["checkout", branch.as_str()]))?;
            session.run(&git(&["pull"]))?;
            let version = session.run(&git(&["rev-parse", branch.as_str()]))?;
            if version.is_empty() {
                return Err(Error::git_command_failed(format!(
                    "git rev-parse {} returned nothing in {}",
                    branch, repo_dir
                )));
            }
            let url = format!("{}/commits/{}", lib.web_url(web_base), version);
            Ok(ResolvedVersion { version, url })
        }
        Revision::LatestTag => {
            let listing = session.run(&git(&["tag", "-l", RELEASE_TAG_PATTERN]))?;
            let tag = latest_release_tag(listing.split_whitespace()).ok_or_else(|| {
                Error::git_command_failed(format!(
                    "No release tags matching '{}' in {}",
                    RELEASE_TAG_PATTERN, lib.repo
                ))
                .with_hint("Deploy with --tag head or an explicit tag")
            })?;
            log_status!("version", "Latest release of {} is {}", lib.name, tag);
            checkout_tag(session, lib, repo_dir, web_base, tag)
        }
        Revision::Tag(tag) => checkout_tag(session, lib, repo_dir, web_base, tag),
    }
}

fn checkout_tag(
    session: &Session,
    lib: &LibraryDescriptor,
    repo_dir: &str,
    web_base: &str,
    tag: String,
) -> Result<ResolvedVersion> {
    session.run(
        &RemoteCommand::new("git")
            .args(["checkout", tag.as_str()])
            .in_dir(repo_dir),
    )?;
    let url = format!("{}/releases/tag/{}", lib.web_url(web_base), tag);
    Ok(ResolvedVersion { version: tag, url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_always_tracks_branch() {
        for tag in ["latest", "head", "v1.0.0", ""] {
            let ctx = RunContext::new(RunMode::Debug, tag);
            assert_eq!(
                select_revision(&ctx, "master"),
                Revision::Branch("master".to_string())
            );
        }
    }

    #[test]
    fn release_head_tracks_branch() {
        let ctx = RunContext::new(RunMode::Release, "head");
        assert_eq!(
            select_revision(&ctx, "main"),
            Revision::Branch("main".to_string())
        );
    }

    #[test]
    fn release_latest_and_explicit_tags() {
        let latest = RunContext::new(RunMode::Release, "latest");
        assert_eq!(select_revision(&latest, "main"), Revision::LatestTag);

        let pinned = RunContext::new(RunMode::Release, "v2.3.1");
        assert_eq!(
            select_revision(&pinned, "main"),
            Revision::Tag("v2.3.1".to_string())
        );
    }

    #[test]
    fn latest_release_tag_uses_version_order() {
        let tags = ["v1.0.0", "v1.2.0", "v1.1.0"];
        assert_eq!(latest_release_tag(tags), Some("v1.2.0".to_string()));

        let tags = ["v1.9.0", "v1.10.0", "v1.2.0"];
        assert_eq!(latest_release_tag(tags), Some("v1.10.0".to_string()));
    }

    #[test]
    fn latest_release_tag_pads_short_versions() {
        let tags = ["v2", "v1.5.3", "v2.0.1"];
        assert_eq!(latest_release_tag(tags), Some("v2.0.1".to_string()));
        assert_eq!(tag_version("v1.4"), Some(Version::new(1, 4, 0)));
    }

    #[test]
    fn prerelease_sorts_below_release() {
        let tags = ["v3.0.0-rc1", "v3.0.0", "v2.9.9"];
        assert_eq!(latest_release_tag(tags), Some("v3.0.0".to_string()));
    }

    #[test]
    fn non_version_tags_are_ignored() {
        let tags = ["vnext", "v", "release-1", "v0.1.0"];
        assert_eq!(latest_release_tag(tags), Some("v0.1.0".to_string()));
        assert_eq!(latest_release_tag(["vnext"]), None);
    }

    #[test]
    fn mode_parses_known_values_only() {
        assert_eq!("debug".parse::<RunMode>().unwrap(), RunMode::Debug);
        assert_eq!("release".parse::<RunMode>().unwrap(), RunMode::Release);
        assert!("staging".parse::<RunMode>().is_err());
    }
}
