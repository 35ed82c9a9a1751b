//! Site templates rendered locally with tera, then uploaded as plain bytes.
//!
//! Sources live in the local templates dir as `<name>_template.html`.
//! Autoescaping is off: release notes are inserted verbatim.

use serde::Serialize;
use std::error::Error as _;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

use crate::error::{Error, Result};
use crate::releases::ChangelogEntry;
use crate::revision::ResolvedVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteTemplate {
    Version,
    Changelog,
}

impl SiteTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            SiteTemplate::Version => "version",
            SiteTemplate::Changelog => "changelog",
        }
    }

    pub fn source_file(&self, templates_dir: &Path) -> PathBuf {
        templates_dir.join(format!("{}_template.html", self.name()))
    }
}

#[derive(Serialize)]
struct VersionContext<'a> {
    version: &'a str,
    url: &'a str,
}

#[derive(Serialize)]
struct ChangelogContext<'a> {
    changelog: &'a [ChangelogEntry],
}

pub fn render_version(templates_dir: &Path, version: &ResolvedVersion) -> Result<String> {
    render(
        templates_dir,
        SiteTemplate::Version,
        &VersionContext {
            version: &version.version,
            url: &version.url,
        },
    )
}

pub fn render_changelog(templates_dir: &Path, changelog: &[ChangelogEntry]) -> Result<String> {
    render(
        templates_dir,
        SiteTemplate::Changelog,
        &ChangelogContext { changelog },
    )
}

pub fn render<C: Serialize>(templates_dir: &Path, template: SiteTemplate, context: &C) -> Result<String> {
    let source = template.source_file(templates_dir);
    if !source.is_file() {
        return Err(Error::local_file_not_found(
            source.display().to_string(),
            Some(format!("{} template", template.name())),
        ));
    }

    let name = template.name();
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_template_file(&source, Some(name))
        .map_err(|e| Error::template_render_failed(name, describe(&e)))?;

    let context =
        Context::from_serialize(context).map_err(|e| Error::template_render_failed(name, describe(&e)))?;

    tera.render(name, &context)
        .map_err(|e| Error::template_render_failed(name, describe(&e)))
}

/// Tera reports the useful part of a failure in the error's source chain.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
