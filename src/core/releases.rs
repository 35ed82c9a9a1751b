//! Release listings from the GitHub API, normalized for the changelog page.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ReleasesConfig;
use crate::error::{Error, Result};

/// One entry of `GET /repos/{owner}/{repo}/releases`, as returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub html_url: String,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Unset for drafts.
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    pub url: String,
    pub date: NaiveDate,
    pub name: String,
    pub tag: String,
    pub description: String,
}

/// Source of release listings.
pub trait ReleaseFeed {
    fn fetch(&self, owner: &str, repo: &str) -> Result<Vec<Release>>;
}

/// Date part of an ISO-8601 timestamp such as `2021-03-04T05:06:07Z`.
pub fn parse_release_date(timestamp: &str) -> Result<NaiveDate> {
    let day = timestamp.get(..10).unwrap_or(timestamp);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
        Error::internal_json(
            e.to_string(),
            Some(format!("parse release date '{}'", timestamp)),
        )
    })
}

/// Normalize a published release. Unnamed releases take their tag as name.
pub fn normalize(release: Release) -> Result<ChangelogEntry> {
    let published = release.published_at.as_deref().ok_or_else(|| {
        Error::internal_json(
            "release has no publish date",
            Some(format!("release {}", release.tag_name)),
        )
    })?;
    let date = parse_release_date(published)?;

    let name = match release.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => release.tag_name.clone(),
    };

    Ok(ChangelogEntry {
        url: release.html_url,
        date,
        name,
        tag: release.tag_name,
        description: release.body.unwrap_or_default(),
    })
}

/// Changelog in API order (newest first), skipping unpublished drafts.
pub fn changelog(releases: Vec<Release>) -> Result<Vec<ChangelogEntry>> {
    releases
        .into_iter()
        .filter(|r| r.published_at.is_some())
        .map(normalize)
        .collect()
}

pub struct GithubReleases {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GithubReleases {
    pub fn new(config: &ReleasesConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("webdeploy/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::internal_unexpected(format!("HTTP client setup failed: {}", e)))?;

        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn releases_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases?per_page=100",
            self.api_base, owner, repo
        )
    }
}

impl ReleaseFeed for GithubReleases {
    fn fetch(&self, owner: &str, repo: &str) -> Result<Vec<Release>> {
        let url = self.releases_url(owner, repo);
        log_status!("releases", "GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| Error::http_request_failed(&url, None, e.to_string()).with_retryable(true))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::http_request_failed(&url, Some(status.as_u16()), body));
        }

        response.json::<Vec<Release>>().map_err(|e| {
            Error::internal_json(e.to_string(), Some(format!("parse releases from {}", url)))
        })
    }
}
