//! Deploy configuration loaded from `deploy.toml`.
//!
//! Only the target identity and remote roots are required; everything else
//! falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::library::LibraryDescriptor;

pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub target: TargetConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub python: PythonConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub releases: ReleasesConfig,

    #[serde(default, rename = "library")]
    pub libraries: Vec<LibraryDescriptor>,
}

/// Who and where to deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub user: String,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,
    /// Directory holding the app root (`<apps_dir>/<project_name>`).
    pub apps_dir: String,
    pub logs_root: String,
    /// Django project package; also the source directory name.
    pub project_name: String,
    /// Django app whose template directory receives rendered templates.
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_app_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// How many times to read the PID file after starting the daemon.
    #[serde(default = "default_pid_poll_attempts")]
    pub pid_poll_attempts: u32,
    #[serde(default = "default_pid_poll_interval_ms")]
    pub pid_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonConfig {
    /// Interpreter used to create the virtualenv, e.g. `python3.11`.
    #[serde(default = "default_python_bin")]
    pub bin: String,
    /// Requirements manifest, relative to the remote source directory.
    #[serde(default = "default_requirements")]
    pub requirements: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Local project directory. Defaults to the directory holding the config file.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Source directory mirrored to the app root. Defaults to `project_name`.
    #[serde(default)]
    pub source: Option<String>,
    /// Destination of the staged settings file, relative to `dir`.
    /// Defaults to `<source>/<project_name>/private_settings.py`.
    #[serde(default)]
    pub private_settings: Option<String>,
    #[serde(default)]
    pub templates: Option<String>,
    #[serde(default)]
    pub extras: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasesConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
    /// Environment variable holding an optional API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_app_port(),
            workers: default_workers(),
            pid_poll_attempts: default_pid_poll_attempts(),
            pid_poll_interval_ms: default_pid_poll_interval_ms(),
        }
    }
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            bin: default_python_bin(),
            requirements: default_requirements(),
        }
    }
}

impl Default for ReleasesConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            web_base: default_web_base(),
            token_env: default_token_env(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_ssh_port() -> u16 {
    22
}

fn default_app_port() -> u16 {
    8000
}

fn default_workers() -> u32 {
    2
}

fn default_pid_poll_attempts() -> u32 {
    10
}

fn default_pid_poll_interval_ms() -> u64 {
    500
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_requirements() -> String {
    "requirements.txt".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_web_base() -> String {
    "https://github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

// =============================================================================
// Resolved accessors
// =============================================================================

impl DeployConfig {
    pub fn local_dir(&self) -> PathBuf {
        self.local.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn source_name(&self) -> &str {
        self.local
            .source
            .as_deref()
            .unwrap_or(&self.target.project_name)
    }

    pub fn local_source_dir(&self) -> PathBuf {
        self.local_dir().join(self.source_name())
    }

    pub fn private_settings_path(&self) -> PathBuf {
        match &self.local.private_settings {
            Some(rel) => self.local_dir().join(rel),
            None => self
                .local_source_dir()
                .join(&self.target.project_name)
                .join("private_settings.py"),
        }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.local_dir()
            .join(self.local.templates.as_deref().unwrap_or("templates"))
    }

    pub fn extras_dir(&self) -> PathBuf {
        self.local_dir()
            .join(self.local.extras.as_deref().unwrap_or("extras"))
    }

    pub fn sync_exclude(&self) -> &[String] {
        &self.sync.exclude
    }

    pub fn library(&self, name: &str) -> Option<&LibraryDescriptor> {
        self.libraries.iter().find(|l| l.name == name)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("target.user", &self.target.user),
            ("target.host", &self.target.host),
            ("target.apps_dir", &self.target.apps_dir),
            ("target.logs_root", &self.target.logs_root),
            ("target.project_name", &self.target.project_name),
            ("target.app_name", &self.target.app_name),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config_missing_key(key, None));
            }
        }

        if self.server.workers == 0 {
            return Err(Error::config_invalid_value(
                "server.workers",
                Some("0".to_string()),
                "At least one worker is required",
            ));
        }

        let mut seen = HashSet::new();
        for lib in &self.libraries {
            lib.validate()?;
            if !seen.insert(lib.name.as_str()) {
                return Err(Error::config_invalid_value(
                    "library.name",
                    Some(lib.name.clone()),
                    "Library names must be unique",
                ));
            }
        }

        Ok(())
    }
}

/// Parse config text. `base_dir` fills in `local.dir` when it is unset or relative.
pub fn parse(content: &str, origin: &str, base_dir: &Path) -> Result<DeployConfig> {
    let mut config: DeployConfig =
        toml::from_str(content).map_err(|e| Error::config_invalid_toml(origin, e))?;

    config.local.dir = Some(match config.local.dir.take() {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => base_dir.join(dir),
        None => base_dir.to_path_buf(),
    });

    config.validate()?;
    Ok(config)
}

pub fn load(path: &Path) -> Result<DeployConfig> {
    let display = path.display().to_string();
    if !path.is_file() {
        return Err(
            Error::local_file_not_found(display, Some("deploy config".to_string()))
                .with_hint(format!(
                    "Create {} or pass --config <path>",
                    DEFAULT_CONFIG_FILE
                )),
        );
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", display))))?;

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    parse(&content, &display, &base_dir)
}
