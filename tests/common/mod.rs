#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use webdeploy::config::{self, DeployConfig};
use webdeploy::error::TargetDetails;
use webdeploy::paths;
use webdeploy::process::{ProcessInfo, ProcessTable};
use webdeploy::releases::{Release, ReleaseFeed};
use webdeploy::remote::{RemoteCommand, SyncOptions, Transport};
use webdeploy::utils::command::CommandOutput;

pub const CONFIG: &str = r#"
[target]
user = "deploy"
host = "web1.example.com"
apps_dir = "/srv"
logs_root = "/var/log/web"
project_name = "site"
app_name = "pages"

[server]
pid_poll_attempts = 2
pid_poll_interval_ms = 0

[sync]
exclude = ["*.pyc"]

[[library]]
name = "domdiv"
owner = "sumpfork"
repo = "dominiontabs"
"#;

/// A local project dir with settings files, the private settings dir and site templates.
pub struct Workspace {
    pub dir: TempDir,
    pub config: DeployConfig,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_config(CONFIG)
    }

    pub fn with_config(content: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("settings_debug.py"), "DEBUG = True\n").unwrap();
        fs::write(root.join("settings_release.py"), "DEBUG = False\n").unwrap();
        fs::create_dir_all(root.join("site").join("site")).unwrap();
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::write(
            root.join("templates").join("version_template.html"),
            "<a href=\"{{ url }}\">{{ version }}</a>",
        )
        .unwrap();
        fs::write(
            root.join("templates").join("changelog_template.html"),
            "{% for entry in changelog %}<li>{{ entry.tag }} {{ entry.date }} {{ entry.name }}</li>{% endfor %}",
        )
        .unwrap();

        let config = config::parse(content, "deploy.toml", root).unwrap();
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn private_settings(&self) -> PathBuf {
        self.config.private_settings_path()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Run(RemoteCommand),
    Upload { path: String, contents: String },
    Sync {
        local: PathBuf,
        remote: String,
        options: SyncOptions,
    },
}

/// In-memory target host. Tracks which paths exist, records every call and
/// answers git and gunicorn commands the way a real host would.
pub struct FakeHost {
    pub existing: RefCell<HashSet<String>>,
    pub files: RefCell<HashMap<String, String>>,
    pub tags: Vec<String>,
    pub events: RefCell<Vec<Event>>,
    /// Commands whose rendered argv starts with one of these fail with exit 1.
    pub failing: RefCell<Vec<String>>,
    /// When false, gunicorn launches leave the PID file untouched.
    pub rewrites_pid_file: Cell<bool>,
    next_pid: RefCell<u32>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            existing: RefCell::new(HashSet::new()),
            files: RefCell::new(HashMap::new()),
            tags: Vec::new(),
            events: RefCell::new(Vec::new()),
            failing: RefCell::new(Vec::new()),
            rewrites_pid_file: Cell::new(true),
            next_pid: RefCell::new(4242),
        }
    }

    pub fn with_tags(tags: &[&str]) -> Self {
        let mut host = Self::new();
        host.tags = tags.iter().map(|t| t.to_string()).collect();
        host
    }

    pub fn fail_on(&self, prefix: &str) {
        self.failing.borrow_mut().push(prefix.to_string());
    }

    pub fn put_file(&self, path: &str, contents: &str) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), contents.to_string());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn commands(&self) -> Vec<RemoteCommand> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Run(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every command as a space-joined argv, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(|c| c.argv().join(" ")).collect()
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Upload { path, contents } => Some((path.clone(), contents.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn upload_to(&self, path: &str) -> Option<String> {
        self.uploads()
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c)
    }

    fn path_exists(&self, path: &str) -> bool {
        self.existing.borrow().contains(path) || self.files.borrow().contains_key(path)
    }

    fn respond(&self, command: &RemoteCommand) -> CommandOutput {
        let argv = command.argv();
        let line = argv.join(" ");
        if self.failing.borrow().iter().any(|p| line.starts_with(p)) {
            return CommandOutput::failed(1, format!("{}: failed", argv[0]));
        }

        let cwd = command.cwd.clone().unwrap_or_default();
        match argv.as_slice() {
            ["test", "-e", path] => {
                if self.path_exists(path) {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(1, "")
                }
            }
            ["mkdir", path] => {
                if self.path_exists(path) {
                    return CommandOutput::failed(1, "mkdir: File exists");
                }
                self.existing.borrow_mut().insert(path.to_string());
                CommandOutput::ok("")
            }
            ["virtualenv", .., dir] => {
                self.existing.borrow_mut().insert(paths::join(&cwd, dir));
                CommandOutput::ok("created virtual environment")
            }
            ["git", "clone", url] => {
                let repo = url
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .trim_end_matches(".git");
                self.existing.borrow_mut().insert(paths::join(&cwd, repo));
                CommandOutput::ok("")
            }
            ["git", "tag", "-l", _] => CommandOutput::ok(format!("{}\n", self.tags.join("\n"))),
            ["git", "rev-parse", _] => CommandOutput::ok("0123abcd\n"),
            ["cat", path] => match self.files.borrow().get(*path) {
                Some(contents) => CommandOutput::ok(contents.clone()),
                None => CommandOutput::failed(1, format!("cat: {}: No such file or directory", path)),
            },
            [program, args @ ..] if program.ends_with("/gunicorn") => {
                if !self.rewrites_pid_file.get() {
                    return CommandOutput::ok("");
                }
                if let Some(idx) = args.iter().position(|a| *a == "--pid") {
                    let pid = {
                        let mut next = self.next_pid.borrow_mut();
                        *next += 1;
                        *next
                    };
                    self.put_file(args[idx + 1], &format!("{}\n", pid));
                }
                CommandOutput::ok("")
            }
            _ => CommandOutput::ok(""),
        }
    }
}

impl Transport for FakeHost {
    fn target(&self) -> TargetDetails {
        TargetDetails {
            user: Some("deploy".to_string()),
            host: Some("web1.example.com".to_string()),
        }
    }

    fn execute(&self, command: &RemoteCommand) -> CommandOutput {
        self.events.borrow_mut().push(Event::Run(command.clone()));
        self.respond(command)
    }

    fn upload(&self, contents: &[u8], remote_path: &str) -> CommandOutput {
        let contents = String::from_utf8_lossy(contents).to_string();
        self.events.borrow_mut().push(Event::Upload {
            path: remote_path.to_string(),
            contents: contents.clone(),
        });
        self.put_file(remote_path, &contents);
        CommandOutput::ok("")
    }

    fn sync_dir(&self, local_path: &Path, remote_path: &str, options: &SyncOptions) -> CommandOutput {
        self.events.borrow_mut().push(Event::Sync {
            local: local_path.to_path_buf(),
            remote: remote_path.to_string(),
            options: options.clone(),
        });
        CommandOutput::ok("")
    }
}

/// Canned release listings keyed by `owner/repo`.
pub struct FakeFeed {
    pub releases: HashMap<String, Vec<Release>>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self {
            releases: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with(mut self, owner_repo: &str, releases: Vec<Release>) -> Self {
        self.releases.insert(owner_repo.to_string(), releases);
        self
    }
}

impl ReleaseFeed for FakeFeed {
    fn fetch(&self, owner: &str, repo: &str) -> webdeploy::Result<Vec<Release>> {
        let key = format!("{}/{}", owner, repo);
        self.calls.borrow_mut().push(key.clone());
        Ok(self.releases.get(&key).cloned().unwrap_or_default())
    }
}

pub fn release(tag: &str, published_at: Option<&str>) -> Release {
    Release {
        html_url: format!("https://github.com/sumpfork/dominiontabs/releases/tag/{}", tag),
        tag_name: tag.to_string(),
        name: Some(format!("Release {}", tag)),
        body: Some(format!("Notes for {}", tag)),
        published_at: published_at.map(str::to_string),
    }
}

/// Process table holding a fixed set of processes.
pub struct FakeTable(pub Vec<ProcessInfo>);

impl ProcessTable for FakeTable {
    fn lookup(&self, pid: u32) -> Option<ProcessInfo> {
        self.0.iter().find(|p| p.pid == pid).cloned()
    }
}

pub fn gunicorn_process(pid: u32, user: &str) -> ProcessInfo {
    ProcessInfo {
        pid,
        cmdline: vec![
            "/srv/site/venv/bin/python".to_string(),
            "/srv/site/venv/bin/gunicorn".to_string(),
            "site.wsgi:application".to_string(),
        ],
        user: Some(user.to_string()),
    }
}
