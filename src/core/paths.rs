//! Remote filesystem layout derived from the deploy target.

use serde::Serialize;

use crate::config::DeployConfig;

/// Join remote (POSIX) path segments.
pub fn join(base: &str, segment: &str) -> String {
    let segment = segment.trim_start_matches('/');
    if base.is_empty() {
        return segment.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, segment)
    } else {
        format!("{}/{}", base, segment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLayout {
    pub app_root: String,
    pub src_dir: String,
    pub venv_dir: String,
    pub checkout_dir: String,
    pub pid_file: String,
    pub error_log: String,
    pub access_log: String,
    pub wsgi_module: String,
    /// `.pth` file that puts the source dir on the venv's import path.
    pub path_config_file: String,
    pub template_dir: String,
}

pub const VENV_SUBDIR: &str = "venv";
pub const CHECKOUT_SUBDIR: &str = "checkouts";

impl RemoteLayout {
    pub fn from_config(config: &DeployConfig) -> Self {
        let target = &config.target;
        let project = &target.project_name;

        let app_root = join(&target.apps_dir, project);
        let src_dir = join(&app_root, project);
        let venv_dir = join(&app_root, VENV_SUBDIR);
        let site_packages = format!("lib/{}/site-packages", config.python.bin);

        Self {
            checkout_dir: join(&app_root, CHECKOUT_SUBDIR),
            pid_file: join(&app_root, "gunicorn.pid"),
            error_log: join(&target.logs_root, &format!("gunicorn_error_{}.log", project)),
            access_log: join(&target.logs_root, &format!("gunicorn_access_{}.log", project)),
            wsgi_module: format!("{}.wsgi", project),
            path_config_file: join(&join(&venv_dir, &site_packages), "projectsource.pth"),
            template_dir: join(
                &join(&join(&src_dir, &target.app_name), "templates"),
                &target.app_name,
            ),
            app_root,
            src_dir,
            venv_dir,
        }
    }

    pub fn checkout(&self, repo: &str) -> String {
        join(&self.checkout_dir, repo)
    }

    /// Destination of a rendered site template, e.g. `version.html`.
    pub fn template_file(&self, name: &str) -> String {
        join(&self.template_dir, &format!("{}.html", name))
    }

    pub fn venv_bin(&self, program: &str) -> String {
        join(&join(&self.venv_dir, "bin"), program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> DeployConfig {
        crate::config::parse(
            r#"
[target]
user = "deploy"
host = "web1"
apps_dir = "/home/deploy/webapps/"
logs_root = "/home/deploy/logs/user"
project_name = "bgtools"
app_name = "domdiv"

[python]
bin = "python3.11"
"#,
            "deploy.toml",
            Path::new("/work"),
        )
        .unwrap()
    }

    #[test]
    fn join_handles_slashes() {
        assert_eq!(join("/srv", "app"), "/srv/app");
        assert_eq!(join("/srv/", "app"), "/srv/app");
        assert_eq!(join("/srv", "/app"), "/srv/app");
        assert_eq!(join("", "app"), "app");
    }

    #[test]
    fn layout_matches_remote_conventions() {
        let layout = RemoteLayout::from_config(&config());

        assert_eq!(layout.app_root, "/home/deploy/webapps/bgtools");
        assert_eq!(layout.src_dir, "/home/deploy/webapps/bgtools/bgtools");
        assert_eq!(layout.venv_dir, "/home/deploy/webapps/bgtools/venv");
        assert_eq!(layout.checkout_dir, "/home/deploy/webapps/bgtools/checkouts");
        assert_eq!(layout.pid_file, "/home/deploy/webapps/bgtools/gunicorn.pid");
        assert_eq!(
            layout.error_log,
            "/home/deploy/logs/user/gunicorn_error_bgtools.log"
        );
        assert_eq!(
            layout.access_log,
            "/home/deploy/logs/user/gunicorn_access_bgtools.log"
        );
        assert_eq!(layout.wsgi_module, "bgtools.wsgi");
        assert_eq!(
            layout.path_config_file,
            "/home/deploy/webapps/bgtools/venv/lib/python3.11/site-packages/projectsource.pth"
        );
    }

    #[test]
    fn template_and_checkout_paths() {
        let layout = RemoteLayout::from_config(&config());
        assert_eq!(
            layout.template_file("changelog"),
            "/home/deploy/webapps/bgtools/bgtools/domdiv/templates/domdiv/changelog.html"
        );
        assert_eq!(
            layout.checkout("dominiontabs"),
            "/home/deploy/webapps/bgtools/checkouts/dominiontabs"
        );
        assert_eq!(
            layout.venv_bin("gunicorn"),
            "/home/deploy/webapps/bgtools/venv/bin/gunicorn"
        );
    }
}
