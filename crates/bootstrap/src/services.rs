//! The managed service catalog: Gitea, Drone server, Drone runner.
//!
//! Builds the three [`ServiceSpec`]s from resolved [`Settings`] and the
//! directory layout. Gitea gets an INI `app.ini`; the Drone pieces are
//! configured through rendered env files applied to their process
//! environment. The Drone server waits for Gitea, the runner waits for
//! the Drone server -- ordering is enforced by readiness probes, not
//! fixed delays.

use std::collections::BTreeMap;

use forgeup_core::config::{DbParams, Settings};
use forgeup_core::layout::DirectoryLayout;
use forgeup_core::spec::{
    ArtifactSpec, ConfigFormat, ConfigSpec, Probe, ServiceSpec, StartCommand,
};

/// Service names as they appear in the status snapshot.
pub const GITEA: &str = "gitea";
pub const DRONE_SERVER: &str = "drone-server";
pub const DRONE_RUNNER: &str = "drone-runner";

/// Directory groups under the data root (the two Drone processes share
/// the `drone` tree, matching the layout the binaries expect).
pub const SERVICE_DIRS: &[&str] = &["gitea", "drone"];

/// Pinned artifact downloads.
const GITEA_DOWNLOAD_URL: &str =
    "https://dl.gitea.io/gitea/1.21.0/gitea-1.21.0-linux-amd64";
const DRONE_SERVER_DOWNLOAD_URL: &str =
    "https://github.com/harness/drone/releases/download/v2.20.0/drone_linux_amd64";
const DRONE_RUNNER_DOWNLOAD_URL: &str =
    "https://github.com/drone-runners/drone-runner-docker/releases/download/v1.8.3/drone_runner_docker_linux_amd64";

/// Gitea `app.ini` template. The `db_section` parameter carries the
/// driver-specific `[database]` block.
const GITEA_APP_INI: &str = r#"[server]
APP_NAME = Forgeup Gitea
RUN_USER = git
RUN_MODE = prod
DOMAIN = {{domain}}
HTTP_PORT = {{http_port}}
ROOT_URL = http://{{domain}}:{{http_port}}/
DISABLE_SSH = false
SSH_DOMAIN = {{domain}}
SSH_PORT = 22
SSH_LISTEN_PORT = 22
LFS_START_SERVER = true
LFS_CONTENT_PATH = {{data_dir}}/lfs
LFS_JWT_SECRET = {{secret}}
OFFLINE_MODE = false

{{db_section}}

[repository]
ROOT = {{data_dir}}/repositories
SCRIPT_TYPE = bash

[repository.upload]
ENABLED = true
TEMP_PATH = {{data_dir}}/uploads
MAX_SIZE = 10485760
ALLOWED_TYPES = *

[security]
INSTALL_LOCK = true
SECRET_KEY = {{secret}}
LOGIN_REMEMBER_DAYS = 7
REVERSE_PROXY_LIMIT = 1
REVERSE_PROXY_TRUSTED = *

[service]
DISABLE_REGISTRATION = false
REQUIRE_SIGNIN_VIEW = false
ENABLE_NOTIFY_MAIL = false
ENABLE_CAPTCHA = false
DEFAULT_KEEP_EMAIL_PRIVATE = false
DEFAULT_ALLOW_CREATE_ORGANIZATION = true
DEFAULT_ENABLE_TIMETRACKING = true
NO_REPLY_ADDRESS = noreply.example.org

[mailer]
ENABLED = false

[openid]
ENABLE_OPENID_SIGNIN = true
ENABLE_OPENID_SIGNUP = true

[oauth2]
ENABLE = true
JWT_SECRET = {{secret}}

[webhook]
ENABLED = true
SKIP_TLS_VERIFY = true
ALLOWED_HOST_LIST = *

[metrics]
ENABLED = true
"#;

/// Drone server env-file template.
const DRONE_SERVER_ENV: &str = r#"# Drone server configuration (applied to the process environment)
DRONE_GITEA_SERVER={{gitea_url}}
DRONE_GITEA_CLIENT_ID={{client_id}}
DRONE_GITEA_CLIENT_SECRET={{client_secret}}
DRONE_RPC_SECRET={{secret}}
DRONE_SERVER_HOST={{server_host}}
DRONE_SERVER_PROTO=http
DRONE_SERVER_PORT=:{{server_port}}
DRONE_DATABASE_DRIVER={{db_driver}}
DRONE_DATABASE_DATASOURCE={{db_datasource}}
"#;

/// Drone runner env-file template.
const DRONE_RUNNER_ENV: &str = r#"# Drone runner configuration (applied to the process environment)
DRONE_RPC_HOST={{rpc_host}}:{{rpc_port}}
DRONE_RPC_PROTO=http
DRONE_RPC_SECRET={{secret}}
DRONE_RUNNER_CAPACITY=2
DRONE_RUNNER_NAME=forgeup-runner
"#;

/// Build the full catalog for one bootstrap run.
pub fn service_catalog(settings: &Settings) -> Vec<ServiceSpec> {
    let layout = DirectoryLayout::new(&settings.data_dir);
    vec![
        gitea_spec(settings, &layout),
        drone_server_spec(settings, &layout),
        drone_runner_spec(settings, &layout),
    ]
}

/// Webhook URL an operator should configure in Gitea once Drone is up.
pub fn webhook_url(settings: &Settings) -> String {
    format!("{}/hook", settings.drone_url())
}

fn gitea_spec(settings: &Settings, layout: &DirectoryLayout) -> ServiceSpec {
    let install_path = layout.service_dir("gitea").join("gitea");
    let config_dest = layout.config_dir("gitea").join("app.ini");
    let data_dir = layout.data_dir("gitea");

    let mut params = BTreeMap::new();
    params.insert("domain".into(), settings.gitea_domain.clone());
    params.insert("http_port".into(), settings.gitea_port.to_string());
    params.insert("data_dir".into(), data_dir.display().to_string());
    params.insert("secret".into(), settings.drone_secret.clone());
    params.insert(
        "db_section".into(),
        gitea_db_section(&settings.gitea_db, &data_dir.display().to_string()),
    );

    ServiceSpec {
        name: GITEA.to_string(),
        artifact: ArtifactSpec {
            url: GITEA_DOWNLOAD_URL.to_string(),
            install_path: install_path.clone(),
        },
        config: Some(ConfigSpec {
            template: GITEA_APP_INI.to_string(),
            params,
            dest: config_dest.clone(),
            format: ConfigFormat::Ini,
        }),
        command: StartCommand::new(install_path)
            .arg("web")
            .arg("--config")
            .arg(config_dest.display().to_string())
            .current_dir(layout.service_dir("gitea")),
        probe: Probe::Tcp {
            host: "127.0.0.1".to_string(),
            port: settings.gitea_port,
        },
        depends_on: None,
    }
}

/// Build the driver-specific `[database]` block spliced into
/// `app.ini`. Values come straight from validated [`DbParams`], so
/// this is plain string assembly rather than another template pass.
fn gitea_db_section(db: &DbParams, data_dir: &str) -> String {
    if db.driver.is_server() {
        format!(
            "[database]\n\
             DB_TYPE = {}\n\
             HOST = {}\n\
             NAME = {}\n\
             USER = {}\n\
             PASSWD = {}\n\
             SSL_MODE = disable\n\
             CHARSET = utf8",
            db.driver.as_str(),
            db.host,
            db.name,
            db.user,
            db.password
        )
    } else {
        format!(
            "[database]\n\
             DB_TYPE = sqlite3\n\
             NAME = {}\n\
             SSL_MODE = disable\n\
             CHARSET = utf8\n\
             PATH = {}/gitea.db",
            db.name, data_dir
        )
    }
}

fn drone_server_spec(settings: &Settings, layout: &DirectoryLayout) -> ServiceSpec {
    let install_path = layout.service_dir("drone").join("drone-server");
    let config_dest = layout.config_dir("drone").join("drone-server.env");

    let mut params = BTreeMap::new();
    params.insert("gitea_url".into(), settings.gitea_url());
    params.insert("client_id".into(), settings.gitea_client_id.clone());
    params.insert("client_secret".into(), settings.gitea_client_secret.clone());
    params.insert("secret".into(), settings.drone_secret.clone());
    params.insert("server_host".into(), settings.drone_host.clone());
    params.insert("server_port".into(), settings.drone_port.to_string());
    params.insert(
        "db_driver".into(),
        settings.drone_db.driver.as_str().to_string(),
    );
    params.insert(
        "db_datasource".into(),
        drone_datasource(&settings.drone_db, layout),
    );

    ServiceSpec {
        name: DRONE_SERVER.to_string(),
        artifact: ArtifactSpec {
            url: DRONE_SERVER_DOWNLOAD_URL.to_string(),
            install_path: install_path.clone(),
        },
        config: Some(ConfigSpec {
            template: DRONE_SERVER_ENV.to_string(),
            params,
            dest: config_dest,
            format: ConfigFormat::EnvFile,
        }),
        command: StartCommand::new(install_path).arg("server"),
        probe: Probe::Tcp {
            host: "127.0.0.1".to_string(),
            port: settings.drone_port,
        },
        depends_on: Some(GITEA.to_string()),
    }
}

/// Drone's database datasource string: a connection URL for server
/// drivers, a file path for sqlite.
fn drone_datasource(db: &DbParams, layout: &DirectoryLayout) -> String {
    if db.driver.is_server() {
        format!(
            "{}://{}:{}@{}/{}?sslmode=disable",
            db.driver.as_str(),
            db.user,
            db.password,
            db.host,
            db.name
        )
    } else {
        layout.data_dir("drone").join("drone.db").display().to_string()
    }
}

fn drone_runner_spec(settings: &Settings, layout: &DirectoryLayout) -> ServiceSpec {
    let install_path = layout.service_dir("drone").join("drone-runner");
    let config_dest = layout.config_dir("drone").join("drone-runner.env");

    let mut params = BTreeMap::new();
    params.insert("rpc_host".into(), settings.drone_host.clone());
    params.insert("rpc_port".into(), settings.drone_port.to_string());
    params.insert("secret".into(), settings.drone_secret.clone());

    ServiceSpec {
        name: DRONE_RUNNER.to_string(),
        artifact: ArtifactSpec {
            url: DRONE_RUNNER_DOWNLOAD_URL.to_string(),
            install_path: install_path.clone(),
        },
        config: Some(ConfigSpec {
            template: DRONE_RUNNER_ENV.to_string(),
            params,
            dest: config_dest,
            format: ConfigFormat::EnvFile,
        }),
        command: StartCommand::new(install_path),
        // The runner exposes no port of its own; launched is running.
        probe: Probe::None,
        depends_on: Some(DRONE_SERVER.to_string()),
    }
}
