//! Process configuration resolved once at startup.
//!
//! All components receive an immutable [`Settings`] by reference (or
//! `Arc`); nothing reads the environment after startup. Every variable
//! has a documented default except `DRONE_SECRET`, which must be
//! provisioned explicitly -- a missing secret fails fast instead of
//! silently running with a known-insecure value.

use std::path::PathBuf;

use crate::error::BootstrapError;

/// Database driver accepted for Gitea and Drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    Sqlite3,
    Postgres,
    Mysql,
}

impl DbDriver {
    /// Parse from an environment value (`sqlite3`, `postgres`, `mysql`).
    pub fn parse(s: &str) -> Result<Self, BootstrapError> {
        match s {
            "sqlite3" => Ok(Self::Sqlite3),
            "postgres" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            other => Err(BootstrapError::Config(format!(
                "Unknown database driver '{other}'. Must be one of: sqlite3, postgres, mysql"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite3 => "sqlite3",
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    /// Whether this driver needs a host/user/password connection.
    pub fn is_server(&self) -> bool {
        !matches!(self, Self::Sqlite3)
    }
}

/// Database connection parameters for one managed service.
#[derive(Debug, Clone)]
pub struct DbParams {
    pub driver: DbDriver,
    pub host: String,
    pub name: String,
    pub user: String,
    pub password: String,
}

/// Immutable process-wide configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP bind address for the manager itself (default: `0.0.0.0`).
    pub host: String,
    /// HTTP bind port for the manager itself (default: `8080`).
    pub port: u16,
    /// Root data directory; one subdirectory per managed service.
    pub data_dir: PathBuf,
    /// Port Gitea listens on (default: `3000`).
    pub gitea_port: u16,
    /// Public domain Gitea advertises (default: `localhost`).
    pub gitea_domain: String,
    /// Port the Drone server listens on (default: `3001`).
    pub drone_port: u16,
    /// Host the Drone server advertises (default: `localhost`).
    pub drone_host: String,
    /// Shared RPC secret between Gitea, Drone server, and runner.
    /// Required; there is no default.
    pub drone_secret: String,
    /// OAuth2 client credentials Drone uses against Gitea.
    pub gitea_client_id: String,
    pub gitea_client_secret: String,
    /// Gitea database connection parameters.
    pub gitea_db: DbParams,
    /// Drone database connection parameters.
    pub drone_db: DbParams,
    /// Readiness probe deadline per service (default: `30`s).
    pub ready_timeout_secs: u64,
    /// Readiness probe poll interval (default: `500`ms).
    pub ready_interval_ms: u64,
    /// HTTP request timeout for the manager API (default: `30`s).
    pub request_timeout_secs: u64,
    /// Allowed CORS origins, comma-separated in `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
}

impl Settings {
    /// Load configuration from process environment variables.
    ///
    /// | Env Var                | Default              |
    /// |------------------------|----------------------|
    /// | `HOST`                 | `0.0.0.0`            |
    /// | `PORT`                 | `8080`               |
    /// | `DATA_DIR`             | `/tmp/forgeup`       |
    /// | `GITEA_PORT`           | `3000`               |
    /// | `GITEA_DOMAIN`         | `localhost`          |
    /// | `DRONE_PORT`           | `3001`               |
    /// | `DRONE_HOST`           | `localhost`          |
    /// | `DRONE_SECRET`         | (required)           |
    /// | `GITEA_CLIENT_ID`      | `gitea-client-id`    |
    /// | `GITEA_CLIENT_SECRET`  | `gitea-client-secret`|
    /// | `GITEA_DB_TYPE`        | `sqlite3`            |
    /// | `GITEA_DB_HOST`        | (empty)              |
    /// | `GITEA_DB_NAME`        | `gitea`              |
    /// | `GITEA_DB_USER`        | `gitea`              |
    /// | `GITEA_DB_PASS`        | (empty)              |
    /// | `DRONE_DB_TYPE`        | `sqlite3`            |
    /// | `DRONE_DB_HOST`        | (empty)              |
    /// | `DRONE_DB_NAME`        | `drone`              |
    /// | `DRONE_DB_USER`        | `drone`              |
    /// | `DRONE_DB_PASS`        | (empty)              |
    /// | `READY_TIMEOUT_SECS`   | `30`                 |
    /// | `READY_INTERVAL_MS`    | `500`                |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                 |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    pub fn from_env() -> Result<Self, BootstrapError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an injectable lookup function.
    ///
    /// `from_env` delegates here; tests pass a closure over a map so
    /// they never touch process-global environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let drone_secret = lookup("DRONE_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                BootstrapError::Config(
                    "DRONE_SECRET must be set; refusing to run with a default secret".into(),
                )
            })?;

        let gitea_db = Self::db_params(&lookup, "GITEA_DB", "gitea")?;
        let drone_db = Self::db_params(&lookup, "DRONE_DB", "drone")?;

        Ok(Self {
            host: get("HOST", "0.0.0.0"),
            port: parse_u16(&get("PORT", "8080"), "PORT")?,
            data_dir: PathBuf::from(get("DATA_DIR", "/tmp/forgeup")),
            gitea_port: parse_u16(&get("GITEA_PORT", "3000"), "GITEA_PORT")?,
            gitea_domain: get("GITEA_DOMAIN", "localhost"),
            drone_port: parse_u16(&get("DRONE_PORT", "3001"), "DRONE_PORT")?,
            drone_host: get("DRONE_HOST", "localhost"),
            drone_secret,
            gitea_client_id: get("GITEA_CLIENT_ID", "gitea-client-id"),
            gitea_client_secret: get("GITEA_CLIENT_SECRET", "gitea-client-secret"),
            gitea_db,
            drone_db,
            ready_timeout_secs: parse_u64(&get("READY_TIMEOUT_SECS", "30"), "READY_TIMEOUT_SECS")?,
            ready_interval_ms: parse_u64(&get("READY_INTERVAL_MS", "500"), "READY_INTERVAL_MS")?,
            request_timeout_secs: parse_u64(
                &get("REQUEST_TIMEOUT_SECS", "30"),
                "REQUEST_TIMEOUT_SECS",
            )?,
            cors_origins: get("CORS_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    /// Resolve one `<PREFIX>_{TYPE,HOST,NAME,USER,PASS}` variable group.
    fn db_params<F>(lookup: &F, prefix: &str, default_name: &str) -> Result<DbParams, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str, default: &str| {
            lookup(&format!("{prefix}_{suffix}")).unwrap_or_else(|| default.to_string())
        };

        let driver = DbDriver::parse(&get("TYPE", "sqlite3"))?;
        let host = get("HOST", "");

        if driver.is_server() && host.trim().is_empty() {
            return Err(BootstrapError::Config(format!(
                "{prefix}_HOST must be set when {prefix}_TYPE is '{}'",
                driver.as_str()
            )));
        }

        Ok(DbParams {
            driver,
            host,
            name: get("NAME", default_name),
            user: get("USER", default_name),
            password: get("PASS", ""),
        })
    }

    /// Gitea's externally reachable base URL.
    pub fn gitea_url(&self) -> String {
        format!("http://{}:{}", self.gitea_domain, self.gitea_port)
    }

    /// The Drone server's externally reachable base URL.
    pub fn drone_url(&self) -> String {
        format!("http://{}:{}", self.drone_host, self.drone_port)
    }
}

fn parse_u16(value: &str, var: &str) -> Result<u16, BootstrapError> {
    value
        .parse()
        .map_err(|_| BootstrapError::Config(format!("{var} must be a valid port, got '{value}'")))
}

fn parse_u64(value: &str, var: &str) -> Result<u64, BootstrapError> {
    value
        .parse()
        .map_err(|_| BootstrapError::Config(format!("{var} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;
    use crate::error::BootstrapError;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_applied_when_only_secret_is_set() {
        let settings =
            Settings::from_lookup(lookup_from(&[("DRONE_SECRET", "s3cret")])).unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/forgeup"));
        assert_eq!(settings.gitea_port, 3000);
        assert_eq!(settings.drone_port, 3001);
        assert_eq!(settings.gitea_db.driver, DbDriver::Sqlite3);
        assert_eq!(settings.gitea_db.name, "gitea");
        assert_eq!(settings.drone_db.name, "drone");
        assert_eq!(settings.ready_timeout_secs, 30);
        assert_eq!(settings.ready_interval_ms, 500);
    }

    #[test]
    fn missing_secret_fails_fast() {
        let result = Settings::from_lookup(lookup_from(&[]));
        assert_matches!(result, Err(BootstrapError::Config(msg)) if msg.contains("DRONE_SECRET"));
    }

    #[test]
    fn blank_secret_rejected() {
        let result = Settings::from_lookup(lookup_from(&[("DRONE_SECRET", "   ")]));
        assert!(result.is_err());
    }

    #[test]
    fn overrides_take_effect() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DRONE_SECRET", "s3cret"),
            ("PORT", "9090"),
            ("DATA_DIR", "/srv/forge"),
            ("GITEA_DOMAIN", "git.example.org"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 9090);
        assert_eq!(settings.data_dir, PathBuf::from("/srv/forge"));
        assert_eq!(settings.gitea_url(), "http://git.example.org:3000");
    }

    #[test]
    fn invalid_port_rejected() {
        let result = Settings::from_lookup(lookup_from(&[
            ("DRONE_SECRET", "s3cret"),
            ("PORT", "not-a-port"),
        ]));
        assert_matches!(result, Err(BootstrapError::Config(msg)) if msg.contains("PORT"));
    }

    #[test]
    fn server_db_requires_host() {
        let result = Settings::from_lookup(lookup_from(&[
            ("DRONE_SECRET", "s3cret"),
            ("GITEA_DB_TYPE", "postgres"),
        ]));
        assert_matches!(result, Err(BootstrapError::Config(msg)) if msg.contains("GITEA_DB_HOST"));
    }

    #[test]
    fn server_db_with_host_accepted() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DRONE_SECRET", "s3cret"),
            ("GITEA_DB_TYPE", "postgres"),
            ("GITEA_DB_HOST", "db.internal:5432"),
            ("GITEA_DB_PASS", "hunter2"),
        ]))
        .unwrap();

        assert_eq!(settings.gitea_db.driver, DbDriver::Postgres);
        assert_eq!(settings.gitea_db.host, "db.internal:5432");
        assert_eq!(settings.gitea_db.password, "hunter2");
    }

    #[test]
    fn unknown_db_driver_rejected() {
        let result = Settings::from_lookup(lookup_from(&[
            ("DRONE_SECRET", "s3cret"),
            ("DRONE_DB_TYPE", "oracle"),
        ]));
        assert_matches!(result, Err(BootstrapError::Config(msg)) if msg.contains("oracle"));
    }

    #[test]
    fn cors_origins_split_and_trimmed() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DRONE_SECRET", "s3cret"),
            ("CORS_ORIGINS", "http://a.test, http://b.test ,"),
        ]))
        .unwrap();
        assert_eq!(settings.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}
