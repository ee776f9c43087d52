//! Configuration file handling.
//!
//! The file is TOML and optional: without one the TUI runs against a local snapshot store
//! and seeds it on first start.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;

/// Database used when the `mongodb` section names none.
const DEFAULT_DATABASE: &str = "jezero";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub(crate) struct Config {
    /// Default log filter when neither `RUST_LOG` nor `-v` is given.
    pub log_level: String,
    /// Log file for the TUI. Defaults to `jezero.log` in the data directory.
    pub log_file: Option<PathBuf>,
    /// Load the bundled fixtures into empty collections on start.
    pub seed_on_start: bool,
    /// Document store backend.
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: String::from("info"),
            log_file: None,
            seed_on_start: true,
            store: StoreConfig::default(),
        }
    }
}

/// Document store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub(crate) enum StoreConfig {
    /// Local in-process store, persisted to a JSON snapshot.
    Memory {
        /// Snapshot path. Defaults to `jezero.json` in the data directory.
        #[serde(default)]
        snapshot: Option<PathBuf>,
    },
    /// MongoDB deployment reached through the driver.
    #[serde(rename_all = "kebab-case")]
    Mongodb {
        /// Connection string. Ignored when `uri-env` is set.
        #[serde(default)]
        uri: Option<String>,
        /// Name of an environment variable holding the connection string.
        #[serde(default)]
        uri_env: Option<String>,
        #[serde(default = "default_database")]
        database: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory { snapshot: None }
    }
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_owned()
}

/// Connection string of a `mongodb` store.
///
/// `uri-env` wins over `uri` so credentials can stay out of the file. `lookup` reads the
/// environment.
pub(crate) fn connection_string(
    uri: Option<&str>,
    uri_env: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    match (uri_env, uri) {
        (Some(name), _) => {
            lookup(name).with_context(|| format!("set {name} to the MongoDB connection string"))
        }
        (None, Some(uri)) => Ok(uri.to_owned()),
        (None, None) => bail!("the mongodb store needs `uri` or `uri-env`"),
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "jezero", "jezero")
}

/// Location of the config file when `--config` is not given.
pub(crate) fn default_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Directory for the snapshot and log file.
pub(crate) fn data_dir() -> PathBuf {
    project_dirs().map_or_else(|| PathBuf::from(".jezero"), |dirs| dirs.data_dir().to_path_buf())
}

impl Config {
    /// Snapshot path of the memory store, if that backend is selected.
    pub(crate) fn snapshot_path(&self) -> Option<PathBuf> {
        match &self.store {
            StoreConfig::Memory { snapshot } => Some(
                snapshot
                    .clone()
                    .unwrap_or_else(|| data_dir().join("jezero.json")),
            ),
            StoreConfig::Mongodb { .. } => None,
        }
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| data_dir().join("jezero.log"))
    }
}

/// Parse a TOML config document.
pub(crate) fn parse(text: &str) -> Result<Config> {
    toml::from_str(text).context("invalid configuration")
}

/// Load the config file.
///
/// An explicit path has to exist. Otherwise the default location is used when present and
/// built-in defaults when not.
pub(crate) fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse("").expect("empty config");
        assert_eq!(config, Config::default());
        assert!(config.seed_on_start, "seeding on by default");
        assert!(config.snapshot_path().is_some(), "memory store by default");
    }

    #[test]
    fn mongodb_section() {
        let config = parse(
            r#"
            log-level = "debug"
            seed-on-start = false

            [store]
            kind = "mongodb"
            uri = "mongodb://localhost:27017"
            database = "habitat"
            "#,
        )
        .expect("mongodb config");

        assert_eq!(config.log_level, "debug");
        assert!(!config.seed_on_start, "seeding disabled");
        assert_eq!(
            config.store,
            StoreConfig::Mongodb {
                uri: Some(String::from("mongodb://localhost:27017")),
                uri_env: None,
                database: String::from("habitat"),
            }
        );
        assert_eq!(config.snapshot_path(), None);

        let from_env = parse("[store]\nkind = \"mongodb\"\nuri-env = \"JEZERO_MONGODB_URI\"\n")
            .expect("mongodb config from env");
        assert_eq!(
            from_env.store,
            StoreConfig::Mongodb {
                uri: None,
                uri_env: Some(String::from("JEZERO_MONGODB_URI")),
                database: String::from("jezero"),
            }
        );
    }

    #[test]
    fn connection_string_prefers_the_environment() {
        let env = |name: &str| (name == "MONGO").then(|| String::from("mongodb://env:27017"));

        let resolved = connection_string(Some("mongodb://file:27017"), Some("MONGO"), env)
            .expect("env var set");
        assert_eq!(resolved, "mongodb://env:27017");
        let resolved = connection_string(Some("mongodb://file:27017"), None, env).expect("uri");
        assert_eq!(resolved, "mongodb://file:27017");

        assert!(connection_string(None, Some("UNSET"), env).is_err(), "env var missing");
        assert!(connection_string(None, None, env).is_err(), "nothing configured");
    }

    #[test]
    fn unknown_store_kind_is_rejected() {
        let result = parse("[store]\nkind = \"sqlite\"\n");
        assert!(result.is_err(), "unknown backend");
    }

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[store]\nkind = \"memory\"\nsnapshot = \"/tmp/jezero-test.json\""
        )
        .expect("write config");

        let config = load(Some(file.path())).expect("load config");
        assert_eq!(
            config.snapshot_path(),
            Some(PathBuf::from("/tmp/jezero-test.json"))
        );
    }

    #[test]
    fn missing_explicit_path_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err(), "explicit path must exist");
    }
}
