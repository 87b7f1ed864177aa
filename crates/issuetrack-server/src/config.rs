//! Server configuration.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults (`0.0.0.0:3000`, in-memory storage)
//! 2. An optional YAML file named by `--config`
//! 3. Command line flags and their environment variables
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 8080
//! storage:
//!   backend: jsonl
//!   data_file: data/issues.jsonl
//! log_filter: issuetrack=debug,tower_http=info
//! ```

use crate::error::{Error, Result};
use clap::Parser;
use issuetrack::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Default listen address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default tracing filter, used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "issuetrack=info,issuetrack_server=info,tower_http=info";

/// Backend name for ephemeral in-memory storage
pub const BACKEND_MEMORY: &str = "memory";

/// Backend name for JSONL file storage
pub const BACKEND_JSONL: &str = "jsonl";

/// Command line arguments for `issuetrack-server`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "issuetrack-server", version, about = "Project-scoped issue tracking over HTTP")]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Storage backend
    #[arg(long, value_parser = [BACKEND_MEMORY, BACKEND_JSONL])]
    pub backend: Option<String>,

    /// JSONL data file
    ///
    /// Selects the JSONL backend unless `--backend` says otherwise.
    #[arg(long, env = "ISSUETRACK_DATA_FILE", value_name = "FILE")]
    pub data_file: Option<PathBuf>,

    /// Tracing filter directives (e.g. "issuetrack=debug")
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

/// Configuration file structure for the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Tracing filter directives
    pub log_filter: String,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type ("memory" or "jsonl")
    pub backend: String,

    /// Path to the data file, required by the JSONL backend
    pub data_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage: StorageConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BACKEND_MEMORY.to_string(),
            data_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    ///
    /// Keys missing from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and
    /// `Error::ConfigFile` if it is not valid configuration YAML.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml(&content).map_err(|source| Error::ConfigFile {
            path: path.display().to_string(),
            source,
        })
    }

    fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty file is a valid, all-defaults configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Build the effective configuration from command line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// result is invalid (see [`storage_backend`](Self::storage_backend)).
    pub async fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path).await?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.storage_backend()?;
        Ok(config)
    }

    /// Override settings with the ones given on the command line.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.host.clone_from(host);
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(data_file) = &args.data_file {
            self.storage.data_file = Some(data_file.clone());
            if args.backend.is_none() {
                self.storage.backend = BACKEND_JSONL.to_string();
            }
        }
        if let Some(backend) = &args.backend {
            self.storage.backend.clone_from(backend);
        }
        if let Some(log_filter) = &args.log_filter {
            self.log_filter.clone_from(log_filter);
        }
    }

    /// The storage backend this configuration selects.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown backend, or for the JSONL
    /// backend without a data file.
    pub fn storage_backend(&self) -> Result<StorageBackend> {
        match self.storage.backend.as_str() {
            BACKEND_MEMORY => Ok(StorageBackend::InMemory),
            BACKEND_JSONL => self
                .storage
                .data_file
                .clone()
                .map(StorageBackend::Jsonl)
                .ok_or_else(|| {
                    Error::Config("The jsonl backend requires storage.data_file".to_string())
                }),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{other}'. Valid values: {BACKEND_MEMORY}, {BACKEND_JSONL}"
            ))),
        }
    }

    /// The `host:port` address to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.storage_backend().unwrap(), StorageBackend::InMemory);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[tokio::test]
    async fn test_load_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "port: 8080\nstorage:\n  backend: jsonl\n  data_file: issues.jsonl\n")
            .await
            .unwrap();

        let config = ServerConfig::load(&path).await.unwrap();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.storage_backend().unwrap(),
            StorageBackend::Jsonl(PathBuf::from("issues.jsonl"))
        );
    }

    #[tokio::test]
    async fn test_load_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "").await.unwrap();

        let config = ServerConfig::load(&path).await.unwrap();

        assert_eq!(config, ServerConfig::default());
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "port: [not, a, port]\n").await.unwrap();

        let result = ServerConfig::load(&path).await;

        assert!(matches!(result, Err(Error::ConfigFile { .. })));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = ServerConfig::load(Path::new("/nonexistent/config.yaml")).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_args_override_file_values() {
        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..ServerConfig::default()
        };
        let args = Args {
            port: Some(9090),
            log_filter: Some("issuetrack=debug".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.bind_address(), "127.0.0.1:9090");
        assert_eq!(config.log_filter, "issuetrack=debug");
    }

    #[rstest]
    #[case(None, StorageBackend::Jsonl(PathBuf::from("data.jsonl")))]
    #[case(Some(BACKEND_MEMORY), StorageBackend::InMemory)]
    #[case(Some(BACKEND_JSONL), StorageBackend::Jsonl(PathBuf::from("data.jsonl")))]
    fn test_data_file_selects_backend(#[case] backend: Option<&str>, #[case] expected: StorageBackend) {
        let mut config = ServerConfig::default();
        let args = Args {
            data_file: Some(PathBuf::from("data.jsonl")),
            backend: backend.map(str::to_string),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.storage_backend().unwrap(), expected);
    }

    #[rstest]
    #[case("jsonl", None)]
    #[case("postgres", Some(PathBuf::from("data.jsonl")))]
    fn test_invalid_storage_config(#[case] backend: &str, #[case] data_file: Option<PathBuf>) {
        let config = ServerConfig {
            storage: StorageConfig {
                backend: backend.to_string(),
                data_file,
            },
            ..ServerConfig::default()
        };

        assert!(matches!(config.storage_backend(), Err(Error::Config(_))));
    }

    #[test]
    fn test_args_parse_flags() {
        let args = Args::try_parse_from([
            "issuetrack-server",
            "--config",
            "server.yaml",
            "--backend",
            "memory",
            "--log-filter",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("server.yaml")));
        assert_eq!(args.backend.as_deref(), Some(BACKEND_MEMORY));
        assert_eq!(args.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn test_args_reject_unknown_backend() {
        let result = Args::try_parse_from(["issuetrack-server", "--backend", "postgres"]);
        assert!(result.is_err());
    }
}
