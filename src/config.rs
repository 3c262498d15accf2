//! Run configuration
//!
//! A JSON document naming the analyzed system, its repository locator and
//! the repository-relative roots of its microservices. The core consumes
//! this only as a list of `(service name, root path)` pairs; cloning and
//! checkout belong to the surrounding tooling.
//!
//! ```json
//! {
//!   "systemName": "train-ticket",
//!   "repositoryUrl": "https://github.com/acme/train-ticket.git",
//!   "baseBranch": "main",
//!   "baseCommit": "f1d2d2f9",
//!   "microservicePaths": ["ts-user-service", "ts-order-service"]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors are fatal: no partial run is attempted, and each
/// kind carries its own process exit code.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("required config field is blank: {0}")]
    BlankField(&'static str),

    #[error("malformed repository locator: {0}")]
    InvalidRepositoryUrl(String),

    #[error("microservice path list is empty")]
    EmptyMicroservicePaths,
}

impl ConfigError {
    /// Distinct exit code per error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::BlankField(_) => 2,
            ConfigError::InvalidRepositoryUrl(_) => 3,
            ConfigError::EmptyMicroservicePaths => 4,
            ConfigError::Io(_) => 5,
            ConfigError::Parse(_) => 6,
        }
    }
}

/// The run configuration supplied at the input boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Name of the analyzed system.
    pub system_name: String,
    /// Remote locator of the source repository.
    pub repository_url: String,
    /// Branch the analysis is rooted at.
    pub base_branch: String,
    /// Starting commit, may be refined by the caller per run.
    #[serde(default)]
    pub base_commit: String,
    /// Repository-relative microservice root paths, in configured order.
    pub microservice_paths: Vec<String>,
}

impl Config {
    /// Validate required fields. Called by [`load_config`]; exposed for
    /// configurations built in memory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system_name.trim().is_empty() {
            return Err(ConfigError::BlankField("systemName"));
        }
        if self.base_branch.trim().is_empty() {
            return Err(ConfigError::BlankField("baseBranch"));
        }
        if self.repository_url.trim().is_empty() {
            return Err(ConfigError::BlankField("repositoryUrl"));
        }
        if !(self.repository_url.starts_with("https://")
            || self.repository_url.starts_with("http://")
            || self.repository_url.starts_with("git@"))
        {
            return Err(ConfigError::InvalidRepositoryUrl(
                self.repository_url.clone(),
            ));
        }
        if self.microservice_paths.is_empty()
            || self.microservice_paths.iter().any(|p| p.trim().is_empty())
        {
            return Err(ConfigError::EmptyMicroservicePaths);
        }
        Ok(())
    }

    /// The `(name, root path)` pairs the core actually consumes. The
    /// service name is the last path segment of its root.
    pub fn services(&self) -> impl Iterator<Item = (String, &str)> {
        self.microservice_paths.iter().map(|p| {
            let root = normalize_root(p);
            (service_name(root).to_string(), root)
        })
    }

    /// The configured service root owning `path`, if any.
    pub fn owning_service(&self, path: &str) -> Option<(String, &str)> {
        self.services()
            .find(|(_, root)| path == *root || path.starts_with(&format!("{root}/")))
    }
}

fn normalize_root(path: &str) -> &str {
    path.trim_start_matches("./").trim_end_matches('/')
}

fn service_name(root: &str) -> &str {
    root.rsplit('/').next().unwrap_or(root)
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            system_name: "train-ticket".into(),
            repository_url: "https://github.com/acme/train-ticket.git".into(),
            base_branch: "main".into(),
            base_commit: "abc123".into(),
            microservice_paths: vec![
                "ts-user-service".into(),
                "services/ts-order-service/".into(),
            ],
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn blank_system_name_is_fatal() {
        let mut config = sample();
        config.system_name = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::BlankField("systemName")));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn malformed_repository_url_is_fatal() {
        let mut config = sample();
        config.repository_url = "ftp://example.com/repo".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepositoryUrl(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn empty_service_paths_is_fatal() {
        let mut config = sample();
        config.microservice_paths.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyMicroservicePaths));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn service_names_come_from_last_path_segment() {
        let config = sample();
        let services: Vec<(String, &str)> = config.services().collect();
        assert_eq!(
            services,
            vec![
                ("ts-user-service".to_string(), "ts-user-service"),
                ("ts-order-service".to_string(), "services/ts-order-service"),
            ]
        );
    }

    #[test]
    fn owning_service_matches_by_prefix() {
        let config = sample();
        let (name, _) = config
            .owning_service("services/ts-order-service/src/Main.java")
            .unwrap();
        assert_eq!(name, "ts-order-service");
        assert!(config.owning_service("other/src/Main.java").is_none());
        // Prefix must stop at a path boundary
        assert!(
            config
                .owning_service("ts-user-service-v2/src/Main.java")
                .is_none()
        );
    }

    #[test]
    fn parses_json_document() {
        let json = r#"{
            "systemName": "acme",
            "repositoryUrl": "git@github.com:acme/repo.git",
            "baseBranch": "main",
            "microservicePaths": ["svc-a"]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.system_name, "acme");
        assert_eq!(config.base_commit, "");
        assert!(config.validate().is_ok());
    }
}
