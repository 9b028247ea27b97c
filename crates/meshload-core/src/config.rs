//! Configuration (meshload.toml + environment)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable selecting the dataset variant
pub const DATASET_SUFFIX_VAR: &str = "DATASET_SUFFIX";

/// Environment variable holding the warehouse project id
pub const PROJECT_NAME_VAR: &str = "PROJECT_NAME";

/// Suffixes that select a non-production dataset
const SUFFIXED_ENVIRONMENTS: &[&str] = &["dev", "pre"];

/// Existence-poll settings for the recreated snapshot table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between existence checks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Checks before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    30
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Warehouse credentials
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Service account key file; Application Default Credentials when unset
    #[serde(default)]
    pub credentials: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one subdirectory per data product
    #[serde(default = "default_products_dir")]
    pub products_dir: PathBuf,

    /// Snapshot table schema template
    #[serde(default = "default_snapshot_schema")]
    pub snapshot_schema: PathBuf,

    /// Dataset name before the environment suffix is applied
    #[serde(default = "default_base_dataset")]
    pub base_dataset: String,

    #[serde(default = "default_snapshot_table")]
    pub snapshot_table: String,

    #[serde(default = "default_history_table")]
    pub history_table: String,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Base for relative paths (directory of the config file)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_products_dir() -> PathBuf {
    PathBuf::from("../../dataproducts")
}

fn default_snapshot_schema() -> PathBuf {
    PathBuf::from("../../iac/bq_schemas_static/data_mesh_contracts/metadata_snapshot.tpl")
}

fn default_base_dataset() -> String {
    "data_mesh_contracts".to_string()
}

fn default_snapshot_table() -> String {
    "metadata_snapshot".to_string()
}

fn default_history_table() -> String {
    "metadata_history".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            products_dir: default_products_dir(),
            snapshot_schema: default_snapshot_schema(),
            base_dataset: default_base_dataset(),
            snapshot_table: default_snapshot_table(),
            history_table: default_history_table(),
            poll: PollConfig::default(),
            warehouse: WarehouseConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Check names that end up in table references
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name_re = Regex::new(r"^[A-Za-z0-9_]{1,1024}$")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        for (key, value) in [
            ("base_dataset", &self.base_dataset),
            ("snapshot_table", &self.snapshot_table),
            ("history_table", &self.history_table),
        ] {
            if !name_re.is_match(value) {
                return Err(ConfigError::Invalid(format!(
                    "{} '{}' must contain only letters, digits and underscores",
                    key, value
                )));
            }
        }

        if self.snapshot_table == self.history_table {
            return Err(ConfigError::Invalid(
                "snapshot_table and history_table must differ".to_string(),
            ));
        }

        if self.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid("poll.max_attempts must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn products_path(&self) -> PathBuf {
        self.resolve(&self.products_dir)
    }

    pub fn snapshot_schema_path(&self) -> PathBuf {
        self.resolve(&self.snapshot_schema)
    }
}

/// Required environment settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub dataset_suffix: String,
    pub project_name: String,
}

impl EnvConfig {
    /// Read `DATASET_SUFFIX` and `PROJECT_NAME` from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through a lookup function; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
        };

        Ok(Self {
            dataset_suffix: require(DATASET_SUFFIX_VAR)?,
            project_name: require(PROJECT_NAME_VAR)?,
        })
    }
}

/// Dataset name for an environment: `dev` and `pre` get a suffix, anything
/// else uses the base name.
pub fn construct_dataset_name(base_name: &str, suffix: &str) -> String {
    if SUFFIXED_ENVIRONMENTS.contains(&suffix) {
        format!("{}_{}", base_name, suffix)
    } else {
        base_name.to_string()
    }
}

/// Fully qualified snapshot and history table names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIds {
    pub project: String,
    pub dataset: String,
    pub snapshot_table: String,
    pub history_table: String,
}

impl TableIds {
    pub fn snapshot_fqn(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.snapshot_table)
    }

    pub fn history_fqn(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.history_table)
    }
}

/// Table ids for a project/dataset pair using the default table names
pub fn construct_table_ids(project: &str, dataset: &str) -> TableIds {
    TableIds {
        project: project.to_string(),
        dataset: dataset.to_string(),
        snapshot_table: default_snapshot_table(),
        history_table: default_history_table(),
    }
}

impl Config {
    /// Table ids for this configuration in the given environment
    pub fn table_ids(&self, env: &EnvConfig) -> TableIds {
        TableIds {
            project: env.project_name.clone(),
            dataset: construct_dataset_name(&self.base_dataset, &env.dataset_suffix),
            snapshot_table: self.snapshot_table.clone(),
            history_table: self.history_table.clone(),
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment value is not set for {0}")]
    MissingEnv(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
