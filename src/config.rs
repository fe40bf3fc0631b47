//! Layered configuration for Vangraph.
//!
//! Settings come from `.vangraph/vangraph.toml`, then environment variables,
//! then CLI flags, each layer overriding the one before.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! dev = false
//!
//! [database]
//! path = ".vangraph/vangraph.db"
//!
//! [positions]
//! baseline = 1000.0
//! step = 1000.0
//! auto_rebalance = true
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::board::position::{DEFAULT_BASELINE, DEFAULT_STEP, PositionAllocator};
use crate::board::server::ServerConfig;

/// Directory holding the config file and, by default, the database.
pub const VANGRAPH_DIR: &str = ".vangraph";

/// Config file name inside [`VANGRAPH_DIR`].
pub const CONFIG_FILE: &str = "vangraph.toml";

pub const ENV_PORT: &str = "VANGRAPH_PORT";
pub const ENV_DB_PATH: &str = "VANGRAPH_DB_PATH";
pub const ENV_LOG: &str = "VANGRAPH_LOG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen on all interfaces and allow cross-origin requests.
    #[serde(default)]
    pub dev: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite file, relative to the project directory unless absolute.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(VANGRAPH_DIR).join("vangraph.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Fractional position tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsSection {
    #[serde(default = "default_baseline")]
    pub baseline: f64,
    #[serde(default = "default_step")]
    pub step: f64,
    /// Renumber a column when a move finds no room between two cards.
    #[serde(default = "default_auto_rebalance")]
    pub auto_rebalance: bool,
}

fn default_baseline() -> f64 {
    DEFAULT_BASELINE
}

fn default_step() -> f64 {
    DEFAULT_STEP
}

fn default_auto_rebalance() -> bool {
    true
}

impl Default for PositionsSection {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            step: default_step(),
            auto_rebalance: default_auto_rebalance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is unset, e.g. "info" or "vangraph=debug".
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// The complete vangraph.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VangraphToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub positions: PositionsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl VangraphToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse vangraph.toml")
    }

    /// Load `vangraph.toml` from the given directory, or defaults if absent.
    pub fn load_or_default(vangraph_dir: &Path) -> Result<Self> {
        let config_path = vangraph_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize vangraph.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Override file values from `VANGRAPH_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(ENV_PORT) {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid {} '{}'", ENV_PORT, port))?;
        }
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var(ENV_LOG) {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Allocator for the `[positions]` section. Fails on a non-finite
    /// baseline or a step that is not finite and positive.
    pub fn allocator(&self) -> Result<PositionAllocator> {
        PositionAllocator::new(self.positions.baseline, self.positions.step)
            .context("Invalid [positions] section in vangraph.toml")
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.positions.baseline.is_finite() {
            warnings.push(format!(
                "Invalid positions.baseline '{}': must be a finite number",
                self.positions.baseline
            ));
        }
        if !self.positions.step.is_finite() || self.positions.step <= 0.0 {
            warnings.push(format!(
                "Invalid positions.step '{}': must be a positive finite number",
                self.positions.step
            ));
        }
        if self.server.port == 0 {
            warnings.push("server.port is 0: the OS will pick a random port".to_string());
        }
        if self.logging.level.trim().is_empty() {
            warnings.push("logging.level is empty: falling back to 'info'".to_string());
        }

        warnings
    }
}

/// Resolved configuration for one invocation.
///
/// It merges settings from:
/// 1. vangraph.toml file
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct VangraphConfig {
    pub project_dir: PathBuf,
    pub vangraph_dir: PathBuf,
    pub toml: VangraphToml,
    /// CLI override: verbose logging
    pub verbose: bool,
}

impl VangraphConfig {
    /// Load file and environment layers for a project directory.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let vangraph_dir = project_dir.join(VANGRAPH_DIR);
        let mut toml = VangraphToml::load_or_default(&vangraph_dir)?;
        toml.apply_env()?;

        Ok(Self {
            project_dir,
            vangraph_dir,
            toml,
            verbose: false,
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, verbose: bool) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.vangraph_dir.join(CONFIG_FILE)
    }

    /// Database path resolved against the project directory.
    pub fn db_path(&self) -> PathBuf {
        let path = &self.toml.database.path;
        if path.is_absolute() {
            path.clone()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn allocator(&self) -> Result<PositionAllocator> {
        self.toml.allocator()
    }

    /// Server settings before CLI flags are applied.
    pub fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            host: self.toml.server.host.clone(),
            port: self.toml.server.port,
            db_path: self.db_path(),
            in_memory: false,
            dev_mode: self.toml.server.dev,
            allocator: self.allocator()?,
            auto_rebalance: self.toml.positions.auto_rebalance,
        })
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Tests that touch VANGRAPH_* variables must not interleave.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        unsafe {
            std::env::remove_var(ENV_PORT);
            std::env::remove_var(ENV_DB_PATH);
            std::env::remove_var(ENV_LOG);
        }
    }

    #[test]
    fn test_parse_empty() {
        let toml = VangraphToml::parse("").unwrap();
        assert_eq!(toml.server.port, 3141);
        assert_eq!(toml.server.host, "127.0.0.1");
        assert_eq!(toml.positions.baseline, 1000.0);
        assert_eq!(toml.positions.step, 1000.0);
        assert!(toml.positions.auto_rebalance);
        assert_eq!(toml.logging.level, "info");
        assert!(!toml.logging.json);
    }

    #[test]
    fn test_parse_partial_sections() {
        let content = r#"
[server]
port = 8080

[positions]
step = 64.0
auto_rebalance = false
"#;
        let toml = VangraphToml::parse(content).unwrap();
        assert_eq!(toml.server.port, 8080);
        assert_eq!(toml.server.host, "127.0.0.1");
        assert_eq!(toml.positions.step, 64.0);
        assert_eq!(toml.positions.baseline, 1000.0);
        assert!(!toml.positions.auto_rebalance);
        assert_eq!(
            toml.allocator().unwrap(),
            PositionAllocator::new(1000.0, 64.0).unwrap()
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(VangraphToml::parse("[server]\nport = \"nope\"").is_err());
    }

    #[test]
    fn test_validate_defaults_clean() {
        assert!(VangraphToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_bad_step() {
        let mut toml = VangraphToml::default();
        toml.positions.step = 0.0;
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("positions.step"));

        toml.positions.step = f64::INFINITY;
        toml.positions.baseline = f64::NAN;
        assert_eq!(toml.validate().len(), 2);
    }

    #[test]
    fn test_invalid_positions_rejected() {
        for content in [
            "[positions]\nstep = 0.0\n",
            "[positions]\nstep = -1000.0\n",
            "[positions]\nstep = inf\n",
            "[positions]\nbaseline = nan\n",
        ] {
            let toml = VangraphToml::parse(content).unwrap();
            let err = toml.allocator().unwrap_err();
            assert!(
                format!("{:#}", err).contains("[positions]"),
                "{content}: {err:#}"
            );
        }
    }

    #[test]
    fn test_server_config_fails_on_negative_step() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let dir = tempdir().unwrap();
        let vangraph_dir = dir.path().join(VANGRAPH_DIR);
        std::fs::create_dir_all(&vangraph_dir).unwrap();
        std::fs::write(vangraph_dir.join(CONFIG_FILE), "[positions]\nstep = -5.0\n").unwrap();

        // Loading still works so `config validate` can report the problem.
        let config = VangraphConfig::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(config.validate().len(), 1);
        assert!(config.server_config().is_err());
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut toml = VangraphToml::default();
        toml.server.port = 9000;
        toml.logging.json = true;
        toml.save(&path).unwrap();

        let loaded = VangraphToml::load(&path).unwrap();
        assert_eq!(loaded.server.port, 9000);
        assert!(loaded.logging.json);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = VangraphToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.server.port, 3141);
    }

    #[test]
    fn test_env_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let mut toml = VangraphToml::parse("[server]\nport = 8080").unwrap();
        unsafe {
            std::env::set_var(ENV_PORT, "9999");
            std::env::set_var(ENV_DB_PATH, "/tmp/board.db");
            std::env::set_var(ENV_LOG, "debug");
        }
        toml.apply_env().unwrap();
        clear_env();

        assert_eq!(toml.server.port, 9999);
        assert_eq!(toml.database.path, PathBuf::from("/tmp/board.db"));
        assert_eq!(toml.logging.level, "debug");
    }

    #[test]
    fn test_env_invalid_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let mut toml = VangraphToml::default();
        unsafe { std::env::set_var(ENV_PORT, "not-a-port") };
        let result = toml.apply_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_config_paths_and_server_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let dir = tempdir().unwrap();
        let vangraph_dir = dir.path().join(VANGRAPH_DIR);
        std::fs::create_dir_all(&vangraph_dir).unwrap();
        std::fs::write(
            vangraph_dir.join(CONFIG_FILE),
            "[server]\ndev = true\n\n[positions]\nauto_rebalance = false\n",
        )
        .unwrap();

        let config = VangraphConfig::with_cli_args(dir.path().to_path_buf(), true).unwrap();
        assert!(config.verbose);
        assert!(config.config_file().ends_with(".vangraph/vangraph.toml"));
        assert!(config.db_path().ends_with(".vangraph/vangraph.db"));
        assert!(config.db_path().is_absolute());

        let server = config.server_config().unwrap();
        assert!(server.dev_mode);
        assert!(!server.auto_rebalance);
        assert!(!server.in_memory);
    }

    #[test]
    fn test_absolute_db_path_kept() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let dir = tempdir().unwrap();
        let mut config = VangraphConfig::new(dir.path().to_path_buf()).unwrap();
        config.toml.database.path = PathBuf::from("/var/lib/vangraph.db");
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/vangraph.db"));
    }
}
