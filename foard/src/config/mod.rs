//! Configuration system for the Foard client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/foard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    identity: IdentityFileConfig,
    board: BoardFileConfig,
    cache: CacheFileConfig,
}

/// `[identity]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct IdentityFileConfig {
    name: Option<String>,
    lucky_number: Option<u32>,
    wait_timeout_ms: Option<u64>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    invite_ttl_hours: Option<u64>,
    max_task_title_len: Option<usize>,
    txn_retry_limit: Option<u32>,
}

/// `[cache]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct CacheFileConfig {
    default_ttl_secs: Option<u64>,
    user_ttl_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Read-through cache configuration (used by `ReadCache`).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for board and membership reads.
    pub default_ttl: Duration,
    /// Time-to-live for user profile reads (change rarely).
    pub user_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            user_ttl: Duration::from_secs(300),
        }
    }
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Identity --
    /// Display name used to derive the user id.
    pub name: Option<String>,
    /// Lucky number mixed into the user id derivation.
    pub lucky_number: Option<u32>,
    /// How long callers wait for an identity to become available.
    pub identity_wait_timeout: Duration,

    // -- Board --
    /// How long an invite token stays redeemable.
    pub invite_ttl: Duration,
    /// Maximum task title length in characters.
    pub max_task_title_len: usize,
    /// Retry cap for the task creation transaction.
    pub txn_retry_limit: u32,

    // -- Cache --
    /// Read-through cache TTLs.
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: None,
            lucky_number: None,
            identity_wait_timeout: Duration::from_secs(5),
            invite_ttl: Duration::from_secs(72 * 60 * 60),
            max_task_title_len: 256,
            txn_retry_limit: 5,
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/foard/config.toml`) is tried and
    /// silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. This is separated from `load()` to
    /// enable unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            name: cli.name.clone().or_else(|| file.identity.name.clone()),
            lucky_number: cli.lucky_number.or(file.identity.lucky_number),
            identity_wait_timeout: file
                .identity
                .wait_timeout_ms
                .map_or(defaults.identity_wait_timeout, Duration::from_millis),
            invite_ttl: file
                .board
                .invite_ttl_hours
                .map_or(defaults.invite_ttl, |h| Duration::from_secs(h * 60 * 60)),
            max_task_title_len: file
                .board
                .max_task_title_len
                .unwrap_or(defaults.max_task_title_len),
            txn_retry_limit: file
                .board
                .txn_retry_limit
                .unwrap_or(defaults.txn_retry_limit),
            cache: CacheConfig {
                default_ttl: file
                    .cache
                    .default_ttl_secs
                    .map_or(defaults.cache.default_ttl, Duration::from_secs),
                user_ttl: file
                    .cache
                    .user_ttl_secs
                    .map_or(defaults.cache.user_ttl, Duration::from_secs),
            },
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Collaborative task board")]
pub struct CliArgs {
    /// Display name to sign in with.
    #[arg(long, env = "FOARD_NAME")]
    pub name: Option<String>,

    /// Lucky number mixed into the derived user id.
    #[arg(long, env = "FOARD_LUCKY_NUMBER")]
    pub lucky_number: Option<u32>,

    /// Path to config file (default: `~/.config/foard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "FOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/foard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("foard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
