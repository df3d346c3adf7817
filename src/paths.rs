use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Application directory name under platform config/data roots
const APP_DIR: &str = "vidctl";

/// Settings file name
pub const SETTINGS_FILE: &str = "vidctl.json";

/// Default log file name
pub const LOG_FILE: &str = "vidctl.log";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (VIDCTL_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var("VIDCTL_CONFIG_DIR").ok().map(PathBuf::from));

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. VIDCTL_CONFIG_DIR environment variable
/// 3. Local folder IF any vidctl files exist (vidctl.json, vidctl.log)
/// 4. Platform-specific config directory from dirs-next (default)
///
/// Platform paths:
/// - Linux: ~/.config/vidctl/{name}
/// - macOS: ~/Library/Application Support/vidctl/{name}
/// - Windows: %APPDATA%\vidctl\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    config_dir(config).join(name)
}

/// Get path to a data file (logs)
///
/// Same priority as `config_file`, with the platform data directory as the
/// default (Linux: ~/.local/share/vidctl/{name}).
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = config_dir(config);
    let data_dir = data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    // Only create data_dir if it's different from config_dir
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

fn has_local_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform_root: Option<PathBuf>) -> PathBuf {
    // Priority 1: Custom directory from CLI or ENV
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    // Priority 2: Local folder IF vidctl files exist there
    if let Ok(current_dir) = std::env::current_dir()
        && has_local_files(&current_dir)
    {
        return current_dir;
    }

    // Priority 3: Platform-specific directory
    if let Some(dir) = platform_root {
        return dir.join(APP_DIR);
    }

    // Fallback: "." if everything else fails
    PathBuf::from(".")
}

fn config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir())
}

fn data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir())
}
