//! Path resolution for terrapin configuration.
//!
//! # Environment Variables
//!
//! - `TERRAPIN_CONFIG_DIR` - Override the config directory (e.g., `~/dotfiles/terrapin`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `TERRAPIN_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/terrapin` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\terrapin`
//!    - macOS/Linux: `~/.config/terrapin`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "TERRAPIN_CONFIG_DIR";

/// Global defaults file inside the config directory
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Project file inside the workspace directory
pub const PROJECT_FILE: &str = "terrapin.toml";

/// Get the terrapin config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("terrapin");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("terrapin");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("terrapin");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Path of the global defaults file
pub fn global_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(GLOBAL_CONFIG_FILE))
}

/// Path of the project file for a workspace directory
pub fn project_file(dir: &Path) -> PathBuf {
    dir.join(PROJECT_FILE)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
