//! Centralized path resolution for ankigen
//!
//! All file and directory paths are resolved through this module so behavior
//! stays consistent across platforms.
//!
//! ## Path Strategy
//!
//! Platform-standard application data locations:
//! - **macOS**: `~/Library/Application Support/Ankigen/`
//! - **Windows**: `%LOCALAPPDATA%\Ankigen\`
//! - **Linux**: `$XDG_DATA_HOME/Ankigen/` (fallback `~/.local/share/Ankigen/`)
//!
//! ## Directory Structure
//!
//! ```text
//! Ankigen/
//! ├── data/
//! │   ├── config.json
//! │   └── session.token
//! └── logs/
//!     └── ankigen_*.log
//! ```

use once_cell::sync::Lazy;
use std::fs;
use std::path::PathBuf;

// =============================================================================
// BASE DIRECTORY RESOLUTION
// =============================================================================

/// Lazy-initialized base directory (thread-safe)
static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

/// Resolves the base directory for all ankigen data
fn resolve_base_directory() -> PathBuf {
    const APP_DIR: &str = "Ankigen";

    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(dir) = dirs::data_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(APP_DIR);
    }

    PathBuf::from(APP_DIR)
}

// =============================================================================
// PRIMARY DIRECTORY ACCESSORS
// =============================================================================

/// Returns the base directory for all ankigen data
pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

/// Returns the data directory path
///
/// Contains the config file and the stored session token.
pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

/// Returns the logs directory path
pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

// =============================================================================
// FILE ACCESSORS
// =============================================================================

/// Path of the JSON configuration file
pub fn get_config_file() -> PathBuf {
    get_data_directory().join("config.json")
}

/// Path of the persisted bearer token used as the auth fallback
pub fn get_token_file() -> PathBuf {
    get_data_directory().join("session.token")
}

/// Ensure the data and logs directories exist
pub fn ensure_directories() -> std::io::Result<()> {
    fs::create_dir_all(get_data_directory())?;
    fs::create_dir_all(get_logs_directory())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted_in_base() {
        let base = get_base_directory();
        assert!(get_data_directory().starts_with(&base));
        assert!(get_logs_directory().starts_with(&base));
        assert!(get_config_file().starts_with(get_data_directory()));
        assert!(get_token_file().starts_with(get_data_directory()));
    }
}
