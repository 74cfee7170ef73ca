//! Filesystem adapters for JurisMind.
//!
//! Resolves the data directory layout (`config.toml`, `profile.toml`,
//! `jurismind.db`) and reads/writes the actor profile.

pub mod profile;

use std::path::{Path, PathBuf};

/// Compute the profile path: `{data_dir}/profile.toml`.
pub fn profile_path(data_dir: &Path) -> PathBuf {
    data_dir.join("profile.toml")
}

/// Compute the config path: `{data_dir}/config.toml`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `JURISMIND_DATA_DIR` environment variable
/// 2. `~/.jurismind`
/// 3. `./.jurismind`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("JURISMIND_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".jurismind");
    }

    // Last resort: current directory
    PathBuf::from(".jurismind")
}
