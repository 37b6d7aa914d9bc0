//! Wrapper for getting default configuration paths.
//!
//! Follows these rules:
//!
//! - XDG base directory (all platforms if environment variable is set)
//! - `.config` in the home directory
//! - Platform-specific well known directory (see [`dirs`])

use std::env;
use std::path::PathBuf;

use camino::Utf8PathBuf;

const XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";

/// Gets the directory holding configuration files. Unlike data directories it
/// is never created; a missing directory simply means no configuration.
#[must_use]
pub fn config_dir() -> Option<Utf8PathBuf> {
    let dir = if let Some(path) = env::var_os(XDG_CONFIG_HOME).filter(|p| !p.is_empty()) {
        PathBuf::from(path)
    } else if let Some(path) = dirs::home_dir() {
        path.join(".config")
    } else {
        dirs::config_dir()?
    };
    Utf8PathBuf::try_from(dir).ok()
}
