//! Configuration loading and root folder resolution
//!
//! The root folder holds everything the application writes: the SQLite
//! database file and the uploaded image directory.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no CLI argument is given
pub const ROOT_ENV_VAR: &str = "BOOKSHELF_ROOT";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Locate the configuration file for the platform
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("bookshelf").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/bookshelf/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("bookshelf"))
        .unwrap_or_else(|| PathBuf::from("./bookshelf_data"))
}

/// Path of the SQLite database file under the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("bookshelf.db")
}

/// Path of the uploaded image directory under the root folder
pub fn images_dir(root_folder: &Path) -> PathBuf {
    root_folder.join("images")
}

/// Ensure the root folder and image directory exist
pub fn ensure_directories(root_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(root_folder)?;
    std::fs::create_dir_all(images_dir(root_folder))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_takes_priority() {
        let root = resolve_root_folder(Some("/tmp/bookshelf-cli"));
        assert_eq!(root, PathBuf::from("/tmp/bookshelf-cli"));
    }

    #[test]
    fn derived_paths_live_under_root() {
        let root = PathBuf::from("/data/bookshelf");
        assert_eq!(database_path(&root), root.join("bookshelf.db"));
        assert_eq!(images_dir(&root), root.join("images"));
    }

    #[test]
    fn ensure_directories_creates_images_subdir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("store");
        ensure_directories(&root).unwrap();
        assert!(images_dir(&root).is_dir());
    }
}
