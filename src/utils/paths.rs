use std::path::{Path, PathBuf};

// Default OpenCode storage root: ~/.local/share/opencode/storage
pub fn default_storage_dir() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".local/share/opencode/storage"))
}

// Default per-session message directory inside the storage root
pub fn default_messages_dir() -> Option<PathBuf> {
    default_storage_dir().map(|storage| storage.join("message"))
}

// Default user config file: ~/.config/ocmon/config.toml
pub fn default_user_config() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".config/ocmon/config.toml"))
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return home::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }

    match (path.strip_prefix("~/"), home::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Resolve `path` against `base_dir` unless it is already absolute
pub fn resolve_relative(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
