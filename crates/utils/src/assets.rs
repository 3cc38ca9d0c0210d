use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const ASSET_DIR_ENV: &str = "TRACKER_ASSET_DIR";

/// Directory holding the SQLite file and `config.json`.
pub fn asset_dir() -> PathBuf {
    let path = std::env::var(ASSET_DIR_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_asset_dir);

    if !path.exists()
        && let Err(err) = std::fs::create_dir_all(&path)
    {
        tracing::warn!("Failed to create asset directory {}: {}", path.display(), err);
    }

    path
}

fn default_asset_dir() -> PathBuf {
    if cfg!(debug_assertions) {
        return PathBuf::from(PROJECT_ROOT).join("../../dev_assets");
    }
    ProjectDirs::from("dev", "tracker", "issue-tracker")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".issue-tracker"))
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}
