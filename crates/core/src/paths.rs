use std::path::{Path, PathBuf};

const APP_DIR: &str = "vidgrade";

/// Root directory for the draft, history and theme records
pub fn get_root_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Directory holding `config.toml`
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

/// Path of the file backing one store key
pub fn get_record_path(data_dir: &Path, key: &str) -> PathBuf {
    data_dir.join(format!("{key}.json"))
}
