use std::path::PathBuf;
use std::sync::OnceLock;

// Cache the paths to avoid repeated environment lookups
static CULICIDAE_HOME: OnceLock<PathBuf> = OnceLock::new();
static CULICIDAE_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static CULICIDAE_STORE_DIR: OnceLock<PathBuf> = OnceLock::new();
static CULICIDAE_IMAGES_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the culicidae home directory
/// Checks CULICIDAE_HOME environment variable, falls back to ${HOME}/.culicidae
pub fn culicidae_home() -> PathBuf {
    CULICIDAE_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("CULICIDAE_HOME") {
                PathBuf::from(path)
            } else {
                let home = std::env::var("HOME").unwrap_or_else(|_| {
                    std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string())
                });
                PathBuf::from(home).join(".culicidae")
            }
        })
        .clone()
}

/// Get the data directory
/// Checks CULICIDAE_DATA_DIR environment variable, falls back to CULICIDAE_HOME
pub fn culicidae_data_dir() -> PathBuf {
    CULICIDAE_DATA_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("CULICIDAE_DATA_DIR") {
                PathBuf::from(path)
            } else {
                culicidae_home()
            }
        })
        .clone()
}

/// Get the table store directory
/// Checks CULICIDAE_STORE_DIR environment variable, falls back to CULICIDAE_DATA_DIR/store
pub fn culicidae_store_dir() -> PathBuf {
    CULICIDAE_STORE_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("CULICIDAE_STORE_DIR") {
                PathBuf::from(path)
            } else {
                culicidae_data_dir().join("store")
            }
        })
        .clone()
}

/// Get the observation image directory
/// Checks CULICIDAE_IMAGES_DIR environment variable, falls back to CULICIDAE_DATA_DIR/images
pub fn culicidae_images_dir() -> PathBuf {
    CULICIDAE_IMAGES_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("CULICIDAE_IMAGES_DIR") {
                PathBuf::from(path)
            } else {
                culicidae_data_dir().join("images")
            }
        })
        .clone()
}

/// Check if running in a custom data directory
pub fn is_custom_data_dir() -> bool {
    std::env::var("CULICIDAE_DATA_DIR").is_ok() || std::env::var("CULICIDAE_HOME").is_ok()
}

/// Get a human-readable description of the current path configuration
pub fn describe_paths() -> String {
    format!(
        "culicidae paths:\n  \
        Home: {}\n  \
        Data: {}\n  \
        Store: {}\n  \
        Images: {}\n  \
        Custom: {}",
        culicidae_home().display(),
        culicidae_data_dir().display(),
        culicidae_store_dir().display(),
        culicidae_images_dir().display(),
        if is_custom_data_dir() {
            "Yes"
        } else {
            "No (using defaults)"
        }
    )
}
