use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "org";
pub const APP_ORG: &str = "fileowl";
pub const APP_NAME: &str = "owl";

pub const ALERT_LOG_FILE: &str = "alert.csv";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn log_dir() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join("logs"))
}

pub fn default_alert_log() -> anyhow::Result<PathBuf> {
    if let Ok(override_path) = std::env::var("OWL_ALERT_LOG") {
        return Ok(PathBuf::from(override_path));
    }
    Ok(log_dir()?.join(ALERT_LOG_FILE))
}
