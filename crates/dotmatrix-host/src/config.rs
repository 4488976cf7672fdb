use dotmatrix_core::hardware::{FRAME_RATE, IoPolicy};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How unmodelled peripherals are handled, as spelled in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IoPolicySetting {
    Strict,
    #[default]
    BestEffort,
}

impl From<IoPolicySetting> for IoPolicy {
    fn from(setting: IoPolicySetting) -> Self {
        match setting {
            IoPolicySetting::Strict => IoPolicy::Strict,
            IoPolicySetting::BestEffort => IoPolicy::BestEffort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HostConfig {
    pub boot_rom: Option<PathBuf>,
    pub io_policy: IoPolicySetting,
    pub frame_rate: f64,
    pub unthrottled: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            boot_rom: None,
            io_policy: IoPolicySetting::default(),
            frame_rate: FRAME_RATE,
            unthrottled: false,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("dotmatrix").join("host.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("dotmatrix")
            .join("host.toml");
    }

    PathBuf::from("host.toml")
}

/// Read the host config, falling back to defaults when the file is missing
/// or malformed.
pub fn load_from_file(path: &Path) -> HostConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return HostConfig::default(),
    };

    match toml::from_str::<HostConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse host config {}: {e}; using defaults",
                path.display()
            );
            HostConfig::default()
        }
    }
}
