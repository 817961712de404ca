//! Configuration vault – reads/writes `~/.lanesweep/config.toml`.
//!
//! ```toml
//! [navigation]
//! total_lanes = 4
//! left_turn_ids = [20, 30]
//! right_turn_ids = [10, 40]
//!
//! [serial]
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//! simulate = false
//!
//! [runtime]
//! sink_queue_capacity = 32
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use lanesweep_hal::serial::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT};
use lanesweep_nav::NavConfig;
use lanesweep_runtime::control_loop::DEFAULT_SINK_QUEUE_CAPACITY;
use serde::{Deserialize, Serialize};

/// Motor-controller link settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Log commands instead of opening the port.
    pub simulate: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            simulate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Commands buffered between the control loop and the serial writer.
    pub sink_queue_capacity: usize,
    /// Mirror log output into this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            sink_queue_capacity: DEFAULT_SINK_QUEUE_CAPACITY,
            log_file: None,
        }
    }
}

/// Persisted configuration stored in `~/.lanesweep/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub navigation: NavConfig,
    pub serial: SerialSettings,
    pub runtime: RuntimeSettings,
}

/// Return the path to `~/.lanesweep/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".lanesweep").join("config.toml")
}

/// Load the config from a specific path.  Returns `None` if the file does not
/// exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Load `path`, falling back to defaults (with environment overrides) when
/// the file is absent.  The flag reports whether a file was read.
pub fn load_or_default(path: &Path) -> Result<(Config, bool), String> {
    match load_from(path)? {
        Some(cfg) => Ok((cfg, true)),
        None => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            Ok((cfg, false))
        }
    }
}

/// Apply `LANESWEEP_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `LANESWEEP_SERIAL_PORT` | `serial.port` |
/// | `LANESWEEP_SIMULATE` | `serial.simulate` (`1`/`true`/`0`/`false`) |
/// | `LANESWEEP_TOTAL_LANES` | `navigation.total_lanes` |
/// | `LANESWEEP_LOG_FILE` | `runtime.log_file` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("LANESWEEP_SERIAL_PORT") {
        cfg.serial.port = v;
    }
    if let Ok(v) = std::env::var("LANESWEEP_SIMULATE")
        && let Some(simulate) = parse_flag(&v)
    {
        cfg.serial.simulate = simulate;
    }
    if let Ok(v) = std::env::var("LANESWEEP_TOTAL_LANES")
        && let Ok(lanes) = v.parse::<u32>()
    {
        cfg.navigation.total_lanes = lanes;
    }
    if let Ok(v) = std::env::var("LANESWEEP_LOG_FILE") {
        cfg.runtime.log_file = Some(PathBuf::from(v));
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config to a specific path, creating the parent directory.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
