//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.muxgate/config.json`). Every field
//! has a default, so a missing file or an empty `{}` is a valid configuration.
//! The listen address and serial device come from the command line, not from here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::endpoint::DEFAULT_MAX_DATAGRAM_SIZE;
use crate::framemux::{DEFAULT_MAX_FRAME_SIZE, FRAME_OVERHEAD};
use crate::pacing::{DEFAULT_BURST_SIZE, DEFAULT_PAUSE};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// UDP side.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Serial side.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Output pacing towards the device.
    #[serde(default)]
    pub pacing: PacingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Largest datagram forwarded to the device; longer ones are dropped (default 1024).
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialConfig {
    /// Line speed; framing is always 8N1 (default 115200).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Largest accepted frame including type and pad bytes; longer frames are
    /// dropped as corrupt. Must be at least `maxDatagramSize + 2` (default 1026).
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

/// Burst/pause pacing for writes to the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingConfig {
    /// When false, frames are written at full line speed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bytes written per burst (default 8, the device FIFO depth).
    #[serde(default = "default_burst_size")]
    pub burst_size: usize,

    /// Pause between bursts in milliseconds (default 1000).
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

fn default_max_datagram_size() -> usize {
    DEFAULT_MAX_DATAGRAM_SIZE
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

fn default_true() -> bool {
    true
}

fn default_burst_size() -> usize {
    DEFAULT_BURST_SIZE
}

fn default_pause_ms() -> u64 {
    DEFAULT_PAUSE.as_millis() as u64
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: default_max_datagram_size(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            burst_size: default_burst_size(),
            pause_ms: default_pause_ms(),
        }
    }
}

impl PacingConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Config {
    /// Reject values that would make an endpoint unusable.
    pub fn validate(&self) -> Result<()> {
        if self.network.max_datagram_size == 0 {
            anyhow::bail!("network.maxDatagramSize must be greater than 0");
        }
        if self.serial.baud_rate == 0 {
            anyhow::bail!("serial.baudRate must be greater than 0");
        }
        let reply_room = self.network.max_datagram_size + FRAME_OVERHEAD;
        if self.serial.max_frame_size < reply_room {
            anyhow::bail!(
                "serial.maxFrameSize ({}) must be at least network.maxDatagramSize + {} ({})",
                self.serial.max_frame_size,
                FRAME_OVERHEAD,
                reply_room
            );
        }
        if self.pacing.enabled && self.pacing.burst_size == 0 {
            anyhow::bail!("pacing.burstSize must be greater than 0 when pacing is enabled");
        }
        Ok(())
    }
}

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_PATH_ENV: &str = "MUXGATE_CONFIG_PATH";

/// `$MUXGATE_CONFIG_PATH` if set, else `~/.muxgate/config.json`.
pub fn default_config_path() -> PathBuf {
    if let Some(p) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".muxgate").join("config.json"),
        None => PathBuf::from("config.json"),
    }
}

/// Load the config at `path` (or [`default_config_path`]) and return it with
/// the path used. A missing file yields the defaults.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok((Config::default(), path));
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config from {}", path.display()))?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device() {
        let c = Config::default();
        assert_eq!(c.serial.baud_rate, 115_200);
        assert_eq!(c.network.max_datagram_size, 1024);
        assert!(c.pacing.enabled);
        assert_eq!(c.pacing.burst_size, 8);
        assert_eq!(c.pacing.pause(), Duration::from_secs(1));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_object_is_default() {
        let c: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(c.serial.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(c.pacing.pause_ms, 1000);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let c: Config =
            serde_json::from_str(r#"{"pacing":{"pauseMs":250},"serial":{"baudRate":9600}}"#)
                .unwrap();
        assert_eq!(c.pacing.pause(), Duration::from_millis(250));
        assert_eq!(c.pacing.burst_size, 8);
        assert_eq!(c.serial.baud_rate, 9600);
        assert_eq!(c.serial.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
    }

    #[test]
    fn zero_burst_rejected_only_when_pacing() {
        let mut c = Config::default();
        c.pacing.burst_size = 0;
        assert!(c.validate().is_err());
        c.pacing.enabled = false;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn frame_limit_must_fit_full_datagram_reply() {
        let mut c = Config::default();
        assert_eq!(c.serial.max_frame_size, c.network.max_datagram_size + FRAME_OVERHEAD);

        c.serial.max_frame_size = c.network.max_datagram_size;
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("maxFrameSize"));

        c.network.max_datagram_size = 512;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn env_var_names_config_file() {
        let path = std::env::temp_dir().join("muxgate-env-config.json");
        std::fs::write(&path, r#"{"serial":{"baudRate":57600}}"#).unwrap();
        std::env::set_var(CONFIG_PATH_ENV, &path);
        let loaded = load_config(None);
        std::env::remove_var(CONFIG_PATH_ENV);
        let (c, used) = loaded.unwrap();
        assert_eq!(used, path);
        assert_eq!(c.serial.baud_rate, 57600);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("muxgate-test-does-not-exist").join("config.json");
        let (c, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(c.serial.baud_rate, 115_200);
    }
}
