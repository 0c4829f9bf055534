//! Configuration management (`config.toml`).
//!
//! Every key has a default so a partial file is fine. A missing file is not:
//! a commented template is written in its place and loading fails so the user
//! can fill in their Steam details and demos folder first.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timeout::TimeoutGuard;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no config file at '{}'; a template was written there. Edit it and launch DemoHelper again",
        .path.display()
    )]
    Missing { path: PathBuf },

    #[error("could not access config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{}' is invalid: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub steam: SteamConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub internals: InternalsConfig,
}

/// Used to look up the display name that goes into the mute breadcrumb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SteamConfig {
    #[serde(default)]
    pub web_api_key: String,
    #[serde(default)]
    pub steam_id64: String,
    /// Skips the web lookup entirely when set.
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Launch the game with `-netconport <port>` for this to be reachable.
    #[serde(default = "default_netcon_host")]
    pub netcon_host: String,
    #[serde(default = "default_netcon_port")]
    pub netcon_port: u16,
    #[serde(default)]
    pub demos_folder: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Turns on `voice_loopback` so your own voice ends up in the demo.
    #[serde(default = "default_true")]
    pub record_my_voice_in_demos: bool,
    /// Sets your own `voice_player_volume` to 0 so you don't hear yourself.
    #[serde(default = "default_true")]
    pub mute_my_voice_while_recording: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Unmute the recorder again when their demo is played back.
    #[serde(default = "default_true")]
    pub playback_voice_player_volume: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default)]
    pub explicitly_mark_competitive_demos: bool,
    /// `de_dust2` becomes `dust2`.
    #[serde(default = "default_true")]
    pub attempt_hide_map_prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalsConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_console_output_wait")]
    pub console_output_wait_secs: u64,
    #[serde(default = "default_user_input_wait")]
    pub user_input_wait_secs: u64,
    #[serde(default = "default_port_wait")]
    pub port_wait_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_netcon_host() -> String {
    "127.0.0.1".to_string()
}
fn default_netcon_port() -> u16 {
    2121
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_console_output_wait() -> u64 {
    2
}
fn default_user_input_wait() -> u64 {
    30
}
fn default_port_wait() -> u64 {
    90
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            netcon_host: default_netcon_host(),
            netcon_port: default_netcon_port(),
            demos_folder: PathBuf::new(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            record_my_voice_in_demos: default_true(),
            mute_my_voice_while_recording: default_true(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            playback_voice_player_volume: default_true(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            explicitly_mark_competitive_demos: false,
            attempt_hide_map_prefix: default_true(),
        }
    }
}

impl Default for InternalsConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            console_output_wait_secs: default_console_output_wait(),
            user_input_wait_secs: default_user_input_wait(),
            port_wait_secs: default_port_wait(),
        }
    }
}

impl InternalsConfig {
    pub fn timeouts(&self) -> TimeoutGuard {
        TimeoutGuard::new(
            Duration::from_secs(self.console_output_wait_secs),
            Duration::from_secs(self.user_input_wait_secs),
        )
    }

    pub fn port_wait(&self) -> Duration {
        Duration::from_secs(self.port_wait_secs)
    }
}

impl GameConfig {
    pub fn netcon_addr(&self) -> String {
        format!("{}:{}", self.netcon_host, self.netcon_port)
    }
}

/// Written out when no config file exists yet.
pub const TEMPLATE: &str = r#"# DemoHelper configuration

[steam]
# Create one at https://steamcommunity.com/dev/apikey
web_api_key = ""
# Your 64-bit Steam ID (17 digits)
steam_id64 = ""
# Uncomment to skip the Steam lookup and use this name instead
# display_name = "The Lovely Potato"

[game]
# Must match -netconport in the game's launch options
netcon_host = "127.0.0.1"
netcon_port = 2121
# e.g. C:\Program Files (x86)\Steam\steamapps\common\Counter-Strike Global Offensive\csgo
demos_folder = ""

[recording]
record_my_voice_in_demos = true
mute_my_voice_while_recording = true

[playback]
playback_voice_player_volume = true

[naming]
explicitly_mark_competitive_demos = false
attempt_hide_map_prefix = true

[internals]
log_level = "info"
console_output_wait_secs = 2
user_input_wait_secs = 30
port_wait_secs = 90
"#;

/// Platform config directory, e.g. `~/.config/demohelper` on Linux.
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "DrTomLLC", "demohelper")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

impl Config {
    /// Parse `path`, writing the template there first if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            write_template(path)?;
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

fn write_template(path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }
    std::fs::write(path, TEMPLATE).map_err(io_err)?;
    tracing::info!("Created config file at {}", path.display());
    Ok(())
}
