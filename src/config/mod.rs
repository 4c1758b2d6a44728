//! Configuration management for feedme.
//!
//! Configuration is read from `~/.config/feedme/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod colors;
pub mod keybindings;

pub use colors::ColorConfig;
pub use keybindings::KeybindingConfig;

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub network: NetworkConfig,
    pub colors: ColorConfig,
    pub keybindings: KeybindingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Source opened when `--source` is not given.
    pub default_source: String,
    /// Stories fetched per batch in the story list.
    pub batch_size: usize,
    /// Maximum comment depth; 0 loads the whole tree.
    pub comment_depth: usize,
    pub check_updates: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_source: "hn".to_string(),
            batch_size: 30,
            comment_depth: 0,
            check_updates: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    /// Concurrent item fetches for sources that look items up one by one.
    pub workers: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            workers: 10,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedme/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedme").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!(path = %path.display(), "Wrote default config");
        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# feedme configuration
#
# Colors can be specified as:
# - Named colors: Black, Red, Green, Yellow, Blue, Magenta, Cyan, Gray,
#   DarkGray, LightRed, LightGreen, LightYellow, LightBlue, LightMagenta,
#   LightCyan, White, Reset
# - Hex colors: "#RRGGBB" or "#RGB"
#
# Keybindings can be specified as:
# - Single characters: "a", "A", "?"
# - Special keys: Enter, Tab, BackTab, Backspace, Delete, Home, End,
#   PageUp, PageDown, Up, Down, Left, Right, Esc, Space, F1-F12
# - With modifiers: "Ctrl+c", "Shift+Tab", "Alt+Enter"

[general]
# hn, lobsters, tildes, ~group, r/<subreddit>, devto, ap, bbc, npr, google,
# reuters, guardian, or the URL of any RSS/Atom feed
default_source = "hn"

# Stories loaded per batch while scrolling
batch_size = 30

# Maximum comment depth (0 = unlimited)
comment_depth = 0

# Look for a newer release at most once a day
check_updates = true

[network]
timeout_secs = 15

# Parallel item requests for Hacker News
workers = 10

[colors]
accent = "#FF6600"
header_fg = "Black"
tab_active = "White"
tab_inactive = "#888888"
title = "White"
selected_title = "#FF6600"
domain = "#666666"
meta = "#888888"
comment_text = "#CCCCCC"
status_fg = "#888888"
status_bg = "#333333"
error = "#FF0000"

# Rail colors for comment depths, repeating
depth_palette = ["#FF6600", "#4A9EFF", "#50C878", "#FFD700", "#FF69B4", "#9370DB"]

[keybindings]
quit = ["q", "Ctrl+c"]
move_up = ["k", "Up"]
move_down = ["j", "Down"]
page_up = ["PageUp", "Ctrl+u"]
page_down = ["PageDown", "Ctrl+d"]
top = ["g", "Home"]
bottom = ["G", "End"]
open = ["o", "Enter"]
comments = ["c"]
back = ["Esc", "b"]
next_feed = ["Tab", "l"]
prev_feed = ["BackTab", "Shift+Tab", "h"]
refresh = ["r"]
help = ["?"]
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert_eq!(config.general.default_source, "hn");
        assert_eq!(config.general.batch_size, 30);
        assert_eq!(config.network.workers, 10);
        assert_eq!(config.colors.accent, Color::Rgb(0xFF, 0x66, 0x00));
        assert_eq!(config.colors.depth_palette.len(), 6);
        assert_eq!(config.keybindings.quit, vec!["q", "Ctrl+c"]);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[general]
default_source = "lobsters"
comment_depth = 3

[colors]
accent = "#00FF00"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.general.default_source, "lobsters");
        assert_eq!(config.general.comment_depth, 3);
        assert_eq!(config.general.batch_size, 30);
        assert!(config.general.check_updates);
        assert_eq!(config.colors.accent, Color::Rgb(0, 255, 0));
        assert_eq!(config.colors.error, Color::Rgb(255, 0, 0));
        assert_eq!(config.network.timeout_secs, 15);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.general.default_source, "hn");
        assert_eq!(config.keybindings.comments, vec!["c"]);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedme").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.general.default_source, "hn");
        assert!(path.exists());

        fs::write(&path, "[network]\nworkers = 4\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().network.workers, 4);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general\nbatch_size = ").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
