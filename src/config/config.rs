use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::data_source::SortDirection;
use crate::data::window_cache::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_IN_FLIGHT};
use crate::state::sort_filter::DEFAULT_FILTER_DEBOUNCE_MS;
use crate::ui::viewport::DEFAULT_OVERSCAN;
use crate::utils::app_paths::AppPaths;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridSettings,
    pub display: DisplayConfig,
    pub keybindings: KeybindingConfig,
}

/// Tuning shared by every grid the app mounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Rows requested per data source call
    pub batch_size: usize,

    /// Rows kept resident below the visible window
    pub overscan: usize,

    /// Quiet period before typed filter text triggers a reload
    pub filter_debounce_ms: u64,

    /// Distinct batches allowed in flight at once
    pub max_in_flight_batches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use Unicode glyphs for sort indicators
    pub use_glyphs: bool,

    /// Show row numbers in a leading column
    pub show_row_numbers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    /// Whether to use vim-style keybindings (hjkl, g/G)
    pub vim_mode: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            overscan: DEFAULT_OVERSCAN,
            filter_debounce_ms: DEFAULT_FILTER_DEBOUNCE_MS,
            max_in_flight_batches: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl GridSettings {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("grid.batch_size must be at least 1");
        }
        if self.max_in_flight_batches == 0 {
            bail!("grid.max_in_flight_batches must be at least 1");
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_glyphs: true, // Default to glyphs, can be disabled
            show_row_numbers: false,
        }
    }
}

impl DisplayConfig {
    /// Header suffix for a sorted column
    pub fn sort_indicator(&self, direction: SortDirection) -> &'static str {
        match (self.use_glyphs, direction) {
            (true, SortDirection::Ascending) => " ▲",
            (true, SortDirection::Descending) => " ▼",
            (false, SortDirection::Ascending) => " ^",
            (false, SortDirection::Descending) => " v",
        }
    }
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self { vim_mode: true }
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // Create default config if it doesn't exist
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.grid.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        AppPaths::config_file()
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# paged-grid configuration file
# Location: ~/.config/paged-grid/config.toml (Linux)
#           ~/Library/Application Support/paged-grid/config.toml (macOS)
#           %APPDATA%\paged-grid\config.toml (Windows)

[grid]
# Rows requested from the data source per call
batch_size = 100

# Rows fetched ahead of the visible window while scrolling
overscan = 10

# Milliseconds of typing silence before the filter reloads the grid
filter_debounce_ms = 300

# Upper bound on batches requested concurrently
max_in_flight_batches = 4

[display]
# Use Unicode glyphs for sort indicators (▲/▼)
# Set to false for ASCII-only mode (^/v)
use_glyphs = true

# Show row numbers in a leading column
show_row_numbers = false

[keybindings]
# Use vim-style keybindings (hjkl navigation, g/G for top/bottom)
vim_mode = true
"#
        .to_string()
    }
}
