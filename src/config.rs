use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chart_export::FigureStyle;
use crate::preset::DEFAULT_PRESETS_FILE;
use crate::source::LoadOptions;

const CONFIG_FILE: &str = "config.toml";
const FONT_RANGE: std::ops::RangeInclusive<u32> = 6..=30;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of a file inside the config directory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the commented default config. An existing file is only replaced with `force`.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path(CONFIG_FILE);

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// The user config file, or defaults when there is none.
    pub fn load_user_config(&self) -> Result<AppConfig> {
        let config_path = self.config_path(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Resolve the configured presets file against the config directory.
    pub fn presets_path(&self, config: &PresetsConfig) -> PathBuf {
        let file = Path::new(&config.file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.config_dir.join(file)
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub figure: FigureConfig,
    pub fonts: FontConfig,
    pub presets: PresetsConfig,
    pub loading: LoadingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// Inches
    pub width: f64,
    /// Inches
    pub height: f64,
    pub dpi: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub title: u32,
    pub label: u32,
    pub tick: u32,
    pub legend: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetsConfig {
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// 0 scans the whole file
    pub infer_schema_length: usize,
    pub ignore_errors: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            figure: FigureConfig::default(),
            fonts: FontConfig::default(),
            presets: PresetsConfig::default(),
            loading: LoadingConfig::default(),
        }
    }
}

impl Default for FigureConfig {
    fn default() -> Self {
        let style = FigureStyle::default();
        Self {
            width: style.width,
            height: style.height,
            dpi: style.dpi,
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        let style = FigureStyle::default();
        Self {
            title: style.title_size,
            label: style.label_size,
            tick: style.tick_size,
            legend: style.legend_size,
        }
    }
}

impl Default for PresetsConfig {
    fn default() -> Self {
        Self {
            file: DEFAULT_PRESETS_FILE.to_string(),
        }
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            infer_schema_length: 100,
            ignore_errors: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user) and validate it
    pub fn load(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(manager.load_user_config()?);
        config.validate()?;
        Ok(config)
    }

    /// Merge another config into this one. Values in `other` that differ from
    /// the defaults win.
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }
        self.figure.merge(other.figure);
        self.fonts.merge(other.fonts);
        self.presets.merge(other.presets);
        self.loading.merge(other.loading);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        let figure = &self.figure;
        if !(figure.width > 0.0 && figure.width.is_finite())
            || !(figure.height > 0.0 && figure.height.is_finite())
        {
            return Err(eyre!(
                "Figure size must be positive, got {} x {}",
                figure.width,
                figure.height
            ));
        }
        if figure.dpi == 0 {
            return Err(eyre!("dpi must be greater than 0"));
        }

        for (name, size) in [
            ("title", self.fonts.title),
            ("label", self.fonts.label),
            ("tick", self.fonts.tick),
            ("legend", self.fonts.legend),
        ] {
            if !FONT_RANGE.contains(&size) {
                return Err(eyre!(
                    "Font size '{}' must be between {} and {}, got {}",
                    name,
                    FONT_RANGE.start(),
                    FONT_RANGE.end(),
                    size
                ));
            }
        }

        if self.presets.file.trim().is_empty() {
            return Err(eyre!("presets.file cannot be empty"));
        }

        Ok(())
    }

    /// Figure style from the `[figure]` and `[fonts]` sections, with no overrides.
    pub fn figure_style(&self) -> FigureStyle {
        FigureStyle {
            width: self.figure.width,
            height: self.figure.height,
            dpi: self.figure.dpi,
            title_size: self.fonts.title,
            label_size: self.fonts.label,
            tick_size: self.fonts.tick,
            legend_size: self.fonts.legend,
            ..FigureStyle::default()
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            infer_schema_length: match self.loading.infer_schema_length {
                0 => None,
                n => Some(n),
            },
            ignore_errors: self.loading.ignore_errors,
            format: None,
        }
    }
}

impl FigureConfig {
    pub fn merge(&mut self, other: Self) {
        let default = FigureConfig::default();
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
        if other.dpi != default.dpi {
            self.dpi = other.dpi;
        }
    }
}

impl FontConfig {
    pub fn merge(&mut self, other: Self) {
        let default = FontConfig::default();
        if other.title != default.title {
            self.title = other.title;
        }
        if other.label != default.label {
            self.label = other.label;
        }
        if other.tick != default.tick {
            self.tick = other.tick;
        }
        if other.legend != default.legend {
            self.legend = other.legend;
        }
    }
}

impl PresetsConfig {
    pub fn merge(&mut self, other: Self) {
        if other.file != PresetsConfig::default().file {
            self.file = other.file;
        }
    }
}

impl LoadingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LoadingConfig::default();
        if other.infer_schema_length != default.infer_schema_length {
            self.infer_schema_length = other.infer_schema_length;
        }
        if other.ignore_errors != default.ignore_errors {
            self.ignore_errors = other.ignore_errors;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed, AppConfig::default());
        parsed.validate().unwrap();
    }

    #[test]
    fn test_merge_keeps_unset_values() {
        let mut config = AppConfig::default();
        let user: AppConfig = toml::from_str("[figure]\ndpi = 200\n[fonts]\ntitle = 20\n").unwrap();
        config.merge(user);
        assert_eq!(config.figure.dpi, 200);
        assert_eq!(config.figure.width, 8.0);
        assert_eq!(config.fonts.title, 20);
        assert_eq!(config.fonts.label, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.version = "0.2".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.figure.width = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.figure.dpi = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fonts.tick = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_options_zero_scans_everything() {
        let mut config = AppConfig::default();
        assert_eq!(config.load_options().infer_schema_length, Some(100));
        config.loading.infer_schema_length = 0;
        assert_eq!(config.load_options().infer_schema_length, None);
    }

    #[test]
    fn test_presets_path_relative_to_config_dir() {
        let manager = ConfigManager::with_dir(PathBuf::from("/tmp/cfg"));
        let config = PresetsConfig::default();
        assert_eq!(
            manager.presets_path(&config),
            PathBuf::from("/tmp/cfg/plot_presets.json")
        );
    }
}
