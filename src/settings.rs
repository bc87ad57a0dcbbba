use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::stamp::{
    Color, DEFAULT_CACHE_CAPACITY, DEFAULT_COLOR, DEFAULT_TINT_THRESHOLD, ImageCache,
    ResizeFilter, TintEngine,
};
use crate::viewport::{DEFAULT_STAMP_WIDTH, EditLimits, HANDLE_SIZE, MIN_STAMP_SIZE};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "stampink";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Channel value below which a pixel is recolored
    #[serde(default = "default_tint_threshold")]
    pub tint_threshold: u8,

    #[serde(default)]
    pub resize_filter: ResizeFilter,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default)]
    pub default_color: Color,

    #[serde(default = "default_stamp_width")]
    pub default_stamp_width: f64,

    #[serde(default = "default_min_stamp_size")]
    pub min_stamp_size: f64,

    #[serde(default = "default_handle_size")]
    pub handle_size: f64,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_tint_threshold() -> u8 {
    DEFAULT_TINT_THRESHOLD
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_stamp_width() -> f64 {
    DEFAULT_STAMP_WIDTH
}

fn default_min_stamp_size() -> f64 {
    MIN_STAMP_SIZE
}

fn default_handle_size() -> f64 {
    HANDLE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            tint_threshold: DEFAULT_TINT_THRESHOLD,
            resize_filter: ResizeFilter::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            default_color: DEFAULT_COLOR,
            default_stamp_width: DEFAULT_STAMP_WIDTH,
            min_stamp_size: MIN_STAMP_SIZE,
            handle_size: HANDLE_SIZE,
        }
    }
}

impl Settings {
    /// Load from the user config directory, writing defaults on first run
    pub fn load() -> Self {
        let Some(path) = preferred_config_path() else {
            warn!("Could not determine config directory, using default settings");
            return Self::default();
        };

        if path.exists() {
            return Self::load_from_path(&path);
        }

        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Self::default();
        if let Err(e) = settings.save_to_path(&path) {
            error!("Failed to save settings to {path:?}: {e:#}");
        }
        settings
    }

    /// Load from `path`, falling back to defaults when it cannot be read
    pub fn load_from_path(path: &Path) -> Self {
        match Self::read_from_path(path) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");
                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    if let Err(e) = settings.save_to_path(path) {
                        error!("Failed to save migrated settings to {path:?}: {e:#}");
                    }
                }
                settings
            }
            Err(e) => {
                error!("{e:#}");
                Self::default()
            }
        }
    }

    /// Parse `path` strictly, reporting read and parse failures
    pub fn read_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {path:?}"))?;
        serde_yaml::from_str::<Settings>(&content)
            .with_context(|| format!("Failed to parse settings file {path:?}"))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {parent:?}"))?;
            }
        }

        fs::write(path, generate_settings_yaml(self))
            .with_context(|| format!("Failed to write settings to {path:?}"))?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }

    #[must_use]
    pub fn tint_engine(&self) -> TintEngine {
        TintEngine::new(self.tint_threshold)
    }

    /// Fresh image cache configured from these settings
    #[must_use]
    pub fn image_cache(&self) -> ImageCache {
        ImageCache::new(self.cache_capacity, self.tint_engine(), self.resize_filter)
    }

    #[must_use]
    pub fn edit_limits(&self) -> EditLimits {
        EditLimits {
            handle_size: self.handle_size.max(0.0),
            min_stamp_size: self.min_stamp_size.max(0.0),
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // Future migrations go here:
    // if settings.version < 2 {
    //     migrate_v1_to_v2(settings);
    // }

    settings.version = CURRENT_VERSION;
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push('\n');
    content.push_str("# Pixels whose red, green and blue are all below this value (0-255)\n");
    content.push_str("# take the stamp color. Everything else is left untouched.\n");
    content.push_str(&format!("tint_threshold: {}\n", settings.tint_threshold));
    content.push('\n');
    content.push_str("# nearest | bilinear | catmull_rom | lanczos3\n");
    content.push_str(&format!("resize_filter: {}\n", settings.resize_filter.as_str()));
    content.push('\n');
    content.push_str("# Number of scaled/tinted stamp images kept in memory\n");
    content.push_str(&format!("cache_capacity: {}\n", settings.cache_capacity));
    content.push('\n');
    content.push_str(&format!("default_color: \"{}\"\n", settings.default_color));
    content.push('\n');
    content.push_str("# Stamp geometry, in pixels\n");
    content.push_str(&format!(
        "default_stamp_width: {:?}\n",
        settings.default_stamp_width
    ));
    content.push_str(&format!("min_stamp_size: {:?}\n", settings.min_stamp_size));
    content.push_str(&format!("handle_size: {:?}\n", settings.handle_size));

    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.tint_threshold, 30);
        assert_eq!(s.cache_capacity, 100);
        assert_eq!(s.default_color, Color::BLACK);
        assert_eq!(s.resize_filter, ResizeFilter::Lanczos3);
        assert_eq!(s.default_stamp_width, 100.0);
        assert_eq!(s.min_stamp_size, 20.0);
        assert_eq!(s.handle_size, 8.0);
    }

    #[test]
    fn generated_yaml_round_trips() {
        let mut s = Settings::default();
        s.tint_threshold = 42;
        s.resize_filter = ResizeFilter::CatmullRom;
        s.default_color = Color::new(0x12, 0xab, 0xef);
        s.default_stamp_width = 150.5;

        let parsed: Settings = serde_yaml::from_str(&generate_settings_yaml(&s)).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed: Settings = serde_yaml::from_str("tint_threshold: 10\n").unwrap();
        assert_eq!(parsed.tint_threshold, 10);
        assert_eq!(parsed.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(parsed.version, CURRENT_VERSION);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut s = Settings::default();
        s.cache_capacity = 7;
        s.save_to_path(&path).unwrap();

        assert_eq!(Settings::load_from_path(&path), s);
    }

    #[test]
    fn unreadable_or_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert_eq!(Settings::load_from_path(&missing), Settings::default());

        let broken = dir.path().join("broken.yaml");
        fs::write(&broken, "default_color: \"#zzzzzz\"\n").unwrap();
        assert!(Settings::read_from_path(&broken).is_err());
        assert_eq!(Settings::load_from_path(&broken), Settings::default());
    }

    #[test]
    fn old_version_is_migrated_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\ntint_threshold: 12\n").unwrap();

        let s = Settings::load_from_path(&path);
        assert_eq!(s.version, CURRENT_VERSION);
        assert_eq!(s.tint_threshold, 12);

        let rewritten = Settings::read_from_path(&path).unwrap();
        assert_eq!(rewritten.version, CURRENT_VERSION);
    }

    #[test]
    fn builds_configured_components() {
        let mut s = Settings::default();
        s.tint_threshold = 64;
        s.cache_capacity = 3;
        s.min_stamp_size = -5.0;

        assert_eq!(s.tint_engine().threshold(), 64);
        assert_eq!(s.image_cache().capacity(), 3);
        assert_eq!(s.edit_limits().min_stamp_size, 0.0);
    }
}
