use crate::canvas::Color;
use crate::hotkey::{parse_hotkey, Hotkey};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "traffic_light.json";

/// Receives the error when the settings file itself cannot be loaded, since
/// no configured log destination is known at that point.
pub const STARTUP_LOG_FILE_NAME: &str = "traffic_light.log";

/// Startup configuration. Read once and never changed while the overlay runs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Window width in pixels.
    #[serde(default = "default_width")]
    pub width: i32,
    /// Window height in pixels.
    #[serde(default = "default_height")]
    pub height: i32,
    /// Thickness of the outline drawn around the ellipse.
    #[serde(default = "default_border_width")]
    pub border_width: i32,
    /// Fill color once the hotkey has switched the overlay on.
    #[serde(default = "default_active_color")]
    pub active_color: Color,
    /// Fill color at startup and whenever the overlay is switched off.
    #[serde(default = "default_inactive_color")]
    pub inactive_color: Color,
    #[serde(default = "default_border_color")]
    pub border_color: Color,
    /// Initial screen position of the window's top-left corner.
    #[serde(default = "default_x")]
    pub x: i32,
    #[serde(default = "default_y")]
    pub y: i32,
    #[serde(default = "default_window_title")]
    pub window_title: String,
    /// Toggle chord, e.g. `"Ctrl+Shift+Space"`.
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving a copy of every log record.
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_width() -> i32 {
    200
}

fn default_height() -> i32 {
    200
}

fn default_border_width() -> i32 {
    6
}

fn default_active_color() -> Color {
    Color::GREEN
}

fn default_inactive_color() -> Color {
    Color::RED
}

fn default_border_color() -> Color {
    Color::BLACK
}

fn default_x() -> i32 {
    300
}

fn default_y() -> i32 {
    300
}

fn default_window_title() -> String {
    "Traffic Light".to_string()
}

fn default_hotkey() -> String {
    "Ctrl+Shift+Space".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            border_width: default_border_width(),
            active_color: default_active_color(),
            inactive_color: default_inactive_color(),
            border_color: default_border_color(),
            x: default_x(),
            y: default_y(),
            window_title: default_window_title(),
            hotkey: default_hotkey(),
            debug_logging: false,
            log_file: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing or blank file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("deserialize settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))
    }

    pub fn hotkey(&self) -> Hotkey {
        match usable_hotkey(&self.hotkey) {
            Some(hotkey) => hotkey,
            None => {
                tracing::warn!(
                    "provided hotkey string '{}' is not a valid chord; using default {}",
                    self.hotkey,
                    Hotkey::default()
                );
                Hotkey::default()
            }
        }
    }

    /// Replace values the window system cannot honour with their defaults.
    /// Returns whether anything changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;

        if self.width <= 0 || self.height <= 0 {
            tracing::warn!(
                width = self.width,
                height = self.height,
                "window size must be positive; using defaults"
            );
            self.width = default_width();
            self.height = default_height();
            changed = true;
        }

        if self.border_width < 0 {
            tracing::warn!(
                border_width = self.border_width,
                "border width must not be negative; using default"
            );
            self.border_width = default_border_width();
            changed = true;
        }

        if usable_hotkey(&self.hotkey).is_none() {
            tracing::warn!(
                hotkey = %self.hotkey,
                "hotkey must be a key plus at least two modifiers; using default"
            );
            self.hotkey = default_hotkey();
            changed = true;
        }

        changed
    }
}

fn usable_hotkey(text: &str) -> Option<Hotkey> {
    parse_hotkey(text).filter(Hotkey::is_chord)
}

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn startup_log_path(settings_path: &Path) -> PathBuf {
    settings_path.with_file_name(STARTUP_LOG_FILE_NAME)
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}
