//! Application configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::HexColor;

const MIB: usize = 1024 * 1024;

/// Largest accepted canvas edge, in pixels.
pub const MAX_CANVAS_EDGE: u32 = 16_384;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Memory ceiling for each document's undo history, in MiB (minimum 1).
    pub history_max_mb: u64,
    /// Size of new documents.
    pub default_canvas_width: u32,
    pub default_canvas_height: u32,
    /// Fill of the background layer of new documents.
    pub default_background: HexColor,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_max_mb: 512,
            default_canvas_width: 800,
            default_canvas_height: 600,
            default_background: HexColor::WHITE,
        }
    }
}

impl AppConfig {
    /// Returns the config file path: exe directory + `rust-paint.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("rust-paint.json")))
            .unwrap_or_else(|| PathBuf::from("rust-paint.json"))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (unreadable file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e}", path.display());
            }
            return config;
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config at {}: {e}", path.display()))
            .and_then(|contents| {
                serde_json::from_str::<AppConfig>(&contents)
                    .map_err(|e| format!("Failed to parse config at {}: {e}", path.display()))
            });
        match parsed {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(message) => {
                // Keep the broken file for the user to fix.
                tracing::warn!("{message}");
                Self::default()
            }
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// History memory ceiling in bytes.
    pub fn history_max_bytes(&self) -> usize {
        usize::try_from(self.history_max_mb)
            .unwrap_or(usize::MAX)
            .saturating_mul(MIB)
    }

    /// Clamps values to valid ranges.
    pub fn sanitize(&mut self) {
        self.history_max_mb = self.history_max_mb.max(1);
        self.default_canvas_width = self.default_canvas_width.clamp(1, MAX_CANVAS_EDGE);
        self.default_canvas_height = self.default_canvas_height.clamp(1, MAX_CANVAS_EDGE);
    }
}
