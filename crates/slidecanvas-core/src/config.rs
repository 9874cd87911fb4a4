//! Surface configuration supplied by the host when mounting a canvas.

use crate::layers::{Rgb, DEFAULT_FILL};
use crate::presence::UserProfile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of layers a room may hold.
pub const MAX_LAYERS: usize = 100;
/// Width and height of click-inserted layers.
pub const DEFAULT_LAYER_SIZE: f64 = 100.0;
/// Manhattan distance a press must travel before it becomes a selection net.
pub const DRAG_THRESHOLD: f64 = 5.0;
/// Pick radius around resize handles, in canvas units.
pub const HANDLE_TOLERANCE: f64 = 8.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What happens to the active tool after it has been used once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolLock {
    /// The pencil stays armed after a stroke.
    #[default]
    Sticky,
    /// Every tool falls back to selection after one use.
    Single,
}

/// Everything the host decides about a mounted canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Room to join. One room per slide.
    pub room_id: String,
    /// Background slide image.
    pub image_url: String,
    /// Read-only viewer mode.
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default = "default_color")]
    pub initial_color: Rgb,
    #[serde(default)]
    pub tool_lock: ToolLock,
    #[serde(default = "default_max_layers")]
    pub max_layers: usize,
    #[serde(default = "default_layer_size")]
    pub default_layer_size: f64,
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: f64,
    #[serde(default = "default_handle_tolerance")]
    pub handle_tolerance: f64,
}

fn default_color() -> Rgb {
    DEFAULT_FILL
}

fn default_max_layers() -> usize {
    MAX_LAYERS
}

fn default_layer_size() -> f64 {
    DEFAULT_LAYER_SIZE
}

fn default_drag_threshold() -> f64 {
    DRAG_THRESHOLD
}

fn default_handle_tolerance() -> f64 {
    HANDLE_TOLERANCE
}

impl SurfaceConfig {
    /// Config with every optional field at its default.
    pub fn new(room_id: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            image_url: image_url.into(),
            disabled: false,
            profile: UserProfile::default(),
            initial_color: DEFAULT_FILL,
            tool_lock: ToolLock::default(),
            max_layers: MAX_LAYERS,
            default_layer_size: DEFAULT_LAYER_SIZE,
            drag_threshold: DRAG_THRESHOLD,
            handle_tolerance: HANDLE_TOLERANCE,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SurfaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room_id.trim().is_empty() {
            return Err(ConfigError::Invalid("room_id must not be empty".to_string()));
        }
        if self.image_url.trim().is_empty() {
            return Err(ConfigError::Invalid("image_url must not be empty".to_string()));
        }
        if self.max_layers == 0 || self.max_layers > MAX_LAYERS {
            return Err(ConfigError::Invalid(format!(
                "max_layers must be between 1 and {MAX_LAYERS}"
            )));
        }
        if !(self.default_layer_size > 0.0) {
            return Err(ConfigError::Invalid(
                "default_layer_size must be positive".to_string(),
            ));
        }
        if !(self.drag_threshold >= 0.0) || !(self.handle_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(
                "drag_threshold and handle_tolerance must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config =
            SurfaceConfig::from_json(r#"{"room_id": "slide-1", "image_url": "https://x/y.png"}"#)
                .unwrap();
        assert_eq!(config, SurfaceConfig::new("slide-1", "https://x/y.png"));
        assert_eq!(config.initial_color, Rgb::new(252, 142, 42));
        assert_eq!(config.max_layers, 100);
        assert_eq!(config.tool_lock, ToolLock::Sticky);
        assert!(!config.disabled);
    }

    #[test]
    fn test_full_json() {
        let json = r#"{
            "room_id": "slide-2",
            "image_url": "slide.png",
            "disabled": true,
            "profile": {"user_id": "u1", "name": "Ada"},
            "initial_color": {"r": 1, "g": 2, "b": 3},
            "tool_lock": "single",
            "drag_threshold": 3.0
        }"#;
        let config = SurfaceConfig::from_json(json).unwrap();
        assert!(config.disabled);
        assert_eq!(config.profile.name, "Ada");
        assert_eq!(config.initial_color, Rgb::new(1, 2, 3));
        assert_eq!(config.tool_lock, ToolLock::Single);
        assert_eq!(config.drag_threshold, 3.0);
    }

    #[test]
    fn test_rejects_missing_room() {
        let err = SurfaceConfig::from_json(r#"{"room_id": " ", "image_url": "a.png"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SurfaceConfig::from_json(r#"{"image_url": "a.png"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_bad_limits() {
        let mut config = SurfaceConfig::new("room", "a.png");
        config.max_layers = 0;
        assert!(config.validate().is_err());

        let mut config = SurfaceConfig::new("room", "a.png");
        config.drag_threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = SurfaceConfig::new("room", "a.png");
        config.default_layer_size = -10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layer_cap_cannot_be_raised() {
        let err = SurfaceConfig::from_json(
            r#"{"room_id": "slide-1", "image_url": "a.png", "max_layers": 150}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = SurfaceConfig::from_json(
            r#"{"room_id": "slide-1", "image_url": "a.png", "max_layers": 100}"#,
        )
        .unwrap();
        assert_eq!(config.max_layers, MAX_LAYERS);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SurfaceConfig::new("room", "a.png");
        let back = SurfaceConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
