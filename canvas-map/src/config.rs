//! Composer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{GeoCenter, DEFAULT_RANGE, DEFAULT_ROTATION_SPEED};

/// Error loading a [`ComposerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is not valid JSON or has wrong field types.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Map center is not a finite coordinate.
    #[error("invalid map center: lat={lat}, long={long}")]
    InvalidCenter {
        /// Configured latitude.
        lat: f64,
        /// Configured longitude.
        long: f64,
    },

    /// Range is negative or not finite.
    #[error("invalid range: {0}")]
    InvalidRange(f64),

    /// Rotation speed is not finite.
    #[error("invalid rotation speed: {0}")]
    InvalidRotationSpeed(f64),
}

/// Construction parameters of a [`MapComposer`](crate::MapComposer).
///
/// ```json
/// {
///   "mapId": "nd-map",
///   "configFolder": "/cfg/bing",
///   "centerLla": { "lat": 47.0, "long": 8.0 },
///   "range": 40,
///   "rotation": 90
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerConfig {
    /// Map provider identifier.
    pub map_id: String,
    /// Provider configuration location.
    #[serde(alias = "bingConfigFolder")]
    pub config_folder: String,
    /// Map center.
    #[serde(rename = "centerLla")]
    pub center: GeoCenter,
    /// Visible range.
    #[serde(default = "default_range")]
    pub range: f64,
    /// Frame rotation at construction, degrees.
    #[serde(default, alias = "rotation")]
    pub initial_rotation: f64,
    /// Aircraft heading supplied by the host, degrees. Carried along but never used to
    /// orient the frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Angular speed of the frame, degrees per second.
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f64,
}

fn default_range() -> f64 {
    DEFAULT_RANGE
}

fn default_rotation_speed() -> f64 {
    DEFAULT_ROTATION_SPEED
}

impl ComposerConfig {
    /// Creates a configuration with default range, rotation and speed.
    pub fn new(
        map_id: impl Into<String>,
        config_folder: impl Into<String>,
        center: GeoCenter,
    ) -> Self {
        Self {
            map_id: map_id.into(),
            config_folder: config_folder.into(),
            center,
            range: DEFAULT_RANGE,
            initial_rotation: 0.0,
            heading: None,
            rotation_speed: DEFAULT_ROTATION_SPEED,
        }
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("Loading composer config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks that numeric values can be used for rendering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.center.is_finite() {
            return Err(ConfigError::InvalidCenter {
                lat: self.center.lat,
                long: self.center.long,
            });
        }

        if !self.range.is_finite() || self.range < 0.0 {
            return Err(ConfigError::InvalidRange(self.range));
        }

        if !self.rotation_speed.is_finite() {
            return Err(ConfigError::InvalidRotationSpeed(self.rotation_speed));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = ComposerConfig::from_json_str(
            r#"{ "mapId": "nd", "configFolder": "/cfg", "centerLla": { "lat": 47.0, "long": 8.0 } }"#,
        )
        .expect("valid config");

        assert_eq!(config, ComposerConfig::new("nd", "/cfg", GeoCenter::new(47.0, 8.0)));
        assert_eq!(config.range, 80.0);
        assert_eq!(config.rotation_speed, 1000.0);
    }

    #[test]
    fn rotation_and_folder_aliases() {
        let config = ComposerConfig::from_json_str(
            r#"{
                "mapId": "nd",
                "bingConfigFolder": "/bing",
                "centerLla": { "lat": 0.0, "long": 0.0 },
                "range": 20,
                "rotation": 90,
                "rotationSpeed": 30
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.config_folder, "/bing");
        assert_eq!(config.range, 20.0);
        assert_eq!(config.initial_rotation, 90.0);
        assert_eq!(config.heading, None);
        assert_eq!(config.rotation_speed, 30.0);
    }

    #[test]
    fn heading_does_not_set_rotation() {
        let config = ComposerConfig::from_json_str(
            r#"{
                "mapId": "nd",
                "configFolder": "/cfg",
                "centerLla": { "lat": 0.0, "long": 0.0 },
                "heading": 90,
                "rotation": 15
            }"#,
        )
        .expect("heading and rotation together");

        assert_eq!(config.initial_rotation, 15.0);
        assert_eq!(config.heading, Some(90.0));

        let heading_only = ComposerConfig::from_json_str(
            r#"{
                "mapId": "nd",
                "configFolder": "/cfg",
                "centerLla": { "lat": 0.0, "long": 0.0 },
                "heading": 270
            }"#,
        )
        .expect("heading only");
        assert_eq!(heading_only.initial_rotation, 0.0);
    }

    #[test]
    fn negative_range_is_rejected() {
        let result = ComposerConfig::from_json_str(
            r#"{ "mapId": "nd", "configFolder": "", "centerLla": { "lat": 0.0, "long": 0.0 }, "range": -1 }"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidRange(range)) if range == -1.0));
    }

    #[test]
    fn missing_center_is_parse_error() {
        let result = ComposerConfig::from_json_str(r#"{ "mapId": "nd", "configFolder": "" }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut config = ComposerConfig::new("nd", "", GeoCenter::new(f64::NAN, 0.0));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCenter { .. })));

        config.center = GeoCenter::new(0.0, 0.0);
        config.rotation_speed = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRotationSpeed(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ComposerConfig::load("/nonexistent/canvas-map/config.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
