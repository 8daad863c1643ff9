// Application configuration loaded from a JSON file

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub camera: CameraConfig,
    pub overlay: OverlayConfig,
    /// Optional JSON file replacing the built-in quotes
    pub quotes_path: Option<PathBuf>,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub cascade_path: PathBuf,
    pub model_path: PathBuf,
    /// Emotion labels in model output order
    pub labels: Vec<String>,
    /// Square model input edge in pixels
    pub input_size: u32,
    /// Single-channel model input instead of RGB
    pub grayscale_input: bool,
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_face_size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub box_color: [u8; 3],
    pub thickness: u32,
    /// TrueType font used to draw the label onto the image
    pub font_path: Option<PathBuf>,
    /// Search the usual system font locations when `font_path` is unset or unreadable
    pub system_fonts: bool,
    pub font_size: f32,
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File,
    /// No file at the path, defaults in use
    Missing,
    /// The file could not be parsed, defaults in use
    Invalid(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            camera: CameraConfig::default(),
            overlay: OverlayConfig::default(),
            quotes_path: None,
            log_file: PathBuf::from("emotion_detector.log"),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from("assets/models/haarcascade_frontalface_default.xml"),
            model_path: PathBuf::from("assets/models/emotion.onnx"),
            labels: [
                "angry", "disgust", "fear", "happy", "sad", "surprise", "neutral", "contempt",
            ]
            .iter()
                .map(|l| l.to_string())
                .collect(),
            input_size: 260,
            grayscale_input: false,
            scale_factor: 1.1,
            min_neighbors: 5,
            min_face_size: 40,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            box_color: [0, 255, 0],
            thickness: 3,
            font_path: None,
            system_fonts: true,
            font_size: 20.0,
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config.json";

    /// Loads the config file, falling back to defaults when it is missing or malformed.
    ///
    /// Runs before logging is set up, so the caller reports the returned source
    /// once the log file exists.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Missing));
        }

        let content = fs::read_to_string(path)?;
        match Self::from_json_str(&content) {
            Ok(config) => Ok((config, ConfigSource::File)),
            Err(e) => Ok((
                Self::default(),
                ConfigSource::Invalid(format!("Error parsing config {path:?}: {e}")),
            )),
        }
    }

    /// Missing fields take their default values
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MoodCategory;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.classifier.labels.len(), 8);
        assert_eq!(config.classifier.labels[3], "happy");
        assert_eq!(config.classifier.labels[7], "contempt");
        assert_eq!(
            MoodCategory::from_raw_label(&config.classifier.labels[7]),
            MoodCategory::Neutral
        );
        assert!(config.overlay.system_fonts);
        assert_eq!(config.overlay.box_color, [0, 255, 0]);
        assert_eq!(config.overlay.thickness, 3);
        assert!(config.quotes_path.is_none());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = AppConfig::from_json_str(include_str!("../config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AppConfig::from_json_str(
            r#"{ "classifier": { "input_size": 48, "grayscale_input": true }, "camera": { "index": 1 } }"#,
        )
        .unwrap();

        assert_eq!(config.classifier.input_size, 48);
        assert!(config.classifier.grayscale_input);
        assert_eq!(config.classifier.min_neighbors, 5);
        assert_eq!(config.camera.index, 1);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.log_file, PathBuf::from("emotion_detector.log"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, source) = AppConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(source, ConfigSource::Missing);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let (config, source) = AppConfig::load(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        match source {
            ConfigSource::Invalid(warning) => {
                assert!(warning.contains("Error parsing config"));
                assert!(warning.contains("config.json"));
            }
            other => panic!("expected a parse warning, got {other:?}"),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.quotes_path = Some(PathBuf::from("quotes.json"));
        config.overlay.box_color = [255, 0, 0];

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), (config, ConfigSource::File));
    }
}
