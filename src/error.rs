// Error types for the Mood Quote Detector application

use thiserror::Error;

/// Main error type for the Mood Quote Detector application
#[derive(Debug, Error)]
pub enum EmotionDetectorError {
    #[error("Camera initialization failed: {0}")]
    CameraInit(String),

    #[error("Frame processing failed: {0}")]
    FrameProcessing(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Image loading failed: {0}")]
    ImageLoad(String),

    #[error("Unsupported image format: {0} (expected jpg, jpeg or png)")]
    UnsupportedFormat(String),

    #[error("Face detection failed: {0}")]
    FaceDetection(String),

    /// Failure reported by a classifier backend, displayed as-is
    #[error("{0}")]
    Classifier(String),

    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(String),

    #[error("OpenCV error: {0}")]
    OpenCV(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid quote table: {0}")]
    QuoteTable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Mood Quote Detector operations
pub type Result<T> = std::result::Result<T, EmotionDetectorError>;

// Conversion from nokhwa errors
impl From<nokhwa::NokhwaError> for EmotionDetectorError {
    fn from(err: nokhwa::NokhwaError) -> Self {
        match err {
            nokhwa::NokhwaError::StructureError { structure, error } => {
                EmotionDetectorError::CameraInit(format!("{structure}: {error}"))
            }
            nokhwa::NokhwaError::OpenDeviceError(device, error) => {
                EmotionDetectorError::CameraInit(format!("Device {device}: {error}"))
            }
            nokhwa::NokhwaError::GetPropertyError { property, error } => {
                EmotionDetectorError::CameraInit(format!("Property {property}: {error}"))
            }
            _ => EmotionDetectorError::CameraInit(err.to_string()),
        }
    }
}

// Conversion from OpenCV errors
impl From<opencv::Error> for EmotionDetectorError {
    fn from(err: opencv::Error) -> Self {
        EmotionDetectorError::OpenCV(err.to_string())
    }
}

// Conversion from ONNX Runtime errors
impl From<ort::Error> for EmotionDetectorError {
    fn from(err: ort::Error) -> Self {
        EmotionDetectorError::OnnxRuntime(err.to_string())
    }
}
