// Camera module for single webcam snapshots

use crate::config::CameraConfig;
use crate::error::{EmotionDetectorError, Result};
use crate::models::RasterImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{error, info};

/// The configured index, then the next one since some systems start numbering at 1
fn candidate_indices(index: u32) -> impl Iterator<Item = u32> {
    std::iter::once(index).chain(index.checked_add(1))
}

/// Owns an open webcam and captures still frames on demand
pub struct CameraManager {
    camera: Camera,
}

impl CameraManager {
    /// Opens the configured camera, trying the next index if that fails
    pub fn new(settings: &CameraConfig) -> Result<Self> {
        let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            nokhwa::utils::CameraFormat::new(
                nokhwa::utils::Resolution::new(settings.width, settings.height),
                nokhwa::utils::FrameFormat::YUYV,
                settings.fps,
            ),
        ));

        let mut opened = Err(EmotionDetectorError::CameraInit(
            "no camera index to try".to_string(),
        ));
        for index in candidate_indices(settings.index) {
            opened = Self::try_open_camera(index, requested_format);
            match &opened {
                Ok(_) => break,
                Err(e) => info!("Camera {} unavailable: {}", index, e),
            }
        }
        let camera = opened
            .map_err(|e| {
                error!(
                    "Failed to initialize camera after trying multiple indices: {}",
                    e
                );
                EmotionDetectorError::CameraInit(format!(
                    "Could not open camera. Make sure:\n\
                    1. A camera is connected\n\
                    2. No other app is using it\n\
                    3. Camera permissions are granted\n\
                    Error: {e}"
                ))
            })?;

        let mut manager = Self { camera };
        manager.ensure_stream_open()?;
        info!("Opened camera {}", manager.camera_info());
        Ok(manager)
    }

    fn try_open_camera(index: u32, requested_format: RequestedFormat) -> Result<Camera> {
        Ok(Camera::new(CameraIndex::Index(index), requested_format)?)
    }

    pub fn camera_info(&self) -> String {
        self.camera.info().human_name().to_string()
    }

    /// Opens the camera stream if not already open
    pub fn ensure_stream_open(&mut self) -> Result<()> {
        // Idempotent if already open
        let _ = self.camera.open_stream();

        std::thread::sleep(std::time::Duration::from_millis(200));

        match self.camera.frame() {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Camera stream not working: {}", e);
                Err(EmotionDetectorError::CameraInit(format!(
                    "Camera stream not working: {e}. Make sure camera permissions are granted."
                )))
            }
        }
    }

    /// Captures and decodes one RGB frame
    pub fn snapshot(&mut self) -> Result<RasterImage> {
        let frame_data = self.camera.frame().map_err(|e| {
            EmotionDetectorError::FrameProcessing(format!("Failed to capture frame: {e}"))
        })?;

        let buffer = frame_data.decode_image::<RgbFormat>().map_err(|e| {
            EmotionDetectorError::FrameProcessing(format!("Failed to decode frame: {e}"))
        })?;

        let (width, height) = (buffer.width(), buffer.height());
        Ok(RasterImage::new(buffer.into_raw(), width, height))
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            error!("Error stopping camera stream: {}", e);
        }
    }
}
