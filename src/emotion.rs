// Face detection and emotion classification backed by OpenCV and ONNX Runtime

use crate::config::ClassifierConfig;
use crate::error::{EmotionDetectorError, Result};
use crate::models::{BoundingBox, EmotionScores, FaceDetection, RasterImage};
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::imgproc;
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, error, info, warn};

/// Anything that can locate faces in an image and score their emotions
pub trait FaceEmotionClassifier {
    /// Returns every detected face; an empty vector means no face was found
    fn classify(&mut self, image: &RasterImage) -> Result<Vec<FaceDetection>>;
}

/// Face detector using OpenCV Haar Cascade
pub struct FaceDetector {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
    min_size: i32,
}

impl FaceDetector {
    /// Creates a new FaceDetector by loading the Haar Cascade classifier
    pub fn new(settings: &ClassifierConfig) -> Result<Self> {
        let cascade_path = settings.cascade_path.to_string_lossy();
        let classifier = CascadeClassifier::new(&cascade_path).map_err(|e| {
            error!("Failed to load Haar Cascade: {}", e);
            EmotionDetectorError::ModelLoad(format!("Haar Cascade load failed: {e}"))
        })?;

        if classifier.empty()? {
            return Err(EmotionDetectorError::ModelLoad(format!(
                "Haar Cascade classifier is empty: {cascade_path}"
            )));
        }

        Ok(Self {
            classifier,
            scale_factor: settings.scale_factor,
            min_neighbors: settings.min_neighbors,
            min_size: settings.min_face_size,
        })
    }

    /// Detects faces and returns each box with its grayscale crop
    pub fn detect_faces(&mut self, image: &RasterImage) -> Result<Vec<(Rect, Mat)>> {
        let mat = Mat::from_slice(&image.data).map_err(|e| {
            EmotionDetectorError::FaceDetection(format!("Failed to create Mat: {e}"))
        })?;

        let mat = mat.reshape(3, image.height as i32).map_err(|e| {
            EmotionDetectorError::FaceDetection(format!("Failed to reshape Mat: {e}"))
        })?;

        let mut gray = Mat::default();
        imgproc::cvt_color(
            &mat,
            &mut gray,
            imgproc::COLOR_RGB2GRAY,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| {
            EmotionDetectorError::FaceDetection(format!("Failed to convert to grayscale: {e}"))
        })?;

        let mut faces = Vector::<Rect>::new();
        self.classifier
            .detect_multi_scale(
                &gray,
                &mut faces,
                self.scale_factor,
                self.min_neighbors,
                0,
                Size::new(self.min_size, self.min_size),
                Size::new(0, 0), // no upper limit
            )
            .map_err(|e| {
                EmotionDetectorError::FaceDetection(format!("Face detection failed: {e}"))
            })?;

        let mut regions = Vec::with_capacity(faces.len());
        for rect in faces.iter() {
            match Self::extract_face_region(&gray, rect) {
                Ok(crop) => regions.push((rect, crop)),
                Err(e) => {
                    warn!("Failed to extract face region: {}", e);
                    continue;
                }
            }
        }

        Ok(regions)
    }

    /// Crops a face region into its own continuous Mat
    fn extract_face_region(gray: &Mat, rect: Rect) -> Result<Mat> {
        let face_roi = Mat::roi(gray, rect).map_err(|e| {
            EmotionDetectorError::FaceDetection(format!("Failed to crop face region: {e}"))
        })?;

        face_roi.try_clone().map_err(|e| {
            EmotionDetectorError::FaceDetection(format!("Failed to clone face ROI: {e}"))
        })
    }
}

/// Resizes a grayscale face crop to the model input and scales it to [0, 1].
/// Output is HWC, with three identical channels unless `grayscale` is set.
fn preprocess_face(face: &Mat, input_size: u32, grayscale: bool) -> Result<Vec<f32>> {
    let source = if grayscale {
        face.try_clone()?
    } else {
        let mut rgb_mat = Mat::default();
        imgproc::cvt_color_def(face, &mut rgb_mat, imgproc::COLOR_GRAY2RGB).map_err(|e| {
            EmotionDetectorError::FrameProcessing(format!("Failed to convert to RGB: {e}"))
        })?;
        rgb_mat
    };

    let mut resized = Mat::default();
    imgproc::resize(
        &source,
        &mut resized,
        Size::new(input_size as i32, input_size as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )
    .map_err(|e| EmotionDetectorError::FrameProcessing(format!("Failed to resize face: {e}")))?;

    let data = resized.data_bytes().map_err(|e| {
        EmotionDetectorError::FrameProcessing(format!("Failed to get resized data: {e}"))
    })?;

    Ok(data.iter().map(|&pixel| pixel as f32 / 255.0).collect())
}

/// Reorders interleaved HWC pixels into planar CHW
fn hwc_to_chw(hwc: &[f32], size: usize, channels: usize) -> Vec<f32> {
    let mut chw = vec![0.0f32; channels * size * size];
    for h in 0..size {
        for w in 0..size {
            for c in 0..channels {
                chw[c * size * size + h * size + w] = hwc[(h * size + w) * channels + c];
            }
        }
    }
    chw
}

/// Numerically stable softmax
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}

/// Pairs probabilities with labels in model output order.
/// Outputs beyond the configured labels are named `class_<index>`.
fn label_scores(labels: &[String], probabilities: &[f32]) -> EmotionScores {
    probabilities
        .iter()
        .enumerate()
        .map(|(idx, &p)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("class_{idx}"));
            (label, p)
        })
        .collect()
}

/// Emotion model session using ONNX Runtime
pub struct EmotionModel {
    session: Session,
    input_size: u32,
    grayscale: bool,
}

impl EmotionModel {
    /// Loads the ONNX model
    pub fn new(settings: &ClassifierConfig) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| {
                EmotionDetectorError::ModelLoad(format!("Failed to create session builder: {e}"))
            })?
            .commit_from_file(&settings.model_path)
            .map_err(|e| {
                error!("Failed to load ONNX model: {}", e);
                EmotionDetectorError::ModelLoad(format!("ONNX model load failed: {e}"))
            })?;

        Ok(Self {
            session,
            input_size: settings.input_size,
            grayscale: settings.grayscale_input,
        })
    }

    /// Returns softmax probabilities for one preprocessed (HWC) face
    pub fn probabilities(&mut self, preprocessed_face: &[f32]) -> Result<Vec<f32>> {
        let size = self.input_size as usize;
        let channels = if self.grayscale { 1 } else { 3 };
        let chw_data = hwc_to_chw(preprocessed_face, size, channels);

        let input_array = ndarray::Array4::from_shape_vec((1, channels, size, size), chw_data)
            .map_err(|e| {
                error!(
                    "Failed to create input array with shape [1, {}, {}, {}]: {}",
                    channels, size, size, e
                );
                EmotionDetectorError::OnnxRuntime(format!("Failed to create input array: {e}"))
            })?;

        let input_tensor = Value::from_array(input_array).map_err(|e| {
            EmotionDetectorError::OnnxRuntime(format!("Failed to create input tensor: {e}"))
        })?;

        let outputs = self.session.run(ort::inputs![input_tensor]).map_err(|e| {
            error!("ONNX inference failed: {}", e);
            EmotionDetectorError::OnnxRuntime(format!("Inference failed: {e}"))
        })?;

        let (_, output_value) = outputs
            .iter()
            .next()
            .ok_or_else(|| EmotionDetectorError::OnnxRuntime("No output from model".to_string()))?;

        let (_, logits) = output_value.try_extract_tensor::<f32>().map_err(|e| {
            EmotionDetectorError::OnnxRuntime(format!("Failed to extract output tensor: {e}"))
        })?;

        if logits.is_empty() {
            return Err(EmotionDetectorError::OnnxRuntime(
                "No probabilities in output".to_string(),
            ));
        }

        Ok(softmax(logits))
    }
}

/// Haar cascade detector plus ONNX emotion model, loaded on first use
pub struct OnnxEmotionClassifier {
    settings: ClassifierConfig,
    engine: Option<(FaceDetector, EmotionModel)>,
}

impl OnnxEmotionClassifier {
    pub fn new(settings: ClassifierConfig) -> Self {
        Self {
            settings,
            engine: None,
        }
    }

    /// Loads both models if they are not loaded yet
    fn engine(&mut self) -> Result<&mut (FaceDetector, EmotionModel)> {
        if self.engine.is_none() {
            let detector = FaceDetector::new(&self.settings)?;
            let model = EmotionModel::new(&self.settings)?;
            info!(
                "Loaded face detector {:?} and emotion model {:?}",
                self.settings.cascade_path, self.settings.model_path
            );
            self.engine = Some((detector, model));
        }
        self.engine
            .as_mut()
            .ok_or_else(|| EmotionDetectorError::ModelLoad("models not loaded".to_string()))
    }
}

impl FaceEmotionClassifier for OnnxEmotionClassifier {
    fn classify(&mut self, image: &RasterImage) -> Result<Vec<FaceDetection>> {
        let expected = image.width as usize * image.height as usize * 3;
        if image.data.len() != expected || expected == 0 {
            return Err(EmotionDetectorError::FrameProcessing(format!(
                "expected {} bytes for a {}x{} RGB image, got {}",
                expected,
                image.width,
                image.height,
                image.data.len()
            )));
        }

        let input_size = self.settings.input_size;
        let grayscale = self.settings.grayscale_input;
        let labels = self.settings.labels.clone();
        let (detector, model) = self.engine()?;

        let faces = detector.detect_faces(image)?;
        debug!("Detected {} face(s)", faces.len());

        let mut detections = Vec::with_capacity(faces.len());
        for (rect, crop) in faces {
            let preprocessed = preprocess_face(&crop, input_size, grayscale)?;
            let probabilities = model.probabilities(&preprocessed)?;
            let bbox = BoundingBox::new(rect.x, rect.y, rect.width as u32, rect.height as u32);
            detections.push(FaceDetection::new(bbox, label_scores(&labels, &probabilities)));
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hwc_to_chw() {
        // 2x2 image, 3 channels: pixel p has channels (p, 10 + p, 20 + p)
        let hwc: Vec<f32> = (0..4)
            .flat_map(|p| [p as f32, 10.0 + p as f32, 20.0 + p as f32])
            .collect();
        let chw = hwc_to_chw(&hwc, 2, 3);
        assert_eq!(
            chw,
            vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0, 20.0, 21.0, 22.0, 23.0]
        );
    }

    #[test]
    fn test_label_scores_keep_model_order() {
        let labels: Vec<String> = ["angry", "happy"].iter().map(|s| s.to_string()).collect();
        let scores = label_scores(&labels, &[0.2, 0.5, 0.3]);
        let keys: Vec<&str> = scores.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["angry", "happy", "class_2"]);
        assert_eq!(scores["happy"], 0.5);
    }

    #[test]
    fn test_missing_models_fail_on_classify() {
        let settings = ClassifierConfig {
            cascade_path: "does/not/exist.xml".into(),
            model_path: "does/not/exist.onnx".into(),
            ..ClassifierConfig::default()
        };
        let mut classifier = OnnxEmotionClassifier::new(settings);
        let image = RasterImage::new(vec![0; 8 * 8 * 3], 8, 8);

        assert!(classifier.classify(&image).is_err());
    }

    #[test]
    fn test_rejects_truncated_image() {
        let mut classifier = OnnxEmotionClassifier::new(ClassifierConfig::default());
        let image = RasterImage::new(vec![0; 10], 8, 8);
        assert!(matches!(
            classifier.classify(&image),
            Err(EmotionDetectorError::FrameProcessing(_))
        ));
    }
}
