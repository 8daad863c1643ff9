// Per-image driver: classify, reduce to one face, map to a mood, pick a quote

use crate::emotion::FaceEmotionClassifier;
use crate::models::{MoodCategory, RasterImage, SelectionResult};
use crate::overlay::Annotator;
use crate::quotes::QuoteTable;
use crate::reduction::{rank_emotions, select_main_face};
use rand::Rng;
use tracing::{debug, error, info};

/// Where the driver is in processing the current submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    NoImage,
    ImageReceived,
    ClassifierInvoked,
    NoFaceDetected,
    ClassifierError,
    FacesFound,
    MainFaceSelected,
    EmotionsRanked,
    CategoryMapped,
    QuoteSelected,
    Rendered,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::NoFaceDetected | PipelineStage::ClassifierError | PipelineStage::Rendered
        )
    }
}

/// Everything the presentation layer shows for a successful run
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedResult {
    pub selection: SelectionResult,
    /// Copy of the input with the main face boxed
    pub annotated: RasterImage,
}

/// Result of one submission
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineOutcome {
    NoFaceDetected,
    /// The classifier's error message, unmodified
    ClassifierError(String),
    Rendered(Box<RenderedResult>),
}

/// Runs submissions one at a time to a terminal stage
pub struct EmotionPipeline<C, R> {
    classifier: C,
    quotes: QuoteTable,
    annotator: Annotator,
    rng: R,
    stage: PipelineStage,
}

impl<C: FaceEmotionClassifier, R: Rng> EmotionPipeline<C, R> {
    pub fn new(classifier: C, quotes: QuoteTable, annotator: Annotator, rng: R) -> Self {
        Self {
            classifier,
            quotes,
            annotator,
            rng,
            stage: PipelineStage::NoImage,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn quotes(&self) -> &QuoteTable {
        &self.quotes
    }

    fn advance(&mut self, stage: PipelineStage) {
        debug!("Pipeline stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Processes one image. Classifier failures end the run without retrying.
    pub fn process(&mut self, image: &RasterImage) -> PipelineOutcome {
        self.advance(PipelineStage::ImageReceived);
        info!("Analyzing {}x{} image", image.width, image.height);

        self.advance(PipelineStage::ClassifierInvoked);
        let faces = match self.classifier.classify(image) {
            Ok(faces) => faces,
            Err(e) => {
                error!("Emotion classification failed: {}", e);
                self.advance(PipelineStage::ClassifierError);
                return PipelineOutcome::ClassifierError(e.to_string());
            }
        };

        let Some(main_face) = select_main_face(&faces).cloned() else {
            info!("No face detected");
            self.advance(PipelineStage::NoFaceDetected);
            return PipelineOutcome::NoFaceDetected;
        };
        self.advance(PipelineStage::FacesFound);
        self.advance(PipelineStage::MainFaceSelected);

        let ranked_emotions = rank_emotions(&main_face.emotions);
        self.advance(PipelineStage::EmotionsRanked);

        // A face without scores has no dominant label and falls through to neutral
        let category = ranked_emotions
            .first()
            .map(|(label, _)| MoodCategory::from_raw_label(label))
            .unwrap_or(MoodCategory::Neutral);
        self.advance(PipelineStage::CategoryMapped);

        let quote = self.quotes.pick(category, &mut self.rng).to_string();
        self.advance(PipelineStage::QuoteSelected);

        let selection = SelectionResult {
            main_face,
            ranked_emotions,
            category,
            quote,
        };

        // Only a malformed raster fails here; it ends the run like a classifier failure
        let annotated = match self.annotator.annotate(
            image,
            &selection.main_face.bbox,
            &selection.overlay_label(),
        ) {
            Ok(annotated) => annotated,
            Err(e) => {
                error!("Failed to annotate image: {}", e);
                self.advance(PipelineStage::ClassifierError);
                return PipelineOutcome::ClassifierError(e.to_string());
            }
        };

        if let Some((label, score)) = selection.dominant() {
            let bbox = &selection.main_face.bbox;
            info!(
                "Detected {} (raw {} {:.2}) in box ({}, {})-{:?} among {} face(s)",
                selection.category,
                label,
                score,
                bbox.x,
                bbox.y,
                bbox.bottom_right(),
                faces.len()
            );
        }
        self.advance(PipelineStage::Rendered);

        PipelineOutcome::Rendered(Box::new(RenderedResult {
            selection,
            annotated,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmotionDetectorError, Result};
    use crate::models::{BoundingBox, EmotionScores, FaceDetection};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct StubClassifier(Option<Vec<FaceDetection>>);

    impl FaceEmotionClassifier for StubClassifier {
        fn classify(&mut self, _image: &RasterImage) -> Result<Vec<FaceDetection>> {
            self.0
                .clone()
                .ok_or_else(|| EmotionDetectorError::Classifier("model load failed".to_string()))
        }
    }

    fn pipeline(faces: Option<Vec<FaceDetection>>) -> EmotionPipeline<StubClassifier, StdRng> {
        EmotionPipeline::new(
            StubClassifier(faces),
            QuoteTable::builtin().clone(),
            Annotator::default(),
            StdRng::seed_from_u64(3),
        )
    }

    fn image() -> RasterImage {
        RasterImage::new(vec![0; 64 * 64 * 3], 64, 64)
    }

    #[test]
    fn test_starts_without_image() {
        let p = pipeline(Some(vec![]));
        assert_eq!(p.stage(), PipelineStage::NoImage);
        assert!(!p.stage().is_terminal());
    }

    #[test]
    fn test_no_faces() {
        let mut p = pipeline(Some(vec![]));
        assert_eq!(p.process(&image()), PipelineOutcome::NoFaceDetected);
        assert_eq!(p.stage(), PipelineStage::NoFaceDetected);
        assert!(p.stage().is_terminal());
    }

    #[test]
    fn test_classifier_error_is_surfaced() {
        let mut p = pipeline(None);
        assert_eq!(
            p.process(&image()),
            PipelineOutcome::ClassifierError("model load failed".to_string())
        );
        assert_eq!(p.stage(), PipelineStage::ClassifierError);
    }

    #[test]
    fn test_face_without_scores_is_neutral() {
        let face = FaceDetection::new(BoundingBox::new(1, 1, 10, 10), EmotionScores::new());
        let mut p = pipeline(Some(vec![face]));

        match p.process(&image()) {
            PipelineOutcome::Rendered(result) => {
                assert_eq!(result.selection.category, MoodCategory::Neutral);
                assert!(result.selection.ranked_emotions.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(p.stage(), PipelineStage::Rendered);
    }

    #[test]
    fn test_unknown_label_maps_to_neutral() {
        let mut emotions = EmotionScores::new();
        emotions.insert("contempt".to_string(), 0.9);
        emotions.insert("happy".to_string(), 0.1);
        let face = FaceDetection::new(BoundingBox::new(1, 1, 10, 10), emotions);
        let mut p = pipeline(Some(vec![face]));

        match p.process(&image()) {
            PipelineOutcome::Rendered(result) => {
                assert_eq!(result.selection.category, MoodCategory::Neutral);
                assert_eq!(result.selection.overlay_label(), "Neutral (0.90)");
                assert!(p
                    .quotes()
                    .quotes_for(MoodCategory::Neutral)
                    .contains(&result.selection.quote));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_pipeline_recovers_after_error() {
        let mut p = pipeline(None);
        p.process(&image());
        p.classifier.0 = Some(vec![]);
        assert_eq!(p.process(&image()), PipelineOutcome::NoFaceDetected);
    }
}
