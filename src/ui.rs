// UI module for the mood quote detector application

use crate::camera::CameraManager;
use crate::config::CameraConfig;
use crate::emotion::FaceEmotionClassifier;
use crate::error::Result;
use crate::image_source;
use crate::models::{title_case, MoodCategory, RasterImage};
use crate::pipeline::{EmotionPipeline, PipelineOutcome, RenderedResult};
use rand::Rng;
use std::path::Path;
use tracing::{error, info};

/// Bar colors for the emotion chart, highest score first
const CHART_COLORS: [egui::Color32; 7] = [
    egui::Color32::from_rgb(0xFF, 0x6B, 0x6B),
    egui::Color32::from_rgb(0x4E, 0xCD, 0xC4),
    egui::Color32::from_rgb(0x45, 0xB7, 0xD1),
    egui::Color32::from_rgb(0x96, 0xCE, 0xB4),
    egui::Color32::from_rgb(0xFF, 0xE6, 0x6D),
    egui::Color32::from_rgb(0x6A, 0x05, 0x72),
    egui::Color32::from_rgb(0xAB, 0x83, 0xA1),
];

const QUOTE_COLOR: egui::Color32 = egui::Color32::from_rgb(0x76, 0x4B, 0xA2);
const IMAGE_MAX_WIDTH: f32 = 480.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMethod {
    Upload,
    Webcam,
}

pub fn mood_icon(mood: MoodCategory) -> &'static str {
    match mood {
        MoodCategory::Happy => "😊",
        MoodCategory::Sad => "😢",
        MoodCategory::Angry => "😠",
        MoodCategory::Neutral => "😐",
    }
}

pub fn mood_color(mood: MoodCategory) -> egui::Color32 {
    match mood {
        MoodCategory::Happy => egui::Color32::from_rgb(0x4C, 0xAF, 0x50),
        MoodCategory::Sad => egui::Color32::from_rgb(0x21, 0x96, 0xF3),
        MoodCategory::Angry => egui::Color32::from_rgb(0xF4, 0x43, 0x36),
        MoodCategory::Neutral => egui::Color32::from_rgb(0x9E, 0x9E, 0x9E),
    }
}

/// Scales `size` down to `max_width`, keeping the aspect ratio
pub fn fit_size(size: egui::Vec2, max_width: f32) -> egui::Vec2 {
    if size.x <= max_width || size.x <= 0.0 {
        size
    } else {
        size * (max_width / size.x)
    }
}

/// Main application UI
pub struct MoodQuoteApp<C, R> {
    pipeline: EmotionPipeline<C, R>,
    camera_settings: CameraConfig,
    camera: Option<CameraManager>,
    input_method: InputMethod,
    path_input: String,
    pending: Option<RasterImage>,
    source_error: Option<String>,
    source_texture: Option<egui::TextureHandle>,
    annotated_texture: Option<egui::TextureHandle>,
    outcome: Option<PipelineOutcome>,
    model_name: String,
}

impl<C: FaceEmotionClassifier, R: Rng> MoodQuoteApp<C, R> {
    /// Creates a new MoodQuoteApp. A loaded `initial` image is analyzed on the
    /// first frame; a failed one is shown as the input error.
    pub fn new(
        pipeline: EmotionPipeline<C, R>,
        camera_settings: CameraConfig,
        initial: Option<Result<RasterImage>>,
        model_name: String,
    ) -> Self {
        let (pending, source_error) = match initial {
            Some(Ok(image)) => (Some(image), None),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => (None, None),
        };
        Self {
            pipeline,
            camera_settings,
            camera: None,
            input_method: InputMethod::Upload,
            path_input: String::new(),
            pending,
            source_error,
            source_texture: None,
            annotated_texture: None,
            outcome: None,
            model_name,
        }
    }

    pub fn source_error(&self) -> Option<&str> {
        self.source_error.as_deref()
    }

    pub fn has_pending_image(&self) -> bool {
        self.pending.is_some()
    }

    fn load_texture(ctx: &egui::Context, name: &str, image: &RasterImage) -> egui::TextureHandle {
        let color_image = egui::ColorImage::from_rgb(
            [image.width as usize, image.height as usize],
            &image.data,
        );
        ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
    }

    /// Runs one submission through the pipeline and refreshes the textures
    fn submit(&mut self, ctx: &egui::Context, image: RasterImage) {
        self.source_error = None;
        self.source_texture = Some(Self::load_texture(ctx, "source", &image));

        let outcome = self.pipeline.process(&image);
        self.annotated_texture = match &outcome {
            PipelineOutcome::Rendered(result) => {
                Some(Self::load_texture(ctx, "annotated", &result.annotated))
            }
            _ => None,
        };
        self.outcome = Some(outcome);
    }

    fn report_source_error(&mut self, message: String) {
        error!("Image source failed: {}", message);
        self.source_error = Some(message);
    }

    fn load_from_path(&mut self, ctx: &egui::Context, path: &Path) {
        match image_source::load_upload(path) {
            Ok(image) => {
                info!("Loaded upload {:?}", path);
                self.submit(ctx, image);
            }
            Err(e) => self.report_source_error(e.to_string()),
        }
    }

    /// Accepts files dropped onto the window
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // One submission per user action
        if let Some(file) = dropped.into_iter().next() {
            if let Some(path) = &file.path {
                self.path_input = path.display().to_string();
                self.load_from_path(ctx, path);
            } else if let Some(bytes) = &file.bytes {
                match image_source::decode_upload(&file.name, bytes) {
                    Ok(image) => self.submit(ctx, image),
                    Err(e) => self.report_source_error(e.to_string()),
                }
            }
        }
    }

    fn capture_snapshot(&mut self, ctx: &egui::Context) {
        if self.camera.is_none() {
            match CameraManager::new(&self.camera_settings) {
                Ok(camera) => self.camera = Some(camera),
                Err(e) => {
                    self.report_source_error(e.to_string());
                    return;
                }
            }
        }

        let snapshot = match self.camera.as_mut() {
            Some(camera) => camera.snapshot(),
            None => return,
        };
        match snapshot {
            Ok(image) => self.submit(ctx, image),
            Err(e) => {
                // Reopen on the next attempt
                self.camera = None;
                self.report_source_error(e.to_string());
            }
        }
    }

    /// Renders the input method selector and tips
    fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("input_method").show(ctx, |ui| {
            ui.heading("🎯 Input Method");
            ui.radio_value(&mut self.input_method, InputMethod::Upload, "Upload Image");
            ui.radio_value(&mut self.input_method, InputMethod::Webcam, "Webcam (Camera)");

            ui.add_space(16.0);
            ui.label(egui::RichText::new("💡 Tips for best results:").strong());
            for tip in [
                "Ensure good lighting",
                "Face the camera directly",
                "Remove sunglasses/hats",
                "Use a clear, high-quality image",
            ] {
                ui.label(format!("• {tip}"));
            }

            ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui| {
                ui.small(format!("Using pretrained model {}", self.model_name));
            });
        });
    }

    fn render_input_card(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        egui::Frame::group(ui.style()).show(ui, |ui| match self.input_method {
            InputMethod::Upload => {
                ui.heading("📁 Upload Image");
                ui.label("Choose an image file (jpg/png) or drop it onto the window");
                ui.horizontal(|ui| {
                    let response = ui.text_edit_singleline(&mut self.path_input);
                    let submitted =
                        response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if ui.button("Analyze").clicked() || submitted {
                        let path = std::path::PathBuf::from(self.path_input.trim());
                        self.load_from_path(&ctx, &path);
                    }
                });
            }
            InputMethod::Webcam => {
                ui.heading("📸 Webcam Capture");
                ui.label("Position your face in the center and click the photo");
                if let Some(camera) = &self.camera {
                    ui.small(camera.camera_info());
                }
                if ui.button("Take a picture").clicked() {
                    self.capture_snapshot(&ctx);
                }
            }
        });

        if let Some(message) = &self.source_error {
            ui.colored_label(egui::Color32::from_rgb(0xFF, 0x6B, 0x6B), message);
        }
    }

    fn render_image(ui: &mut egui::Ui, texture: &egui::TextureHandle) {
        let size = fit_size(texture.size_vec2(), IMAGE_MAX_WIDTH);
        ui.add(egui::Image::new(texture).fit_to_exact_size(size));
    }

    fn render_welcome(ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(24.0);
            ui.heading("🎭 Ready to Discover Your Emotions?");
            ui.label(
                "Upload a photo or use your webcam to detect facial emotions and get personalized quotes!",
            );
            ui.add_space(16.0);
            ui.horizontal(|ui| {
                for (icon, title, detail) in [
                    ("📁", "Upload Image", "JPG, PNG formats"),
                    ("📸", "Webcam Capture", "Snapshot detection"),
                    ("💬", "Get Quotes", "Personalized messages"),
                ] {
                    ui.vertical(|ui| {
                        ui.label(egui::RichText::new(icon).size(32.0));
                        ui.strong(title);
                        ui.small(detail);
                    });
                    ui.add_space(32.0);
                }
            });
        });
    }

    fn render_no_face(ui: &mut egui::Ui) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.heading("❌ No Face Detected");
            ui.label("Try another image with better lighting or ensure your face is clearly visible");
        });
    }

    fn render_error(ui: &mut egui::Ui, message: &str) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.heading("⚠️ Processing Error");
            ui.label(format!("Details: {message}"));
            ui.label("Please try with a different image.");
        });
    }

    fn render_chart(ui: &mut egui::Ui, ranked: &[(String, f32)]) {
        ui.heading("📊 Emotion Analysis");
        ui.small("Emotion Probability Distribution");
        egui::Grid::new("emotion_chart")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for (idx, (label, score)) in ranked.iter().enumerate() {
                    ui.label(title_case(label));
                    ui.add(
                        egui::ProgressBar::new(score.clamp(0.0, 1.0))
                            .desired_width(320.0)
                            .fill(CHART_COLORS[idx % CHART_COLORS.len()])
                            .text(format!("{score:.2}")),
                    );
                    ui.end_row();
                }
            });
        ui.small("Confidence Score");
    }

    fn render_result(&self, ui: &mut egui::Ui, result: &RenderedResult) {
        let selection = &result.selection;
        let mood = selection.category;

        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(3.0, mood_color(mood)))
            .show(ui, |ui| {
                ui.heading(format!(
                    "{} Detected Emotion: {}",
                    mood_icon(mood),
                    mood
                ));
                if let Some((label, score)) = selection.dominant() {
                    ui.label(format!("Raw emotion: {label} (confidence: {score:.2})"));
                }
            });

        ui.add_space(12.0);
        Self::render_chart(ui, &selection.ranked_emotions);

        ui.add_space(12.0);
        ui.heading("💫 Quote for You");
        egui::Frame::group(ui.style())
            .fill(QUOTE_COLOR)
            .show(ui, |ui| {
                ui.label(
                    egui::RichText::new(&selection.quote)
                        .italics()
                        .size(18.0)
                        .color(egui::Color32::WHITE),
                );
            });

        ui.add_space(12.0);
        ui.heading("👁️ Face Detection");
        if let Some(texture) = &self.annotated_texture {
            Self::render_image(ui, texture);
        }
        ui.small(format!("Detected Face with Emotion: {}", selection.overlay_label()));
    }

    fn render_main(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading(egui::RichText::new("😊 Facial Emotion Detection").size(32.0));
                    ui.label("Upload an image or use your webcam. The app detects emotion and shows a random quote to refresh your mind.");
                });
                ui.add_space(12.0);

                self.render_input_card(ui);
                ui.add_space(12.0);

                match &self.source_texture {
                    None => Self::render_welcome(ui),
                    Some(texture) => {
                        ui.heading("📷 Your Image");
                        Self::render_image(ui, texture);
                        ui.add_space(12.0);

                        match &self.outcome {
                            Some(PipelineOutcome::NoFaceDetected) => Self::render_no_face(ui),
                            Some(PipelineOutcome::ClassifierError(message)) => {
                                Self::render_error(ui, message)
                            }
                            Some(PipelineOutcome::Rendered(result)) => {
                                self.render_result(ui, result)
                            }
                            None => {}
                        }
                    }
                }

                ui.separator();
                ui.vertical_centered(|ui| {
                    ui.small("Built with egui & ONNX Runtime | Emotion Detection AI");
                });
            });
        });
    }
}

impl<C: FaceEmotionClassifier, R: Rng> eframe::App for MoodQuoteApp<C, R> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(image) = self.pending.take() {
            self.submit(ctx, image);
        }
        self.handle_dropped_files(ctx);

        self.render_sidebar(ctx);
        self.render_main(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Annotator;
    use crate::quotes::QuoteTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_every_mood_has_distinct_style() {
        let icons: std::collections::HashSet<&str> =
            MoodCategory::ALL.into_iter().map(mood_icon).collect();
        let colors: std::collections::HashSet<egui::Color32> =
            MoodCategory::ALL.into_iter().map(mood_color).collect();
        assert_eq!(icons.len(), 4);
        assert_eq!(colors.len(), 4);
    }

    struct NoFaces;

    impl FaceEmotionClassifier for NoFaces {
        fn classify(&mut self, _image: &RasterImage) -> Result<Vec<crate::models::FaceDetection>> {
            Ok(Vec::new())
        }
    }

    fn app(initial: Option<Result<RasterImage>>) -> MoodQuoteApp<NoFaces, StdRng> {
        let pipeline = EmotionPipeline::new(
            NoFaces,
            QuoteTable::builtin().clone(),
            Annotator::default(),
            StdRng::seed_from_u64(5),
        );
        MoodQuoteApp::new(pipeline, CameraConfig::default(), initial, "emotion.onnx".to_string())
    }

    #[test]
    fn test_startup_image_error_is_shown() {
        let dir = tempfile::tempdir().unwrap();
        let initial = image_source::load_upload(dir.path().join("missing.png"));

        let app = app(Some(initial));
        assert!(app.source_error().is_some());
        assert!(!app.has_pending_image());
    }

    #[test]
    fn test_startup_image_is_queued() {
        let app = app(Some(Ok(RasterImage::new(vec![0; 4 * 4 * 3], 4, 4))));
        assert!(app.source_error().is_none());
        assert!(app.has_pending_image());

        let empty = app(None);
        assert!(empty.source_error().is_none());
        assert!(!empty.has_pending_image());
    }

    #[test]
    fn test_fit_size_keeps_aspect_ratio() {
        let fitted = fit_size(egui::vec2(960.0, 480.0), 480.0);
        assert_eq!(fitted, egui::vec2(480.0, 240.0));
        assert_eq!(fit_size(egui::vec2(100.0, 50.0), 480.0), egui::vec2(100.0, 50.0));
    }
}
