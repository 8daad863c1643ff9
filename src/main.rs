use clap::Parser;
use mood_quote_detector::args::Args;
use mood_quote_detector::config::{AppConfig, ConfigSource};
use mood_quote_detector::emotion::OnnxEmotionClassifier;
use mood_quote_detector::error::{EmotionDetectorError, Result};
use mood_quote_detector::image_source;
use mood_quote_detector::overlay::Annotator;
use mood_quote_detector::pipeline::EmotionPipeline;
use mood_quote_detector::quotes::QuoteTable;
use mood_quote_detector::ui::MoodQuoteApp;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the logging system (file only, no console output)
fn init_logging(log_file: &Path) -> Result<()> {
    let log_file = std::fs::File::create(log_file).map_err(EmotionDetectorError::Io)?;

    let file_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);

    tracing_subscriber::registry().with(file_layer).init();

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (mut config, source) = AppConfig::load(&args.config)?;
    if let Some(index) = args.camera_index {
        config.camera.index = index;
    }

    init_logging(&config.log_file)?;
    match source {
        ConfigSource::File => info!("Loaded configuration from {:?}", args.config),
        ConfigSource::Missing => {
            info!("Configuration file {:?} not found, using defaults", args.config)
        }
        ConfigSource::Invalid(warning) => warn!("{}. Loading defaults.", warning),
    }

    let quotes = QuoteTable::load(config.quotes_path.as_deref())?;
    let annotator = Annotator::new(&config.overlay);
    let model_name = config
        .classifier
        .model_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "emotion.onnx".to_string());

    let classifier = OnnxEmotionClassifier::new(config.classifier.clone());
    let pipeline = EmotionPipeline::new(classifier, quotes, annotator, rand::rng());

    // A bad startup image opens the app with the error shown
    let initial = args.image.as_ref().map(|path| {
        image_source::load_upload(path)
            .inspect_err(|e| error!("Failed to load startup image {:?}: {}", path, e))
    });

    let camera_settings = config.camera.clone();
    let result = eframe::run_native(
        "Facial Emotion Detection",
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1100.0, 900.0])
                .with_title("Facial Emotion Detection")
                .with_drag_and_drop(true),
            ..Default::default()
        },
        Box::new(move |_cc| {
            Ok(Box::new(MoodQuoteApp::new(
                pipeline,
                camera_settings,
                initial,
                model_name,
            )))
        }),
    );

    if let Err(e) = result {
        error!("Application error: {}", e);
    }

    Ok(())
}
