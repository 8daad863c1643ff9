// Core data models for the Mood Quote Detector application

use image::{DynamicImage, RgbImage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-label emotion confidence scores, in the classifier's output order
pub type EmotionScores = IndexMap<String, f32>;

/// A decoded still image with RGB pixel data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    /// Raw RGB pixel data (width * height * 3 bytes)
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl RasterImage {
    /// Creates a new RasterImage with the given parameters
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Converts any decoded image to 8-bit RGB
    pub fn from_dynamic_image(img: DynamicImage) -> Self {
        Self::from_rgb_image(img.to_rgb8())
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height)
    }

    /// Returns an owned `image` buffer, or None if the data length does not match
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// Face location in pixel coordinates, origin top-left
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }

    /// Bottom-right corner `(x + w, y + h)`, which may lie beyond `i32`
    pub fn bottom_right(&self) -> (i64, i64) {
        (
            i64::from(self.x) + i64::from(self.w),
            i64::from(self.y) + i64::from(self.h),
        )
    }
}

/// One detected face with its emotion scores
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    pub emotions: EmotionScores,
}

impl FaceDetection {
    pub fn new(bbox: BoundingBox, emotions: EmotionScores) -> Self {
        Self { bbox, emotions }
    }
}

/// Coarse mood bucket shown to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Happy,
    Sad,
    Angry,
    Neutral,
}

impl MoodCategory {
    pub const ALL: [MoodCategory; 4] = [
        MoodCategory::Happy,
        MoodCategory::Sad,
        MoodCategory::Angry,
        MoodCategory::Neutral,
    ];

    /// Maps a raw classifier label onto a mood. Unrecognized labels are neutral.
    pub fn from_raw_label(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "angry" | "disgust" => MoodCategory::Angry,
            "sad" | "fear" => MoodCategory::Sad,
            "happy" => MoodCategory::Happy,
            "neutral" | "surprise" => MoodCategory::Neutral,
            _ => MoodCategory::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCategory::Happy => "happy",
            MoodCategory::Sad => "sad",
            MoodCategory::Angry => "angry",
            MoodCategory::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for MoodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoodCategory::Happy => write!(f, "Happy"),
            MoodCategory::Sad => write!(f, "Sad"),
            MoodCategory::Angry => write!(f, "Angry"),
            MoodCategory::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Outcome of reducing one image's detections to a single mood and quote
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionResult {
    /// The most prominent face (largest box)
    pub main_face: FaceDetection,
    /// Emotion scores of the main face, highest first
    pub ranked_emotions: Vec<(String, f32)>,
    /// Mood derived from the top-ranked label
    pub category: MoodCategory,
    pub quote: String,
}

impl SelectionResult {
    /// The top-ranked raw label and its score
    pub fn dominant(&self) -> Option<(&str, f32)> {
        self.ranked_emotions
            .first()
            .map(|(label, score)| (label.as_str(), *score))
    }

    /// Text drawn next to the face box, e.g. `Happy (0.81)`
    pub fn overlay_label(&self) -> String {
        let score = self.dominant().map(|(_, s)| s).unwrap_or(0.0);
        format!("{} ({:.2})", self.category, score)
    }
}

/// Upper-cases the first character of a label for display
pub fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
