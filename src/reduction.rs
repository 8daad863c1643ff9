// Reduction of classifier output to a single face and a ranked emotion list

use crate::models::{EmotionScores, FaceDetection};

/// Picks the face with the largest box. The first face wins on equal areas.
pub fn select_main_face(faces: &[FaceDetection]) -> Option<&FaceDetection> {
    faces.iter().reduce(|best, face| {
        if face.bbox.area() > best.bbox.area() {
            face
        } else {
            best
        }
    })
}

/// Sorts emotion scores highest first, keeping the original order among equal scores
pub fn rank_emotions(emotions: &EmotionScores) -> Vec<(String, f32)> {
    let mut ranked: Vec<(String, f32)> = emotions
        .iter()
        .map(|(label, score)| (label.clone(), *score))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}
