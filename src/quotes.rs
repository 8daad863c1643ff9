// Quote table and random quote selection per mood

use crate::error::{EmotionDetectorError, Result};
use crate::models::MoodCategory;
use once_cell::sync::Lazy;
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

const HAPPY_QUOTES: [&str; 6] = [
    "The purpose of our lives is to be happy. — Dalai Lama",
    "Happiness is not something ready made. It comes from your own actions. — Dalai Lama",
    "For every minute you are angry you lose sixty seconds of happiness. — Emerson",
    "Happiness depends upon ourselves. — Aristotle",
    "Do more of what makes you happy.",
    "Enjoy your life—it's all that matters. — Audrey Hepburn",
];

const SAD_QUOTES: [&str; 6] = [
    "Tough times never last, but tough people do. — Schuller",
    "This too shall pass.",
    "Sometimes when you're in a dark place you've been planted. — Christine Caine",
    "The darker the night, the brighter the stars. — Dostoyevsky",
    "It's okay to not be okay.",
    "You are allowed to feel messed up and inside out.",
];

const ANGRY_QUOTES: [&str; 6] = [
    "For every minute you remain angry, you give up sixty seconds of peace. — Emerson",
    "Speak when you are angry and you'll make the best speech you regret. — Bierce",
    "You don't have to control your emotions, just don't let them control you.",
    "Anger is an acid that harms its vessel. — Mark Twain",
    "Keep calm and let wise choices lead you.",
    "The best fighter is never angry. — Lao Tzu",
];

const NEUTRAL_QUOTES: [&str; 6] = [
    "Breathe. It's only a bad day, not a bad life.",
    "Stay present. Everything else can wait.",
    "Balance is not something you find, it's something you create.",
    "Calmness is the cradle of power. — Josiah Holland",
    "Rest, reflect, renew.",
    "Small steps every day.",
];

static BUILTIN: Lazy<QuoteTable> = Lazy::new(|| {
    let lists = [
        (MoodCategory::Happy, &HAPPY_QUOTES),
        (MoodCategory::Sad, &SAD_QUOTES),
        (MoodCategory::Angry, &ANGRY_QUOTES),
        (MoodCategory::Neutral, &NEUTRAL_QUOTES),
    ]
    .into_iter()
    .map(|(mood, quotes)| (mood, quotes.iter().map(|q| q.to_string()).collect()))
    .collect();
    QuoteTable { lists }
});

/// Read-only mapping from mood to the quotes shown for it.
///
/// Every list is non-empty and a neutral list always exists, so picking
/// a quote never fails.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteTable {
    lists: HashMap<MoodCategory, Vec<String>>,
}

impl QuoteTable {
    /// The quotes shipped with the application
    pub fn builtin() -> &'static QuoteTable {
        &BUILTIN
    }

    /// Builds a table from explicit lists, rejecting empty lists and a missing neutral list
    pub fn new(lists: HashMap<MoodCategory, Vec<String>>) -> Result<Self> {
        if let Some((mood, _)) = lists.iter().find(|(_, quotes)| quotes.is_empty()) {
            return Err(EmotionDetectorError::QuoteTable(format!(
                "no quotes for \"{}\"",
                mood.as_str()
            )));
        }
        if !lists.contains_key(&MoodCategory::Neutral) {
            return Err(EmotionDetectorError::QuoteTable(
                "a \"neutral\" list is required".to_string(),
            ));
        }
        Ok(Self { lists })
    }

    /// Parses `{ "happy": [...], "neutral": [...] }`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut lists = HashMap::with_capacity(raw.len());
        for (key, quotes) in raw {
            let mood = MoodCategory::ALL
                .into_iter()
                .find(|m| m.as_str() == key.to_lowercase())
                .ok_or_else(|| {
                    EmotionDetectorError::QuoteTable(format!("unknown mood \"{key}\""))
                })?;
            lists.insert(mood, quotes);
        }
        Self::new(lists)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_json_str(&content)?;
        info!("Loaded quote table from {:?}", path.as_ref());
        Ok(table)
    }

    /// Uses the file when given, the built-in quotes otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::builtin().clone()),
        }
    }

    /// Quotes for a mood, or the neutral quotes when the mood has none
    pub fn quotes_for(&self, mood: MoodCategory) -> &[String] {
        self.lists
            .get(&mood)
            .or_else(|| self.lists.get(&MoodCategory::Neutral))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Draws one quote for the mood uniformly at random
    pub fn pick<R: Rng>(&self, mood: MoodCategory, rng: &mut R) -> &str {
        let quotes = self.quotes_for(mood);
        if quotes.is_empty() {
            return "";
        }
        &quotes[rng.random_range(0..quotes.len())]
    }
}
