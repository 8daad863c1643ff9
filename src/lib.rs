// Library exports for Mood Quote Detector

pub mod args;
pub mod camera;
pub mod config;
pub mod emotion;
pub mod error;
pub mod image_source;
pub mod models;
pub mod overlay;
pub mod pipeline;
pub mod quotes;
pub mod reduction;
pub mod ui;
