// src/services/mod.rs
pub mod config_deriver;
pub mod gemini;
pub mod image_processor;

pub use config_deriver::{DerivedConfig, derive};
pub use gemini::{GeminiClient, ImageModel};
pub use image_processor::ImageProcessor;
