// src/lib.rs
use std::sync::Arc;

pub mod config;
pub mod demo;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod services;
pub mod template;

use crate::registry::RunRegistry;
use crate::services::ImageProcessor;

#[derive(Clone)]
pub struct AppState {
    pub registry: RunRegistry,
    pub image_processor: Arc<ImageProcessor>,
}
