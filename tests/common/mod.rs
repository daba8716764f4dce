//! Shared fixtures for integration tests: a scripted image model and
//! helpers for building photos and restoration contexts.
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

use photorevive::config::TickerConfig;
use photorevive::errors::ReviveError;
use photorevive::models::{InputImage, ModelResponse, ResponsePart, RestorationRequest};
use photorevive::orchestrator::RestorationContext;
use photorevive::services::{ImageModel, ImageProcessor};
use photorevive::template::RestorationTemplate;

/// What the scripted model answers with.
#[derive(Clone)]
pub enum Reply {
    Parts(Vec<ResponsePart>),
    TransportFailure(String),
}

pub struct ScriptedModel {
    pub delay: Duration,
    pub reply: Reply,
    pub requests: Mutex<Vec<RestorationRequest>>,
}

impl ScriptedModel {
    pub fn new(reply: Reply) -> Arc<Self> {
        Self::with_delay(reply, Duration::from_millis(200))
    }

    pub fn with_delay(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn image(mime_type: Option<&str>, data: &str) -> Arc<Self> {
        Self::new(Reply::Parts(vec![ResponsePart::InlineImage {
            mime_type: mime_type.map(String::from),
            data: data.to_string(),
        }]))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<RestorationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ImageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &RestorationRequest) -> Result<ModelResponse, ReviveError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Reply::Parts(parts) => Ok(ModelResponse {
                parts: parts.clone(),
            }),
            Reply::TransportFailure(message) => Err(ReviveError::Model(message.clone())),
        }
    }
}

pub fn png_bytes() -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(8, 6, Rgb([200, 180, 150]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

pub fn photo() -> InputImage {
    InputImage {
        filename: Some("grandparents-1962.png".into()),
        content_type: Some("image/png".into()),
        data: Bytes::from(png_bytes()),
    }
}

pub fn context_with(model: Option<Arc<dyn ImageModel>>, ticker: TickerConfig) -> RestorationContext {
    RestorationContext {
        model,
        processor: Arc::new(ImageProcessor::new(1 << 20)),
        template: Arc::new(RestorationTemplate::baseline()),
        ticker,
    }
}

pub fn context(model: Option<Arc<dyn ImageModel>>) -> RestorationContext {
    context_with(model, TickerConfig::default())
}

/// Short timings for tests that run on the real clock.
pub fn fast_ticker() -> TickerConfig {
    TickerConfig {
        total: Duration::from_millis(200),
        interval: Duration::from_millis(10),
        soft_cap: 90,
        grace: Duration::from_millis(20),
        demo_delay: Duration::from_millis(50),
    }
}

pub fn live(model: &Arc<ScriptedModel>) -> Option<Arc<dyn ImageModel>> {
    let model: Arc<dyn ImageModel> = model.clone();
    Some(model)
}
