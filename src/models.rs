// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::{FailureReason, ReviveError};

/// The four restoration toggles picked on the selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet {
    pub basic: bool,
    pub advanced: bool,
    pub colorize: bool,
    pub hd: bool,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            basic: true,
            advanced: false,
            colorize: false,
            hd: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionFlag {
    Basic,
    Advanced,
    Colorize,
    Hd,
}

impl OptionSet {
    /// Flips one flag. Switching basic on clears advanced and the other way round.
    pub fn toggle(&mut self, flag: OptionFlag) {
        match flag {
            OptionFlag::Basic => {
                self.basic = !self.basic;
                if self.basic {
                    self.advanced = false;
                }
            }
            OptionFlag::Advanced => {
                self.advanced = !self.advanced;
                if self.advanced {
                    self.basic = false;
                }
            }
            OptionFlag::Colorize => self.colorize = !self.colorize,
            OptionFlag::Hd => self.hd = !self.hd,
        }
    }

    /// Advanced wins when both modes are set; neither set means basic.
    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.colorize {
            labels.push("colorize");
        }
        if self.hd {
            labels.push("hd");
        }
        if self.advanced {
            labels.push("advanced");
        }
        labels
    }
}

/// A displayable image: either a remote URL or inline base64 data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageReference {
    Url { url: String },
    Data { mime_type: String, data: String },
}

impl ImageReference {
    pub fn url(url: impl Into<String>) -> Self {
        ImageReference::Url { url: url.into() }
    }

    pub fn media_type(&self) -> Option<&str> {
        match self {
            ImageReference::Url { .. } => None,
            ImageReference::Data { mime_type, .. } => Some(mime_type),
        }
    }

    /// Value usable directly as an `<img src>`.
    pub fn to_src(&self) -> String {
        match self {
            ImageReference::Url { url } => url.clone(),
            ImageReference::Data { mime_type, data } => {
                format!("data:{};base64,{}", mime_type, data)
            }
        }
    }

    pub fn decode(&self) -> Result<Option<Vec<u8>>, ReviveError> {
        match self {
            ImageReference::Url { .. } => Ok(None),
            ImageReference::Data { data, .. } => general_purpose::STANDARD
                .decode(data)
                .map(Some)
                .map_err(|e| ReviveError::ImageProcessing(format!("Failed to decode image: {}", e))),
        }
    }
}

/// Raw photo as handed over by the presentation layer.
#[derive(Debug, Clone)]
pub struct InputImage {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Photo in transmissible form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

impl EncodedImage {
    pub fn into_reference(self) -> ImageReference {
        ImageReference::Data {
            mime_type: self.mime_type,
            data: self.data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestorationRequest {
    pub image: EncodedImage,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    InlineImage {
        mime_type: Option<String>,
        data: String,
    },
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub parts: Vec<ResponsePart>,
}

impl ModelResponse {
    pub fn first_image(&self) -> Option<ImageReference> {
        self.parts.iter().find_map(|part| match part {
            ResponsePart::InlineImage { mime_type, data } => Some(ImageReference::Data {
                mime_type: mime_type
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "image/png".to_string()),
                data: data.clone(),
            }),
            ResponsePart::Text(_) => None,
        })
    }

    /// All text parts joined, or `None` when there is no text at all.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts
            .iter()
            .filter_map(|part| match part {
                ResponsePart::Text(t) => Some(t.as_str()),
                ResponsePart::InlineImage { .. } => None,
            })
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }

    /// An image part whose payload is not valid base64 is a model fault,
    /// reported as `ApiError` rather than handed on as a result.
    pub fn into_outcome(self) -> RestorationOutcome {
        if let Some(image) = self.first_image() {
            return match image.decode() {
                Ok(_) => RestorationOutcome::Success(image),
                Err(e) => RestorationOutcome::Failure(FailureReason::ApiError(format!(
                    "Model returned unusable image data: {}",
                    e
                ))),
            };
        }
        match self.text() {
            Some(text) => RestorationOutcome::Failure(FailureReason::ModelReturnedTextOnly(text)),
            None => RestorationOutcome::Failure(FailureReason::NoImageData),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub percent: u8,
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RestorationOutcome {
    Success(ImageReference),
    Failure(FailureReason),
}

impl RestorationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RestorationOutcome::Success(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Failed | RunPhase::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Progress(ProgressState),
    Finished(RestorationOutcome),
}
