// src/services/gemini.rs
use crate::errors::ReviveError;
use crate::models::{ModelResponse, ResponsePart, RestorationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// The external generative-image service.
#[async_trait]
pub trait ImageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Sends one request. Transport and service-side failures are `Err`.
    async fn generate(&self, request: &RestorationRequest) -> Result<ModelResponse, ReviveError>;
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn request_body(request: &RestorationRequest) -> Value {
        json!({
            "contents": {
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": request.image.mime_type,
                            "data": request.image.data
                        }
                    },
                    {
                        "text": request.instruction
                    }
                ]
            }
        })
    }

    fn parse_response(result: &Value) -> Result<ModelResponse, ReviveError> {
        if let Some(message) = result["error"]["message"].as_str() {
            return Err(ReviveError::Model(format!("Gemini error: {}", message)));
        }

        let parts = result["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|arr| arr.iter().filter_map(Self::parse_part).collect())
            .unwrap_or_default();

        Ok(ModelResponse { parts })
    }

    fn parse_part(part: &Value) -> Option<ResponsePart> {
        if let Some(data) = part["inlineData"]["data"].as_str() {
            return Some(ResponsePart::InlineImage {
                mime_type: part["inlineData"]["mimeType"].as_str().map(String::from),
                data: data.to_string(),
            });
        }
        part["text"]
            .as_str()
            .map(|text| ResponsePart::Text(text.to_string()))
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &RestorationRequest) -> Result<ModelResponse, ReviveError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| ReviveError::Model(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReviveError::Model(format!(
                "Gemini error ({}): {}",
                status, error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| ReviveError::Model(format!("Failed to parse Gemini response: {}", e)))?;

        Self::parse_response(&result)
    }
}
