use super::*;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Hosted Imagen `:predict` endpoint
pub struct ImagenProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ImagenProvider {
    pub fn new(base_url: String, api_key: String, model: String) -> ImageResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ImageError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key,
            model,
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:predict", self.base_url, model)
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: PredictInstance<'a>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

/// Wrap a base64 payload into a data URL after checking it decodes
fn to_data_url(mime_type: &str, payload: &str) -> ImageResult<String> {
    STANDARD
        .decode(payload)
        .map_err(|e| ImageError::ParseError(format!("Invalid image payload: {}", e)))?;
    Ok(format!("data:{};base64,{}", mime_type, payload))
}

#[async_trait]
impl ImageGenerator for ImagenProvider {
    async fn generate(&self, request: ImageRequest) -> ImageResult<GeneratedImage> {
        let start = Instant::now();

        let body = PredictRequest {
            instances: PredictInstance {
                prompt: &request.prompt,
            },
            parameters: PredictParameters { sample_count: 1 },
        };

        let call = self
            .client
            .post(self.endpoint(&self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send();

        let response = tokio::time::timeout(request.timeout, call)
            .await
            .map_err(|_| ImageError::Timeout(request.timeout))?
            .map_err(|e| ImageError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ImageError::ApiError(format!(
                "Imagen returned {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| ImageError::ParseError(e.to_string()))?;

        let prediction = parsed
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| ImageError::ParseError("No predictions in response".to_string()))?;
        let payload = prediction
            .bytes_base64_encoded
            .ok_or_else(|| ImageError::ParseError("Prediction carries no image".to_string()))?;
        let mime_type = prediction.mime_type.as_deref().unwrap_or("image/png");

        let data_url = to_data_url(mime_type, &payload)?;
        let latency_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(model = %self.model, latency_ms, "Image generated");

        Ok(GeneratedImage {
            data_url,
            metadata: ImageMetadata {
                provider: "imagen".to_string(),
                model: self.model.clone(),
                latency_ms,
            },
        })
    }

    fn name(&self) -> &str {
        "imagen"
    }
}
