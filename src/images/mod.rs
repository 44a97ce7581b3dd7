mod imagen;
mod placeholder;

use crate::config::non_empty_var;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use imagen::ImagenProvider;
pub use placeholder::PlaceholderProvider;

/// Result type for image generation
pub type ImageResult<T> = Result<T, ImageError>;

/// Errors that can occur while generating an image
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// Request to turn a prompt into an image
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub timeout: Duration,
}

/// An image ready to embed in a page
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// `data:` URL with the base64 payload
    pub data_url: String,
    pub metadata: ImageMetadata,
}

#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub provider: String,
    pub model: String,
    /// Latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all image generators must implement
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image for the given prompt
    async fn generate(&self, request: ImageRequest) -> ImageResult<GeneratedImage>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Configuration for image generation
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// API key for the hosted generator (None = offline placeholder images)
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "imagen-3.0-generate-002";

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ImageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: non_empty_var("IMAGE_API_KEY"),
            base_url: non_empty_var("IMAGE_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            model: non_empty_var("IMAGE_MODEL").unwrap_or(defaults.model),
            timeout: non_empty_var("IMAGE_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Build the configured generator, falling back to placeholders without a key
    pub fn build_generator(&self) -> ImageResult<Arc<dyn ImageGenerator>> {
        match &self.api_key {
            Some(api_key) => Ok(Arc::new(ImagenProvider::new(
                self.base_url.clone(),
                api_key.clone(),
                self.model.clone(),
            )?)),
            None => {
                tracing::warn!(
                    "IMAGE_API_KEY not set, rounds will use placeholder images"
                );
                Ok(Arc::new(PlaceholderProvider))
            }
        }
    }
}
