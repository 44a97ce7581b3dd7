use super::*;
use crate::prompts::catalog_index;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Offline generator used when no API key is configured.
///
/// Draws a colored card labelled with the prompt's catalog number, never the
/// prompt text itself, so the guessing game still works in development.
pub struct PlaceholderProvider;

const PALETTE: &[&str] = &[
    "#e76f51", "#2a9d8f", "#e9c46a", "#264653", "#f4a261", "#8ab17d", "#6d597a", "#b56576",
];

fn render_svg(prompt: &str) -> String {
    let label = match catalog_index(prompt) {
        Some(index) => format!("#{}", index + 1),
        None => "?".to_string(),
    };
    let seed = prompt.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    let color = PALETTE[seed % PALETTE.len()];

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"512\" height=\"512\">\
         <rect width=\"512\" height=\"512\" fill=\"{}\"/>\
         <text x=\"256\" y=\"280\" font-size=\"96\" text-anchor=\"middle\" fill=\"#ffffff\">{}</text>\
         </svg>",
        color, label
    )
}

#[async_trait]
impl ImageGenerator for PlaceholderProvider {
    async fn generate(&self, request: ImageRequest) -> ImageResult<GeneratedImage> {
        let svg = render_svg(&request.prompt);
        Ok(GeneratedImage {
            data_url: format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)),
            metadata: ImageMetadata {
                provider: "placeholder".to_string(),
                model: "svg".to_string(),
                latency_ms: 0,
            },
        })
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_placeholder_hides_prompt_text() {
        let image = PlaceholderProvider
            .generate(ImageRequest {
                prompt: "red car".to_string(),
                timeout: Duration::from_secs(1),
            })
            .await
            .unwrap();

        let payload = image
            .data_url
            .strip_prefix("data:image/svg+xml;base64,")
            .unwrap();
        let svg = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
        assert!(svg.contains("#11"));
        assert!(!svg.contains("red car"));
    }
}
