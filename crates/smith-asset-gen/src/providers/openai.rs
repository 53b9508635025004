//! OpenAI image provider
//!
//! Calls the images API directly. Images come back as base64 payloads,
//! which are decoded here so callers receive raw bytes.

use super::http::HttpSettings;
use crate::config::SmithConfig;
use crate::provider::*;
use base64::Engine;
use smith_core::{Result, SmithError};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const IMAGE_MODEL: &str = "gpt-image-1";

/// OpenAI provider for direct image generation
pub struct OpenAiProvider {
    api_key: String,
    api_url: String,
    http: HttpSettings,
}

impl OpenAiProvider {
    /// Create a new OpenAiProvider from config
    pub fn from_config(config: &SmithConfig) -> Result<Self> {
        let api_key = config
            .api_key("openai")
            .ok_or_else(|| {
                SmithError::ConfigError(
                    "OpenAI API key not configured. Set OPENAI_API_KEY or add to .smith/config.toml"
                        .to_string(),
                )
            })?
            .to_string();

        let api_url = config
            .api_url("openai")
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            api_url,
            http: HttpSettings::from_config(config),
        })
    }
}

impl ImageGenerator for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage> {
        if !request.reference_images.is_empty() {
            return Err(SmithError::remote(
                "openai",
                "reference images are not supported by the generations endpoint",
            ));
        }

        let size = request
            .size
            .clone()
            .unwrap_or_else(|| size_for_aspect(request.aspect_ratio).to_string());
        let background = if request.transparent { "transparent" } else { "auto" };

        let payload = serde_json::json!({
            "model": IMAGE_MODEL,
            "prompt": request.prompt,
            "size": size,
            "background": background,
            "output_format": request.output_format,
            "n": 1
        });

        let headers = [
            ("Authorization", format!("Bearer {}", self.api_key)),
            ("Content-Type", "application/json".to_string()),
        ];
        let url = format!("{}/images/generations", self.api_url);
        let response = self.http.post_json("openai", &url, &headers, &payload)?;

        parse_image_response(&response)
    }
}

/// Pixel size matching an aspect ratio
fn size_for_aspect(aspect: AspectRatio) -> &'static str {
    match aspect {
        AspectRatio::Square => "1024x1024",
        AspectRatio::Landscape => "1536x1024",
        AspectRatio::Portrait => "1024x1536",
    }
}

/// Extract the first image from an images API response
pub fn parse_image_response(response: &serde_json::Value) -> Result<GeneratedImage> {
    let first = response
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| SmithError::remote("openai", format!("No image in response: {}", response)))?;

    if let Some(b64) = first.get("b64_json").and_then(|b| b.as_str()) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| SmithError::remote("openai", format!("Invalid base64 image: {}", e)))?;
        return Ok(GeneratedImage::Inline(bytes));
    }

    first
        .get("url")
        .and_then(|u| u.as_str())
        .map(|u| GeneratedImage::Url(u.to_string()))
        .ok_or_else(|| SmithError::remote("openai", "Image entry has neither b64_json nor url"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline_image() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG fake");
        let response = serde_json::json!({"data": [{"b64_json": payload}]});

        let image = parse_image_response(&response).unwrap();
        assert_eq!(image, GeneratedImage::Inline(b"\x89PNG fake".to_vec()));
    }

    #[test]
    fn test_parse_url_image() {
        let response = serde_json::json!({"data": [{"url": "https://oai.example/img.png"}]});
        assert_eq!(
            parse_image_response(&response).unwrap(),
            GeneratedImage::Url("https://oai.example/img.png".to_string())
        );
    }

    #[test]
    fn test_parse_empty_response() {
        let response = serde_json::json!({"data": []});
        assert!(matches!(
            parse_image_response(&response),
            Err(SmithError::RemoteServiceFailure { .. })
        ));
    }

    #[test]
    fn test_invalid_base64_is_remote_failure() {
        let response = serde_json::json!({"data": [{"b64_json": "%%%not-base64"}]});
        assert!(parse_image_response(&response).is_err());
    }

    #[test]
    fn test_sizes_follow_aspect() {
        assert_eq!(size_for_aspect(AspectRatio::Landscape), "1536x1024");
        assert_eq!(size_for_aspect(AspectRatio::Square), "1024x1024");
    }
}
