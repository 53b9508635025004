//! Replicate provider
//!
//! Runs hosted models through the Replicate predictions API: `gpt-image-1`
//! for images, Trellis for 3-D reconstruction and MiniMax for speech.
//! Predictions are created with `Prefer: wait` and then polled until they
//! reach a terminal status.

use super::http::HttpSettings;
use crate::config::SmithConfig;
use crate::provider::*;
use smith_core::{Result, SmithError};
use std::time::Duration;

const DEFAULT_REPLICATE_URL: &str = "https://api.replicate.com/v1";
const IMAGE_MODEL: &str = "openai/gpt-image-1";
const RECONSTRUCTION_MODEL: &str =
    "firtoz/trellis:e8f6c45206993f297372f5436b90350817bd9b4a0d52d2a76df50c1c8afa2b3c";
const SPEECH_MODEL: &str = "minimax/speech-02-hd";
const POLL_INTERVAL_SECS: u64 = 2;

/// Replicate client shared by the image, reconstruction and speech adapters
pub struct ReplicateProvider {
    api_token: String,
    api_url: String,
    openai_api_key: Option<String>,
    http: HttpSettings,
}

impl ReplicateProvider {
    /// Create a new ReplicateProvider from config
    pub fn from_config(config: &SmithConfig) -> Result<Self> {
        let api_token = config
            .api_key("replicate")
            .ok_or_else(|| {
                SmithError::ConfigError(
                    "Replicate API token not configured. Set REPLICATE_API_TOKEN or add to .smith/config.toml"
                        .to_string(),
                )
            })?
            .to_string();

        let api_url = config
            .api_url("replicate")
            .unwrap_or(DEFAULT_REPLICATE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_token,
            api_url,
            openai_api_key: config.api_key("openai").map(|s| s.to_string()),
            http: HttpSettings::from_config(config),
        })
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Bearer {}", self.api_token)),
            ("Content-Type", "application/json".to_string()),
            ("Prefer", "wait".to_string()),
        ]
    }

    /// Create a prediction for `model` and block until it finishes
    fn run(&self, model: &str, input: serde_json::Value) -> Result<serde_json::Value> {
        let (url, payload) = match model.split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", self.api_url),
                serde_json::json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/models/{}/predictions", self.api_url, model),
                serde_json::json!({ "input": input }),
            ),
        };

        tracing::debug!(model, "submitting prediction");
        let mut response = self.http.post_json("replicate", &url, &self.headers(), &payload)?;

        let max_polls = (self.http.timeout.as_secs() / POLL_INTERVAL_SECS).max(1);
        let mut polls = 0u64;
        loop {
            match parse_prediction(&response) {
                Prediction::Succeeded(output) => return Ok(output),
                Prediction::Failed(msg) => {
                    return Err(SmithError::remote(
                        "replicate",
                        format!("{} prediction failed: {}", model, msg),
                    ));
                }
                Prediction::Pending { poll_url } => {
                    let poll_url = poll_url.ok_or_else(|| {
                        SmithError::remote("replicate", "Pending prediction has no poll URL")
                    })?;

                    polls += 1;
                    if polls > max_polls {
                        return Err(SmithError::remote(
                            "replicate",
                            format!("{} prediction timed out after {} polls", model, max_polls),
                        ));
                    }

                    std::thread::sleep(Duration::from_secs(POLL_INTERVAL_SECS));
                    response = self.http.get_json("replicate", &poll_url, &self.headers())?;
                }
            }
        }
    }
}

impl ImageGenerator for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage> {
        let background = if request.transparent { "transparent" } else { "auto" };
        let mut input = serde_json::json!({
            "prompt": request.prompt,
            "quality": "high",
            "background": background,
            "moderation": "auto",
            "aspect_ratio": request.aspect_ratio.as_str(),
            "output_format": request.output_format,
            "number_of_images": 1,
            "output_compression": 90
        });

        if !request.reference_images.is_empty() {
            input["input_images"] = serde_json::json!(request.reference_images);
        }
        if let Some(ref key) = self.openai_api_key {
            input["openai_api_key"] = serde_json::json!(key);
        }

        let output = self.run(IMAGE_MODEL, input)?;
        image_url_from_output(&output)
            .map(GeneratedImage::Url)
            .ok_or_else(|| {
                SmithError::remote(
                    "replicate",
                    format!("Unexpected image output: {}", output),
                )
            })
    }
}

impl MeshReconstructor for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn reconstruct(&self, request: &ReconstructionRequest) -> Result<String> {
        let p = &request.params;
        let input = serde_json::json!({
            "seed": p.seed,
            "images": request.images,
            "texture_size": p.texture_size,
            "mesh_simplify": p.mesh_simplify,
            "generate_color": p.generate_color,
            "generate_model": p.generate_model,
            "randomize_seed": p.randomize_seed,
            "generate_normal": p.generate_normal,
            "save_gaussian_ply": p.save_gaussian_ply,
            "ss_sampling_steps": p.ss_sampling_steps,
            "slat_sampling_steps": p.slat_sampling_steps,
            "return_no_background": p.return_no_background,
            "ss_guidance_strength": p.ss_guidance_strength,
            "slat_guidance_strength": p.slat_guidance_strength
        });

        let output = self.run(RECONSTRUCTION_MODEL, input)?;
        model_file_from_output(&output).ok_or_else(|| {
            SmithError::remote(
                "replicate",
                format!("No model_file in reconstruction output: {}", output),
            )
        })
    }
}

impl SpeechSynthesizer for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn synthesize(&self, request: &SpeechRequest) -> Result<String> {
        let input = serde_json::json!({
            "text": request.text,
            "pitch": 0,
            "speed": 1,
            "volume": 1,
            "bitrate": 128000,
            "channel": "mono",
            "emotion": request.emotion,
            "voice_id": request.voice_id,
            "sample_rate": 32000,
            "language_boost": "English",
            "english_normalization": true
        });

        let output = self.run(SPEECH_MODEL, input)?;
        output
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                SmithError::remote("replicate", format!("Unexpected speech output: {}", output))
            })
    }
}

/// State of a prediction as reported by the API
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Pending { poll_url: Option<String> },
    Succeeded(serde_json::Value),
    Failed(String),
}

/// Interpret a prediction document
pub fn parse_prediction(response: &serde_json::Value) -> Prediction {
    let status = response
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("starting");

    match status {
        "succeeded" => Prediction::Succeeded(
            response
                .get("output")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        ),
        "failed" | "canceled" => Prediction::Failed(
            response
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or(status)
                .to_string(),
        ),
        _ => Prediction::Pending {
            poll_url: response
                .get("urls")
                .and_then(|u| u.get("get"))
                .and_then(|u| u.as_str())
                .map(|s| s.to_string()),
        },
    }
}

/// First image URL in an image model's output (a URL, a list of URLs, or
/// a list of `{url}` objects)
pub fn image_url_from_output(output: &serde_json::Value) -> Option<String> {
    let first = match output {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };

    first
        .as_str()
        .or_else(|| first.get("url").and_then(|u| u.as_str()))
        .map(|s| s.to_string())
}

/// Mesh URL in a reconstruction model's output
pub fn model_file_from_output(output: &serde_json::Value) -> Option<String> {
    output
        .get("model_file")
        .and_then(|u| u.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_succeeded_prediction() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{
                "id": "xyz",
                "status": "succeeded",
                "output": ["https://replicate.delivery/out-0.png"],
                "urls": {"get": "https://api.replicate.com/v1/predictions/xyz"}
            }"#,
        )
        .unwrap();

        match parse_prediction(&json) {
            Prediction::Succeeded(output) => {
                assert_eq!(
                    image_url_from_output(&output).unwrap(),
                    "https://replicate.delivery/out-0.png"
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_pending_prediction() {
        let json = serde_json::json!({
            "status": "processing",
            "urls": {"get": "https://api.replicate.com/v1/predictions/abc"}
        });
        assert_eq!(
            parse_prediction(&json),
            Prediction::Pending {
                poll_url: Some("https://api.replicate.com/v1/predictions/abc".to_string())
            }
        );
    }

    #[test]
    fn test_parse_failed_prediction() {
        let json = serde_json::json!({"status": "failed", "error": "CUDA out of memory"});
        assert_eq!(
            parse_prediction(&json),
            Prediction::Failed("CUDA out of memory".to_string())
        );

        let canceled = serde_json::json!({"status": "canceled"});
        assert_eq!(parse_prediction(&canceled), Prediction::Failed("canceled".to_string()));
    }

    #[test]
    fn test_image_output_shapes() {
        let objects = serde_json::json!([{"url": "https://a/1.png"}]);
        assert_eq!(image_url_from_output(&objects).unwrap(), "https://a/1.png");

        let single = serde_json::json!("https://a/2.png");
        assert_eq!(image_url_from_output(&single).unwrap(), "https://a/2.png");

        assert!(image_url_from_output(&serde_json::json!([])).is_none());
    }

    #[test]
    fn test_model_file_from_output() {
        let output = serde_json::json!({
            "model_file": "https://replicate.delivery/mesh.glb",
            "color_video": "https://replicate.delivery/turntable.mp4"
        });
        assert_eq!(
            model_file_from_output(&output).unwrap(),
            "https://replicate.delivery/mesh.glb"
        );
        assert!(model_file_from_output(&serde_json::json!({})).is_none());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let result = ReplicateProvider::from_config(&SmithConfig::default());
        assert!(matches!(result, Err(SmithError::ConfigError(_))));
    }
}
