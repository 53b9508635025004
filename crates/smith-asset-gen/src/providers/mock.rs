//! Mock services for testing
//!
//! Implements every service contract without network access. Images are
//! solid-color PNGs, meshes are a minimal GLB and speech is a stub MP3
//! frame. Each call is counted and can be made to fail on demand.

use crate::provider::*;
use smith_core::{Result, SmithError};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// The service calls the mock can count and fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    Image,
    Reconstruct,
    Fetch,
    Convert,
    Speech,
}

/// Offline stand-in for every external service
pub struct MockServices {
    art_width: u32,
    art_height: u32,
    inline_images: bool,
    failing: HashSet<MockCall>,
    failing_prompts: Vec<String>,
    failing_urls: Vec<String>,
    image_calls: AtomicUsize,
    reconstruct_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    convert_calls: AtomicUsize,
    speech_calls: AtomicUsize,
    image_requests: Mutex<Vec<ImageRequest>>,
    reconstruction_requests: Mutex<Vec<ReconstructionRequest>>,
}

impl Default for MockServices {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServices {
    pub fn new() -> Self {
        Self {
            art_width: 64,
            art_height: 64,
            inline_images: false,
            failing: HashSet::new(),
            failing_prompts: Vec::new(),
            failing_urls: Vec::new(),
            image_calls: AtomicUsize::new(0),
            reconstruct_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            convert_calls: AtomicUsize::new(0),
            speech_calls: AtomicUsize::new(0),
            image_requests: Mutex::new(Vec::new()),
            reconstruction_requests: Mutex::new(Vec::new()),
        }
    }

    /// Dimensions of the PNGs served for downloaded images
    pub fn with_art_size(mut self, width: u32, height: u32) -> Self {
        self.art_width = width.max(1);
        self.art_height = height.max(1);
        self
    }

    /// Return generated images inline instead of by URL
    pub fn with_inline_images(mut self) -> Self {
        self.inline_images = true;
        self
    }

    /// Make every call of this kind fail
    pub fn with_failure(mut self, call: MockCall) -> Self {
        self.failing.insert(call);
        self
    }

    /// Make image calls fail when the prompt contains `fragment`
    pub fn with_failing_prompt(mut self, fragment: impl Into<String>) -> Self {
        self.failing_prompts.push(fragment.into());
        self
    }

    /// Make fetches fail when the URL contains `fragment`
    pub fn with_failing_url(mut self, fragment: impl Into<String>) -> Self {
        self.failing_urls.push(fragment.into());
        self
    }

    /// Number of calls made to one service
    pub fn calls(&self, call: MockCall) -> usize {
        self.counter(call).load(Ordering::SeqCst)
    }

    /// Number of calls made to all services
    pub fn total_calls(&self) -> usize {
        [
            MockCall::Image,
            MockCall::Reconstruct,
            MockCall::Fetch,
            MockCall::Convert,
            MockCall::Speech,
        ]
        .iter()
        .map(|c| self.calls(*c))
        .sum()
    }

    /// Image requests received so far, in call order
    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.image_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reconstruction requests received so far, in call order
    pub fn reconstruction_requests(&self) -> Vec<ReconstructionRequest> {
        self.reconstruction_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn counter(&self, call: MockCall) -> &AtomicUsize {
        match call {
            MockCall::Image => &self.image_calls,
            MockCall::Reconstruct => &self.reconstruct_calls,
            MockCall::Fetch => &self.fetch_calls,
            MockCall::Convert => &self.convert_calls,
            MockCall::Speech => &self.speech_calls,
        }
    }

    /// Count the call and return its sequence number
    fn record(&self, call: MockCall) -> Result<usize> {
        let n = self.counter(call).fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&call) {
            return Err(SmithError::remote("mock", format!("{:?} call {} failed", call, n)));
        }
        Ok(n)
    }
}

impl ImageGenerator for MockServices {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage> {
        let n = self.record(MockCall::Image)?;
        self.image_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if let Some(fragment) = self
            .failing_prompts
            .iter()
            .find(|f| request.prompt.contains(f.as_str()))
        {
            return Err(SmithError::remote(
                "mock",
                format!("prompt rejected (contains '{}')", fragment),
            ));
        }

        if self.inline_images {
            return Ok(GeneratedImage::Inline(solid_png(
                &request.prompt,
                self.art_width,
                self.art_height,
            )?));
        }
        Ok(GeneratedImage::Url(format!("mock://images/{}.png", n)))
    }
}

impl MeshReconstructor for MockServices {
    fn name(&self) -> &str {
        "mock"
    }

    fn reconstruct(&self, request: &ReconstructionRequest) -> Result<String> {
        let n = self.record(MockCall::Reconstruct)?;
        self.reconstruction_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        Ok(format!("mock://meshes/{}.glb", n))
    }
}

impl Fetcher for MockServices {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.record(MockCall::Fetch)
            .map_err(|e| SmithError::download(url, e.to_string()))?;

        if let Some(fragment) = self.failing_urls.iter().find(|f| url.contains(f.as_str())) {
            return Err(SmithError::download(
                url,
                format!("connection reset (url contains '{}')", fragment),
            ));
        }

        if url.ends_with(".glb") {
            Ok(minimal_glb()?)
        } else if url.ends_with(".mp3") {
            Ok(silent_mp3_frame())
        } else {
            solid_png(url, self.art_width, self.art_height)
        }
    }
}

impl MeshConverter for MockServices {
    fn convert(&self, input: &Path, format: &str) -> Result<PathBuf> {
        self.record(MockCall::Convert)
            .map_err(|e| SmithError::ConversionFailure(e.to_string()))?;

        let output = input.with_extension(format);
        std::fs::copy(input, &output)?;
        Ok(output)
    }
}

impl SpeechSynthesizer for MockServices {
    fn name(&self) -> &str {
        "mock"
    }

    fn synthesize(&self, _request: &SpeechRequest) -> Result<String> {
        let n = self.record(MockCall::Speech)?;
        Ok(format!("mock://voices/{}.mp3", n))
    }
}

/// Encode a solid-color PNG whose color is derived from `seed`
pub fn solid_png(seed: &str, width: u32, height: u32) -> Result<Vec<u8>> {
    // Warm, earthy color from the seed hash
    let hash_val = seed
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    let r = ((hash_val >> 16) & 0xFF) as u8;
    let g = ((hash_val >> 8) & 0xFF) as u8;
    let b = (hash_val & 0xFF) as u8;

    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([r, g, b, 255]));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|e| SmithError::remote("mock", format!("Failed to encode PNG: {}", e)))?;
    Ok(bytes.into_inner())
}

/// A minimal valid glTF 2.0 binary holding a single triangle
pub fn minimal_glb() -> Result<Vec<u8>> {
    let json = serde_json::json!({
        "asset": { "version": "2.0", "generator": "smith-mock" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0 },
                "indices": 1
            }]
        }],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "max": [1.0, 1.0, 0.0],
                "min": [-1.0, 0.0, 0.0]
            },
            {
                "bufferView": 1,
                "componentType": 5123,
                "count": 3,
                "type": "SCALAR",
                "max": [2],
                "min": [0]
            }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "buffers": [{ "byteLength": 44 }]
    });

    let mut json_chunk = serde_json::to_vec(&json)?;
    json_chunk.resize((json_chunk.len() + 3) & !3, b' ');

    let vertices: [f32; 9] = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin_chunk = Vec::with_capacity(44);
    for v in &vertices {
        bin_chunk.extend_from_slice(&v.to_le_bytes());
    }
    for i in &indices {
        bin_chunk.extend_from_slice(&i.to_le_bytes());
    }
    bin_chunk.resize((bin_chunk.len() + 3) & !3, 0);

    let total_len = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut glb = Vec::with_capacity(total_len);

    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_len as u32).to_le_bytes());

    glb.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(&json_chunk);

    glb.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
    glb.extend_from_slice(&bin_chunk);

    Ok(glb)
}

/// One silent MPEG-1 Layer III frame (128 kbps, 32 kHz, mono)
fn silent_mp3_frame() -> Vec<u8> {
    let mut frame = vec![0xFF, 0xFB, 0x98, 0xC4];
    // 144 * 128000 / 32000 bytes per frame
    frame.resize(576, 0);
    frame
}
