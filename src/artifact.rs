//! Artifacts - Immutable Composited Icons

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::checks::CropNotice;
use crate::hashing::sha256_hex;

/// A composited square PNG.
///
/// Cloning shares the encoded bytes; a new composition is always a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    png: Arc<[u8]>,
    size: u32,
    sha256: String,
    render_key: String,
    notices: Vec<CropNotice>,
}

impl Artifact {
    pub(crate) fn new(
        png: Vec<u8>,
        size: u32,
        render_key: String,
        notices: Vec<CropNotice>,
    ) -> Self {
        let sha256 = sha256_hex(&png);
        Self {
            png: png.into(),
            size,
            sha256,
            render_key,
            notices,
        }
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// Edge length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Digest of the inputs that produced this artifact.
    pub fn render_key(&self) -> &str {
        &self.render_key
    }

    pub fn notices(&self) -> &[CropNotice] {
        &self.notices
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            size: [self.size, self.size],
            format: "png".to_string(),
            bytes: self.png.len(),
            sha256: self.sha256.clone(),
            notices: self.notices.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub size: [u32; 2],
    pub format: String,
    pub bytes: usize,
    pub sha256: String,
    pub notices: Vec<CropNotice>,
}
