//! Raster Compositor - Crop, Resize, Caption, Encode
//!
//! compose is a pure function of its inputs: same source, crop, label and size
//! always produce the same PNG bytes.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageError, ImageFormat, ImageReader, Pixel, RgbaImage};
use std::io::Cursor;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;

use crate::artifact::Artifact;
use crate::checks::{CropContext, CropInspector, NoticeSeverity};
use crate::config::IconForgeConfig;
use crate::hashing::{compute_render_key, sha256_hex};
use crate::label::LabelText;
use crate::region::CropRegion;
use crate::text::{LabelRenderer, OverlayError};

pub const DEFAULT_OUTPUT_SIZE: NonZeroU32 = match NonZeroU32::new(256) {
    Some(size) => size,
    None => unreachable!(),
};

// Bilinear: smooth at icon scale without the ringing of windowed-sinc filters.
const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Source image could not be decoded: {0}")]
    Decode(#[source] ImageError),

    #[error("Crop region {region} has no area inside the {source_width}x{source_height} source")]
    InvalidRegion {
        region: CropRegion,
        source_width: u32,
        source_height: u32,
    },

    #[error("Label overlay failed: {0}")]
    Overlay(#[from] OverlayError),

    #[error("PNG encoding failed: {0}")]
    Encode(#[source] ImageError),

    #[error("Render key error: {0}")]
    RenderKey(#[from] serde_json::Error),
}

/// A decoded upload, already turned upright according to its EXIF
/// orientation. Keeps the original bytes so history can point back at them.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: Arc<DynamicImage>,
    bytes: Arc<[u8]>,
    sha256: String,
}

impl SourceImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, ComposeError> {
        let image = decode_upright(bytes).map_err(ComposeError::Decode)?;
        Ok(Self {
            image: Arc::new(image),
            bytes: bytes.into(),
            sha256: sha256_hex(bytes),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}

pub struct Compositor {
    labels: LabelRenderer,
    inspector: CropInspector,
    aspect_tolerance: f64,
}

impl Compositor {
    pub fn new(labels: LabelRenderer) -> Self {
        Self {
            labels,
            inspector: CropInspector::new(),
            aspect_tolerance: 0.01,
        }
    }

    pub fn from_config(config: &IconForgeConfig) -> Self {
        Self {
            aspect_tolerance: config.aspect_tolerance,
            ..Self::new(LabelRenderer::new(&config.fonts))
        }
    }

    pub fn labels(&self) -> &LabelRenderer {
        &self.labels
    }

    /// Crop, scale to `output_size` square, draw the caption, encode as PNG.
    pub fn compose(
        &self,
        source: &SourceImage,
        crop: CropRegion,
        label: &LabelText,
        output_size: NonZeroU32,
    ) -> Result<Artifact, ComposeError> {
        let (width, height) = (source.width(), source.height());
        let region = crop.clamp_to(width, height).ok_or(ComposeError::InvalidRegion {
            region: crop,
            source_width: width,
            source_height: height,
        })?;

        let notices = self.inspector.inspect(&CropContext {
            source_size: (width, height),
            requested: crop,
            effective: region,
            output_size: output_size.get(),
            aspect_tolerance: self.aspect_tolerance,
        });
        for notice in &notices {
            match notice.severity {
                NoticeSeverity::Warning => tracing::warn!("{}: {}", notice.check, notice.message),
                NoticeSeverity::Info => tracing::debug!("{}: {}", notice.check, notice.message),
            }
        }

        let mut canvas = scale_region(&source.image, region, output_size);

        if let Some(text) = label.rendered() {
            let layer = self.labels.render(&text, output_size)?;
            blend_layer(&mut canvas, &layer);
        }

        let png = encode_png(canvas)?;
        let render_key = compute_render_key(source.sha256(), &crop, label, output_size.get())?;
        tracing::debug!(
            "Composed {}x{} artifact from region {} ({} bytes)",
            output_size,
            output_size,
            region,
            png.len()
        );

        Ok(Artifact::new(png, output_size.get(), render_key, notices))
    }

    /// Decode and compose in one step.
    pub fn compose_bytes(
        &self,
        source: &[u8],
        crop: CropRegion,
        label: &LabelText,
        output_size: NonZeroU32,
    ) -> Result<Artifact, ComposeError> {
        let source = SourceImage::decode(source)?;
        self.compose(&source, crop, label, output_size)
    }
}

/// Crop coordinates refer to the image as displayed, so the stored
/// orientation is applied before anything else sees the pixels.
fn decode_upright(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?;
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// The clamped region resized to a square, with no overlay.
pub fn scale_region(
    image: &DynamicImage,
    region: CropRegion,
    output_size: NonZeroU32,
) -> RgbaImage {
    let cropped = image
        .crop_imm(region.x, region.y, region.width, region.height)
        .to_rgba8();
    imageops::resize(&cropped, output_size.get(), output_size.get(), RESAMPLE_FILTER)
}

fn blend_layer(canvas: &mut RgbaImage, layer: &RgbaImage) {
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        if src[3] > 0 {
            dst.blend(src);
        }
    }
}

fn encode_png(canvas: RgbaImage) -> Result<Vec<u8>, ComposeError> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(ComposeError::Encode)?;
    Ok(out.into_inner())
}
