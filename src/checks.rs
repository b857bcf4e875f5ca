//! Crop Checks - Rule/Notice Separation
//!
//! Checks describe what composition does to a crop region.
//! They produce notices; they never block composition.

use serde::{Deserialize, Serialize};

use crate::region::CropRegion;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropNotice {
    pub check: String,
    pub severity: NoticeSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// What a check gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct CropContext {
    pub source_size: (u32, u32),
    pub requested: CropRegion,
    pub effective: CropRegion,
    pub output_size: u32,
    pub aspect_tolerance: f64,
}

/// Crop check trait - produces notices
pub trait CropCheck {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &CropContext) -> Vec<CropNotice>;
}

// --- Concrete Checks ---

pub struct ClampCheck;

impl CropCheck for ClampCheck {
    fn name(&self) -> &'static str { "clamped" }

    fn check(&self, ctx: &CropContext) -> Vec<CropNotice> {
        if ctx.requested == ctx.effective {
            return vec![];
        }

        vec![CropNotice {
            check: self.name().to_string(),
            severity: NoticeSeverity::Warning,
            message: "Crop region exceeds source bounds and was clamped".to_string(),
            expected: Some(format!("within {}x{}", ctx.source_size.0, ctx.source_size.1)),
            actual: Some(ctx.requested.to_string()),
        }]
    }
}

pub struct UpscaleCheck;

impl CropCheck for UpscaleCheck {
    fn name(&self) -> &'static str { "upscale" }

    fn check(&self, ctx: &CropContext) -> Vec<CropNotice> {
        let region = ctx.effective;
        if region.width >= ctx.output_size && region.height >= ctx.output_size {
            return vec![];
        }

        vec![CropNotice {
            check: self.name().to_string(),
            severity: NoticeSeverity::Warning,
            message: "Crop region is smaller than the icon and will be upscaled".to_string(),
            expected: Some(format!("{}x{} minimum", ctx.output_size, ctx.output_size)),
            actual: Some(format!("{}x{}", region.width, region.height)),
        }]
    }
}

pub struct AspectCheck;

impl CropCheck for AspectCheck {
    fn name(&self) -> &'static str { "aspect" }

    fn check(&self, ctx: &CropContext) -> Vec<CropNotice> {
        let region = ctx.effective;
        let actual = f64::from(region.width) / f64::from(region.height);

        if (actual - 1.0).abs() <= ctx.aspect_tolerance {
            return vec![];
        }

        vec![CropNotice {
            check: self.name().to_string(),
            severity: NoticeSeverity::Info,
            message: "Non-square crop region will be stretched to 1:1".to_string(),
            expected: Some("1:1".to_string()),
            actual: Some(format!("{:.3}", actual)),
        }]
    }
}

/// Runs every check in order
pub struct CropInspector {
    checks: Vec<Box<dyn CropCheck + Send + Sync>>,
}

impl CropInspector {
    pub fn new() -> Self {
        Self {
            checks: vec![
                Box::new(ClampCheck),
                Box::new(UpscaleCheck),
                Box::new(AspectCheck),
            ],
        }
    }

    pub fn inspect(&self, ctx: &CropContext) -> Vec<CropNotice> {
        self.checks.iter().flat_map(|c| c.check(ctx)).collect()
    }
}

impl Default for CropInspector {
    fn default() -> Self {
        Self::new()
    }
}
