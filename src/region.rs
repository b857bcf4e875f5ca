//! Crop Regions - Source-Pixel Rectangles
//!
//! The crop UI hands us rectangles in source pixel units. Nothing guarantees
//! they lie inside the image, so the compositor clamps them here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionParseError {
    #[error("Expected x,y,width,height but got {0:?}")]
    WrongArity(String),

    #[error("Invalid coordinate {0:?}")]
    InvalidNumber(String),

    #[error("Crop width and height must be greater than zero")]
    ZeroSize,
}

impl CropRegion {
    /// Build a region; `None` when either side is zero.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { x, y, width, height })
    }

    /// Largest centered square that fits a `width` x `height` image.
    pub fn centered_square(width: u32, height: u32) -> Option<Self> {
        let side = width.min(height);
        Self::new((width - side) / 2, (height - side) / 2, side, side)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Intersection with the `bounds_w` x `bounds_h` rectangle anchored at the origin.
    ///
    /// Returns `None` when the intersection has zero area.
    pub fn clamp_to(&self, bounds_w: u32, bounds_h: u32) -> Option<Self> {
        let x0 = self.x.min(bounds_w);
        let y0 = self.y.min(bounds_h);
        let x1 = self.x.saturating_add(self.width).min(bounds_w);
        let y1 = self.y.saturating_add(self.height).min(bounds_h);

        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn fits_within(&self, bounds_w: u32, bounds_h: u32) -> bool {
        self.clamp_to(bounds_w, bounds_h) == Some(*self)
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for CropRegion {
    type Err = RegionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(RegionParseError::WrongArity(s.to_string()));
        }

        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| RegionParseError::InvalidNumber(part.to_string()))?;
        }

        let [x, y, width, height] = values;
        Self::new(x, y, width, height).ok_or(RegionParseError::ZeroSize)
    }
}
