//! Label Rendering - Outlined Caption Layer
//!
//! Captions are laid out as a small SVG document and rasterized with resvg,
//! which gives us font matching, glyph outlines and stroking in one place.
//! The result is a transparent layer the compositor blends over the crop.

use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg, usvg::fontdb};
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;

use crate::config::FontConfig;

/// Heaviest CSS weight; font matching falls back to the closest face.
pub const FONT_WEIGHT: u16 = 900;

/// Family of the face compiled into the crate.
pub const BUNDLED_FAMILY: &str = "DejaVu Sans";

static BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

const FONT_SIZE_RATIO: f32 = 0.45;
const RIGHT_MARGIN_RATIO: f32 = 0.05;
const BASELINE_BLEED_RATIO: f32 = 0.02;
const STROKE_WIDTH_RATIO: f32 = 0.08;
// Matches the 2D canvas default so joins look the same as the browser preview.
const STROKE_MITER_LIMIT: f32 = 10.0;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Overlay document rejected: {0}")]
    Document(#[from] usvg::Error),

    #[error("Cannot allocate a {0}x{0} overlay")]
    Allocation(u32),

    #[error("No font face matches family '{0}'")]
    MissingFace(String),

    #[error("Caption {0:?} produced no visible pixels")]
    NothingDrawn(String),
}

/// Caption placement for an `S x S` canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelGeometry {
    pub font_size: f32,
    /// Right edge of the text run.
    pub anchor_x: f32,
    /// Bottom edge of the text run; past the canvas on purpose.
    pub bottom_y: f32,
    pub stroke_width: f32,
}

impl LabelGeometry {
    pub fn for_size(size: NonZeroU32) -> Self {
        let s = size.get() as f32;
        Self {
            font_size: s * FONT_SIZE_RATIO,
            anchor_x: s - s * RIGHT_MARGIN_RATIO,
            bottom_y: s + s * BASELINE_BLEED_RATIO,
            stroke_width: s * STROKE_WIDTH_RATIO,
        }
    }
}

/// Font database plus the caption style.
///
/// The caption family is resolved once: the first configured family that is
/// installed, otherwise the bundled DejaVu Sans Bold. It never depends on the
/// order faces happen to be enumerated in.
pub struct LabelRenderer {
    fontdb: Arc<fontdb::Database>,
    family: String,
}

impl LabelRenderer {
    pub fn new(config: &FontConfig) -> Self {
        let mut db = fontdb::Database::new();

        for path in &config.files {
            if let Err(e) = db.load_font_file(path) {
                tracing::warn!("Skipping font file {}: {}", path.display(), e);
            }
        }
        if config.load_system_fonts {
            db.load_system_fonts();
        }

        let renderer = Self::with_database(db, config.families.as_slice());
        tracing::debug!(
            "Label renderer ready with {} font faces, caption family '{}'",
            renderer.face_count(),
            renderer.family()
        );
        renderer
    }

    /// Only the bundled face.
    pub fn bundled() -> Self {
        Self::with_database::<&str>(fontdb::Database::new(), &[])
    }

    /// Use an already populated database. The bundled face is always added.
    pub fn with_database<S: AsRef<str>>(mut db: fontdb::Database, families: &[S]) -> Self {
        db.load_font_data(BUNDLED_FONT.to_vec());

        let family = families
            .iter()
            .find_map(|wanted| installed_family(&db, wanted.as_ref()))
            .unwrap_or_else(|| BUNDLED_FAMILY.to_string());
        db.set_sans_serif_family(family.clone());

        Self {
            fontdb: Arc::new(db),
            family,
        }
    }

    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Resolved caption family.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// The face captions are drawn with.
    pub fn face(&self) -> Option<&fontdb::FaceInfo> {
        let families = [fontdb::Family::Name(&self.family)];
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight(FONT_WEIGHT),
            ..Default::default()
        };
        self.fontdb.query(&query).and_then(|id| self.fontdb.face(id))
    }

    /// Rasterize `text` as a transparent `size x size` layer.
    pub fn render(&self, text: &str, size: NonZeroU32) -> Result<RgbaImage, OverlayError> {
        if self.face().is_none() {
            return Err(OverlayError::MissingFace(self.family.clone()));
        }

        let document = self.overlay_document(text, size);
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(&document, &options)?;

        let mut pixmap = tiny_skia::Pixmap::new(size.get(), size.get())
            .ok_or(OverlayError::Allocation(size.get()))?;
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        let mut layer = RgbaImage::new(size.get(), size.get());
        for (dst, src) in layer.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }

        if layer.pixels().all(|p| p[3] == 0) {
            return Err(OverlayError::NothingDrawn(text.to_string()));
        }
        Ok(layer)
    }

    /// Two text runs at the same spot: black outline first, white fill on top.
    fn overlay_document(&self, text: &str, size: NonZeroU32) -> String {
        let g = LabelGeometry::for_size(size);
        let s = size.get();
        let text = escape_xml(text);
        let font = format!(
            r#"font-family="'{}', sans-serif" font-weight="{}" font-size="{}" text-anchor="end" dominant-baseline="text-after-edge""#,
            escape_xml(&self.family),
            FONT_WEIGHT,
            g.font_size
        );

        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{s}" height="{s}" viewBox="0 0 {s} {s}">"#,
                r#"<text x="{x}" y="{y}" {font} fill="none" stroke="black" stroke-width="{sw}" stroke-linejoin="miter" stroke-miterlimit="{ml}">{text}</text>"#,
                r#"<text x="{x}" y="{y}" {font} fill="white" stroke="none">{text}</text>"#,
                "</svg>"
            ),
            s = s,
            x = g.anchor_x,
            y = g.bottom_y,
            font = font,
            sw = g.stroke_width,
            ml = STROKE_MITER_LIMIT,
            text = text,
        )
    }
}

/// Canonical name of an installed family, matched case-insensitively.
fn installed_family(db: &fontdb::Database, wanted: &str) -> Option<String> {
    db.faces()
        .flat_map(|face| face.families.iter())
        .map(|(name, _)| name)
        .find(|name| name.eq_ignore_ascii_case(wanted))
        .cloned()
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn renderer() -> LabelRenderer {
        LabelRenderer::bundled()
    }

    #[test]
    fn test_geometry_at_256() {
        let g = LabelGeometry::for_size(size(256));
        assert!((g.font_size - 115.2).abs() < 1e-3);
        assert!((g.anchor_x - 243.2).abs() < 1e-3);
        assert!((g.bottom_y - 261.12).abs() < 1e-3);
        assert!((g.stroke_width - 20.48).abs() < 1e-3);
    }

    #[test]
    fn test_geometry_scales_with_size() {
        let small = LabelGeometry::for_size(size(100));
        assert!((small.font_size - 45.0).abs() < 1e-4);
        assert!((small.anchor_x - 95.0).abs() < 1e-4);
        assert!((small.bottom_y - 102.0).abs() < 1e-4);
        assert!((small.stroke_width - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_stroke_pass_precedes_fill_pass() {
        let doc = renderer().overlay_document("DEV", size(256));
        let stroke = doc.find(r#"stroke="black""#).unwrap();
        let fill = doc.find(r#"fill="white""#).unwrap();
        assert!(stroke < fill);
        assert_eq!(doc.matches(">DEV</text>").count(), 2);
        assert!(doc.contains(r#"font-weight="900""#));
        assert!(doc.contains(r#"text-anchor="end""#));
        assert!(doc.contains("font-family=\"'DejaVu Sans', sans-serif\""));
    }

    #[test]
    fn test_label_is_escaped() {
        let doc = renderer().overlay_document("<&>", size(64));
        assert!(doc.contains(">&lt;&amp;&gt;</text>"));
    }

    #[test]
    fn test_missing_family_falls_back_to_bundled_bold() {
        let renderer = LabelRenderer::with_database(fontdb::Database::new(), &["Inter"]);
        assert_eq!(renderer.family(), BUNDLED_FAMILY);
        assert_eq!(renderer.face_count(), 1);

        let face = renderer.face().unwrap();
        assert_eq!(face.post_script_name, "DejaVuSans-Bold");
        assert_eq!(face.weight, fontdb::Weight::BOLD);
    }

    #[test]
    fn test_configured_family_matches_case_insensitively() {
        let renderer =
            LabelRenderer::with_database(fontdb::Database::new(), &["Missing", "dejavu sans"]);
        assert_eq!(renderer.family(), "DejaVu Sans");
    }

    #[test]
    fn test_render_draws_both_passes() {
        let layer = renderer().render("DEV", size(64)).unwrap();
        assert_eq!(layer.dimensions(), (64, 64));
        assert!(layer.pixels().any(|p| p[3] == 255 && p[0] == 255));
        assert!(layer.pixels().any(|p| p[3] == 255 && p[0] == 0));
    }

    #[test]
    fn test_invisible_caption_is_an_error() {
        let err = renderer().render("\u{200B}", size(64)).unwrap_err();
        assert!(matches!(err, OverlayError::NothingDrawn(_)));
    }
}
