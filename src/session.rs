//! Editor Session - Upload, Edit, Preview, Save, Export
//!
//! Owns the transient editing state (source, crop, label), the debounced
//! preview and the history. Regeneration failures never touch the current
//! preview or saved entries: they are logged and the previous state stays.

use std::num::NonZeroU32;
use std::time::Instant;
use thiserror::Error;

use crate::artifact::Artifact;
use crate::compositor::{ComposeError, Compositor, SourceImage};
use crate::config::IconForgeConfig;
use crate::debounce::Debouncer;
use crate::hashing::compute_render_key;
use crate::history::{History, HistoryEntry, HistoryId, HistoryRecord};
use crate::ico::{encode_ico, ico_filename, IcoError};
use crate::label::LabelText;
use crate::region::CropRegion;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Ico(#[from] IcoError),

    #[error("No source image loaded")]
    NoSource,

    #[error("No crop region selected")]
    NoCrop,

    #[error("No preview has been generated yet")]
    NoPreview,

    #[error("History entry not found: {0}")]
    UnknownEntry(HistoryId),
}

/// What a call to [`EditorSession::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was due.
    Idle,
    /// The preview was replaced.
    Regenerated,
    /// Due, but there was nothing to draw or the preview is already current.
    Skipped,
    /// Composition failed; the previous preview is kept.
    Failed,
}

/// An exported icon ready to be written out.
#[derive(Debug, Clone)]
pub struct IcoExport {
    pub id: HistoryId,
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub struct EditorSession {
    config: IconForgeConfig,
    compositor: Compositor,
    debouncer: Debouncer,
    source: Option<SourceImage>,
    crop: Option<CropRegion>,
    label: LabelText,
    preview: Option<Artifact>,
    active_id: Option<HistoryId>,
    history: History,
}

impl EditorSession {
    pub fn new(config: IconForgeConfig) -> Self {
        let compositor = Compositor::from_config(&config);
        Self::with_compositor(config, compositor)
    }

    pub fn with_compositor(config: IconForgeConfig, compositor: Compositor) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce()),
            config,
            compositor,
            source: None,
            crop: None,
            label: LabelText::empty(),
            preview: None,
            active_id: None,
            history: History::new(),
        }
    }

    /// Start a new editing session on `bytes`.
    ///
    /// An undecodable upload is rejected and leaves the session as it was.
    pub fn load_source(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let source = SourceImage::decode(bytes)?;
        tracing::info!("Loaded {}x{} source image", source.width(), source.height());

        self.reset();
        self.source = Some(source);
        Ok(())
    }

    pub fn set_crop(&mut self, crop: CropRegion, now: Instant) {
        self.crop = Some(crop);
        self.debouncer.schedule(now);
    }

    /// Store at most the first three characters of `text`.
    pub fn set_label(&mut self, text: &str, now: Instant) {
        self.label = LabelText::new(text);
        self.debouncer.schedule(now);
    }

    /// Regenerate the preview if the debounce delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> PollOutcome {
        match self.debouncer.fire_due(now) {
            Some(ticket) => {
                tracing::trace!("Regeneration {:?} due", ticket);
                self.run_regeneration()
            }
            None => PollOutcome::Idle,
        }
    }

    /// Drop any pending regeneration and regenerate immediately.
    pub fn regenerate_now(&mut self) -> PollOutcome {
        self.debouncer.cancel();
        self.run_regeneration()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Upsert the current preview into history under the active session id.
    pub fn save_to_history(&mut self) -> Result<HistoryId, SessionError> {
        if self.debouncer.is_pending() {
            self.debouncer.cancel();
            self.refresh_preview()?;
        }

        let source = self.source.clone().ok_or(SessionError::NoSource)?;
        let crop = self.crop.ok_or(SessionError::NoCrop)?;
        let artifact = self.preview.clone().ok_or(SessionError::NoPreview)?;

        let id = self.history.save(
            self.active_id.clone(),
            HistoryRecord {
                source,
                artifact,
                label: self.label.clone(),
                crop,
            },
        );
        self.active_id = Some(id.clone());
        Ok(id)
    }

    /// Save, then wrap the preview in an ICO container.
    pub fn export_ico(&mut self) -> Result<IcoExport, SessionError> {
        let id = self.save_to_history()?;
        let artifact = self.preview.as_ref().ok_or(SessionError::NoPreview)?;
        let bytes = encode_ico(artifact.png_bytes())?;
        let filename = ico_filename(
            &self.config.filename_prefix,
            self.label.as_str(),
            &self.config.default_label,
        );

        tracing::info!("Exported {} ({} bytes)", filename, bytes.len());
        Ok(IcoExport { id, filename, bytes })
    }

    /// Wrap a saved entry's stored artifact in an ICO container.
    ///
    /// Nothing is recomposed and history is left as it is, so the download
    /// matches the thumbnail even while another image is being edited.
    pub fn export_entry(&self, id: &HistoryId) -> Result<IcoExport, SessionError> {
        let entry = self
            .history
            .get(id)
            .ok_or_else(|| SessionError::UnknownEntry(id.clone()))?;

        let bytes = encode_ico(entry.artifact.png_bytes())?;
        let filename = ico_filename(
            &self.config.entry_filename_prefix,
            entry.label.as_str(),
            &self.config.entry_default_label,
        );

        tracing::info!("Exported saved entry {} as {} ({} bytes)", id, filename, bytes.len());
        Ok(IcoExport {
            id: entry.id.clone(),
            filename,
            bytes,
        })
    }

    /// Reopen a saved entry for editing.
    pub fn load_from_history(&mut self, id: &HistoryId) -> Result<(), SessionError> {
        let entry = self
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownEntry(id.clone()))?;

        self.debouncer.cancel();
        self.source = Some(entry.source);
        self.crop = Some(entry.crop);
        self.label = entry.label;
        self.preview = Some(entry.artifact);
        self.active_id = Some(entry.id);
        Ok(())
    }

    /// Remove a saved entry; closes the editor if it was the one being edited.
    pub fn delete_from_history(&mut self, id: &HistoryId) -> bool {
        let removed = self.history.delete(id);
        if self.active_id.as_ref() == Some(id) {
            self.reset();
        }
        removed
    }

    /// Close the current image. History is untouched.
    pub fn reset(&mut self) {
        self.debouncer.cancel();
        self.source = None;
        self.crop = None;
        self.label = LabelText::empty();
        self.preview = None;
        self.active_id = None;
    }

    pub fn preview(&self) -> Option<&Artifact> {
        self.preview.as_ref()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn crop(&self) -> Option<CropRegion> {
        self.crop
    }

    pub fn label(&self) -> &LabelText {
        &self.label
    }

    pub fn active_id(&self) -> Option<&HistoryId> {
        self.active_id.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.list()
    }

    pub fn output_size(&self) -> NonZeroU32 {
        self.config.output_size
    }

    fn run_regeneration(&mut self) -> PollOutcome {
        match self.refresh_preview() {
            Ok(true) => PollOutcome::Regenerated,
            Ok(false) => PollOutcome::Skipped,
            Err(e) => {
                tracing::warn!("Preview regeneration failed, keeping previous preview: {}", e);
                PollOutcome::Failed
            }
        }
    }

    /// Compose from the current state. `Ok(false)` when there was nothing to do.
    fn refresh_preview(&mut self) -> Result<bool, ComposeError> {
        let (Some(source), Some(crop)) = (&self.source, self.crop) else {
            return Ok(false);
        };

        let size = self.config.output_size;
        let key = compute_render_key(source.sha256(), &crop, &self.label, size.get())?;
        if self.preview.as_ref().map(Artifact::render_key) == Some(key.as_str()) {
            return Ok(false);
        }

        let artifact = self.compositor.compose(source, crop, &self.label, size)?;
        self.preview = Some(artifact);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::LabelRenderer;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::time::Duration;

    fn png_source(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn session() -> EditorSession {
        let config = IconForgeConfig {
            output_size: NonZeroU32::new(32).unwrap(),
            ..IconForgeConfig::default()
        };
        let compositor = Compositor::new(LabelRenderer::bundled());
        EditorSession::with_compositor(config, compositor)
    }

    #[test]
    fn test_rejected_upload_keeps_state() {
        let mut s = session();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), Instant::now());
        assert_eq!(s.regenerate_now(), PollOutcome::Regenerated);

        assert!(matches!(
            s.load_source(b"nope"),
            Err(SessionError::Compose(ComposeError::Decode(_)))
        ));
        assert!(s.source().is_some());
        assert!(s.preview().is_some());
    }

    #[test]
    fn test_poll_waits_for_quiescence() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 20, 20).unwrap(), t0);
        s.set_crop(CropRegion::new(0, 0, 30, 30).unwrap(), t0 + Duration::from_millis(100));

        assert_eq!(s.poll(t0 + Duration::from_millis(200)), PollOutcome::Idle);
        assert_eq!(s.poll(t0 + Duration::from_millis(250)), PollOutcome::Regenerated);
        assert_eq!(s.poll(t0 + Duration::from_millis(400)), PollOutcome::Idle);
    }

    #[test]
    fn test_failed_regeneration_keeps_preview() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), t0);
        assert_eq!(s.regenerate_now(), PollOutcome::Regenerated);
        let before = s.preview().unwrap().sha256().to_string();

        s.set_crop(CropRegion::new(500, 500, 10, 10).unwrap(), t0);
        assert_eq!(s.poll(t0 + Duration::from_secs(1)), PollOutcome::Failed);
        assert_eq!(s.preview().unwrap().sha256(), before);
    }

    #[test]
    fn test_unchanged_inputs_skip() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), t0);
        assert_eq!(s.regenerate_now(), PollOutcome::Regenerated);

        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), t0);
        assert_eq!(s.regenerate_now(), PollOutcome::Skipped);
    }

    #[test]
    fn test_save_reuses_session_id() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), t0);
        s.set_label("dev", t0);

        let first = s.save_to_history().unwrap();
        s.set_label("qa", t0);
        let second = s.save_to_history().unwrap();

        assert_eq!(first, second);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history()[0].label.as_str(), "qa");
    }

    #[test]
    fn test_new_upload_starts_new_entry() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), t0);
        let first = s.save_to_history().unwrap();

        s.load_source(&png_source(50, 50)).unwrap();
        assert!(s.active_id().is_none());
        s.set_crop(CropRegion::new(0, 0, 50, 50).unwrap(), t0);
        let second = s.save_to_history().unwrap();

        assert_ne!(first, second);
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history()[0].id, second);
    }

    #[test]
    fn test_export_names_file_after_label() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), t0);
        s.set_label("devops", t0);

        let export = s.export_ico().unwrap();
        assert_eq!(export.filename, "browser-profile-dev.ico");
        let png_len = s.preview().unwrap().png_bytes().len();
        assert_eq!(export.bytes.len(), 22 + png_len);
        assert_eq!(s.history().len(), 1);

        s.set_label("", t0);
        assert_eq!(s.export_ico().unwrap().filename, "browser-profile-icon.ico");
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_export_entry_uses_stored_artifact() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 40, 40).unwrap(), t0);
        s.set_label("dev", t0);
        let dev = s.save_to_history().unwrap();
        let stored = s.history()[0].artifact.png_bytes().to_vec();

        s.load_source(&png_source(50, 50)).unwrap();
        s.set_crop(CropRegion::new(0, 0, 50, 50).unwrap(), t0);
        let plain = s.save_to_history().unwrap();

        // Editing something else does not change what the old entry exports.
        s.set_label("qa", t0);
        let before: Vec<_> = s.history().iter().map(|e| e.id.clone()).collect();
        let export = s.export_entry(&dev).unwrap();
        let after: Vec<_> = s.history().iter().map(|e| e.id.clone()).collect();

        assert_eq!(before, after);
        assert_eq!(export.id, dev);
        assert_eq!(export.filename, "icon-dev.ico");
        assert_eq!(export.bytes.len(), 22 + stored.len());
        assert_eq!(&export.bytes[22..], stored.as_slice());
        assert_eq!(s.active_id(), Some(&plain));
        assert_eq!(s.label().as_str(), "qa");

        assert_eq!(s.export_entry(&plain).unwrap().filename, "icon-profile.ico");
        assert!(matches!(
            s.export_entry(&HistoryId::from("missing")),
            Err(SessionError::UnknownEntry(_))
        ));
    }

    #[test]
    fn test_save_without_preview_fails() {
        let mut s = session();
        assert!(matches!(s.save_to_history(), Err(SessionError::NoSource)));
        s.load_source(&png_source(40, 40)).unwrap();
        assert!(matches!(s.save_to_history(), Err(SessionError::NoCrop)));
    }

    #[test]
    fn test_load_and_delete_from_history() {
        let mut s = session();
        let t0 = Instant::now();
        s.load_source(&png_source(40, 40)).unwrap();
        s.set_crop(CropRegion::new(5, 5, 30, 30).unwrap(), t0);
        s.set_label("abc", t0);
        let id = s.save_to_history().unwrap();

        s.reset();
        assert!(s.preview().is_none());
        s.load_from_history(&id).unwrap();
        assert_eq!(s.label().as_str(), "abc");
        assert_eq!(s.crop(), CropRegion::new(5, 5, 30, 30));
        assert_eq!(s.active_id(), Some(&id));

        assert!(!s.delete_from_history(&HistoryId::from("missing")));
        assert_eq!(s.history().len(), 1);
        assert!(s.source().is_some());

        assert!(s.delete_from_history(&id));
        assert!(s.history().is_empty());
        assert!(s.source().is_none());
        assert!(matches!(
            s.load_from_history(&id),
            Err(SessionError::UnknownEntry(_))
        ));
    }
}
