//! IconForge Core - Square Icons with Short Captions
//!
//! # Pipeline
//! 1. Decode the upload once (`SourceImage`)
//! 2. Clamp the crop region and scale it to a fixed square
//! 3. Outline, then fill, an optional three-letter caption
//! 4. Encode as PNG (the artifact)
//! 5. Wrap the PNG in a single-image ICO container
//!
//! `EditorSession` ties these together with a debounced preview and an
//! in-memory history.

pub mod region;
pub mod label;
pub mod hashing;
pub mod checks;
pub mod artifact;
pub mod text;
pub mod compositor;
pub mod ico;
pub mod history;
pub mod debounce;
pub mod config;
pub mod session;

pub use region::CropRegion;
pub use label::{LabelText, MAX_LABEL_CHARS};
pub use checks::{CropNotice, NoticeSeverity};
pub use artifact::{Artifact, ArtifactSummary};
pub use text::{LabelGeometry, LabelRenderer, OverlayError, BUNDLED_FAMILY};
pub use compositor::{Compositor, ComposeError, SourceImage, DEFAULT_OUTPUT_SIZE};
pub use ico::{encode_ico, ico_filename, IcoError};
pub use history::{History, HistoryEntry, HistoryId, HistoryRecord, HistorySummary};
pub use debounce::{Debouncer, Ticket};
pub use config::{ConfigError, FontConfig, IconForgeConfig};
pub use session::{EditorSession, IcoExport, PollOutcome, SessionError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
