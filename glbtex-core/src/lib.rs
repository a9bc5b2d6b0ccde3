//! # glbtex core
//!
//! Engine for recoloring and recompressing the diffuse textures embedded in
//! binary glTF (GLB) containers. The container is rebuilt from scratch with a
//! freshly computed buffer layout.
//!
//! ## Architecture
//!
//! - [`container`] - GLB chunk parsing and assembly
//! - [`manifest`] - Typed view of the glTF JSON manifest
//! - [`scene`] - Scene graph walk and explicit material texture slots
//! - [`diffuse`] - Diffuse/albedo texture set resolution
//! - [`gamma`] - sRGB/linear gamma lookup tables
//! - [`codec`] - Image decode and PNG encode collaborators
//! - [`config`] - Conversion configuration (gamma direction, quality level)
//! - [`transcode`] - Per-texture transcoding
//! - [`layout`] - Two-pass buffer view layout planning
//! - [`size_report`] - Before/after size reporting
//! - [`events`] - User-facing conversion event stream
//! - [`pipeline`] - End-to-end conversion

pub mod codec;
pub mod config;
pub mod container;
pub mod diffuse;
pub mod events;
pub mod gamma;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod scene;
pub mod size_report;
pub mod transcode;

// Re-export main types for convenient access
pub use codec::{ImageCrateDecoder, ImageDecoder, PngEncoder, QuantizingPngEncoder, RgbaPixels};
pub use config::{ConvertConfig, Quality, QualityLevel};
pub use container::{assemble_glb, parse_glb, GlbContainer};
pub use diffuse::DiffuseSet;
pub use events::{CallbackSink, ConversionLog, EventSink, LogEvent, Severity};
pub use gamma::{GammaDirection, GammaTable};
pub use layout::{plan_layout, BufferViewLayoutPlan, LayoutPlan};
pub use manifest::Manifest;
pub use pipeline::{convert, inspect, Conversion, Converter, Inspection};
pub use scene::{MaterialKind, SceneGraph, TextureSlot};
pub use size_report::{EntryStatus, SizeReport, TextureSizeEntry};
pub use transcode::{TextureError, TextureRecord, TextureStatus};

/// Common result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Library-wide error type. Every variant aborts the conversion; per-texture
/// failures are reported through [`TextureError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad magic, version, or chunk framing.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// The first chunk is absent or is not a JSON chunk.
    #[error("Missing manifest: {0}")]
    MissingManifest(String),

    /// The JSON chunk is not UTF-8 or not a valid glTF document.
    #[error("Invalid manifest encoding: {0}")]
    InvalidManifestEncoding(String),

    /// Bytes written to the binary payload disagree with the planned layout.
    #[error("Layout assembly mismatch: {0}")]
    LayoutAssemblyMismatch(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
