//! Error type shared by the stamp pipeline and the placement geometry

use crate::viewport::PlacementId;

/// Errors produced by stamp processing and placement geometry.
///
/// Every variant is local to a single request: callers are expected to
/// skip the affected frame or stamp and carry on.
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("invalid target dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("degenerate viewport {width}x{height}")]
    DegenerateViewport { width: f64, height: f64 },

    #[error("invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),

    #[error("pixel buffer of {actual} bytes does not match {width}x{height} with {channels} channels")]
    BufferSize {
        width: u32,
        height: u32,
        channels: u8,
        actual: usize,
    },

    #[error("image decode: {0}")]
    Decode(#[from] image::ImageError),

    #[error("resize: {detail}")]
    Resize { detail: String },

    #[error("no placement with id {0:?}")]
    UnknownPlacement(PlacementId),
}

impl StampError {
    pub fn resize(msg: impl Into<String>) -> Self {
        Self::Resize { detail: msg.into() }
    }
}

pub type Result<T, E = StampError> = std::result::Result<T, E>;
