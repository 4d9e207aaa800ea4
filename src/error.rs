use thiserror::Error;

/// Rejections raised while validating a mask, before any strategy runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("mask has zero area ({width}x{height})")]
    EmptyMask { width: u32, height: u32 },
    #[error("buffer holds {actual} values but a {width}x{height} mask needs {expected}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("value {value} at ({x}, {y}) is not binary (expected 0, 1 or 255)")]
    NonBinaryValue { value: u8, x: u32, y: u32 },
}

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("object has no bitmap geometry")]
    MissingBitmap,
    #[error("invalid base64 bitmap: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to inflate bitmap: {0}")]
    Inflate(#[source] std::io::Error),
    #[error("failed to decode bitmap image: {0}")]
    Image(#[from] image::ImageError),
    #[error(
        "stamp of {stamp_width}x{stamp_height} at origin ({origin_x}, {origin_y}) \
         does not fit in a {canvas_width}x{canvas_height} canvas"
    )]
    StampOutOfBounds {
        origin_x: u32,
        origin_y: u32,
        stamp_width: u32,
        stamp_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
    #[error(transparent)]
    Input(#[from] InputError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("invalid extraction configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
