//! Raster preparation: turns an encoded sub-bitmap into a full-size mask.
//!
//! The encoded form is a base64 string wrapping a zlib stream wrapping a PNG
//! image; the PNG alpha channel marks the foreground.

use std::io::Read;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::ZlibDecoder;
use crate::binary_image::BinaryMask;
use crate::error::RasterError;

/// Decodes an encoded bitmap into a stamp the size of the embedded image.
pub fn decode_bitmap(data: &str) -> Result<BinaryMask, RasterError> {
    let compressed = STANDARD.decode(data.trim())?;
    let mut png = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut png)
        .map_err(RasterError::Inflate)?;
    let image = image::load_from_memory(&png)?;
    Ok(BinaryMask::from_alpha(&image.to_rgba8())?)
}

/// Writes `stamp` into a zero canvas of `canvas_size = (height, width)` with
/// its top-left corner at `origin = (x, y)`.
///
/// A stamp that overflows the canvas is an error rather than being cropped.
pub fn place_stamp(
    stamp: &BinaryMask,
    origin: (u32, u32),
    canvas_size: (u32, u32),
) -> Result<BinaryMask, RasterError> {
    let (origin_x, origin_y) = origin;
    let (canvas_height, canvas_width) = canvas_size;
    let fits_x = origin_x.checked_add(stamp.width()).is_some_and(|end| end <= canvas_width);
    let fits_y = origin_y.checked_add(stamp.height()).is_some_and(|end| end <= canvas_height);
    if !fits_x || !fits_y {
        return Err(RasterError::StampOutOfBounds {
            origin_x,
            origin_y,
            stamp_width: stamp.width(),
            stamp_height: stamp.height(),
            canvas_width,
            canvas_height,
        });
    }

    let mut canvas = BinaryMask::new(canvas_width, canvas_height)?;
    canvas.paste(stamp, origin_x, origin_y);
    Ok(canvas)
}

/// Decodes `encoded_bitmap` and composites it at `origin` on a canvas of
/// `canvas_size = (height, width)`.
pub fn prepare_mask(
    encoded_bitmap: &str,
    origin: (u32, u32),
    canvas_size: (u32, u32),
) -> Result<BinaryMask, RasterError> {
    let stamp = decode_bitmap(encoded_bitmap)?;
    place_stamp(&stamp, origin, canvas_size)
}
