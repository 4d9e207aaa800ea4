use std::ops::Deref;
use bit_vec::BitVec;
use image::{GrayImage, ImageBuffer, Luma, Pixel};
use num_traits::Zero;
use crate::error::InputError;

/// A bit-packed two-dimensional foreground/background raster.
///
/// Every constructor rejects zero-area masks, so a `BinaryMask` that exists
/// always has at least one pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    buffer: BitVec,
}

impl BinaryMask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Result<Self, InputError> {
        check_area(width, height)?;
        Ok(Self {
            width,
            height,
            buffer: BitVec::from_elem(width as usize * height as usize, false),
        })
    }

    /// Builds a mask from a row-major buffer holding only `0`, `1` or `255`.
    pub fn from_raw(width: u32, height: u32, buffer: &[u8]) -> Result<Self, InputError> {
        check_area(width, height)?;
        check_len(width, height, buffer.len())?;
        if let Some(i) = buffer.iter().position(|&v| !matches!(v, 0 | 1 | 255)) {
            return Err(InputError::NonBinaryValue {
                value: buffer[i],
                x: (i % width as usize) as u32,
                y: (i / width as usize) as u32,
            });
        }
        Ok(Self {
            width,
            height,
            buffer: buffer.iter().map(|&v| v != 0).collect(),
        })
    }

    /// Builds a mask from any numeric buffer; non-zero values are foreground.
    pub fn from_values<T>(width: u32, height: u32, buffer: &[T]) -> Result<Self, InputError>
    where
        T: Zero,
    {
        check_area(width, height)?;
        check_len(width, height, buffer.len())?;
        Ok(Self {
            width,
            height,
            buffer: buffer.iter().map(|v| !v.is_zero()).collect(),
        })
    }

    pub fn from_bitvec(width: u32, height: u32, buffer: BitVec) -> Result<Self, InputError> {
        check_area(width, height)?;
        check_len(width, height, buffer.len())?;
        Ok(Self {
            width,
            height,
            buffer,
        })
    }

    /// Skips validation; for buffers derived from an existing mask.
    pub(crate) fn from_parts(width: u32, height: u32, buffer: BitVec) -> Self {
        debug_assert_eq!(buffer.len(), width as usize * height as usize);
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Non-zero luma is foreground.
    pub fn from_gray(image: &GrayImage) -> Result<Self, InputError> {
        let (width, height) = image.dimensions();
        Self::from_values(width, height, image.as_raw())
    }

    /// Non-zero alpha is foreground. Images without an alpha channel are
    /// treated as fully opaque.
    pub fn from_alpha<P, Container>(image: &ImageBuffer<P, Container>) -> Result<Self, InputError>
    where
        P: Pixel,
        Container: Deref<Target = [P::Subpixel]>,
    {
        let (width, height) = image.dimensions();
        check_area(width, height)?;
        let buffer = image
            .pixels()
            .map(|pixel| !pixel.to_rgba().0[3].is_zero())
            .collect();
        Ok(Self {
            width,
            height,
            buffer,
        })
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        debug_assert!(x < self.width && y < self.height, "Pixel out of bounds");
        self.buffer[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        debug_assert!(x < self.width && y < self.height, "Pixel out of bounds");
        let index = self.index(x, y);
        self.buffer.set(index, value);
    }

    #[must_use]
    pub fn count_foreground(&self) -> usize {
        self.buffer.iter().filter(|&bit| bit).count()
    }

    /// True when no pixel is foreground.
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.buffer.none()
    }

    /// Copies `stamp` onto this mask with its top-left corner at `(x, y)`.
    /// The caller guarantees the stamp fits.
    pub(crate) fn paste(&mut self, stamp: &BinaryMask, x: u32, y: u32) {
        debug_assert!(x + stamp.width <= self.width && y + stamp.height <= self.height);
        for sy in 0..stamp.height {
            for sx in 0..stamp.width {
                self.set(x + sx, y + sy, stamp.get(sx, sy));
            }
        }
    }

    /// Foreground as 255, background as 0.
    #[must_use]
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// Background as 255, foreground as 0.
    #[must_use]
    pub fn to_inverted_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 0 } else { 255 }])
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

fn check_area(width: u32, height: u32) -> Result<(), InputError> {
    if width == 0 || height == 0 {
        return Err(InputError::EmptyMask { width, height });
    }
    Ok(())
}

fn check_len(width: u32, height: u32, actual: usize) -> Result<(), InputError> {
    let expected = width as usize * height as usize;
    if actual != expected {
        return Err(InputError::DimensionMismatch {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}
