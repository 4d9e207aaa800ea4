use imageproc::distance_transform::euclidean_squared_distance_transform;
use crate::binary_image::BinaryMask;

/// Euclidean distance from every foreground pixel to the nearest background
/// pixel. Background pixels hold `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl DistanceField {
    pub fn new(mask: &BinaryMask) -> Self {
        let (width, height) = mask.dimensions();
        let len = width as usize * height as usize;

        let values = if mask.is_background() {
            vec![0.0; len]
        } else if mask.count_foreground() == len {
            // Without any background pixel the transform is unbounded, so the
            // canvas edge stands in for the nearest background.
            (0..height)
                .flat_map(|y| (0..width).map(move |x| (x, y)))
                .map(|(x, y)| f64::from((x + 1).min(y + 1).min(width - x).min(height - y)))
                .collect()
        } else {
            euclidean_squared_distance_transform(&mask.to_inverted_gray())
                .pixels()
                .map(|p| p.0[0].sqrt())
                .collect()
        };

        Self {
            width,
            height,
            values,
        }
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
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Row-major values.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(size: u32, x0: u32, y0: u32, side: u32) -> BinaryMask {
        let mut mask = BinaryMask::new(size, size).unwrap();
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                mask.set(x, y, true);
            }
        }
        mask
    }

    #[test]
    fn background_is_zero() {
        let field = DistanceField::new(&BinaryMask::new(4, 4).unwrap());
        assert!(field.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn block_distances_grow_towards_center() {
        let field = DistanceField::new(&block(7, 1, 1, 5));
        assert_eq!(field.get(0, 0), 0.0);
        assert_eq!(field.get(1, 1), 1.0);
        assert_eq!(field.get(2, 3), 2.0);
        assert_eq!(field.get(3, 3), 3.0);
    }

    #[test]
    fn diagonal_distance_is_euclidean() {
        let mut mask = BinaryMask::new(5, 5).unwrap();
        for y in 0..5 {
            for x in 0..5 {
                mask.set(x, y, true);
            }
        }
        mask.set(0, 0, false);
        let field = DistanceField::new(&mask);
        assert!((field.get(1, 1) - 2f64.sqrt()).abs() < 1e-9);
        assert!((field.get(3, 4) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn full_mask_falls_back_to_canvas_edge() {
        let field = DistanceField::new(&block(5, 0, 0, 5));
        assert_eq!(field.get(0, 0), 1.0);
        assert_eq!(field.get(2, 2), 3.0);
        assert_eq!(field.get(4, 2), 1.0);
    }
}
