use geo::{Area, Coord, LineString};
use imageproc::point::Point;

/// One closed contour as an ordered list of integer pixel coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<Point<i32>>,
}

/// Axis-aligned integer box covering every point, `width`/`height` counted in
/// pixels (inclusive of both end points).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    #[must_use]
    pub fn to_xywh(&self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl Polygon {
    #[must_use]
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Rebuilds a polygon from `[x1, y1, x2, y2, ...]`; `None` on odd length.
    #[must_use]
    pub fn from_flat(values: &[i32]) -> Option<Self> {
        if values.len() % 2 != 0 {
            return None;
        }
        Some(Self::new(
            values.chunks_exact(2).map(|xy| Point::new(xy[0], xy[1])).collect(),
        ))
    }

    #[inline]
    #[must_use]
    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fewer than three points cannot enclose a region.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// `[x1, y1, x2, y2, ...]`, the segmentation layout of COCO files.
    #[must_use]
    pub fn flatten(&self) -> Vec<i32> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    #[must_use]
    pub fn to_line_string(&self) -> LineString<f64> {
        self.points
            .iter()
            .map(|p| Coord {
                x: f64::from(p.x),
                y: f64::from(p.y),
            })
            .collect()
    }

    /// Absolute shoelace area of the point sequence taken as a closed ring.
    #[must_use]
    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        geo::Polygon::new(self.to_line_string(), vec![]).unsigned_area()
    }

    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(BoundingBox {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
    }
}

impl From<Vec<Point<i32>>> for Polygon {
    fn from(points: Vec<Point<i32>>) -> Self {
        Self::new(points)
    }
}
