use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use crate::binary_image::BinaryMask;
use crate::polygon::Polygon;

const PALETTE: [Rgba<u8>; 6] = [
    Rgba([230, 25, 75, 160]),
    Rgba([60, 180, 75, 160]),
    Rgba([0, 130, 200, 160]),
    Rgba([245, 130, 48, 160]),
    Rgba([145, 30, 180, 160]),
    Rgba([70, 240, 240, 160]),
];

pub trait DrawPolygons {
    /// Fills each polygon in its own colour on a transparent canvas.
    fn draw(&self, width: u32, height: u32) -> RgbaImage;

    /// Same as [`draw`](Self::draw) with the source mask in grey underneath.
    fn draw_over(&self, mask: &BinaryMask) -> RgbaImage {
        let mut canvas = RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
            if mask.get(x, y) {
                Rgba([128, 128, 128, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let overlay = self.draw(mask.width(), mask.height());
        for (base, top) in canvas.pixels_mut().zip(overlay.pixels()) {
            if top.0[3] > 0 {
                *base = *top;
            }
        }
        canvas
    }
}

/// imageproc refuses rings whose first and last points coincide.
fn open_ring(polygon: &Polygon) -> Vec<Point<i32>> {
    let points = polygon.points();
    if points.len() >= 2 && points.first() == points.last() {
        points[..points.len() - 1].to_vec()
    } else {
        points.to_vec()
    }
}

impl DrawPolygons for [Polygon] {
    fn draw(&self, width: u32, height: u32) -> RgbaImage {
        let mut img = RgbaImage::new(width, height);
        for (i, polygon) in self.iter().enumerate() {
            let ring = open_ring(polygon);
            if ring.len() < 3 {
                continue;
            }
            draw_polygon_mut(&mut img, &ring, PALETTE[i % PALETTE.len()]);
        }
        img
    }
}
