//! Marker-controlled watershed over the negated distance field.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use crate::binary_image::BinaryMask;
use crate::distance::DistanceField;

/// Per-pixel region labels; `0` is background or unassigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelField {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl LabelField {
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
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    /// Distinct non-zero labels in ascending order.
    #[must_use]
    pub fn regions(&self) -> Vec<u32> {
        self.labels
            .iter()
            .copied()
            .filter(|&label| label != 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// A mask holding only the pixels carrying `label`.
    #[must_use]
    pub fn region_mask(&self, label: u32) -> BinaryMask {
        let buffer = self.labels.iter().map(|&l| l == label).collect();
        BinaryMask::from_parts(self.width, self.height, buffer)
    }
}

/// Groups 4-connected seed pixels into markers labelled `1..=K` in raster
/// order of first appearance.
pub fn label_markers(peaks: &[(u32, u32)], width: u32, height: u32) -> LabelField {
    let mut seeds = GrayImage::new(width, height);
    for &(x, y) in peaks {
        seeds.put_pixel(x, y, Luma([255]));
    }
    let components = connected_components(&seeds, Connectivity::Four, Luma([0u8]));

    // Renumber so labels follow the scan order regardless of how the
    // labeller assigned them.
    let mut renumbered = HashMap::new();
    let labels = components
        .pixels()
        .map(|p| match p.0[0] {
            0 => 0,
            component => {
                let next = renumbered.len() as u32 + 1;
                *renumbered.entry(component).or_insert(next)
            }
        })
        .collect();

    LabelField {
        width,
        height,
        labels,
    }
}

#[derive(Debug, Clone, Copy)]
struct FloodItem {
    value: f64,
    age: u64,
    index: usize,
}

impl PartialEq for FloodItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodItem {}

impl PartialOrd for FloodItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloodItem {
    // Reversed so the max-heap pops the lowest level, then the oldest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then_with(|| other.age.cmp(&self.age))
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Floods `markers` across the foreground of `mask`, lowest `-distance`
/// first. A pixel takes the label of whichever neighbour reaches it first.
/// Foreground components without a marker stay `0`.
pub fn watershed(field: &DistanceField, markers: &LabelField, mask: &BinaryMask) -> LabelField {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let values = field.values();
    let inside = |index: usize| mask.get((index % w) as u32, (index / w) as u32);

    let mut labels = vec![0u32; w * h];
    let mut queue = BinaryHeap::new();
    for (index, &marker) in markers.labels.iter().enumerate() {
        if marker != 0 && inside(index) {
            labels[index] = marker;
            queue.push(FloodItem {
                value: -values[index],
                age: 0,
                index,
            });
        }
    }

    let mut age = 0u64;
    while let Some(item) = queue.pop() {
        let (x, y) = (item.index % w, item.index / w);
        let neighbours = [
            (y > 0).then(|| item.index - w),
            (x > 0).then(|| item.index - 1),
            (x + 1 < w).then(|| item.index + 1),
            (y + 1 < h).then(|| item.index + w),
        ];
        for neighbour in neighbours.into_iter().flatten() {
            if labels[neighbour] != 0 || !inside(neighbour) {
                continue;
            }
            age += 1;
            labels[neighbour] = labels[item.index];
            queue.push(FloodItem {
                value: -values[neighbour],
                age,
                index: neighbour,
            });
        }
    }

    LabelField {
        width,
        height,
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> BinaryMask {
        let width = rows[0].len() as u32;
        let raw: Vec<u8> = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| u8::from(b == b'#')))
            .collect();
        BinaryMask::from_raw(width, rows.len() as u32, &raw).unwrap()
    }

    #[test]
    fn markers_follow_raster_order() {
        let markers = label_markers(&[(4, 0), (0, 2), (1, 2)], 5, 3);
        assert_eq!(markers.get(4, 0), 1);
        assert_eq!(markers.get(0, 2), 2);
        assert_eq!(markers.get(1, 2), 2);
        assert_eq!(markers.regions(), vec![1, 2]);
    }

    #[test]
    fn flood_splits_a_dumbbell_at_the_neck() {
        let mask = mask_from_rows(&[
            "...........",
            ".###...###.",
            ".#########.",
            ".###...###.",
            "...........",
        ]);
        let field = DistanceField::new(&mask);
        let markers = label_markers(&[(2, 2), (8, 2)], 11, 5);
        let labels = watershed(&field, &markers, &mask);

        assert_eq!(labels.regions(), vec![1, 2]);
        assert_eq!(labels.get(1, 1), 1);
        assert_eq!(labels.get(9, 3), 2);
        assert_eq!(labels.get(0, 0), 0);
        let total = labels.region_mask(1).count_foreground() + labels.region_mask(2).count_foreground();
        assert_eq!(total, mask.count_foreground());
    }

    #[test]
    fn unseeded_components_stay_unlabelled() {
        let mask = mask_from_rows(&["##..##", "##..##"]);
        let field = DistanceField::new(&mask);
        let markers = label_markers(&[(0, 0)], 6, 2);
        let labels = watershed(&field, &markers, &mask);
        assert_eq!(labels.regions(), vec![1]);
        assert_eq!(labels.get(5, 1), 0);
        assert_eq!(labels.region_mask(1).count_foreground(), 4);
    }

    #[test]
    fn markers_outside_the_mask_are_ignored() {
        let mask = mask_from_rows(&["##..", "##.."]);
        let field = DistanceField::new(&mask);
        let markers = label_markers(&[(3, 0)], 4, 2);
        assert!(watershed(&field, &markers, &mask).regions().is_empty());
    }
}
