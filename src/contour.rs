use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use crate::binary_image::BinaryMask;

/// Whether a traced border encloses foreground or a background hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourKind {
    Outer,
    Hole,
}

/// How many traced border pixels a contour keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainMode {
    /// Every border pixel.
    #[default]
    All,
    /// Only the end points of horizontal, vertical and diagonal runs.
    Simple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContourNode {
    pub points: Vec<Point<i32>>,
    pub kind: ContourKind,
    pub parent: Option<usize>,
    pub first_child: Option<usize>,
    pub next_sibling: Option<usize>,
}

/// Every border of a mask with its nesting, in tracing order.
///
/// Top-level contours are siblings of each other, so the whole forest can be
/// walked from the first root through `next_sibling` and `first_child` links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContourHierarchy {
    nodes: Vec<ContourNode>,
}

impl ContourHierarchy {
    /// Suzuki-Abe border following over the foreground of `mask`.
    pub fn trace(mask: &BinaryMask) -> Self {
        let contours = find_contours::<i32>(&mask.to_gray());
        let mut nodes: Vec<ContourNode> = contours
            .into_iter()
            .map(|contour| ContourNode {
                points: contour.points,
                kind: match contour.border_type {
                    BorderType::Outer => ContourKind::Outer,
                    BorderType::Hole => ContourKind::Hole,
                },
                parent: contour.parent,
                first_child: None,
                next_sibling: None,
            })
            .collect();

        let mut last_child: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut last_root: Option<usize> = None;
        for index in 0..nodes.len() {
            let previous = match nodes[index].parent {
                Some(parent) => {
                    if nodes[parent].first_child.is_none() {
                        nodes[parent].first_child = Some(index);
                    }
                    last_child[parent].replace(index)
                }
                None => last_root.replace(index),
            };
            if let Some(previous) = previous {
                nodes[previous].next_sibling = Some(index);
            }
        }

        Self { nodes }
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[ContourNode] {
        &self.nodes
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of contours without a parent, in tracing order.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.siblings_from(self.nodes.iter().position(|node| node.parent.is_none()))
    }

    /// Indices of the direct children of `index`, in sibling order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.siblings_from(self.nodes[index].first_child)
    }

    fn siblings_from(&self, first: Option<usize>) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(first, |&index| self.nodes[index].next_sibling)
    }
}

/// Outermost borders only; holes and anything nested inside them are ignored.
pub fn external_contours(mask: &BinaryMask, mode: ChainMode) -> Vec<Vec<Point<i32>>> {
    let mut hierarchy = ContourHierarchy::trace(mask);
    let roots: Vec<usize> = hierarchy.roots().collect();
    roots
        .into_iter()
        .map(|index| {
            let points = std::mem::take(&mut hierarchy.nodes[index].points);
            match mode {
                ChainMode::All => points,
                ChainMode::Simple => compress_chain(&points),
            }
        })
        .collect()
}

/// Drops every point of a closed chain that continues the direction of the
/// step leading into it. The starting point is always kept.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }
    (0..n)
        .filter(|&i| {
            if i == 0 {
                return true;
            }
            let previous = points[(i + n - 1) % n];
            let current = points[i];
            let next = points[(i + 1) % n];
            (current.x - previous.x, current.y - previous.y) != (next.x - current.x, next.y - current.y)
        })
        .map(|i| points[i])
        .collect()
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
    fn empty_mask_has_no_contours() {
        let hierarchy = ContourHierarchy::trace(&BinaryMask::new(6, 6).unwrap());
        assert!(hierarchy.is_empty());
        assert_eq!(hierarchy.roots().count(), 0);
    }

    #[test]
    fn ring_has_one_outer_and_one_hole() {
        let mask = mask_from_rows(&[
            ".......",
            ".#####.",
            ".#...#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        let hierarchy = ContourHierarchy::trace(&mask);
        assert_eq!(hierarchy.len(), 2);
        let roots: Vec<usize> = hierarchy.roots().collect();
        assert_eq!(roots.len(), 1);
        let outer = &hierarchy.nodes()[roots[0]];
        assert_eq!(outer.kind, ContourKind::Outer);

        let holes: Vec<usize> = hierarchy.children(roots[0]).collect();
        assert_eq!(holes.len(), 1);
        assert_eq!(hierarchy.nodes()[holes[0]].kind, ContourKind::Hole);
        assert_eq!(hierarchy.nodes()[holes[0]].parent, Some(roots[0]));
    }

    #[test]
    fn separate_blobs_are_linked_as_siblings() {
        let mask = mask_from_rows(&["##..##", "##..##", "......", "..##.."]);
        let hierarchy = ContourHierarchy::trace(&mask);
        assert_eq!(hierarchy.roots().count(), 3);
        assert!(hierarchy.nodes().iter().all(|node| node.first_child.is_none()));
    }

    #[test]
    fn external_contours_skip_holes() {
        let mask = mask_from_rows(&["#####", "#...#", "#####"]);
        let contours = external_contours(&mask, ChainMode::All);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 12);
    }

    #[test]
    fn simple_chain_keeps_square_corners() {
        let mask = mask_from_rows(&[".....", ".###.", ".###.", ".###.", "....."]);
        let full = external_contours(&mask, ChainMode::All);
        assert_eq!(full[0].len(), 8);

        let mut corners = external_contours(&mask, ChainMode::Simple).remove(0);
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![Point::new(1, 1), Point::new(3, 1), Point::new(1, 3), Point::new(3, 3)]
        );
    }

    #[test]
    fn compression_keeps_a_start_point_inside_a_run() {
        let ring = [
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(2, 1),
            Point::new(2, 2),
            Point::new(1, 2),
            Point::new(0, 2),
            Point::new(0, 1),
            Point::new(0, 0),
        ];
        assert_eq!(
            compress_chain(&ring),
            vec![Point::new(1, 0), Point::new(2, 0), Point::new(2, 2), Point::new(0, 2), Point::new(0, 0)]
        );
    }

    #[test]
    fn compressing_a_line_keeps_its_ends() {
        let line = [Point::new(0, 0), Point::new(1, 0), Point::new(2, 0), Point::new(1, 0)];
        assert_eq!(compress_chain(&line), vec![Point::new(0, 0), Point::new(2, 0)]);
    }
}
