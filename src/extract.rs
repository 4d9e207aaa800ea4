//! Mask to polygon extraction.
//!
//! Three strategies are available, chosen once from [`ExtractionOptions`]
//! with the priority hierarchy > watershed > plain:
//!
//! - **Hierarchy** traces every border with its nesting and folds everything
//!   nested below a top-level border into that border's point list, so a
//!   perforated instance still yields a single polygon.
//! - **Watershed** splits touching instances: seeds are the peaks of the
//!   distance transform and each flooded region becomes one polygon.
//! - **Plain** traces outermost borders only. It cannot separate touching
//!   instances, and interior holes disappear because nesting is discarded.
//!   Optional erosion removes small holes and noise but also shrinks every
//!   true boundary by the erosion radius.

use imageproc::distance_transform::Norm;
use imageproc::morphology::erode;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::binary_image::BinaryMask;
use crate::contour::{external_contours, ChainMode, ContourHierarchy};
use crate::distance::DistanceField;
use crate::error::{ExtractError, InputError};
use crate::peaks::find_peaks;
use crate::polygon::Polygon;
use crate::watershed::{label_markers, watershed};

/// Side of the square structuring element used by the plain strategy.
pub const EROSION_KERNEL_SIZE: u8 = 3;
/// Number of successive erosions applied by the plain strategy.
pub const EROSION_ITERATIONS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    /// Erode the foreground before plain tracing.
    pub erosion: bool,
    /// Split touching instances with a distance-transform watershed.
    pub use_watershed: bool,
    /// Fold hole borders into their outer border. Wins over `use_watershed`.
    pub use_hierarchy: bool,
    /// Keep only run end points of each watershed region border.
    pub use_approximation: bool,
    /// Minimum separation, in pixels, between watershed seeds.
    pub minimum_distance: u32,
    /// Forbid watershed seeds closer than `minimum_distance` to the canvas edge.
    pub exclude_border: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            erosion: true,
            use_watershed: true,
            use_hierarchy: false,
            use_approximation: true,
            minimum_distance: 100,
            exclude_border: true,
        }
    }
}

impl ExtractionOptions {
    /// Resolves the flags into the single strategy they select.
    ///
    /// Enabling both `use_hierarchy` and `use_watershed` is not an error; the
    /// hierarchy strategy is used and a warning is logged.
    pub fn strategy(&self) -> Result<ExtractionStrategy, ExtractError> {
        if self.minimum_distance == 0 {
            return Err(ExtractError::InvalidConfiguration(
                "minimum_distance must be at least 1 pixel".to_string(),
            ));
        }
        if self.use_hierarchy {
            if self.use_watershed {
                warn!("use_hierarchy and use_watershed are both enabled, using the hierarchy strategy");
            }
            return Ok(ExtractionStrategy::Hierarchy);
        }
        if self.use_watershed {
            return Ok(ExtractionStrategy::Watershed {
                minimum_distance: self.minimum_distance,
                exclude_border: self.exclude_border,
                chain: if self.use_approximation {
                    ChainMode::Simple
                } else {
                    ChainMode::All
                },
            });
        }
        Ok(ExtractionStrategy::Plain {
            erosion: self.erosion,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    Hierarchy,
    Watershed {
        minimum_distance: u32,
        exclude_border: bool,
        chain: ChainMode,
    },
    Plain {
        erosion: bool,
    },
}

pub trait PolygonExtractor {
    fn extract(&self, mask: &BinaryMask) -> Result<Vec<Polygon>, ExtractError>;
}

impl PolygonExtractor for ExtractionStrategy {
    fn extract(&self, mask: &BinaryMask) -> Result<Vec<Polygon>, ExtractError> {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return Err(InputError::EmptyMask { width, height }.into());
        }
        if mask.is_background() {
            return Ok(Vec::new());
        }

        let polygons = match *self {
            Self::Hierarchy => hierarchy_polygons(mask),
            Self::Watershed {
                minimum_distance,
                exclude_border,
                chain,
            } => watershed_polygons(mask, minimum_distance, exclude_border, chain),
            Self::Plain { erosion } => plain_polygons(mask, erosion)?,
        };
        debug!(strategy = ?self, polygons = polygons.len(), "extracted polygons");
        Ok(polygons)
    }
}

/// Converts `mask` into polygons using the strategy `options` selects.
pub fn extract_polygons(
    mask: &BinaryMask,
    options: &ExtractionOptions,
) -> Result<Vec<Polygon>, ExtractError> {
    options.strategy()?.extract(mask)
}

fn hierarchy_polygons(mask: &BinaryMask) -> Vec<Polygon> {
    let hierarchy = ContourHierarchy::trace(mask);
    hierarchy
        .roots()
        .map(|root| Polygon::new(fold_subtree(&hierarchy, root)))
        .collect()
}

/// Points of `root` followed by every contour nested below it, depth first
/// and in sibling order.
fn fold_subtree(hierarchy: &ContourHierarchy, root: usize) -> Vec<Point<i32>> {
    let nodes = hierarchy.nodes();
    let mut points = Vec::new();
    let mut pending = vec![root];
    while let Some(index) = pending.pop() {
        points.extend_from_slice(&nodes[index].points);
        let children: Vec<usize> = hierarchy.children(index).collect();
        pending.extend(children.into_iter().rev());
    }
    points
}

fn watershed_polygons(
    mask: &BinaryMask,
    minimum_distance: u32,
    exclude_border: bool,
    chain: ChainMode,
) -> Vec<Polygon> {
    let (width, height) = mask.dimensions();
    let field = DistanceField::new(mask);
    let peaks = find_peaks(&field, mask, minimum_distance, exclude_border);
    let markers = label_markers(&peaks, width, height);
    let labels = watershed(&field, &markers, mask);
    let regions = labels.regions();
    debug!(peaks = peaks.len(), regions = regions.len(), "watershed segmentation");

    regions
        .into_iter()
        .filter_map(|label| {
            external_contours(&labels.region_mask(label), chain)
                .into_iter()
                .next()
                .map(Polygon::new)
        })
        .collect()
}

fn plain_polygons(mask: &BinaryMask, erosion: bool) -> Result<Vec<Polygon>, ExtractError> {
    let eroded;
    let source = if erosion {
        // Repeating a 3x3 square erosion n times equals one erosion by a
        // square of radius n * (size / 2).
        let radius = EROSION_ITERATIONS * (EROSION_KERNEL_SIZE / 2);
        eroded = BinaryMask::from_gray(&erode(&mask.to_gray(), Norm::LInf, radius))?;
        &eroded
    } else {
        mask
    };

    Ok(external_contours(source, ChainMode::All)
        .into_iter()
        .map(Polygon::new)
        .collect())
}
