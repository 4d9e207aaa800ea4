//! Conversion of per-object binary segmentation masks into polygon contours
//! for COCO-style instance annotations.
//!
//! The entry point is [`extract_polygons`], which picks one of three
//! strategies from [`ExtractionOptions`]. Masks usually come from
//! [`raster::prepare_mask`], and results are assembled with [`coco::CocoFile`].

mod binary_image;
mod contour;
mod distance;
mod peaks;
mod polygon;
mod watershed;
pub mod coco;
pub mod draw;
pub mod error;
pub mod extract;
pub mod raster;
pub mod supervisely;

pub use crate::binary_image::BinaryMask;
pub use crate::contour::{compress_chain, external_contours, ChainMode, ContourHierarchy, ContourKind, ContourNode};
pub use crate::distance::DistanceField;
pub use crate::error::{Error, ExtractError, InputError, RasterError};
pub use crate::extract::{extract_polygons, ExtractionOptions, ExtractionStrategy, PolygonExtractor};
pub use crate::peaks::find_peaks;
pub use crate::polygon::{BoundingBox, Polygon};
pub use crate::watershed::{label_markers, watershed, LabelField};
pub use imageproc::point::Point;
