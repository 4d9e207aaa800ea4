//! COCO instance-segmentation annotation files.
//!
//! Field names and nesting follow the published format exactly; downstream
//! tools parse these files by name.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use crate::error::Result;
use crate::polygon::Polygon;

pub const DEFAULT_SUPERCATEGORY: &str = "none";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoFile {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoImage {
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    /// One flattened `[x1, y1, x2, y2, ...]` list per polygon.
    pub segmentation: Vec<Vec<i32>>,
    pub area: f64,
    /// `[x, y, width, height]`
    pub bbox: [i32; 4],
    pub iscrowd: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,
    pub supercategory: String,
}

impl CocoAnnotation {
    /// A single-polygon annotation, or `None` when the polygon is degenerate.
    #[must_use]
    pub fn from_polygon(id: u64, image_id: u64, category_id: u64, polygon: &Polygon) -> Option<Self> {
        if polygon.is_degenerate() {
            return None;
        }
        let bbox = polygon.bounding_box()?;
        Some(Self {
            id,
            image_id,
            category_id,
            segmentation: vec![polygon.flatten()],
            area: polygon.area(),
            bbox: bbox.to_xywh(),
            iscrowd: 0,
        })
    }
}

impl CocoFile {
    /// An empty file whose categories are numbered from 1 in the given order.
    pub fn with_categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| CocoCategory {
                id: i as u64 + 1,
                name: name.into(),
                supercategory: DEFAULT_SUPERCATEGORY.to_string(),
            })
            .collect();
        Self {
            categories,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category_id(&self, name: &str) -> Option<u64> {
        self.categories.iter().find(|c| c.name == name).map(|c| c.id)
    }

    /// The id the next annotation should carry.
    #[must_use]
    pub fn next_annotation_id(&self) -> u64 {
        self.annotations.last().map_or(1, |a| a.id + 1)
    }

    /// Appends one annotation for `polygon` and returns its id; degenerate
    /// polygons are skipped.
    pub fn push_polygon(&mut self, image_id: u64, category_id: u64, polygon: &Polygon) -> Option<u64> {
        let id = self.next_annotation_id();
        let annotation = CocoAnnotation::from_polygon(id, image_id, category_id, polygon)?;
        self.annotations.push(annotation);
        Some(id)
    }

    /// JSON with four-space indentation.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_json(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let mut serializer =
            serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        Ok(())
    }
}
