//! Per-image annotation files exported by the labelling tool: the image size
//! plus one object per instance, each carrying an encoded bitmap.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::binary_image::BinaryMask;
use crate::error::{RasterError, Result};
use crate::raster::prepare_mask;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    pub size: ImageSize,
    #[serde(default)]
    pub objects: Vec<AnnotatedObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedObject {
    #[serde(rename = "classTitle")]
    pub class_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitmap: Option<Bitmap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    /// base64 of a zlib-compressed PNG whose alpha channel is the mask.
    pub data: String,
    /// `[x, y]` of the bitmap's top-left corner on the full image.
    pub origin: [u32; 2],
}

impl ImageAnnotation {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl AnnotatedObject {
    /// The object's full-image mask.
    pub fn mask(&self, size: ImageSize) -> Result<BinaryMask, RasterError> {
        let bitmap = self.bitmap.as_ref().ok_or(RasterError::MissingBitmap)?;
        let [x, y] = bitmap.origin;
        prepare_mask(&bitmap.data, (x, y), (size.height, size.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use crate::raster::tests::encode_bitmap;

    #[test]
    fn parses_tool_export() {
        let json = r#"{
            "description": "",
            "size": {"height": 4, "width": 6},
            "objects": [
                {"classTitle": "living", "geometryType": "bitmap",
                 "bitmap": {"data": "eJw=", "origin": [1, 2]}},
                {"classTitle": "dead", "geometryType": "rectangle"}
            ]
        }"#;
        let annotation = ImageAnnotation::from_reader(json.as_bytes()).unwrap();
        assert_eq!(annotation.size, ImageSize { height: 4, width: 6 });
        assert_eq!(annotation.objects.len(), 2);
        assert_eq!(annotation.objects[0].class_title, "living");
        assert_eq!(annotation.objects[0].bitmap.as_ref().unwrap().origin, [1, 2]);
        assert!(annotation.objects[1].bitmap.is_none());
    }

    #[test]
    fn object_mask_lands_at_origin() {
        let mut stamp = RgbaImage::new(2, 1);
        stamp.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let object = AnnotatedObject {
            class_title: "living".to_string(),
            bitmap: Some(Bitmap {
                data: encode_bitmap(&stamp),
                origin: [3, 1],
            }),
        };
        let mask = object.mask(ImageSize { height: 4, width: 6 }).unwrap();
        assert!(mask.get(4, 1));
        assert_eq!(mask.count_foreground(), 1);
    }

    #[test]
    fn object_without_bitmap_is_an_error() {
        let object = AnnotatedObject {
            class_title: "dead".to_string(),
            bitmap: None,
        };
        let err = object.mask(ImageSize { height: 4, width: 6 }).unwrap_err();
        assert!(matches!(err, RasterError::MissingBitmap));
    }
}
