use std::fs;
use std::path::Path;
use anyhow::{anyhow, Context};
use maskpoly::coco::CocoFile;
use maskpoly::draw::DrawPolygons;
use maskpoly::supervisely::{AnnotatedObject, ImageAnnotation, ImageSize};
use maskpoly::{ExtractionStrategy, Polygon, PolygonExtractor};
use tracing::{debug, warn};
use crate::config::Config;

/// Everything extracted from one annotation file, before ids are assigned.
#[derive(Debug, Default)]
pub(crate) struct FileOutcome {
    pub image: Option<ImageRecord>,
    pub instances: Vec<Instance>,
    pub objects: usize,
    pub failed_objects: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageRecord {
    pub file_name: String,
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct Instance {
    pub category_id: u64,
    pub polygon: Polygon,
}

pub(crate) struct Processor {
    config: Config,
    strategy: ExtractionStrategy,
    categories: CocoFile,
}

impl Processor {
    pub(crate) fn new(config: Config) -> anyhow::Result<Self> {
        let strategy = config.extraction.strategy()?;
        let categories = CocoFile::with_categories(config.categories.names.iter().cloned());
        Ok(Processor {
            config,
            strategy,
            categories,
        })
    }

    /// An empty output file with this run's categories.
    pub(crate) fn empty_output(&self) -> CocoFile {
        self.categories.clone()
    }

    pub(crate) fn process(&self, input: &Path) -> anyhow::Result<FileOutcome> {
        let annotation = ImageAnnotation::load(input)
            .with_context(|| format!("Failed to read annotation file {}", input.display()))?;
        let size = annotation.size;
        debug!(
            file = %input.display(),
            objects = annotation.objects.len(),
            "{}x{} image", size.width, size.height
        );

        let mut outcome = FileOutcome {
            objects: annotation.objects.len(),
            ..FileOutcome::default()
        };
        if !annotation.objects.is_empty() {
            outcome.image = Some(ImageRecord {
                file_name: self.config.output.image_file_name(input),
                height: size.height,
                width: size.width,
            });
        }

        for (index, object) in annotation.objects.iter().enumerate() {
            match self.process_object(input, index, object, size) {
                Ok(instances) => outcome.instances.extend(instances),
                Err(e) => {
                    outcome.failed_objects += 1;
                    warn!(
                        file = %input.display(),
                        object = index,
                        class = %object.class_title,
                        "Skipping object: {:#}", e
                    );
                }
            }
        }

        Ok(outcome)
    }

    fn process_object(
        &self,
        input: &Path,
        index: usize,
        object: &AnnotatedObject,
        size: ImageSize,
    ) -> anyhow::Result<Vec<Instance>> {
        let category = self
            .config
            .categories
            .resolve(&object.class_title)
            .ok_or_else(|| anyhow!("No category for class '{}'", object.class_title))?;
        let category_id = self
            .categories
            .category_id(category)
            .ok_or_else(|| anyhow!("Unknown category '{}'", category))?;

        let mask = object.mask(size)?;
        let polygons = self.strategy.extract(&mask)?;

        if let Some(debug_folder) = &self.config.output.debug_folder {
            let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
            fs::create_dir_all(debug_folder)?;
            let path = debug_folder.join(format!("{}_{}.png", stem, index));
            polygons
                .draw_over(&mask)
                .save_with_format(&path, image::ImageFormat::Png)
                .with_context(|| format!("Failed to save rendering {}", path.display()))?;
        }

        let total = polygons.len();
        let instances: Vec<Instance> = polygons
            .into_iter()
            .filter(|polygon| !polygon.is_degenerate())
            .map(|polygon| Instance {
                category_id,
                polygon,
            })
            .collect();
        if instances.len() < total {
            debug!(
                file = %input.display(),
                object = index,
                dropped = total - instances.len(),
                "Dropped degenerate polygons"
            );
        }
        Ok(instances)
    }
}

/// Folds per-file outcomes, in file order, into one COCO file. Image ids are
/// the 1-based file positions; annotation ids run across the whole file.
pub(crate) fn assemble(mut coco: CocoFile, outcomes: &[(usize, FileOutcome)]) -> CocoFile {
    for (index, outcome) in outcomes {
        let image_id = *index as u64 + 1;
        if let Some(image) = &outcome.image {
            coco.images.push(maskpoly::coco::CocoImage {
                file_name: image.file_name.clone(),
                height: image.height,
                width: image.width,
                id: image_id,
            });
        }
        for instance in &outcome.instances {
            coco.push_polygon(image_id, instance.category_id, &instance.polygon);
        }
    }
    coco
}

#[cfg(test)]
mod tests {
    use super::*;
    use maskpoly::Point;

    fn square() -> Polygon {
        Polygon::new(vec![Point::new(0, 0), Point::new(0, 5), Point::new(5, 5), Point::new(5, 0)])
    }

    #[test]
    fn assembly_numbers_images_by_position_and_annotations_globally() {
        let image = |name: &str| ImageRecord {
            file_name: name.to_string(),
            height: 10,
            width: 10,
        };
        let outcomes = vec![
            (0, FileOutcome {
                image: Some(image("a.jpg")),
                instances: vec![Instance { category_id: 1, polygon: square() }],
                objects: 1,
                failed_objects: 0,
            }),
            (1, FileOutcome::default()),
            (2, FileOutcome {
                image: Some(image("c.jpg")),
                instances: vec![
                    Instance { category_id: 2, polygon: square() },
                    Instance { category_id: 1, polygon: square() },
                ],
                objects: 2,
                failed_objects: 0,
            }),
        ];

        let coco = assemble(CocoFile::with_categories(["alive", "dead"]), &outcomes);
        let image_ids: Vec<u64> = coco.images.iter().map(|i| i.id).collect();
        assert_eq!(image_ids, vec![1, 3]);
        let ids: Vec<(u64, u64)> = coco.annotations.iter().map(|a| (a.id, a.image_id)).collect();
        assert_eq!(ids, vec![(1, 1), (2, 3), (3, 3)]);
        assert_eq!(coco.annotations[1].category_id, 2);
    }
}
