use tracing::info;

#[derive(Debug, Default)]
pub(crate) struct ProcessingStats {
    pub(crate) total_files: usize,
    pub(crate) processed: usize,
    pub(crate) failed: usize,
    pub(crate) objects: usize,
    pub(crate) failed_objects: usize,
    pub(crate) total_polygons: usize,
}

impl ProcessingStats {
    pub(crate) fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    pub(crate) fn print_summary(&self) {
        info!("=== Processing Summary ===");
        info!("Total files: {}", self.total_files);
        info!("Successfully processed: {}", self.processed);
        info!("Failed: {}", self.failed);
        info!("Objects: {} ({} failed)", self.objects, self.failed_objects);
        info!("Total polygons generated: {}", self.total_polygons);
        if self.total_files > 0 {
            info!("Success rate: {:.1}%",
                  (self.processed as f64 / self.total_files as f64) * 100.0);
        }
    }
}
