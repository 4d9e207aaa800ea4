mod config;
mod processing;
mod stats;

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context};
use clap::Parser;
use rayon::prelude::*;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use crate::config::Config;
use crate::processing::{assemble, Processor};
use crate::stats::ProcessingStats;

#[derive(Parser)]
#[command(name = "maskpoly")]
#[command(about = "Convert per-object bitmap masks into COCO polygon annotations")]
#[command(version = "0.1")]
struct Args {
    /// Annotation file or directory of annotation files
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output COCO annotation file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Generate default configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// File patterns to include in batch processing (e.g., "*.json")
    #[arg(long)]
    include_patterns: Option<String>,

    /// File patterns to exclude from batch processing
    #[arg(long)]
    exclude_patterns: Option<String>,

    /// Number of parallel workers for batch processing
    #[arg(long)]
    workers: Option<usize>,

    /// Continue batch processing even if some files fail
    #[arg(long)]
    continue_on_error: Option<bool>,

    /// Split touching instances with the watershed strategy
    #[arg(long)]
    watershed: Option<bool>,

    /// Fold holes into their outer polygon (takes priority over watershed)
    #[arg(long)]
    hierarchy: Option<bool>,

    /// Erode masks before plain contour tracing
    #[arg(long)]
    erosion: Option<bool>,

    /// Keep only run end points of watershed region borders
    #[arg(long)]
    approximation: Option<bool>,

    /// Minimum distance in pixels between watershed seeds
    #[arg(long)]
    minimum_distance: Option<u32>,

    /// Directory for per-object polygon renderings
    #[arg(long)]
    debug_folder: Option<PathBuf>,

    /// Verbose output
    #[arg(long)]
    verbose: bool,
}

fn matches_patterns(filename: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return false;
    }

    patterns.iter().any(|pattern| {
        if pattern.contains('*') {
            // Simple glob matching
            let pattern = pattern.replace('*', "");
            if pattern.starts_with('.') {
                filename.ends_with(&pattern)
            } else {
                filename.contains(&pattern)
            }
        } else {
            filename == pattern
        }
    })
}

fn find_input_files(
    input_path: &Path,
    include_patterns: &[String],
    exclude_patterns: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else if input_path.is_dir() {
        for entry in fs::read_dir(input_path)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if matches_patterns(filename, include_patterns)
                    && !matches_patterns(filename, exclude_patterns)
                {
                    files.push(path);
                }
            }
        }
    } else {
        bail!("Input path {} does not exist", input_path.display());
    }

    files.sort();
    Ok(files)
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn apply_overrides(config: &mut Config, args: Args) {
    if let Some(input) = args.input {
        config.input.input = input;
    }
    if let Some(output) = args.output {
        config.output.output_path = output;
    }
    if args.debug_folder.is_some() {
        config.output.debug_folder = args.debug_folder;
    }
    if let Some(workers) = args.workers {
        config.batch.workers = workers;
    }
    if let Some(continue_on_error) = args.continue_on_error {
        config.batch.continue_on_error = continue_on_error;
    }
    if let Some(watershed) = args.watershed {
        config.extraction.use_watershed = watershed;
    }
    if let Some(hierarchy) = args.hierarchy {
        config.extraction.use_hierarchy = hierarchy;
    }
    if let Some(erosion) = args.erosion {
        config.extraction.erosion = erosion;
    }
    if let Some(approximation) = args.approximation {
        config.extraction.use_approximation = approximation;
    }
    if let Some(minimum_distance) = args.minimum_distance {
        config.extraction.minimum_distance = minimum_distance;
    }
    if let Some(include_patterns) = args.include_patterns {
        config.batch.include_patterns = split_patterns(&include_patterns);
    }
    if let Some(exclude_patterns) = args.exclude_patterns {
        config.batch.exclude_patterns.append(&mut split_patterns(&exclude_patterns));
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Handle config generation
    if args.generate_config {
        let config_path = args.config.unwrap_or_else(|| PathBuf::from("maskpoly.json"));
        Config::save_default(&config_path)?;
        info!("Generated default configuration file: {}", config_path.display());
        return Ok(());
    }

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::load(config_path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;

    let input_files = find_input_files(
        &config.input.input,
        &config.batch.include_patterns,
        &config.batch.exclude_patterns,
    )?;
    if input_files.is_empty() {
        bail!("No input files found matching the criteria");
    }
    info!("Found {} input files", input_files.len());
    for file in &input_files {
        debug!("  - {}", file.display());
    }

    let processor = Processor::new(config.clone())?;
    let mut pool = rayon::ThreadPoolBuilder::new();
    if config.batch.workers > 0 {
        pool = pool.num_threads(config.batch.workers);
    }
    let pool = pool.build().context("Failed to start worker pool")?;

    // One file per task; results keep the file order
    let results: Vec<_> = pool.install(|| {
        input_files
            .par_iter()
            .map(|file| processor.process(file))
            .collect()
    });

    let mut stats = ProcessingStats::new(input_files.len());
    let mut outcomes = Vec::with_capacity(results.len());
    for (index, (file, result)) in input_files.iter().zip(results).enumerate() {
        match result {
            Ok(outcome) => {
                stats.processed += 1;
                stats.objects += outcome.objects;
                stats.failed_objects += outcome.failed_objects;
                stats.total_polygons += outcome.instances.len();
                debug!("Processed {} ({} polygons)", file.display(), outcome.instances.len());
                outcomes.push((index, outcome));
            }
            Err(e) => {
                stats.failed += 1;
                error!("Failed to process {}: {:#}", file.display(), e);
                if !config.batch.continue_on_error {
                    return Err(e);
                }
            }
        }
    }

    let coco = assemble(processor.empty_output(), &outcomes);
    if let Some(parent) = config.output.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    coco.save(&config.output.output_path)
        .with_context(|| format!("Failed to write {}", config.output.output_path.display()))?;

    stats.print_summary();
    info!("COCO format annotations saved to {}", config.output.output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_match_by_extension_and_name() {
        let patterns = split_patterns("*.json, exact.txt");
        assert!(matches_patterns("a_mask.jpg.json", &patterns));
        assert!(matches_patterns("exact.txt", &patterns));
        assert!(!matches_patterns("image.jpg", &patterns));
        assert!(!matches_patterns("anything", &[]));
    }

    #[test]
    fn directory_listing_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = find_input_files(dir.path(), &["*.json".to_string()], &[]).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(find_input_files(Path::new("/definitely/not/here"), &[], &[]).is_err());
    }
}
