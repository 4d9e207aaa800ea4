use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context};
use maskpoly::ExtractionOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Input setting
    pub input: InputConfig,
    /// Mask to polygon extraction parameters
    #[serde(default = "default_extraction")]
    pub extraction: ExtractionOptions,
    /// Output categories and class mapping
    #[serde(default)]
    pub categories: CategoryConfig,
    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct InputConfig {
    /// Annotation file or directory of annotation files
    pub input: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CategoryConfig {
    /// Category names; ids are their 1-based positions
    pub names: Vec<String>,
    /// Input class title to category name
    #[serde(default)]
    pub class_map: BTreeMap<String, String>,
    /// Category for class titles missing from `class_map`
    #[serde(default)]
    pub default_category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BatchConfig {
    /// File patterns to include in batch processing
    #[serde(default)]
    pub include_patterns: Vec<String>,
    /// File patterns to exclude from batch processing
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Number of parallel workers (0 lets rayon decide)
    #[serde(default)]
    pub workers: usize,
    /// Continue batch processing even if some files fail
    #[serde(default)]
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OutputConfig {
    /// COCO annotation file to write
    pub output_path: PathBuf,
    /// Suffix of annotation file names, replaced by `image_extension`
    pub mask_suffix: String,
    /// Extension of the annotated images
    pub image_extension: String,
    /// Directory for per-object polygon renderings
    #[serde(default)]
    pub debug_folder: Option<PathBuf>,
}

fn default_extraction() -> ExtractionOptions {
    ExtractionOptions {
        erosion: false,
        use_watershed: true,
        use_hierarchy: false,
        use_approximation: false,
        minimum_distance: 100,
        exclude_border: true,
    }
}

impl Default for CategoryConfig {
    fn default() -> Self {
        CategoryConfig {
            names: vec!["alive".to_string(), "dead".to_string()],
            class_map: BTreeMap::from([("living".to_string(), "alive".to_string())]),
            default_category: Some("dead".to_string()),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            include_patterns: vec!["*.json".to_string()],
            exclude_patterns: vec![],
            workers: 0,
            continue_on_error: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            output_path: PathBuf::from("output/annotation_coco.json"),
            mask_suffix: "_mask.jpg.json".to_string(),
            image_extension: ".jpg".to_string(),
            debug_folder: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: InputConfig {
                input: PathBuf::from("masks"),
            },
            extraction: default_extraction(),
            categories: CategoryConfig::default(),
            batch: BatchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl CategoryConfig {
    /// Category name for an input class title.
    pub fn resolve(&self, class_title: &str) -> Option<&str> {
        self.class_map
            .get(class_title)
            .or(self.default_category.as_ref())
            .map(String::as_str)
    }
}

impl OutputConfig {
    /// Image file name an annotation file describes.
    pub fn image_file_name(&self, annotation_path: &Path) -> String {
        let name = annotation_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match name.strip_suffix(&self.mask_suffix) {
            Some(stem) => format!("{}{}", stem, self.image_extension),
            None => name,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> anyhow::Result<Config> {
        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        let config: Config = match config_path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&config_str)?,
            Some("toml") => toml::from_str(&config_str)?,
            _ => bail!("Unsupported config file format. Use .json or .toml"),
        };
        Ok(config)
    }

    pub fn save_default(config_path: &Path) -> anyhow::Result<()> {
        let config = Config::default();
        let config_str = match config_path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::to_string_pretty(&config)?,
            _ => serde_json::to_string_pretty(&config)?, // Default to JSON
        };

        let mut file = File::create(config_path)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    /// Categories referenced by the class mapping must exist.
    pub fn validate(&self) -> anyhow::Result<()> {
        let targets = self
            .categories
            .class_map
            .values()
            .chain(self.categories.default_category.iter());
        for name in targets {
            if !self.categories.names.contains(name) {
                bail!("Category '{}' is mapped to but not declared in categories.names", name);
            }
        }
        self.extraction.strategy()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapping_matches_labelling_conventions() {
        let categories = CategoryConfig::default();
        assert_eq!(categories.resolve("living"), Some("alive"));
        assert_eq!(categories.resolve("anything else"), Some("dead"));
    }

    #[test]
    fn image_name_replaces_mask_suffix() {
        let output = OutputConfig::default();
        assert_eq!(output.image_file_name(Path::new("dir/cell_01_mask.jpg.json")), "cell_01.jpg");
        assert_eq!(output.image_file_name(Path::new("other.json")), "other.json");
    }

    #[test]
    fn default_config_round_trips_through_toml_and_json() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.extraction, config.extraction);
        assert_eq!(parsed.categories.names, config.categories.names);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.output.mask_suffix, "_mask.jpg.json");
    }

    #[test]
    fn minimal_config_uses_orchestrator_defaults() {
        let parsed: Config = toml::from_str("[input]\ninput = \"masks\"\n").unwrap();
        assert!(!parsed.extraction.erosion);
        assert!(!parsed.extraction.use_approximation);
        assert!(parsed.batch.continue_on_error);
        parsed.validate().unwrap();
    }

    #[test]
    fn unknown_category_target_is_rejected() {
        let mut config = Config::default();
        config.categories.default_category = Some("ghost".to_string());
        assert!(config.validate().is_err());
    }
}
