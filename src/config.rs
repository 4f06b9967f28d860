//! Input layout and run configuration.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use crate::pipeline::Mode;
use crate::schema::LANGUAGES;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// The language whose catalog text is the lookup key of every localized string
pub const SOURCE_LANGUAGE: &str = "zh";

/// Fixed locations of the input files below the extracted game data root
#[derive(Debug, Clone)]
pub struct SourceLayout {
    root: PathBuf,
}

impl SourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staticdata(&self) -> PathBuf {
        self.root.join("staticdata")
    }

    fn py_static(&self) -> PathBuf {
        self.root.join("py_data").join("data_common").join("static")
    }

    fn universe(&self) -> PathBuf {
        self.root.join("sigmadata").join("eve").join("universe")
    }

    pub fn gettext_dir(&self, lang: &str) -> PathBuf {
        self.staticdata().join("gettext").join(lang)
    }

    pub fn item_type_script(&self) -> PathBuf {
        self.root
            .join("script")
            .join("data_common")
            .join("static")
            .join("item")
            .join("item_type.py")
    }

    pub fn item_types_by_group(&self) -> PathBuf {
        self.items_dir().join("item_types_by_group.json")
    }

    pub fn type_id_mapping(&self) -> PathBuf {
        self.py_static().join("item").join("type_id_mapping.json")
    }

    pub fn groups(&self) -> PathBuf {
        self.items_dir().join("group.json")
    }

    pub fn categories(&self) -> PathBuf {
        self.items_dir().join("category.json")
    }

    pub fn dogma_dir(&self) -> PathBuf {
        self.staticdata().join("dogma")
    }

    pub fn units(&self) -> PathBuf {
        self.dogma_dir().join("units.json")
    }

    pub fn attributes(&self) -> PathBuf {
        self.dogma_dir().join("attributes.json")
    }

    pub fn effects(&self) -> PathBuf {
        self.dogma_dir().join("effects.json")
    }

    pub fn type_effects(&self) -> PathBuf {
        self.dogma_dir().join("type_effects.json")
    }

    pub fn items_dir(&self) -> PathBuf {
        self.staticdata().join("items")
    }

    pub fn item_dogma_dir(&self) -> PathBuf {
        self.items_dir().join("item_dogma")
    }

    pub fn item_nanocore(&self) -> PathBuf {
        self.items_dir().join("item_nanocore.json")
    }

    pub fn repackage_volume(&self) -> PathBuf {
        self.py_static().join("item").join("repackage_volume.json")
    }

    pub fn reprocess(&self) -> PathBuf {
        self.py_static().join("reprocess.json")
    }

    pub fn industry(&self) -> PathBuf {
        self.py_static().join("spacestation").join("industry.json")
    }

    pub fn cal_code_modifier(&self) -> PathBuf {
        self.py_static()
            .join("dogma")
            .join("cal_code_modifier.json")
    }

    pub fn universe_text(&self) -> PathBuf {
        self.universe().join("gettext.json")
    }

    pub fn regions(&self) -> PathBuf {
        self.universe().join("regions.json")
    }

    pub fn constellations(&self) -> PathBuf {
        self.universe().join("constellations.json")
    }

    pub fn solar_systems(&self) -> PathBuf {
        self.universe().join("solar_systems.json")
    }

    pub fn stars(&self) -> PathBuf {
        self.universe().join("stars.json")
    }

    pub fn celestials(&self) -> PathBuf {
        self.universe().join("celestials.json")
    }

    pub fn stargates(&self) -> PathBuf {
        self.universe().join("stargates.json")
    }

    pub fn planet_exploit(&self) -> PathBuf {
        self.root
            .join("manual_staticdata")
            .join("universe")
            .join("planet_exploit_resource.json")
    }

    /// Files and directories a mode reads, with a short label each
    pub fn inputs(&self, mode: Mode) -> Vec<(&'static str, PathBuf)> {
        match mode {
            Mode::Lang => vec![("gettext", self.gettext_dir(SOURCE_LANGUAGE))],
            Mode::Base => vec![
                ("item_type", self.item_type_script()),
                ("item_types_by_group", self.item_types_by_group()),
                ("type_id_mapping", self.type_id_mapping()),
                ("group", self.groups()),
                ("category", self.categories()),
                ("units", self.units()),
            ],
            Mode::Attrs => vec![("attributes", self.attributes()), ("effects", self.effects())],
            Mode::Items => vec![
                ("items", self.items_dir()),
                ("item_dogma", self.item_dogma_dir()),
                ("item_nanocore", self.item_nanocore()),
            ],
            Mode::ItemExtra => vec![
                ("repackage_volume", self.repackage_volume()),
                ("reprocess", self.reprocess()),
            ],
            Mode::ItemAttrs => vec![
                ("dogma", self.dogma_dir()),
                ("type_effects", self.type_effects()),
            ],
            Mode::Modifier => vec![("cal_code_modifier", self.cal_code_modifier())],
            Mode::Bps => vec![("industry", self.industry())],
            Mode::Universe => vec![
                ("universe_text", self.universe_text()),
                ("regions", self.regions()),
                ("constellations", self.constellations()),
                ("solar_systems", self.solar_systems()),
                ("stars", self.stars()),
                ("celestials", self.celestials()),
                ("stargates", self.stargates()),
            ],
            Mode::Cobalt => Vec::new(),
            Mode::PlanetExploit => vec![("planet_exploit", self.planet_exploit())],
        }
    }

    /// Inputs of the given modes that do not exist on disk
    pub fn missing(&self, modes: &[Mode]) -> Vec<(Mode, &'static str, PathBuf)> {
        let mut missing = Vec::new();
        for mode in modes {
            for (label, path) in self.inputs(*mode) {
                if !path.exists() {
                    missing.push((*mode, label, path));
                }
            }
        }
        missing
    }
}

/// Settings for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub layout: SourceLayout,
    /// Translations loaded besides the source language
    pub languages: Vec<String>,
    /// Rows per insert batch
    pub batch_size: usize,
    /// Keep connections that only one side reports
    pub synthesize_reverse_edges: bool,
    /// Drop and recreate every table before the first write
    pub drop: bool,
}

impl PipelineConfig {
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self {
            layout: SourceLayout::new(input_root),
            languages: LANGUAGES
                .iter()
                .filter(|lang| **lang != SOURCE_LANGUAGE)
                .map(|lang| lang.to_string())
                .collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            synthesize_reverse_edges: true,
            drop: false,
        }
    }
}

/// Default database location in the platform data directory
pub fn default_database_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "echoes-sde-to-sqlite")
        .map(|dirs| dirs.data_dir().join("echoes.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = SourceLayout::new("/data");
        assert_eq!(
            layout.industry(),
            PathBuf::from("/data/py_data/data_common/static/spacestation/industry.json")
        );
        assert_eq!(
            layout.gettext_dir("en"),
            PathBuf::from("/data/staticdata/gettext/en")
        );
        assert_eq!(
            layout.planet_exploit(),
            PathBuf::from("/data/manual_staticdata/universe/planet_exploit_resource.json")
        );
    }

    #[test]
    fn test_missing_inputs() {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        fs::create_dir_all(layout.dogma_dir()).unwrap();
        fs::write(layout.attributes(), "{}").unwrap();

        let missing = layout.missing(&[Mode::Attrs]);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].1, "effects");
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::new("/data");
        assert!(config.synthesize_reverse_edges);
        assert!(!config.drop);
        assert!(!config.languages.iter().any(|l| l == SOURCE_LANGUAGE));
        assert!(config.languages.iter().any(|l| l == "en"));
    }
}
