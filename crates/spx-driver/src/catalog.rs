//! Read-through access to a project's resource catalog
//!
//! Layout under the resource root:
//! - `index.json`: `backdrops` and `zorder` (widgets are the object entries with a name)
//! - `sounds/<name>/index.json`
//! - `sprites/<name>/index.json`: costumes in order, `fAnimations` by name
//!
//! Nothing is cached between calls; every lookup reads the files it needs.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;
use tracing::debug;

use crate::resource::{
    AnimationResource, BackdropResource, CostumeResource, SoundResource, SpriteResource, WidgetResource,
};
use crate::workspace::{join_path, Workspace};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

#[derive(Deserialize, Default)]
struct RootIndex {
    #[serde(default)]
    backdrops: Vec<BackdropResource>,
    #[serde(default)]
    zorder: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawSprite {
    #[serde(default)]
    costumes: Vec<CostumeResource>,
    #[serde(default, rename = "costumeIndex")]
    costume_index: usize,
    #[serde(default, rename = "fAnimations")]
    animations: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "defaultAnimation")]
    default_animation: Option<String>,
}

pub struct ResourceCatalog<'a> {
    workspace: &'a dyn Workspace,
    root: String,
}

impl<'a> ResourceCatalog<'a> {
    pub fn new(workspace: &'a dyn Workspace, root: impl Into<String>) -> Self {
        Self {
            workspace,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn backdrop(&self, name: &str) -> Result<BackdropResource, CatalogError> {
        let index = self.root_index()?;
        index
            .backdrops
            .into_iter()
            .find(|b| b.name == name)
            .ok_or_else(|| CatalogError::NotFound(format!("backdrop {:?}", name)))
    }

    pub fn widget(&self, name: &str) -> Result<WidgetResource, CatalogError> {
        self.widgets()?
            .into_iter()
            .find(|w| w.name == name)
            .ok_or_else(|| CatalogError::NotFound(format!("widget {:?}", name)))
    }

    pub fn sound(&self, name: &str) -> Result<SoundResource, CatalogError> {
        let path = join_path("sounds", &format!("{}/index.json", name));
        let mut sound: SoundResource = self.read_json(&path)?;
        sound.name = name.to_string();
        Ok(sound)
    }

    pub fn sprite(&self, name: &str) -> Result<SpriteResource, CatalogError> {
        let path = join_path("sprites", &format!("{}/index.json", name));
        let raw: RawSprite = self.read_json(&path)?;
        let animations = raw
            .animations
            .into_iter()
            .map(|(name, value)| AnimationResource {
                name,
                frame_from: value.get("frameFrom").and_then(|v| v.as_str()).map(str::to_string),
                frame_to: value.get("frameTo").and_then(|v| v.as_str()).map(str::to_string),
            })
            .collect();
        Ok(SpriteResource {
            name: name.to_string(),
            costumes: raw.costumes,
            costume_index: raw.costume_index,
            animations,
            default_animation: raw.default_animation.filter(|a| !a.is_empty()),
        })
    }

    fn widgets(&self) -> Result<Vec<WidgetResource>, CatalogError> {
        let index = self.root_index()?;
        Ok(index
            .zorder
            .into_iter()
            .filter(|item| item.is_object())
            .filter_map(|item| serde_json::from_value::<WidgetResource>(item).ok())
            .filter(|w| !w.name.is_empty())
            .collect())
    }

    fn root_index(&self) -> Result<RootIndex, CatalogError> {
        self.read_json("index.json")
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, sub_path: &str) -> Result<T, CatalogError> {
        let path = join_path(&self.root, sub_path);
        debug!(path = %path, "reading catalog file");
        let bytes = self.workspace.read_file(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CatalogError::NotFound(path.clone())
            } else {
                CatalogError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MapFs;

    fn fixture() -> MapFs {
        MapFs::with_files([
            (
                "assets/index.json",
                r#"{
                    "backdrops": [{"name": "night", "path": "night.png"}],
                    "zorder": ["Hero", {"name": "score", "type": "monitor", "label": "Score", "x": 10, "visible": true}, {"type": "monitor"}]
                }"#,
            ),
            ("assets/sounds/Boom/index.json", r#"{"path": "boom.wav", "rate": 44100, "sampleCount": 1024}"#),
            (
                "assets/sprites/Hero/index.json",
                r#"{
                    "costumes": [{"name": "walk-1", "path": "1.png"}, {"name": "walk-2", "path": "2.png"}],
                    "costumeIndex": 1,
                    "fAnimations": {"run": {"frameFrom": "walk-1", "frameTo": "walk-2"}, "idle": {}},
                    "defaultAnimation": "idle"
                }"#,
            ),
            ("assets/sprites/Broken/index.json", "{ not json"),
        ])
    }

    #[test]
    fn test_backdrop_and_widget_from_root_index() {
        let fs = fixture();
        let catalog = ResourceCatalog::new(&fs, "assets");
        assert_eq!(catalog.backdrop("night").unwrap().path, "night.png");
        assert!(catalog.backdrop("day").unwrap_err().is_not_found());

        let widget = catalog.widget("score").unwrap();
        assert_eq!(widget.kind, "monitor");
        assert_eq!(widget.x, Some(10.0));
        assert_eq!(widget.visible, Some(true));
        assert_eq!(catalog.widgets().unwrap().len(), 1);
    }

    #[test]
    fn test_sound_takes_directory_name() {
        let fs = fixture();
        let catalog = ResourceCatalog::new(&fs, "assets");
        let sound = catalog.sound("Boom").unwrap();
        assert_eq!(sound.name, "Boom");
        assert_eq!(sound.rate, Some(44100));
        assert_eq!(sound.sample_count, Some(1024));
        assert!(catalog.sound("Quiet").unwrap_err().is_not_found());
    }

    #[test]
    fn test_sprite_costumes_and_animations() {
        let fs = fixture();
        let catalog = ResourceCatalog::new(&fs, "assets");
        let hero = catalog.sprite("Hero").unwrap();
        assert_eq!(hero.costumes.len(), 2);
        assert_eq!(hero.costumes[0].name, "walk-1");
        assert_eq!(hero.costume_index, 1);
        let names: Vec<&str> = hero.animations.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["idle", "run"]);
        assert_eq!(hero.animation("run").unwrap().frame_to.as_deref(), Some("walk-2"));
        assert_eq!(hero.default_animation.as_deref(), Some("idle"));
        assert!(hero.costume("walk-3").is_none());
    }

    #[test]
    fn test_corrupt_metadata_is_parse_error() {
        let fs = fixture();
        let catalog = ResourceCatalog::new(&fs, "assets");
        let err = catalog.sprite("Broken").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse assets/sprites/Broken/index.json"));
    }

    #[test]
    fn test_missing_root_index_is_not_found() {
        let fs = MapFs::with_files([("main.spx", "")]);
        let catalog = ResourceCatalog::new(&fs, "assets");
        assert!(catalog.backdrop("night").unwrap_err().is_not_found());
        assert!(catalog.widget("score").unwrap_err().is_not_found());
    }

    #[test]
    fn test_dotted_root_reads_same_files() {
        let fs = fixture();
        let catalog = ResourceCatalog::new(&fs, "./assets");
        assert_eq!(catalog.sound("Boom").unwrap().path, "boom.wav");
        assert_eq!(catalog.sprite("Hero").unwrap().costumes.len(), 2);
    }
}
