//! Named chart presets, stored as one JSON document:
//! `{ "<chart kind>": { "<preset name>": { ...settings } } }`.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::chart_settings::{ChartKind, ChartSettings};

pub const DEFAULT_PRESETS_FILE: &str = "plot_presets.json";

/// The preset document, loaded once and rewritten whole on every change.
/// Kinds this build does not know are kept as they are.
#[derive(Debug, Clone)]
pub struct PresetStore {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl PresetStore {
    /// Open the preset file at `path`. A missing or empty file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = if path.exists() {
            let text = fs::read_to_string(&path)
                .map_err(|e| eyre!("Failed to read presets {}: {}", path.display(), e))?;
            if text.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&text)
                    .map_err(|e| eyre!("Invalid presets file {}: {}", path.display(), e))?
                {
                    Value::Object(map) => map,
                    _ => {
                        return Err(eyre!(
                            "Invalid presets file {}: expected a JSON object",
                            path.display()
                        ))
                    }
                }
            }
        } else {
            Map::new()
        };
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Preset names saved for `kind`, sorted.
    pub fn names(&self, kind: ChartKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .doc
            .get(kind.name())
            .and_then(Value::as_object)
            .map(|presets| presets.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// The stored settings object, as saved.
    pub fn get(&self, kind: ChartKind, name: &str) -> Option<&Value> {
        self.doc.get(kind.name())?.as_object()?.get(name)
    }

    /// Stored settings merged over the defaults of `kind`.
    pub fn load(&self, kind: ChartKind, name: &str) -> Result<ChartSettings> {
        let stored = self
            .get(kind, name)
            .ok_or_else(|| eyre!("No {} preset named '{}'", kind, name))?;
        Ok(ChartSettings::from_value(kind, stored))
    }

    /// Save `settings` under `name`, replacing a preset of the same name.
    pub fn save(&mut self, name: &str, settings: &ChartSettings) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(eyre!("Preset name cannot be empty"));
        }
        let kind = settings.kind();
        let value = settings.to_value()?;
        let entry = self
            .doc
            .entry(kind.name().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(presets) = entry {
            presets.insert(name.to_string(), value);
        }
        self.write()?;
        log::info!("saved {} preset '{}' to {}", kind, name, self.path.display());
        Ok(())
    }

    /// Remove one preset. Returns whether it existed; nothing is written if not.
    pub fn delete(&mut self, kind: ChartKind, name: &str) -> Result<bool> {
        let removed = self
            .doc
            .get_mut(kind.name())
            .and_then(Value::as_object_mut)
            .and_then(|presets| presets.remove(name))
            .is_some();
        if removed {
            self.write()?;
            log::info!("deleted {} preset '{}'", kind, name);
        }
        Ok(removed)
    }

    /// Forget every preset and delete the file.
    pub fn remove_all(&mut self) -> Result<()> {
        self.doc.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            log::info!("removed presets file {}", self.path.display());
        }
        Ok(())
    }

    /// Rewrite the whole document under an exclusive lock.
    fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.doc)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        fs2::FileExt::lock_exclusive(&file)?;
        file.set_len(0)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        fs2::FileExt::unlock(&file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_settings::PieSettings;
    use serde_json::json;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::open(dir.path().join("none.json")).unwrap();
        assert!(store.names(ChartKind::Bar).is_empty());
    }

    #[test]
    fn test_blank_name_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let mut store = PresetStore::open(&path).unwrap();
        let settings = ChartSettings::default_for(ChartKind::Pie);
        assert!(store.save("   ", &settings).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_kinds_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, r#"{"Heatmap": {"old": {"x": 1}}}"#).unwrap();
        let mut store = PresetStore::open(&path).unwrap();
        let mut pie = PieSettings::default();
        pie.col = "share".to_string();
        store.save("mine", &ChartSettings::Pie(pie)).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["Heatmap"], json!({"old": {"x": 1}}));
        assert_eq!(written["Pie"]["mine"]["col"], json!("share"));
    }

    #[test]
    fn test_not_an_object_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(PresetStore::open(&path).is_err());
    }

    #[test]
    fn test_delete_missing_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let mut store = PresetStore::open(&path).unwrap();
        assert!(!store.delete(ChartKind::Line, "nope").unwrap());
        assert!(!path.exists());
    }
}
