//! The Unified Model Store: an in-memory model graph backed by model files in
//! the repository working tree.
//!
//! Watchers receive one store behind a shared lock and never create or
//! replace it. Clients read and mutate through short-lived views; `reload()`
//! re-reads the working tree after the VCS has mutated it and invalidates
//! every previously issued view (enforced via a generation stamp).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use ums_core::{write_atomic, ValidationOutcome};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed model file {path}: {source}")]
    MalformedModel {
        path: String,
        source: serde_json::Error,
    },
    #[error("model serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store is disposed")]
    Disposed,
    #[error("stale view: store generation {current}, view generation {seen}")]
    StaleView { current: u64, seen: u64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A component inside a system, optionally requiring sibling components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
        }
    }
}

/// Root model element of one model resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl System {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }
}

/// Systems per model file name that looks crowded enough to warn about.
const LARGE_SYSTEM_THRESHOLD: usize = 100;

/// Builder for the process-wide store.
#[derive(Debug)]
pub struct ModelStoreBuilder {
    storage_root: Option<PathBuf>,
    model_extension: String,
}

impl ModelStoreBuilder {
    pub fn new() -> Self {
        Self {
            storage_root: None,
            model_extension: "model".to_string(),
        }
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    pub fn with_model_extension(mut self, extension: impl Into<String>) -> Self {
        self.model_extension = extension.into();
        self
    }

    /// Build the store and load every model resource found under the root.
    pub fn build_and_load(self) -> Result<ModelStore> {
        let storage_root = self
            .storage_root
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no storage root"))?;
        let mut store = ModelStore {
            storage_root,
            model_extension: self.model_extension,
            resources: BTreeMap::new(),
            generation: 0,
            disposed: false,
        };
        store.load_from_disk()?;
        Ok(store)
    }
}

/// The in-memory model graph.
pub struct ModelStore {
    storage_root: PathBuf,
    model_extension: String,
    resources: BTreeMap<String, System>,
    generation: u64,
    disposed: bool,
}

impl ModelStore {
    pub fn builder() -> ModelStoreBuilder {
        ModelStoreBuilder::new()
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(StoreError::Disposed);
        }
        Ok(())
    }

    /// Snapshot view of the current model state.
    pub fn view(&self) -> Result<ModelView> {
        self.ensure_live()?;
        Ok(ModelView {
            generation: self.generation,
            resources: self.resources.clone(),
            dirty: BTreeSet::new(),
        })
    }

    /// Apply a view's edits and persist the touched model files.
    ///
    /// Rejects views issued before the last `reload()`: the view no longer
    /// reflects the on-disk state the store was rebuilt from.
    pub fn commit_view(&mut self, view: ModelView) -> Result<()> {
        self.ensure_live()?;
        if view.generation != self.generation {
            return Err(StoreError::StaleView {
                current: self.generation,
                seen: view.generation,
            });
        }
        for file_name in &view.dirty {
            let path = self.storage_root.join(file_name);
            match view.resources.get(file_name) {
                Some(system) => {
                    let json = serde_json::to_string_pretty(system)?;
                    write_atomic(&path, json.as_bytes())?;
                }
                None => {
                    let _ = std::fs::remove_file(&path);
                }
            }
        }
        self.resources = view.resources;
        debug!(resources = self.resources.len(), "view committed");
        Ok(())
    }

    /// Drop in-memory state and re-read every model file from disk.
    ///
    /// Bumps the generation: views issued before the reload are stale and can
    /// no longer be committed.
    pub fn reload(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.load_from_disk()?;
        self.generation += 1;
        debug!(
            generation = self.generation,
            resources = self.resources.len(),
            "store reloaded from disk"
        );
        Ok(())
    }

    fn load_from_disk(&mut self) -> Result<()> {
        self.resources.clear();
        let entries = match std::fs::read_dir(&self.storage_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str())
                    != Some(self.model_extension.as_str())
            {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            let system: System =
                serde_json::from_str(&content).map_err(|source| StoreError::MalformedModel {
                    path: path.display().to_string(),
                    source,
                })?;
            self.resources.insert(file_name.to_string(), system);
        }
        Ok(())
    }

    /// Validate all currently loaded resources.
    pub fn validate(&self) -> Result<ValidationOutcome> {
        self.ensure_live()?;
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.resources.is_empty() {
            warnings.push("no model resources loaded".to_string());
        }

        for (file_name, system) in &self.resources {
            let mut seen = BTreeSet::new();
            for component in &system.components {
                if component.name.trim().is_empty() {
                    errors.push(format!("component with empty name in {file_name}"));
                    continue;
                }
                if !seen.insert(component.name.as_str()) {
                    errors.push(format!(
                        "duplicate component name '{}' in {file_name}",
                        component.name
                    ));
                }
            }
            for component in &system.components {
                for required in &component.requires {
                    if !system.components.iter().any(|c| &c.name == required) {
                        errors.push(format!(
                            "unresolved reference '{required}' from component '{}' in {file_name}",
                            component.name
                        ));
                    }
                }
            }
            if system.components.len() > LARGE_SYSTEM_THRESHOLD {
                warnings.push(format!(
                    "large model: {file_name} has {} components",
                    system.components.len()
                ));
            }
        }

        Ok(ValidationOutcome::from_findings(errors, warnings))
    }

    /// Tear the store down. Further operations fail with `Disposed`.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.resources.clear();
        self.generation += 1;
    }
}

/// A snapshot of the model state, valid until the next `reload()`.
#[derive(Debug, Clone)]
pub struct ModelView {
    generation: u64,
    resources: BTreeMap<String, System>,
    dirty: BTreeSet<String>,
}

impl ModelView {
    /// Register a new root system under the given model file name.
    pub fn register_root(&mut self, system: System, file_name: impl Into<String>) {
        let file_name = file_name.into();
        self.resources.insert(file_name.clone(), system);
        self.dirty.insert(file_name);
    }

    /// Remove a root system (and, on commit, its model file).
    pub fn remove_root(&mut self, file_name: &str) {
        self.resources.remove(file_name);
        self.dirty.insert(file_name.to_string());
    }

    pub fn system(&self, file_name: &str) -> Option<&System> {
        self.resources.get(file_name)
    }

    /// Mutable access marks the resource dirty for the next commit.
    pub fn system_mut(&mut self, file_name: &str) -> Option<&mut System> {
        if self.resources.contains_key(file_name) {
            self.dirty.insert(file_name.to_string());
        }
        self.resources.get_mut(file_name)
    }

    pub fn root_systems(&self) -> impl Iterator<Item = (&str, &System)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
