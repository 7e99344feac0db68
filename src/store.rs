//! Durable persona store — the single JSON document shared by every context.
//!
//! Holds the keys `personas`, `activePersonaId`, and `settings`. Absent keys
//! fall back to per-component defaults; there is no schema versioning. The
//! store is shared by the daemon and CLI with last-write-wins semantics:
//! writes within the process are serialized, concurrent writers from other
//! processes are tolerated and may race.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Persona, PersonaId, Settings, DEFAULT_COLOR};

/// The full persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageData {
    /// Ordered persona list.
    pub personas: Vec<Persona>,

    /// Process-wide default persona; dangling ids are tolerated.
    pub active_persona_id: Option<PersonaId>,

    /// Behavior flags.
    pub settings: Settings,
}

impl StorageData {
    /// Resolve a persona by id.
    pub fn persona(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Resolve the active persona, treating a dangling id as "no persona".
    pub fn active_persona(&self) -> Option<&Persona> {
        self.active_persona_id
            .as_deref()
            .and_then(|id| self.persona(id))
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Store
// ─────────────────────────────────────────────────────────────────

/// File-backed store for personas, the active persona id, and settings.
pub struct PersonaStore {
    path: PathBuf,

    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl PersonaStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ─────────────────────────────────────────────────────────────
    // Document access
    // ─────────────────────────────────────────────────────────────

    /// Load the full document. A missing file yields defaults.
    pub async fn load(&self) -> Result<StorageData> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| Error::StoreParse {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Store file absent, using defaults");
                Ok(StorageData::default())
            }
            Err(e) => Err(Error::IoRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Persist the full document.
    async fn save(&self, data: &StorageData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json).await.map_err(|e| Error::IoWrite {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Load, apply a mutation, and persist — serialized within the process.
    async fn update<F>(&self, mutate: F) -> Result<StorageData>
    where
        F: FnOnce(&mut StorageData),
    {
        let _guard = self.write_lock.lock().await;
        let mut data = self.load().await?;
        mutate(&mut data);
        self.save(&data).await?;
        Ok(data)
    }

    // ─────────────────────────────────────────────────────────────
    // Personas
    // ─────────────────────────────────────────────────────────────

    /// Get the persona list.
    pub async fn personas(&self) -> Result<Vec<Persona>> {
        Ok(self.load().await?.personas)
    }

    /// Replace the persona list.
    pub async fn set_personas(&self, personas: Vec<Persona>) -> Result<()> {
        self.update(|data| data.personas = personas).await?;
        Ok(())
    }

    /// Append personas (used by import; callers validate first).
    pub async fn add_personas(&self, personas: Vec<Persona>) -> Result<()> {
        self.update(|data| data.personas.extend(personas)).await?;
        Ok(())
    }

    /// Remove a persona by id. Clears the active id if it pointed at it.
    /// Returns the removed persona, if any.
    pub async fn remove_persona(&self, id: &str) -> Result<Option<Persona>> {
        let mut removed = None;
        self.update(|data| {
            if let Some(pos) = data.personas.iter().position(|p| p.id == id) {
                removed = Some(data.personas.remove(pos));
                if data.active_persona_id.as_deref() == Some(id) {
                    data.active_persona_id = None;
                }
            }
        })
        .await?;
        Ok(removed)
    }

    /// Find a persona by exact id, falling back to exact name match.
    pub async fn find_persona(&self, id_or_name: &str) -> Result<Option<Persona>> {
        let data = self.load().await?;
        Ok(data
            .personas
            .iter()
            .find(|p| p.id == id_or_name)
            .or_else(|| data.personas.iter().find(|p| p.name == id_or_name))
            .cloned())
    }

    // ─────────────────────────────────────────────────────────────
    // Active persona
    // ─────────────────────────────────────────────────────────────

    /// Get the global active persona id.
    pub async fn active_persona_id(&self) -> Result<Option<PersonaId>> {
        Ok(self.load().await?.active_persona_id)
    }

    /// Set (or clear) the global active persona id.
    pub async fn set_active_persona_id(&self, id: Option<&str>) -> Result<()> {
        self.update(|data| data.active_persona_id = id.map(str::to_string))
            .await?;
        Ok(())
    }

    /// Resolve the active persona object; dangling ids yield `None`.
    pub async fn active_persona(&self) -> Result<Option<Persona>> {
        Ok(self.load().await?.active_persona().cloned())
    }

    // ─────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────

    /// Get the settings record.
    pub async fn settings(&self) -> Result<Settings> {
        Ok(self.load().await?.settings)
    }

    /// Replace the settings record.
    pub async fn set_settings(&self, settings: Settings) -> Result<()> {
        self.update(|data| data.settings = settings).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────

    /// Seed a default persona on first run. Returns true if seeding happened.
    pub async fn ensure_seeded(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.load().await?;
        if !data.personas.is_empty() {
            return Ok(false);
        }

        let default = Persona::new(
            "Default Assistant",
            "Standard assistant behavior",
            "",
            DEFAULT_COLOR,
        );
        info!(persona = %default.name, "Seeding default persona");
        data.active_persona_id = Some(default.id.clone());
        data.personas.push(default);
        data.settings = Settings::default();
        self.save(&data).await?;
        Ok(true)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
