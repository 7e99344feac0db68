//! Persona definition and validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Color assigned to personas created without an explicit one.
pub const DEFAULT_COLOR: &str = "#3b82f6";

/// Maximum allowed prompt length in characters.
pub const MAX_PROMPT_LEN: usize = 2000;

/// A named, colored, reusable seed prompt plus metadata.
///
/// Identity is `id`, generated once at creation and immutable thereafter.
/// Owned by the persona store; mutated only through explicit
/// create/edit/delete operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Opaque identifier (UUID v4 string).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Short human-readable description.
    #[serde(default)]
    pub description: String,

    /// Seed prompt injected into fresh conversations.
    #[serde(default)]
    pub prompt: String,

    /// RGB hex color (`#RRGGBB`).
    pub color: String,

    /// Creation timestamp.
    pub created: DateTime<Utc>,
}

impl Persona {
    /// Create a new persona with a fresh id and creation timestamp.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            prompt: prompt.into(),
            color: color.into(),
            created: Utc::now(),
        }
    }

    /// Validate user-supplied fields.
    ///
    /// Name and prompt are required, the prompt is capped at
    /// [`MAX_PROMPT_LEN`] characters, and the color must be `#RRGGBB`.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::PersonaInvalid {
                name: self.name.clone(),
                reason: "Name must not be empty".to_string(),
            });
        }
        if self.prompt.trim().is_empty() {
            return Err(Error::PersonaInvalid {
                name: self.name.clone(),
                reason: "Prompt must not be empty".to_string(),
            });
        }
        if self.prompt.chars().count() > MAX_PROMPT_LEN {
            return Err(Error::PersonaInvalid {
                name: self.name.clone(),
                reason: format!("Prompt must be at most {} characters", MAX_PROMPT_LEN),
            });
        }
        if !is_valid_color(&self.color) {
            return Err(Error::PersonaInvalid {
                name: self.name.clone(),
                reason: format!("Color '{}' is not a #RRGGBB hex value", self.color),
            });
        }
        Ok(())
    }
}

/// Check that a string is a `#RRGGBB` hex color.
pub fn is_valid_color(color: &str) -> bool {
    let bytes = color.as_bytes();
    bytes.len() == 7
        && bytes[0] == b'#'
        && bytes[1..].iter().all(|b| b.is_ascii_hexdigit())
}

// ─────────────────────────────────────────────────────────────────
// Import / Export
// ─────────────────────────────────────────────────────────────────

/// Parse an import payload into personas with fresh identities.
///
/// The payload must be a JSON array whose items all carry non-empty string
/// `name` and `prompt` fields; anything else rejects the whole payload and
/// nothing is applied. Description and color are optional.
pub fn import_personas(json: &str) -> Result<Vec<Persona>> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| Error::ImportInvalid {
        reason: format!("Not valid JSON: {}", e),
    })?;

    let items = value.as_array().ok_or_else(|| Error::ImportInvalid {
        reason: "Expected a JSON array of personas".to_string(),
    })?;

    let mut personas = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let name = item
            .get("name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());
        let prompt = item
            .get("prompt")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());
        let (name, prompt) = match (name, prompt) {
            (Some(name), Some(prompt)) => (name, prompt),
            _ => {
                return Err(Error::ImportInvalid {
                    reason: format!(
                        "Item {} is missing a name or prompt field",
                        index + 1
                    ),
                })
            }
        };

        let description = item.get("description").and_then(|v| v.as_str()).unwrap_or("");
        let color = item
            .get("color")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_COLOR);

        personas.push(Persona::new(name, description, prompt, color));
    }

    Ok(personas)
}

/// Serialize personas for export, stripping identity and creation time so
/// a re-import mints fresh ids.
pub fn export_personas(personas: &[Persona]) -> Result<String> {
    let items: Vec<serde_json::Value> = personas
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "description": p.description,
                "prompt": p.prompt,
                "color": p.color,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&items)?)
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
