//! Catalog of named title definitions.
//!
//! Titles are admin-defined display templates a player can be granted and
//! activate. The registry persists as a bare id → definition JSON mapping;
//! `createdAt` stamps give [`TitleRegistry::list`] a stable definition order
//! on top of the unordered map.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::TagError;

/// Placeholder in display templates replaced with the player's name.
pub const PLAYER_PLACEHOLDER: &str = "{player}";

/// Title id granted to every new profile unless configured otherwise.
pub const DEFAULT_TITLE_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleDefinition {
    /// Text shown for the player, possibly containing gradient/color markup
    /// and the `{player}` placeholder.
    pub display_template: String,
    /// Permission level the host requires for this title. The core never
    /// evaluates it; level checks are the gateway's concern.
    #[serde(default)]
    pub required_permission_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "unknown_actor")]
    pub created_by: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

fn unknown_actor() -> String {
    "system".to_string()
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// In-memory title catalog. Serializes transparently as the id → definition
/// mapping of the titles document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleRegistry {
    titles: HashMap<String, TitleDefinition>,
}

impl TitleRegistry {
    /// Insert a new title. Fails with [`TagError::DuplicateTitle`] when the
    /// id is already taken.
    pub fn define(
        &mut self,
        id: &str,
        template: &str,
        level: u8,
        description: Option<String>,
        created_by: &str,
    ) -> Result<(), TagError> {
        if self.titles.contains_key(id) {
            return Err(TagError::DuplicateTitle(id.to_string()));
        }
        // Keep createdAt strictly increasing so clock ties cannot scramble
        // list order.
        let mut created_at = Utc::now();
        if let Some(max) = self.titles.values().map(|t| t.created_at).max() {
            if created_at <= max {
                created_at = max + Duration::nanoseconds(1);
            }
        }
        self.titles.insert(
            id.to_string(),
            TitleDefinition {
                display_template: template.to_string(),
                required_permission_level: level,
                description,
                created_by: created_by.to_string(),
                created_at,
            },
        );
        Ok(())
    }

    /// Remove a title definition. Profiles referencing it keep their dangling
    /// id; resolution treats it as "no active title".
    pub fn remove(&mut self, id: &str) -> Result<TitleDefinition, TagError> {
        self.titles
            .remove(id)
            .ok_or_else(|| TagError::TitleNotFound(id.to_string()))
    }

    pub fn resolve(&self, id: &str) -> Option<&TitleDefinition> {
        self.titles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.titles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Iterate definitions in definition order (createdAt, then id). Each
    /// call produces a fresh, finite iteration.
    pub fn list(&self) -> impl Iterator<Item = (&str, &TitleDefinition)> {
        let mut entries: Vec<(&str, &TitleDefinition)> = self
            .titles
            .iter()
            .map(|(id, def)| (id.as_str(), def))
            .collect();
        entries.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at).then(a.0.cmp(b.0)));
        entries.into_iter()
    }

    /// Built-in title set written on first run when no titles document exists.
    pub fn bootstrap_defaults() -> Self {
        let mut registry = TitleRegistry::default();
        let defaults: &[(&str, &str, u8, &str)] = &[
            (
                DEFAULT_TITLE_ID,
                "{player}",
                0,
                "Standard nametag",
            ),
            (
                "vip",
                "§6[VIP] §r{player}",
                0,
                "Golden VIP prefix",
            ),
            (
                "legend",
                "<gradient>[Legend]</gradient> §r{player}",
                3,
                "Animated-looking gradient prefix for staff",
            ),
        ];
        for (id, template, level, desc) in defaults {
            // Inserting into an empty registry cannot collide.
            let _ = registry.define(id, template, *level, Some(desc.to_string()), "system");
        }
        registry
    }
}
