//! Per-player persisted state: owned titles, active title, custom tag.
//!
//! Profiles are created lazily on first reference and never deleted, only
//! emptied. All mutations are pure in-memory operations; the service layer
//! persists the document and drives display resynchronization.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::errors::TagError;
use crate::gradient;

use super::registry::TitleRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    #[serde(default)]
    pub owned_title_ids: BTreeSet<String>,
    /// Invariant: `None` or a member of `owned_title_ids`. A dangling id left
    /// behind by a later title removal resolves as "no active title".
    #[serde(default)]
    pub active_title_id: Option<String>,
    #[serde(default)]
    pub custom_tag: Option<String>,
    #[serde(default = "epoch")]
    pub first_seen: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub last_seen: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl PlayerProfile {
    fn new() -> Self {
        let now = Utc::now();
        PlayerProfile {
            owned_title_ids: BTreeSet::new(),
            active_title_id: None,
            custom_tag: None,
            first_seen: now,
            last_seen: now,
        }
    }
}

/// Strip control characters from player-supplied tag text before it is
/// measured or stored.
pub fn sanitize_tag(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// In-memory profile map. Serializes transparently as the player-id → profile
/// mapping of the profiles document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileStore {
    profiles: HashMap<String, PlayerProfile>,
}

impl ProfileStore {
    pub fn get(&self, player: &str) -> Option<&PlayerProfile> {
        self.profiles.get(player)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlayerProfile)> {
        self.profiles.iter().map(|(id, p)| (id.as_str(), p))
    }

    /// Return the existing profile, or create one with `default_title`
    /// granted and active. The second element is true when a profile was
    /// created (the caller persists only in that case).
    pub fn ensure(&mut self, player: &str, default_title: &str) -> (&PlayerProfile, bool) {
        let mut created = false;
        let profile = self.profiles.entry(player.to_string()).or_insert_with(|| {
            created = true;
            let mut p = PlayerProfile::new();
            p.owned_title_ids.insert(default_title.to_string());
            p.active_title_id = Some(default_title.to_string());
            p
        });
        (profile, created)
    }

    /// Refresh `last_seen` for an existing profile.
    pub fn touch(&mut self, player: &str) {
        if let Some(p) = self.profiles.get_mut(player) {
            p.last_seen = Utc::now();
        }
    }

    /// Add `title` to the player's owned set. Idempotent: returns false and
    /// changes nothing when already owned. The title must exist in the
    /// registry; ownership stays a live reference to the registry entry.
    pub fn grant(
        &mut self,
        player: &str,
        title: &str,
        registry: &TitleRegistry,
    ) -> Result<bool, TagError> {
        if !registry.contains(title) {
            return Err(TagError::TitleNotFound(title.to_string()));
        }
        let profile = self
            .profiles
            .entry(player.to_string())
            .or_insert_with(PlayerProfile::new);
        Ok(profile.owned_title_ids.insert(title.to_string()))
    }

    /// Remove `title` from the owned set; clears the active title when it was
    /// the one revoked. Returns false when not owned.
    pub fn revoke(&mut self, player: &str, title: &str) -> bool {
        let Some(profile) = self.profiles.get_mut(player) else {
            return false;
        };
        if !profile.owned_title_ids.remove(title) {
            return false;
        }
        if profile.active_title_id.as_deref() == Some(title) {
            profile.active_title_id = None;
        }
        true
    }

    /// Activate an owned title. Fails with [`TagError::NotOwned`] otherwise,
    /// leaving the active title unchanged.
    pub fn set_active(&mut self, player: &str, title: &str) -> Result<(), TagError> {
        let owned = self
            .profiles
            .get(player)
            .map(|p| p.owned_title_ids.contains(title))
            .unwrap_or(false);
        if !owned {
            return Err(TagError::NotOwned {
                player: player.to_string(),
                title: title.to_string(),
            });
        }
        // get_mut cannot fail after the ownership check above
        if let Some(profile) = self.profiles.get_mut(player) {
            profile.active_title_id = Some(title.to_string());
        }
        Ok(())
    }

    pub fn clear_active(&mut self, player: &str) {
        if let Some(profile) = self.profiles.get_mut(player) {
            profile.active_title_id = None;
        }
    }

    /// Store a freeform tag, sanitized of control characters. Fails with
    /// [`TagError::TagTooLong`] (profile unchanged) when the sanitized text
    /// exceeds `max` characters; color codes and markup count toward the
    /// limit.
    pub fn set_custom_tag(&mut self, player: &str, text: &str, max: usize) -> Result<String, TagError> {
        let tag = sanitize_tag(text);
        let len = tag.chars().count();
        if len > max {
            return Err(TagError::TagTooLong { len, max });
        }
        let profile = self
            .profiles
            .entry(player.to_string())
            .or_insert_with(PlayerProfile::new);
        profile.custom_tag = Some(tag.clone());
        Ok(tag)
    }

    /// Drop the custom tag. Returns false when none was set.
    pub fn clear_custom_tag(&mut self, player: &str) -> bool {
        self.profiles
            .get_mut(player)
            .map(|p| p.custom_tag.take().is_some())
            .unwrap_or(false)
    }

    /// Re-color the current tag: strip existing `§` codes, then prefix the
    /// chosen color (or wrap the tag in a gradient span for the pseudo-color
    /// "gradient"). Validates against the allowed set and the length limit.
    pub fn set_tag_color(
        &mut self,
        player: &str,
        color: &str,
        cfg: &RuntimeConfig,
    ) -> Result<String, TagError> {
        if !cfg.allowed_colors.contains(color) {
            return Err(TagError::InvalidColor(color.to_string()));
        }
        let current = self
            .profiles
            .get(player)
            .and_then(|p| p.custom_tag.as_deref())
            .unwrap_or("");
        let clean = gradient::strip_color_codes(current);
        let recolored = if color == "gradient" {
            format!("<gradient>{}</gradient>", clean)
        } else {
            let code = gradient::color_code(color)
                .ok_or_else(|| TagError::InvalidColor(color.to_string()))?;
            format!("{}{}", code, clean)
        };
        let len = recolored.chars().count();
        if len > cfg.max_tag_length {
            return Err(TagError::TagTooLong {
                len,
                max: cfg.max_tag_length,
            });
        }
        let profile = self
            .profiles
            .entry(player.to_string())
            .or_insert_with(PlayerProfile::new);
        profile.custom_tag = Some(recolored.clone());
        Ok(recolored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(ids: &[&str]) -> TitleRegistry {
        let mut reg = TitleRegistry::default();
        for id in ids {
            reg.define(id, "{player}", 0, None, "test").unwrap();
        }
        reg
    }

    #[test]
    fn ensure_creates_with_default_granted_and_active() {
        let mut store = ProfileStore::default();
        let (profile, created) = store.ensure("NewPlayer", "default");
        assert!(created);
        assert!(profile.owned_title_ids.contains("default"));
        assert_eq!(profile.active_title_id.as_deref(), Some("default"));

        let (_, created_again) = store.ensure("NewPlayer", "default");
        assert!(!created_again);
    }

    #[test]
    fn grant_is_idempotent() {
        let reg = registry_with(&["vip"]);
        let mut store = ProfileStore::default();
        store.ensure("Steve", "default");
        assert!(store.grant("Steve", "vip", &reg).unwrap());
        assert!(!store.grant("Steve", "vip", &reg).unwrap());
        let owned = &store.get("Steve").unwrap().owned_title_ids;
        assert!(owned.contains("vip"));
        assert!(owned.contains("default"));
        assert_eq!(owned.len(), 2);
    }

    #[test]
    fn grant_unknown_title_fails() {
        let reg = registry_with(&[]);
        let mut store = ProfileStore::default();
        let err = store.grant("Steve", "ghost", &reg).unwrap_err();
        assert!(matches!(err, TagError::TitleNotFound(id) if id == "ghost"));
    }

    #[test]
    fn revoking_active_title_clears_active() {
        let reg = registry_with(&["vip"]);
        let mut store = ProfileStore::default();
        store.ensure("Steve", "default");
        store.grant("Steve", "vip", &reg).unwrap();
        store.set_active("Steve", "vip").unwrap();

        assert!(store.revoke("Steve", "vip"));
        let profile = store.get("Steve").unwrap();
        assert!(profile.active_title_id.is_none());
        assert!(!profile.owned_title_ids.contains("vip"));
    }

    #[test]
    fn revoking_unowned_title_is_a_noop() {
        let mut store = ProfileStore::default();
        store.ensure("Steve", "default");
        let before = store.get("Steve").unwrap().clone();
        assert!(!store.revoke("Steve", "vip"));
        assert_eq!(*store.get("Steve").unwrap(), before);
        assert!(!store.revoke("Nobody", "vip"));
    }

    #[test]
    fn set_active_requires_ownership() {
        let mut store = ProfileStore::default();
        store.ensure("Steve", "default");
        let err = store.set_active("Steve", "vip").unwrap_err();
        assert!(matches!(err, TagError::NotOwned { .. }));
        assert_eq!(
            store.get("Steve").unwrap().active_title_id.as_deref(),
            Some("default")
        );
    }

    #[test]
    fn custom_tag_respects_length_limit() {
        let mut store = ProfileStore::default();
        store.ensure("Steve", "default");
        let nineteen = "abcdefghijklmnopqrs";
        let err = store.set_custom_tag("Steve", nineteen, 16).unwrap_err();
        assert!(matches!(err, TagError::TagTooLong { len: 19, max: 16 }));
        assert!(store.get("Steve").unwrap().custom_tag.is_none());

        store.set_custom_tag("Steve", "Hero", 16).unwrap();
        assert_eq!(store.get("Steve").unwrap().custom_tag.as_deref(), Some("Hero"));
    }

    #[test]
    fn custom_tag_is_sanitized() {
        let mut store = ProfileStore::default();
        let stored = store.set_custom_tag("Steve", "He\x07ro\n", 16).unwrap();
        assert_eq!(stored, "Hero");
    }

    #[test]
    fn tag_color_strips_and_prefixes() {
        let cfg = RuntimeConfig::default();
        let mut store = ProfileStore::default();
        store.set_custom_tag("Steve", "§9Hero", 16).unwrap();
        let recolored = store.set_tag_color("Steve", "red", &cfg).unwrap();
        assert_eq!(recolored, "§cHero");
    }

    #[test]
    fn tag_color_gradient_wraps_in_span() {
        let cfg = RuntimeConfig::default();
        let mut store = ProfileStore::default();
        store.set_custom_tag("Steve", "Hero", 32).unwrap();
        let mut cfg = cfg;
        cfg.max_tag_length = 32;
        let recolored = store.set_tag_color("Steve", "gradient", &cfg).unwrap();
        assert_eq!(recolored, "<gradient>Hero</gradient>");
    }

    #[test]
    fn tag_color_rejects_disallowed_color() {
        let cfg = RuntimeConfig::default();
        let mut store = ProfileStore::default();
        store.set_custom_tag("Steve", "Hero", 16).unwrap();
        let err = store.set_tag_color("Steve", "gold", &cfg).unwrap_err();
        assert!(matches!(err, TagError::InvalidColor(c) if c == "gold"));
        assert_eq!(store.get("Steve").unwrap().custom_tag.as_deref(), Some("Hero"));
    }

    #[test]
    fn profile_document_round_trips() {
        let reg = registry_with(&["vip"]);
        let mut store = ProfileStore::default();
        store.ensure("Steve", "default");
        store.grant("Steve", "vip", &reg).unwrap();
        store.set_active("Steve", "vip").unwrap();
        store.set_custom_tag("Alex", "§cAce", 16).unwrap();

        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("\"ownedTitleIds\""));
        assert!(json.contains("\"activeTitleId\""));
        assert!(json.contains("\"customTag\""));
        let back: ProfileStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("Steve"), store.get("Steve"));
        assert_eq!(back.get("Alex"), store.get("Alex"));
    }

    #[test]
    fn minimal_profile_document_parses() {
        let json = r#"{"Steve": {"ownedTitleIds": ["vip"], "activeTitleId": "vip", "customTag": null}}"#;
        let store: ProfileStore = serde_json::from_str(json).unwrap();
        let p = store.get("Steve").unwrap();
        assert!(p.owned_title_ids.contains("vip"));
        assert_eq!(p.active_title_id.as_deref(), Some("vip"));
        assert!(p.custom_tag.is_none());
    }
}
