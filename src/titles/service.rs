//! Application context for the title system.
//!
//! [`TitleService`] is constructed once at startup and owns the registry,
//! profile store, runtime configuration, and presence set behind a single
//! `RwLock`, plus the display sink capability. There is no ambient global
//! state; hosts pass the service (cheaply cloneable) into whatever task model
//! they run requests on.
//!
//! Concurrency discipline: every mutating operation holds the write lock
//! across the in-memory change *and* the document save, so mutations are
//! atomic with respect to each other and the persisted file never reflects a
//! torn write. Reads (list, lookups, the periodic resync sweep) take the read
//! lock. A failed save is logged and returned to the caller of the mutation
//! that triggered it; in-memory state stays authoritative, and the next
//! mutation will attempt the save again. Display pushes are best-effort and
//! never roll anything back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::config::RuntimeConfig;
use crate::errors::TagError;
use crate::gradient;
use crate::logutil::escape_log;
use crate::storage;

use super::display::{compute_display, DisplaySink};
use super::profile::{PlayerProfile, ProfileStore};
use super::registry::{TitleDefinition, TitleRegistry};

/// Locations of the three persisted documents inside the data directory.
pub struct DocPaths {
    pub titles: PathBuf,
    pub profiles: PathBuf,
    pub runtime: PathBuf,
}

impl DocPaths {
    pub fn new(data_dir: &Path) -> Self {
        DocPaths {
            titles: data_dir.join("titles.json"),
            profiles: data_dir.join("profiles.json"),
            runtime: data_dir.join("config.json"),
        }
    }
}

struct CoreState {
    registry: TitleRegistry,
    profiles: ProfileStore,
    runtime: RuntimeConfig,
    /// Players currently in the world; in-memory only, fed by join/leave.
    present: HashSet<String>,
}

struct Inner {
    state: RwLock<CoreState>,
    paths: DocPaths,
    default_title: String,
    sink: Box<dyn DisplaySink>,
}

/// Counters for the `status` command.
pub struct ServiceStatus {
    pub titles: usize,
    pub profiles: usize,
    pub present: usize,
}

#[derive(Clone)]
pub struct TitleService {
    inner: Arc<Inner>,
}

impl TitleService {
    /// Load (or bootstrap) all three documents from `data_dir` and build the
    /// service. A corrupt titles document falls back to the built-in default
    /// set; corrupt profiles or config fall back to empty/default documents.
    pub fn open(
        data_dir: &Path,
        default_title: &str,
        sink: Box<dyn DisplaySink>,
    ) -> Result<Self, TagError> {
        let paths = DocPaths::new(data_dir);
        let registry = storage::load_or_init(&paths.titles, TitleRegistry::bootstrap_defaults())?;
        let profiles = storage::load_or_init(&paths.profiles, ProfileStore::default())?;
        let runtime =
            storage::load_or_init(&paths.runtime, RuntimeConfig::default())?.sanitized();
        info!(
            "title service ready: {} titles, {} profiles",
            registry.len(),
            profiles.len()
        );
        Ok(TitleService {
            inner: Arc::new(Inner {
                state: RwLock::new(CoreState {
                    registry,
                    profiles,
                    runtime,
                    present: HashSet::new(),
                }),
                paths,
                default_title: default_title.to_string(),
                sink,
            }),
        })
    }

    // ---- registry operations -------------------------------------------

    /// Define a new title and persist the titles document.
    pub async fn define_title(
        &self,
        id: &str,
        template: &str,
        level: u8,
        description: Option<String>,
        actor: &str,
    ) -> Result<(), TagError> {
        let mut state = self.inner.state.write().await;
        state
            .registry
            .define(id, template, level, description, actor)?;
        storage::save(&self.inner.paths.titles, &state.registry)?;
        info!("title '{}' defined by {}", escape_log(id), escape_log(actor));
        Ok(())
    }

    /// Remove a title. Does not cascade into profiles; dangling active ids
    /// heal to "no active title" at resolution time.
    pub async fn remove_title(&self, id: &str) -> Result<TitleDefinition, TagError> {
        let mut state = self.inner.state.write().await;
        let removed = state.registry.remove(id)?;
        storage::save(&self.inner.paths.titles, &state.registry)?;
        info!("title '{}' removed", escape_log(id));
        Ok(removed)
    }

    pub async fn resolve_title(&self, id: &str) -> Result<TitleDefinition, TagError> {
        let state = self.inner.state.read().await;
        state
            .registry
            .resolve(id)
            .cloned()
            .ok_or_else(|| TagError::TitleNotFound(id.to_string()))
    }

    /// Snapshot of all titles in definition order.
    pub async fn list_titles(&self) -> Vec<(String, TitleDefinition)> {
        let state = self.inner.state.read().await;
        state
            .registry
            .list()
            .map(|(id, def)| (id.to_string(), def.clone()))
            .collect()
    }

    // ---- profile operations --------------------------------------------

    /// Return the player's profile, creating it (default title granted and
    /// active) on first reference. Persists only when a profile was created.
    pub async fn ensure_profile(&self, player: &str) -> Result<PlayerProfile, TagError> {
        // Fast path under the read lock for the common case.
        {
            let state = self.inner.state.read().await;
            if let Some(profile) = state.profiles.get(player) {
                return Ok(profile.clone());
            }
        }
        let mut state = self.inner.state.write().await;
        let (profile, created) = state.profiles.ensure(player, &self.inner.default_title);
        let snapshot = profile.clone();
        if created {
            storage::save(&self.inner.paths.profiles, &state.profiles)?;
            info!("profile created for {}", escape_log(player));
        }
        Ok(snapshot)
    }

    /// Grant a title. Idempotent; `Ok(false)` means it was already owned.
    pub async fn grant(&self, player: &str, title: &str) -> Result<bool, TagError> {
        let mut state = self.inner.state.write().await;
        let (_, created) = state.profiles.ensure(player, &self.inner.default_title);
        let s = &mut *state;
        let result = s.profiles.grant(player, title, &s.registry);
        let changed = matches!(result, Ok(true));
        if created || changed {
            storage::save(&self.inner.paths.profiles, &state.profiles)?;
        }
        result
    }

    /// Revoke a title; clears the active title when it was the one revoked.
    pub async fn revoke(&self, player: &str, title: &str) -> Result<bool, TagError> {
        let mut state = self.inner.state.write().await;
        if !state.profiles.revoke(player, title) {
            return Ok(false);
        }
        storage::save(&self.inner.paths.profiles, &state.profiles)?;
        self.push_display(&state, player);
        Ok(true)
    }

    /// Activate an owned title and resynchronize the display.
    pub async fn set_active(&self, player: &str, title: &str) -> Result<(), TagError> {
        let mut state = self.inner.state.write().await;
        state.profiles.ensure(player, &self.inner.default_title);
        state.profiles.set_active(player, title)?;
        storage::save(&self.inner.paths.profiles, &state.profiles)?;
        self.push_display(&state, player);
        Ok(())
    }

    /// Clear the active title and resynchronize the display.
    pub async fn clear_active(&self, player: &str) -> Result<(), TagError> {
        let mut state = self.inner.state.write().await;
        state.profiles.ensure(player, &self.inner.default_title);
        state.profiles.clear_active(player);
        storage::save(&self.inner.paths.profiles, &state.profiles)?;
        self.push_display(&state, player);
        Ok(())
    }

    /// Store a custom tag (length-checked against the runtime config) and
    /// resynchronize the display. Returns the sanitized stored text.
    pub async fn set_custom_tag(&self, player: &str, text: &str) -> Result<String, TagError> {
        let mut state = self.inner.state.write().await;
        state.profiles.ensure(player, &self.inner.default_title);
        let max = state.runtime.max_tag_length;
        let stored = state.profiles.set_custom_tag(player, text, max)?;
        storage::save(&self.inner.paths.profiles, &state.profiles)?;
        self.push_display(&state, player);
        Ok(stored)
    }

    /// Drop the custom tag and resynchronize.
    pub async fn clear_custom_tag(&self, player: &str) -> Result<bool, TagError> {
        let mut state = self.inner.state.write().await;
        if !state.profiles.clear_custom_tag(player) {
            return Ok(false);
        }
        storage::save(&self.inner.paths.profiles, &state.profiles)?;
        self.push_display(&state, player);
        Ok(true)
    }

    /// Re-color the current tag with one of the allowed colors.
    pub async fn set_tag_color(&self, player: &str, color: &str) -> Result<String, TagError> {
        let mut state = self.inner.state.write().await;
        state.profiles.ensure(player, &self.inner.default_title);
        let recolored = {
            let s = &mut *state;
            s.profiles.set_tag_color(player, color, &s.runtime)?
        };
        storage::save(&self.inner.paths.profiles, &state.profiles)?;
        self.push_display(&state, player);
        Ok(recolored)
    }

    pub async fn profile(&self, player: &str) -> Option<PlayerProfile> {
        let state = self.inner.state.read().await;
        state.profiles.get(player).cloned()
    }

    // ---- presence & display --------------------------------------------

    /// Join event from the host: ensure the profile exists, mark the player
    /// present, refresh `lastSeen`, and push their display.
    pub async fn player_joined(&self, player: &str) -> Result<(), TagError> {
        let mut state = self.inner.state.write().await;
        let (_, created) = state.profiles.ensure(player, &self.inner.default_title);
        state.profiles.touch(player);
        state.present.insert(player.to_string());
        storage::save(&self.inner.paths.profiles, &state.profiles)?;
        if created {
            info!("first join for {}", escape_log(player));
        }
        self.push_display(&state, player);
        Ok(())
    }

    pub async fn player_left(&self, player: &str) {
        let mut state = self.inner.state.write().await;
        state.present.remove(player);
    }

    /// Compute the current display string without pushing it anywhere.
    pub async fn display_for(&self, player: &str) -> String {
        let state = self.inner.state.read().await;
        match state.profiles.get(player) {
            Some(profile) => compute_display(player, profile, &state.registry, &state.runtime),
            None => player.to_string(),
        }
    }

    /// Push the display for one player through the sink.
    pub async fn sync_player(&self, player: &str) {
        let state = self.inner.state.read().await;
        self.push_display(&state, player);
    }

    /// Periodic sweep: recompute and push displays for all present players.
    /// Read lock only, so request-handling mutations are never held up for
    /// longer than one save.
    pub async fn sync_all_present(&self) {
        let state = self.inner.state.read().await;
        for player in state.present.iter() {
            self.push_display(&state, player);
        }
    }

    fn push_display(&self, state: &CoreState, player: &str) {
        let Some(profile) = state.profiles.get(player) else {
            return;
        };
        let display = compute_display(player, profile, &state.registry, &state.runtime);
        if let Err(e) = self.inner.sink.apply(player, &display) {
            // Best-effort: profile state is authoritative, display heals on
            // the next sweep.
            warn!("display sync failed for {}: {}", escape_log(player), e);
        }
    }

    // ---- runtime configuration -----------------------------------------

    pub async fn runtime_config(&self) -> RuntimeConfig {
        self.inner.state.read().await.runtime.clone()
    }

    /// Host-side permission predicates are built on this level; the core
    /// itself never checks permissions.
    pub async fn admin_permission_level(&self) -> u8 {
        self.inner.state.read().await.runtime.admin_permission_level
    }

    pub async fn set_max_tag_length(&self, max: usize) -> Result<(), TagError> {
        let mut state = self.inner.state.write().await;
        state.runtime.max_tag_length = max;
        storage::save(&self.inner.paths.runtime, &state.runtime)
    }

    pub async fn set_admin_permission_level(&self, level: u8) -> Result<(), TagError> {
        let mut state = self.inner.state.write().await;
        state.runtime.admin_permission_level = level;
        storage::save(&self.inner.paths.runtime, &state.runtime)
    }

    /// Replace the gradient palette. Entries may be color names or `§` codes;
    /// at least two are required.
    pub async fn set_gradient_palette(&self, entries: &[String]) -> Result<(), TagError> {
        let mut palette = Vec::with_capacity(entries.len());
        for entry in entries {
            if gradient::is_color_code(entry) {
                palette.push(entry.clone());
            } else if let Some(code) = gradient::color_code(entry) {
                palette.push(code.to_string());
            } else {
                return Err(TagError::InvalidColor(entry.clone()));
            }
        }
        if palette.len() < 2 {
            return Err(TagError::InvalidColor(
                "palette needs at least 2 colors".to_string(),
            ));
        }
        let mut state = self.inner.state.write().await;
        state.runtime.gradient_palette = palette;
        storage::save(&self.inner.paths.runtime, &state.runtime)
    }

    /// Add a color name to the allowed set. "gradient" is accepted alongside
    /// the color table names.
    pub async fn allow_color(&self, name: &str) -> Result<bool, TagError> {
        if name != "gradient" && gradient::color_code(name).is_none() {
            return Err(TagError::InvalidColor(name.to_string()));
        }
        let mut state = self.inner.state.write().await;
        let added = state.runtime.allowed_colors.insert(name.to_string());
        if added {
            storage::save(&self.inner.paths.runtime, &state.runtime)?;
        }
        Ok(added)
    }

    pub async fn deny_color(&self, name: &str) -> Result<bool, TagError> {
        let mut state = self.inner.state.write().await;
        let removed = state.runtime.allowed_colors.remove(name);
        if removed {
            storage::save(&self.inner.paths.runtime, &state.runtime)?;
        }
        Ok(removed)
    }

    pub async fn status(&self) -> ServiceStatus {
        let state = self.inner.state.read().await;
        ServiceStatus {
            titles: state.registry.len(),
            profiles: state.profiles.len(),
            present: state.present.len(),
        }
    }
}

/// Handle to the periodic resynchronization task. Dropping it detaches the
/// task; call [`ResyncHandle::shutdown`] for an orderly stop that never
/// interrupts an in-flight save.
pub struct ResyncHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl ResyncHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.join.await;
    }
}

/// Spawn the fixed-interval display sweep over all present players. The sweep
/// holds only the read lock, independent of request-triggered syncs.
pub fn spawn_resync(service: TitleService, interval: Duration) -> ResyncHandle {
    let (tx, mut rx) = oneshot::channel::<()>();
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut rx => break,
                _ = ticker.tick() => {
                    service.sync_all_present().await;
                }
            }
        }
        debug!("resync loop terminated");
    });
    ResyncHandle { shutdown: tx, join }
}
