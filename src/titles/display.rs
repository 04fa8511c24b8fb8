//! Display computation and the external display sink seam.
//!
//! The core computes a canonical display string for a profile and hands it to
//! a [`DisplaySink`]. Display state is best-effort: sink failures are logged
//! by the caller and never roll back the profile mutation that triggered the
//! sync. The core never reads display state back.

use log::info;
use serde_json::json;
use tokio::sync::mpsc;

use crate::config::RuntimeConfig;
use crate::errors::TagError;
use crate::gradient;

use super::profile::PlayerProfile;
use super::registry::{TitleRegistry, PLAYER_PLACEHOLDER};

/// One-way capability that pushes a rendered string to the game client.
pub trait DisplaySink: Send + Sync {
    fn apply(&self, player_id: &str, display: &str) -> Result<(), TagError>;
}

/// A computed display update, as carried by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayUpdate {
    pub player_id: String,
    pub display: String,
}

/// Compute the canonical display string for a profile:
/// custom tag (rendered through the gradient engine) takes precedence, then
/// the active title's template with `{player}` substituted, then the bare
/// player name. A dangling active id resolves as "no active title".
pub fn compute_display(
    player: &str,
    profile: &PlayerProfile,
    registry: &TitleRegistry,
    cfg: &RuntimeConfig,
) -> String {
    if let Some(tag) = profile.custom_tag.as_deref() {
        if !tag.is_empty() {
            return gradient::render_markup(tag, &cfg.gradient_palette);
        }
    }
    if let Some(active) = profile.active_title_id.as_deref() {
        if let Some(def) = registry.resolve(active) {
            let substituted = def.display_template.replace(PLAYER_PLACEHOLDER, player);
            return gradient::render_markup(&substituted, &cfg.gradient_palette);
        }
    }
    player.to_string()
}

/// Sink that emits `team modify` server-console commands on stdout, suitable
/// for piping into a game server console.
pub struct ConsoleCommandSink;

impl DisplaySink for ConsoleCommandSink {
    fn apply(&self, player_id: &str, display: &str) -> Result<(), TagError> {
        let component = json!({ "text": format!(" {}", display) });
        println!("team modify nametag suffix {}", component);
        info!("display updated for {}", player_id);
        Ok(())
    }
}

/// Sink that forwards updates over an unbounded channel; used by tests and by
/// hosts that bridge updates into their own transport.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DisplayUpdate>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

impl DisplaySink for ChannelSink {
    fn apply(&self, player_id: &str, display: &str) -> Result<(), TagError> {
        self.tx
            .send(DisplayUpdate {
                player_id: player_id.to_string(),
                display: display.to_string(),
            })
            .map_err(|_| TagError::DisplaySink(player_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::titles::profile::ProfileStore;

    fn fixtures() -> (TitleRegistry, RuntimeConfig) {
        let mut reg = TitleRegistry::default();
        reg.define("default", "{player}", 0, None, "test").unwrap();
        reg.define("vip", "§6[VIP] §r{player}", 0, None, "test")
            .unwrap();
        (reg, RuntimeConfig::default())
    }

    #[test]
    fn custom_tag_takes_precedence() {
        let (reg, cfg) = fixtures();
        let mut store = ProfileStore::default();
        store.ensure("Steve", "vip");
        store.set_custom_tag("Steve", "§cAce", 16).unwrap();
        let display = compute_display("Steve", store.get("Steve").unwrap(), &reg, &cfg);
        assert_eq!(display, "§cAce");
    }

    #[test]
    fn active_title_substitutes_player_name() {
        let (reg, cfg) = fixtures();
        let mut store = ProfileStore::default();
        store.ensure("Steve", "vip");
        let display = compute_display("Steve", store.get("Steve").unwrap(), &reg, &cfg);
        assert_eq!(display, "§6[VIP] §rSteve");
    }

    #[test]
    fn dangling_active_id_falls_back_to_bare_name() {
        let (mut reg, cfg) = fixtures();
        let mut store = ProfileStore::default();
        store.ensure("Steve", "vip");
        reg.remove("vip").unwrap();
        let display = compute_display("Steve", store.get("Steve").unwrap(), &reg, &cfg);
        assert_eq!(display, "Steve");
    }

    #[test]
    fn no_tag_no_title_yields_bare_name() {
        let (reg, cfg) = fixtures();
        let mut store = ProfileStore::default();
        store.ensure("Steve", "vip");
        store.clear_active("Steve");
        let display = compute_display("Steve", store.get("Steve").unwrap(), &reg, &cfg);
        assert_eq!(display, "Steve");
    }

    #[test]
    fn gradient_tag_renders_through_palette() {
        let (reg, mut cfg) = fixtures();
        cfg.gradient_palette = vec!["§c".into(), "§9".into()];
        let mut store = ProfileStore::default();
        store.set_custom_tag("Steve", "&gAce", 16).unwrap();
        let display = compute_display("Steve", store.get("Steve").unwrap(), &reg, &cfg);
        // 3 chars over 2 colors: indices 0,0,1
        assert_eq!(display, "§cA§cc§9e");
    }

    #[test]
    fn channel_sink_delivers_updates() {
        let (sink, mut rx) = ChannelSink::new();
        sink.apply("Steve", "§cAce").unwrap();
        let update = rx.try_recv().unwrap();
        assert_eq!(update.player_id, "Steve");
        assert_eq!(update.display, "§cAce");
    }

    #[test]
    fn channel_sink_reports_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        let err = sink.apply("Steve", "x").unwrap_err();
        assert!(matches!(err, TagError::DisplaySink(p) if p == "Steve"));
    }
}
