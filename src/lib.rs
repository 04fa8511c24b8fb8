//! # Tagforge - Persistent player titles and gradient nametags
//!
//! Tagforge manages per-player customizable display titles and nametags for a
//! persistent multiplayer game world. Players (or administrators) select or
//! compose short decorated text fragments - plain colors or multi-color
//! gradients - that persist across sessions and render above the player's
//! name and in chat.
//!
//! ## Features
//!
//! - **Gradient Rendering**: Character-by-character color assignment over a
//!   discrete palette, with `<gradient>` markup and `&g` shorthand.
//! - **Title Catalog**: Admin-defined display templates with permission
//!   levels, granted to and activated by players.
//! - **Custom Tags**: Length-bounded freeform tags with flat-color or
//!   gradient re-coloring.
//! - **Corruption Recovery**: JSON documents that fall back to defaults when
//!   unparsable instead of failing startup; the next save overwrites them.
//! - **Async Design**: One concurrent task per request against a
//!   single-writer-lock core, plus a cancellable periodic display resync.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tagforge::titles::{ConsoleCommandSink, TitleService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = TitleService::open(
//!         Path::new("./data"),
//!         "default",
//!         Box::new(ConsoleCommandSink),
//!     )?;
//!
//!     service.player_joined("Steve").await?;
//!     service.set_custom_tag("Steve", "&gHero").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`gradient`] - pure color/gradient text rendering
//! - [`titles`] - registry, profiles, display sync, and the service context
//! - [`storage`] - atomic JSON document persistence with fallback-to-default
//! - [`config`] - static TOML config and the runtime config document
//! - [`errors`] - the shared error taxonomy
//!
//! The command gateway (chat parsing, permission checks) and the mechanism
//! that applies a display string to a game client are host concerns: the
//! library takes already-typed arguments and pushes computed strings through
//! a [`titles::DisplaySink`] capability.

pub mod config;
pub mod errors;
pub mod gradient;
pub mod logutil;
pub mod storage;
pub mod titles;

pub use errors::TagError;
