//! Title system core: registry, per-player profiles, display
//! synchronization, and the application context that binds them.
//!
//! - [`registry`] - admin-defined title catalog
//! - [`profile`] - persisted per-player state (owned/active titles, tags)
//! - [`display`] - display computation and the external sink seam
//! - [`service`] - the explicitly constructed application context

pub mod display;
pub mod profile;
pub mod registry;
pub mod service;

pub use display::{compute_display, ChannelSink, ConsoleCommandSink, DisplaySink, DisplayUpdate};
pub use profile::{PlayerProfile, ProfileStore};
pub use registry::{TitleDefinition, TitleRegistry, DEFAULT_TITLE_ID, PLAYER_PLACEHOLDER};
pub use service::{spawn_resync, DocPaths, ResyncHandle, ServiceStatus, TitleService};
