use thiserror::Error;

/// Errors produced by title, profile, and persistence operations.
///
/// Validation failures (`DuplicateTitle` through `InvalidColor`) are expected,
/// recovered locally, and surfaced to the player as a reply; they never leave
/// state partially mutated. `DataCorrupt` and the I/O wrappers degrade to
/// default documents rather than aborting. `DisplaySink` is logged and
/// swallowed by the synchronizer.
#[derive(Debug, Error)]
pub enum TagError {
    /// A title with this id is already defined.
    #[error("title '{0}' already exists")]
    DuplicateTitle(String),

    /// No title with this id exists in the registry.
    #[error("unknown title '{0}'")]
    TitleNotFound(String),

    /// The player does not own the title they tried to activate.
    #[error("player '{player}' does not own title '{title}'")]
    NotOwned { player: String, title: String },

    /// Custom tag exceeds the configured maximum length.
    #[error("tag is {len} characters, maximum is {max}")]
    TagTooLong { len: usize, max: usize },

    /// Color name is unknown or not in the allowed set.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A persisted document failed to parse. The engine falls back to the
    /// default document; the broken file stays on disk until the next save.
    #[error("corrupt data file {path}: {detail}")]
    DataCorrupt { path: String, detail: String },

    /// The external display sink rejected an update. Non-fatal.
    #[error("display sink failed for '{0}'")]
    DisplaySink(String),

    /// Wrapper around I/O errors from the persistence engine.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON serialization errors.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
