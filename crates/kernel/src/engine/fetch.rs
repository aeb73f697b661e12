//! Fetch strategy for parent references.
//!
//! Decides whether list and detail reads join the referenced category into
//! the same round trip (eager) or leave it for an explicit secondary lookup
//! (lazy). The mode is resolved once from configuration and never changes
//! for the lifetime of the process.

use std::fmt;

/// How an item's category is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Inner-join the category into the selection query.
    #[default]
    Eager,
    /// Select item columns only; the caller resolves the category per row.
    Lazy,
}

impl FetchMode {
    /// Resolve the mode from the raw `USE_JOIN_FETCH` value.
    ///
    /// Unset or unparseable values fall back to [`FetchMode::Eager`].
    pub fn from_flag(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Self::Eager,
            "false" | "0" | "no" | "off" => Self::Lazy,
            _ => {
                tracing::warn!(value = %raw, "unparseable USE_JOIN_FETCH, defaulting to eager");
                Self::default()
            }
        }
    }

    /// Whether the parent entity is joined into the primary query.
    pub fn eager_fetch(self) -> bool {
        matches!(self, Self::Eager)
    }

    /// Lowercase name, used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
