//! Database models.

pub mod category;
pub mod item;

pub use category::{Category, CategoryDraft};
pub use item::{Item, ItemDraft, ItemFilter};

use crate::engine::{EngineError, EngineResult};

/// Require a non-blank string of at most `max_len` characters.
pub(crate) fn require_text(field: &'static str, value: &str, max_len: usize) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(field, "must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(EngineError::validation(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    Ok(())
}
