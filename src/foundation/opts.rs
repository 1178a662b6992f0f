use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{ChainError, ChainResult};

/// Session-wide editor settings.
///
/// Every field has a default, so a JSON options file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditorOpts {
    /// Longest edge of the preview thumbnail, in pixels.
    pub preview_max_px: u32,
    /// Merge consecutive updates of the same parameter into one undo step.
    pub coalesce_param_updates: bool,
    /// Maximum number of retained history entries (`None` keeps everything).
    pub history_limit: Option<usize>,
    /// Canvas offset applied to a duplicated node's position.
    pub duplicate_offset: [f64; 2],
}

impl Default for EditorOpts {
    fn default() -> Self {
        Self {
            preview_max_px: 450,
            coalesce_param_updates: false,
            history_limit: None,
            duplicate_offset: [20.0, 20.0],
        }
    }
}

impl EditorOpts {
    /// Load options from a JSON file.
    pub fn from_json_file(path: &Path) -> ChainResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read options '{}'", path.display()))?;
        let opts: Self = serde_json::from_str(&text)
            .map_err(|e| ChainError::serde(format!("options '{}': {e}", path.display())))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> ChainResult<()> {
        if self.preview_max_px == 0 {
            return Err(ChainError::validation("preview_max_px must be > 0"));
        }
        if self.history_limit == Some(0) {
            return Err(ChainError::validation("history_limit must be > 0 when set"));
        }
        if !self.duplicate_offset.iter().all(|v| v.is_finite()) {
            return Err(ChainError::validation("duplicate_offset must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/opts.rs"]
mod tests;
