use serde::{Deserialize, Serialize};

use crate::error::{CollectionError, Result};
use crate::selection::DEFAULT_RESOLVE_BATCH;
use crate::selection_handler::SelectionMode;

fn default_page_size() -> usize {
    25
}

fn default_selection_mode() -> SelectionMode {
    SelectionMode::Multi
}

fn default_resolve_batch_size() -> usize {
    DEFAULT_RESOLVE_BATCH
}

/// Settings for a [`PageableCollection`](crate::PageableCollection).
///
/// Every field is optional in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_selection_mode")]
    pub selection_mode: SelectionMode,
    /// Items hydrated per service call during full iteration.
    #[serde(default = "default_resolve_batch_size")]
    pub resolve_batch_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            selection_mode: default_selection_mode(),
            resolve_batch_size: default_resolve_batch_size(),
        }
    }
}

impl CollectionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CollectionConfig =
            serde_json::from_str(json).map_err(|err| CollectionError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CollectionError::InvalidPageSize(0));
        }
        if self.resolve_batch_size == 0 {
            return Err(CollectionError::Config(
                "resolve_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_selection_mode(mut self, selection_mode: SelectionMode) -> Self {
        self.selection_mode = selection_mode;
        self
    }
}
