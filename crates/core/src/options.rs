use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Settings applied when a provider opens a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    /// Cycles per microsecond. Overrides the value stored with the dataset.
    pub processor_frequency: Option<i64>,
    /// Memoize resolved name mappings for the lifetime of the provider.
    pub cache_name_mappings: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            processor_frequency: None,
            cache_name_mappings: true,
        }
    }
}

impl ProviderOptions {
    pub fn from_json(text: &str) -> Result<Self, QueryError> {
        serde_json::from_str(text).map_err(QueryError::Options)
    }

    pub fn with_processor_frequency(mut self, frequency: i64) -> Self {
        self.processor_frequency = Some(frequency);
        self
    }
}
