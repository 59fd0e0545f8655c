use thiserror::Error;

/// Failures surfaced while realizing call tree queries.
///
/// An empty child or caller sequence is never an error.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("storage: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("no name mapping for id {0}")]
    MappingNotFound(i32),
    #[error("name mapping {id} has an invalid parameter list: {source}")]
    InvalidMapping {
        id: i32,
        #[source]
        source: serde_json::Error,
    },
    #[error("dataset has no processor frequency and none was configured")]
    MissingProcessorFrequency,
    #[error("processor frequency must be positive, got {0}")]
    InvalidProcessorFrequency(i64),
    #[error("property {name} has a malformed value {value:?}")]
    InvalidProperty { name: String, value: String },
    #[error("plan cannot be translated: {0}")]
    UnsupportedPlan(String),
    #[error("invalid provider options: {0}")]
    Options(#[source] serde_json::Error),
}
