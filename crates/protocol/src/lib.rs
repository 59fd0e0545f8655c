pub mod name_mapping;
pub mod summary;

pub use name_mapping::NameMapping;
pub use summary::NodeSummary;
