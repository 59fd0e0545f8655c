use serde::{Deserialize, Serialize};

/// Flat, serializable snapshot of one call tree node for presentation layers.
///
/// Holds no connection to the dataset; navigation stays on the node itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub name: String,
    pub signature: String,
    /// Number of raw call records the node represents.
    pub record_count: usize,
    /// Completed calls plus calls already active at window start.
    pub call_count: i64,
    pub raw_call_count: i64,
    pub cpu_cycles_spent: i64,
    /// Inclusive time in milliseconds.
    pub time_spent: f64,
    pub time_spent_self: f64,
    pub is_active_at_start: bool,
    pub has_children: bool,
    pub is_merged: bool,
}
