pub mod aggregate;
pub mod name_id;
pub mod node;
pub mod record;
pub mod sqlite_node;

pub use aggregate::{CallAggregate, MergeAccumulator};
pub use name_id::{CallId, NameId};
pub use node::{CallTreeNode, Descendants};
pub use record::CallRecord;
pub use sqlite_node::SqliteCallTreeNode;
