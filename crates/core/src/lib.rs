//! Lazy call tree queries over stored profiling data.
//!
//! A [`SqliteCallTreeNode`] groups raw call records that share a name.
//! Navigating `children` or `callers` builds a small [`QueryNode`] plan that
//! the [`SqliteQueryProvider`] realizes only when the returned
//! [`CallTreeQuery`] is iterated.

pub mod error;
pub mod model;
pub mod options;
pub mod provider;
pub mod query;
pub mod schema;

pub use calltree_protocol::{NameMapping, NodeSummary};
pub use error::QueryError;
pub use model::{CallId, CallRecord, CallTreeNode, Descendants, NameId, SqliteCallTreeNode};
pub use options::ProviderOptions;
pub use provider::SqliteQueryProvider;
pub use query::{CallPredicate, CallTreeQuery, QueryNode};
