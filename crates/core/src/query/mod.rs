pub mod plan;
pub mod sequence;
pub(crate) mod sql;

pub use plan::{CallPredicate, QueryNode};
pub use sequence::CallTreeQuery;
