use std::fmt;

use crate::model::{CallId, CallRecord};

/// Record-level predicates a `Filter` plan node can carry.
///
/// Kept to a closed set so every predicate has a relational translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallPredicate {
    IdIn(Vec<CallId>),
    ParentIdIn(Vec<CallId>),
    NameIdIn(Vec<i32>),
}

impl CallPredicate {
    pub fn matches(&self, record: &CallRecord) -> bool {
        match self {
            CallPredicate::IdIn(ids) => ids.contains(&record.id),
            CallPredicate::ParentIdIn(ids) => ids.contains(&record.parent_id),
            CallPredicate::NameIdIn(ids) => ids.contains(&record.name_id),
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            CallPredicate::IdIn(_) => "id",
            CallPredicate::ParentIdIn(_) => "parentid",
            CallPredicate::NameIdIn(_) => "nameid",
        }
    }

    pub(crate) fn values(&self) -> &[i32] {
        match self {
            CallPredicate::IdIn(ids)
            | CallPredicate::ParentIdIn(ids)
            | CallPredicate::NameIdIn(ids) => ids,
        }
    }
}

impl fmt::Display for CallPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IN (", self.column())?;
        for (i, value) in self.values().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

/// Description of a call tree query. Building one performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// Every stored call record.
    AllCalls,
    Filter {
        source: Box<QueryNode>,
        predicate: CallPredicate,
    },
    /// One aggregated node per distinct name id in `source`.
    MergeByName { source: Box<QueryNode> },
}

impl QueryNode {
    pub fn filter(source: QueryNode, predicate: CallPredicate) -> Self {
        QueryNode::Filter {
            source: Box::new(source),
            predicate,
        }
    }

    pub fn merge_by_name(source: QueryNode) -> Self {
        QueryNode::MergeByName {
            source: Box::new(source),
        }
    }

    /// Evaluates the record-level part of the plan in memory.
    ///
    /// `MergeByName` layers are transparent here; grouping is the provider's job.
    pub fn selects(&self, record: &CallRecord) -> bool {
        match self {
            QueryNode::AllCalls => true,
            QueryNode::Filter { source, predicate } => {
                predicate.matches(record) && source.selects(record)
            }
            QueryNode::MergeByName { source } => source.selects(record),
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::AllCalls => f.write_str("AllCalls"),
            QueryNode::Filter { source, predicate } => write!(f, "Filter({source}, {predicate})"),
            QueryNode::MergeByName { source } => write!(f, "MergeByName({source})"),
        }
    }
}
