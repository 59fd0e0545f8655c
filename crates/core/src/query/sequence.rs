use std::rc::Rc;

use log::trace;

use super::plan::QueryNode;
use crate::error::QueryError;
use crate::model::{CallId, SqliteCallTreeNode};
use crate::provider::SqliteQueryProvider;

/// What a pending query realizes once it is first polled.
#[derive(Debug)]
enum Source {
    Plan(QueryNode),
    /// Distinct parents of these records, resolved through an id list first.
    CallersOf(Vec<CallId>),
}

#[derive(Debug)]
enum State {
    Pending {
        provider: Rc<SqliteQueryProvider>,
        source: Source,
        parent: Option<Rc<SqliteCallTreeNode>>,
    },
    Ready(std::vec::IntoIter<Rc<SqliteCallTreeNode>>),
    Done,
}

/// Lazy, single-pass sequence of call tree nodes.
///
/// Nothing touches storage until the first call to `next`. The rows of the
/// realized statement are read in full at that point and the statement is
/// released, so dropping the sequence early leaves nothing open. A storage
/// failure is yielded once and ends the sequence.
#[derive(Debug)]
pub struct CallTreeQuery {
    state: State,
}

impl CallTreeQuery {
    pub(crate) fn empty() -> Self {
        Self {
            state: State::Ready(Vec::new().into_iter()),
        }
    }

    pub(crate) fn once(node: Rc<SqliteCallTreeNode>) -> Self {
        Self {
            state: State::Ready(vec![node].into_iter()),
        }
    }

    pub(crate) fn plan(
        provider: Rc<SqliteQueryProvider>,
        plan: QueryNode,
        parent: Option<Rc<SqliteCallTreeNode>>,
    ) -> Self {
        Self {
            state: State::Pending {
                provider,
                source: Source::Plan(plan),
                parent,
            },
        }
    }

    pub(crate) fn callers_of(provider: Rc<SqliteQueryProvider>, ids: Vec<CallId>) -> Self {
        Self {
            state: State::Pending {
                provider,
                source: Source::CallersOf(ids),
                parent: None,
            },
        }
    }

    /// The plan this sequence will realize, if it is still pending and known.
    pub fn pending_plan(&self) -> Option<&QueryNode> {
        match &self.state {
            State::Pending {
                source: Source::Plan(plan),
                ..
            } => Some(plan),
            _ => None,
        }
    }

    /// Whether the first `next` will hit storage.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    fn realize(
        provider: &Rc<SqliteQueryProvider>,
        source: Source,
        parent: Option<Rc<SqliteCallTreeNode>>,
    ) -> Result<Vec<Rc<SqliteCallTreeNode>>, QueryError> {
        match source {
            Source::Plan(plan) => provider.execute(&plan, parent.as_ref()),
            Source::CallersOf(ids) => {
                let parent_ids = provider.parent_ids(&ids)?;
                if parent_ids.is_empty() {
                    trace!("no parent ids for {} records", ids.len());
                    return Ok(Vec::new());
                }
                provider.execute(&SqliteQueryProvider::callers_plan(parent_ids), None)
            }
        }
    }
}

impl Iterator for CallTreeQuery {
    type Item = Result<Rc<SqliteCallTreeNode>, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let State::Pending { .. } = self.state {
            let State::Pending {
                provider,
                source,
                parent,
            } = std::mem::replace(&mut self.state, State::Done)
            else {
                return None;
            };
            match Self::realize(&provider, source, parent) {
                Ok(nodes) => self.state = State::Ready(nodes.into_iter()),
                Err(err) => return Some(Err(err)),
            }
        }
        match &mut self.state {
            State::Ready(nodes) => nodes.next().map(Ok),
            _ => None,
        }
    }
}
