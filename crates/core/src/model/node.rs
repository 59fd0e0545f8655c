use std::borrow::Borrow;
use std::hash::Hash;
use std::rc::Rc;

use calltree_protocol::{NameMapping, NodeSummary};

use crate::error::QueryError;

/// Capability surface of an aggregated call tree node.
///
/// A backend supplies the storage-specific parts; presentation code only
/// talks to this trait. Equality and hashing identify a node by the raw
/// records it represents.
pub trait CallTreeNode: Eq + Hash + Sized {
    /// Lazy sequence returned by navigation.
    type Query: Iterator<Item = Result<Rc<Self>, QueryError>>;

    /// Name, return type and parameters of the function.
    fn name_mapping(&self) -> Result<NameMapping, QueryError>;

    /// Whether members of this node disagree on their name.
    fn is_merged(&self) -> bool;

    /// Number of raw call records behind this node.
    fn record_count(&self) -> usize;

    /// Calls completed inside the selected window.
    fn raw_call_count(&self) -> i64;

    /// Calls that were already running when the window started.
    fn active_call_count(&self) -> i64;

    /// Inclusive cycles.
    fn cpu_cycles_spent(&self) -> i64;

    fn cpu_cycles_spent_self(&self) -> i64;

    /// Inclusive time in milliseconds.
    fn time_spent(&self) -> f64;

    fn time_spent_self(&self) -> f64;

    fn has_children(&self) -> bool;

    /// Node this one was reached from through `children`, if any.
    fn parent(&self) -> Option<&Rc<Self>>;

    fn children(self: &Rc<Self>) -> Self::Query;

    fn callers(&self) -> Self::Query;

    /// Folds `nodes` into one fresh node without a parent.
    fn merge<I>(&self, nodes: I) -> Rc<Self>
    where
        I: IntoIterator,
        I::Item: Borrow<Self>;

    fn call_count(&self) -> i64 {
        self.raw_call_count() + self.active_call_count()
    }

    fn is_active_at_start(&self) -> bool {
        self.active_call_count() > 0
    }

    /// Depth-first pre-order walk below this node.
    fn descendants(self: &Rc<Self>) -> Descendants<Self> {
        Descendants {
            stack: vec![self.children()],
        }
    }

    fn summary(&self) -> Result<NodeSummary, QueryError> {
        let mapping = self.name_mapping()?;
        Ok(NodeSummary {
            signature: mapping.signature(),
            name: mapping.name,
            record_count: self.record_count(),
            call_count: self.call_count(),
            raw_call_count: self.raw_call_count(),
            cpu_cycles_spent: self.cpu_cycles_spent(),
            time_spent: self.time_spent(),
            time_spent_self: self.time_spent_self(),
            is_active_at_start: self.is_active_at_start(),
            has_children: self.has_children(),
            is_merged: self.is_merged(),
        })
    }
}

/// Lazy depth-first walk produced by [`CallTreeNode::descendants`].
///
/// A failed child query is yielded as an error and the walk continues with
/// the next sibling of the node whose children could not be read.
pub struct Descendants<N: CallTreeNode> {
    stack: Vec<N::Query>,
}

impl<N: CallTreeNode> Iterator for Descendants<N> {
    type Item = Result<Rc<N>, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(Ok(node)) => {
                    self.stack.push(node.children());
                    return Some(Ok(node));
                }
                Some(Err(err)) => return Some(Err(err)),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
