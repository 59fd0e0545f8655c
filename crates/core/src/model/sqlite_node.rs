use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use calltree_protocol::NameMapping;
use log::trace;

use super::{CallAggregate, CallId, CallTreeNode, NameId};
use crate::error::QueryError;
use crate::provider::SqliteQueryProvider;
use crate::query::{CallPredicate, CallTreeQuery, QueryNode};

/// Multiplier of the rolling identity hash.
const HASH_PRIME: i32 = 1_000_000_007;

/// Call tree node backed by a [`SqliteQueryProvider`].
///
/// Immutable once built. Equality is positional over the represented record
/// ids: the same ids in a different order are a different node.
pub struct SqliteCallTreeNode {
    aggregate: CallAggregate,
    parent: Option<Rc<SqliteCallTreeNode>>,
    provider: Rc<SqliteQueryProvider>,
}

impl SqliteCallTreeNode {
    pub(crate) fn new(
        aggregate: CallAggregate,
        parent: Option<Rc<SqliteCallTreeNode>>,
        provider: Rc<SqliteQueryProvider>,
    ) -> Self {
        Self {
            aggregate,
            parent,
            provider,
        }
    }

    pub fn name_id(&self) -> NameId {
        self.aggregate.name_id
    }

    /// Raw record ids, in the order they were gathered.
    pub fn ids(&self) -> &[CallId] {
        &self.aggregate.ids
    }

    pub(crate) fn aggregate(&self) -> &CallAggregate {
        &self.aggregate
    }

    /// `(a[0] * p + a[1]) * p + a[2] ...` with wrapping 32-bit arithmetic.
    pub fn identity_hash(&self) -> i32 {
        self.aggregate
            .ids
            .iter()
            .fold(0i32, |hash, &id| hash.wrapping_mul(HASH_PRIME).wrapping_add(id))
    }

    fn children_plan(&self) -> QueryNode {
        QueryNode::merge_by_name(QueryNode::filter(
            QueryNode::AllCalls,
            CallPredicate::ParentIdIn(self.aggregate.ids.clone()),
        ))
    }
}

impl CallTreeNode for SqliteCallTreeNode {
    type Query = CallTreeQuery;

    fn name_mapping(&self) -> Result<NameMapping, QueryError> {
        self.provider.mapping(self.aggregate.name_id)
    }

    fn is_merged(&self) -> bool {
        self.aggregate.name_id.is_merged()
    }

    fn record_count(&self) -> usize {
        self.aggregate.ids.len()
    }

    fn raw_call_count(&self) -> i64 {
        self.aggregate.call_count
    }

    fn active_call_count(&self) -> i64 {
        self.aggregate.active_call_count
    }

    fn cpu_cycles_spent(&self) -> i64 {
        self.aggregate.cpu_cycles_spent
    }

    /// Cycles are only recorded inclusively.
    fn cpu_cycles_spent_self(&self) -> i64 {
        0
    }

    fn time_spent(&self) -> f64 {
        self.provider.cycles_to_millis(self.cpu_cycles_spent())
    }

    fn time_spent_self(&self) -> f64 {
        self.provider.cycles_to_millis(self.cpu_cycles_spent_self())
    }

    fn has_children(&self) -> bool {
        self.aggregate.has_children
    }

    fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// Children grouped by name, in order of first call.
    fn children(self: &Rc<Self>) -> CallTreeQuery {
        // Roughly half the nodes of a real trace are leaves; recursive walks
        // must not pay a statement for each of them.
        if !self.aggregate.has_children {
            trace!("leaf {}: no children query", self.aggregate.name_id);
            return CallTreeQuery::empty();
        }
        CallTreeQuery::plan(
            Rc::clone(&self.provider),
            self.children_plan(),
            Some(Rc::clone(self)),
        )
    }

    fn callers(&self) -> CallTreeQuery {
        // Reached through `children`: every id shares this one parent.
        if let Some(parent) = &self.parent {
            trace!("callers of {} from back-reference", self.aggregate.name_id);
            return CallTreeQuery::once(Rc::clone(parent));
        }
        if self.aggregate.ids.is_empty() {
            return CallTreeQuery::empty();
        }
        CallTreeQuery::callers_of(Rc::clone(&self.provider), self.aggregate.ids.clone())
    }

    fn merge<I>(&self, nodes: I) -> Rc<Self>
    where
        I: IntoIterator,
        I::Item: Borrow<Self>,
    {
        self.provider.merge(nodes)
    }
}

impl PartialEq for SqliteCallTreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.aggregate.ids == other.aggregate.ids
    }
}

impl Eq for SqliteCallTreeNode {}

impl Hash for SqliteCallTreeNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.identity_hash());
    }
}

impl fmt::Debug for SqliteCallTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCallTreeNode")
            .field("name_id", &self.aggregate.name_id)
            .field("ids", &self.aggregate.ids)
            .field("call_count", &self.aggregate.call_count)
            .field("cpu_cycles_spent", &self.aggregate.cpu_cycles_spent)
            .field("active_call_count", &self.aggregate.active_call_count)
            .field("has_children", &self.aggregate.has_children)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use rusqlite::Connection;

    use super::*;
    use crate::options::ProviderOptions;
    use crate::schema;

    fn provider(frequency: i64) -> Rc<SqliteQueryProvider> {
        let conn = Connection::open_in_memory().unwrap();
        schema::initialize(&conn).unwrap();
        SqliteQueryProvider::from_connection(
            conn,
            ProviderOptions::default().with_processor_frequency(frequency),
        )
        .unwrap()
    }

    fn node(provider: &Rc<SqliteQueryProvider>, name: i32, ids: &[CallId]) -> SqliteCallTreeNode {
        SqliteCallTreeNode::new(
            CallAggregate {
                name_id: NameId::Named(name),
                ids: ids.to_vec(),
                call_count: 1,
                cpu_cycles_spent: 0,
                active_call_count: 0,
                has_children: false,
            },
            None,
            Rc::clone(provider),
        )
    }

    fn std_hash(node: &SqliteCallTreeNode) -> u64 {
        let mut hasher = DefaultHasher::new();
        node.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn identity_hash_is_rolling_polynomial() {
        let p = provider(1000);
        assert_eq!(node(&p, 1, &[]).identity_hash(), 0);
        assert_eq!(node(&p, 1, &[5]).identity_hash(), 5);
        assert_eq!(node(&p, 1, &[1, 2]).identity_hash(), 1_000_000_009);
        assert_eq!(node(&p, 1, &[2, 1]).identity_hash(), 2_000_000_015);
    }

    #[test]
    fn identity_hash_wraps() {
        let p = provider(1000);
        // 3 * 1_000_000_007 overflows i32.
        assert_eq!(node(&p, 1, &[3, 0]).identity_hash(), -1_294_967_275);
    }

    #[test]
    fn equality_is_positional() {
        let p = provider(1000);
        let a = node(&p, 1, &[1, 2, 3]);
        let b = node(&p, 2, &[1, 2, 3]);
        let reordered = node(&p, 1, &[3, 2, 1]);
        let shorter = node(&p, 1, &[1, 2]);
        assert_eq!(a, b);
        assert_eq!(std_hash(&a), std_hash(&b));
        assert_ne!(a, reordered);
        assert_ne!(a, shorter);
    }

    #[test]
    fn time_conversion() {
        let p = provider(1000);
        let mut n = node(&p, 1, &[1]);
        n.aggregate.cpu_cycles_spent = 2_000_000;
        assert!((n.time_spent() - 2.0).abs() < f64::EPSILON);
        assert_eq!(n.cpu_cycles_spent_self(), 0);
        assert_eq!(n.time_spent_self(), 0.0);
    }

    #[test]
    fn call_count_includes_active_calls() {
        let p = provider(1000);
        let mut n = node(&p, 1, &[1]);
        n.aggregate.call_count = 4;
        n.aggregate.active_call_count = 2;
        assert_eq!(n.raw_call_count(), 4);
        assert_eq!(n.call_count(), 6);
        assert!(n.is_active_at_start());
        n.aggregate.active_call_count = 0;
        assert!(!n.is_active_at_start());
    }

    #[test]
    fn leaf_children_do_not_query() {
        let p = provider(1000);
        let leaf = Rc::new(node(&p, 1, &[1]));
        let children = leaf.children();
        assert!(!children.is_pending());
        assert_eq!(children.count(), 0);
        assert_eq!(p.queries_issued(), 0);
    }

    #[test]
    fn children_plan_filters_on_parent_ids() {
        let p = provider(1000);
        let mut n = node(&p, 1, &[4, 8]);
        n.aggregate.has_children = true;
        let n = Rc::new(n);
        let children = n.children();
        assert_eq!(
            children.pending_plan().map(ToString::to_string).as_deref(),
            Some("MergeByName(Filter(AllCalls, parentid IN (4, 8)))")
        );
        assert_eq!(p.queries_issued(), 0);
    }

    #[test]
    fn merged_name_mapping_is_local() {
        let p = provider(1000);
        let merged = p.merge([node(&p, 1, &[1]), node(&p, 2, &[2])]);
        assert!(merged.is_merged());
        assert!(merged.name_mapping().unwrap().is_merged());
        assert_eq!(p.queries_issued(), 0);
    }
}
