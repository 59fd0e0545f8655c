use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use calltree_protocol::NameMapping;
use log::{debug, info, trace};
use rusqlite::{Connection, Params, Row, params, params_from_iter};

use crate::error::QueryError;
use crate::model::{CallAggregate, CallId, MergeAccumulator, NameId, SqliteCallTreeNode};
use crate::options::ProviderOptions;
use crate::query::sql::{PARENT_IDS_SQL, id_array, translate};
use crate::query::{CallPredicate, CallTreeQuery, QueryNode};
use crate::schema::{self, ROOT_PARENT_ID};

/// Executes call tree plans against one SQLite dataset.
///
/// Owns the connection for the dataset's session. Single-reader: it does no
/// locking and is neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct SqliteQueryProvider {
    conn: Connection,
    /// Cycles per microsecond.
    processor_frequency: i64,
    options: ProviderOptions,
    mappings: RefCell<HashMap<i32, NameMapping>>,
    queries_issued: Cell<u64>,
}

impl SqliteQueryProvider {
    pub fn open(
        path: impl AsRef<Path>,
        options: ProviderOptions,
    ) -> Result<Rc<Self>, QueryError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let provider = Self::from_connection(conn, options)?;
        info!(
            "opened profiling dataset {} ({} cycles/us)",
            path.display(),
            provider.processor_frequency
        );
        Ok(provider)
    }

    /// Wraps an open connection. The configured frequency wins over the
    /// dataset's stored one.
    pub fn from_connection(
        conn: Connection,
        options: ProviderOptions,
    ) -> Result<Rc<Self>, QueryError> {
        // Id sets are bound through the `rarray` table-valued function.
        rusqlite::vtab::array::load_module(&conn)?;
        let processor_frequency = match options.processor_frequency {
            Some(frequency) => frequency,
            None => schema::read_processor_frequency(&conn)?
                .ok_or(QueryError::MissingProcessorFrequency)?,
        };
        if processor_frequency <= 0 {
            return Err(QueryError::InvalidProcessorFrequency(processor_frequency));
        }
        Ok(Rc::new(Self {
            conn,
            processor_frequency,
            options,
            mappings: RefCell::new(HashMap::new()),
            queries_issued: Cell::new(0),
        }))
    }

    pub fn processor_frequency(&self) -> i64 {
        self.processor_frequency
    }

    /// Statements executed so far for plans, id lists and mapping lookups.
    pub fn queries_issued(&self) -> u64 {
        self.queries_issued.get()
    }

    pub(crate) fn cycles_to_millis(&self, cycles: i64) -> f64 {
        cycles as f64 / (1000.0 * self.processor_frequency as f64)
    }

    /// Lazily realizes `plan`. No statement runs until the result is polled.
    pub fn create_query(self: &Rc<Self>, plan: QueryNode) -> CallTreeQuery {
        CallTreeQuery::plan(Rc::clone(self), plan, None)
    }

    /// Top-level calls, grouped by name.
    pub fn roots(self: &Rc<Self>) -> CallTreeQuery {
        self.create_query(QueryNode::merge_by_name(QueryNode::filter(
            QueryNode::AllCalls,
            CallPredicate::ParentIdIn(vec![ROOT_PARENT_ID]),
        )))
    }

    /// One node per function over the whole dataset.
    pub fn functions(self: &Rc<Self>) -> CallTreeQuery {
        self.create_query(QueryNode::merge_by_name(QueryNode::AllCalls))
    }

    /// Folds `nodes` into one parentless node.
    pub fn merge<I>(self: &Rc<Self>, nodes: I) -> Rc<SqliteCallTreeNode>
    where
        I: IntoIterator,
        I::Item: Borrow<SqliteCallTreeNode>,
    {
        let aggregate = nodes
            .into_iter()
            .fold(MergeAccumulator::default(), |acc, node| {
                let node: &SqliteCallTreeNode = node.borrow();
                acc.fold(node.aggregate())
            })
            .finish();
        Rc::new(SqliteCallTreeNode::new(aggregate, None, Rc::clone(self)))
    }

    /// Runs an id-producing statement and collects the first column.
    pub fn run_id_list<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<CallId>, QueryError> {
        debug!("id list: {sql}");
        self.count_query();
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params, |row| row.get(0))?
            .collect::<Result<Vec<CallId>, _>>()?;
        Ok(ids)
    }

    /// Resolves a name id. `NameId::Merged` is answered locally.
    pub fn mapping(&self, name_id: NameId) -> Result<NameMapping, QueryError> {
        let id = match name_id {
            NameId::Merged => return Ok(NameMapping::merged()),
            NameId::Named(id) => id,
        };
        if let Some(mapping) = self.mappings.borrow().get(&id) {
            trace!("name mapping {id}: cached");
            return Ok(mapping.clone());
        }
        self.count_query();
        let mapping = schema::read_mapping(&self.conn, id)?;
        if self.options.cache_name_mappings {
            self.mappings.borrow_mut().insert(id, mapping.clone());
        }
        Ok(mapping)
    }

    pub(crate) fn parent_ids(&self, ids: &[CallId]) -> Result<Vec<CallId>, QueryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.run_id_list(PARENT_IDS_SQL, params![id_array(ids)])
    }

    pub(crate) fn callers_plan(parent_ids: Vec<CallId>) -> QueryNode {
        QueryNode::merge_by_name(QueryNode::filter(
            QueryNode::AllCalls,
            CallPredicate::IdIn(parent_ids),
        ))
    }

    pub(crate) fn execute(
        self: &Rc<Self>,
        plan: &QueryNode,
        parent: Option<&Rc<SqliteCallTreeNode>>,
    ) -> Result<Vec<Rc<SqliteCallTreeNode>>, QueryError> {
        let query = translate(plan)?;
        debug!("realizing {plan}");
        self.count_query();
        let map_row: fn(&Row<'_>) -> rusqlite::Result<CallAggregate> = if query.merge_by_name {
            CallAggregate::from_group_row
        } else {
            CallAggregate::from_row
        };
        let mut stmt = self.conn.prepare_cached(&query.sql)?;
        let aggregates = stmt
            .query_map(params_from_iter(query.bound_params()), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aggregates
            .into_iter()
            .map(|aggregate| {
                Rc::new(SqliteCallTreeNode::new(
                    aggregate,
                    parent.cloned(),
                    Rc::clone(self),
                ))
            })
            .collect())
    }

    fn count_query(&self) {
        self.queries_issued.set(self.queries_issued.get() + 1);
    }
}
