use std::rc::Rc;

use rusqlite::types::Value;

use super::plan::{CallPredicate, QueryNode};
use crate::error::QueryError;
use crate::model::CallId;

const HAS_CHILDREN: &str = "EXISTS (SELECT 1 FROM FunctionData c WHERE c.parentid = f.id)";

/// Relational form of a plan: one statement plus one id set per `rarray(?)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SqlQuery {
    pub sql: String,
    pub params: Vec<Vec<i32>>,
    /// Rows are name groups rather than single records.
    pub merge_by_name: bool,
}

impl SqlQuery {
    /// Id sets in the form the `rarray` table-valued function binds.
    pub fn bound_params(&self) -> Vec<Rc<Vec<Value>>> {
        self.params.iter().map(|ids| id_array(ids.as_slice())).collect()
    }
}

/// Binds a whole id set as one parameter, so its size is not limited by
/// `SQLITE_MAX_VARIABLE_NUMBER`.
pub(crate) fn id_array(ids: &[CallId]) -> Rc<Vec<Value>> {
    Rc::new(ids.iter().map(|&id| Value::Integer(i64::from(id))).collect())
}

pub(crate) fn translate(plan: &QueryNode) -> Result<SqlQuery, QueryError> {
    let mut merge_by_name = false;
    let mut node = plan;
    while let QueryNode::MergeByName { source } = node {
        merge_by_name = true;
        node = source.as_ref();
    }

    let mut predicates: Vec<&CallPredicate> = Vec::new();
    loop {
        match node {
            QueryNode::AllCalls => break,
            QueryNode::Filter { source, predicate } => {
                predicates.push(predicate);
                node = source.as_ref();
            }
            QueryNode::MergeByName { .. } => {
                return Err(QueryError::UnsupportedPlan(format!(
                    "filter over a merged source in {plan}"
                )));
            }
        }
    }
    // Innermost filter first.
    predicates.reverse();

    let mut sql = if merge_by_name {
        format!(
            "SELECT f.nameid, json_group_array(f.id ORDER BY f.id), SUM(f.callcount), \
             SUM(f.cpucyclesspent), SUM(f.activecallcount), MAX({HAS_CHILDREN}) \
             FROM FunctionData f"
        )
    } else {
        format!(
            "SELECT f.id, f.nameid, f.callcount, f.cpucyclesspent, f.activecallcount, \
             {HAS_CHILDREN} FROM FunctionData f"
        )
    };
    let mut params = Vec::with_capacity(predicates.len());
    for (i, predicate) in predicates.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(&format!("f.{} IN rarray(?)", predicate.column()));
        params.push(predicate.values().to_vec());
    }
    if merge_by_name {
        sql.push_str(" GROUP BY f.nameid ORDER BY MIN(f.id)");
    } else {
        sql.push_str(" ORDER BY f.id");
    }

    Ok(SqlQuery {
        sql,
        params,
        merge_by_name,
    })
}

/// `SELECT DISTINCT parentid` for the id set bound as the only parameter.
pub(crate) const PARENT_IDS_SQL: &str =
    "SELECT DISTINCT parentid FROM FunctionData WHERE id IN rarray(?1) ORDER BY parentid";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_calls() {
        let q = translate(&QueryNode::AllCalls).unwrap();
        assert!(q.sql.starts_with("SELECT f.id"));
        assert!(!q.sql.contains("WHERE"));
        assert!(q.sql.ends_with("ORDER BY f.id"));
        assert!(q.params.is_empty());
        assert!(!q.merge_by_name);
    }

    #[test]
    fn children_plan_groups_in_sql() {
        let plan = QueryNode::merge_by_name(QueryNode::filter(
            QueryNode::AllCalls,
            CallPredicate::ParentIdIn(vec![4, 9]),
        ));
        let q = translate(&plan).unwrap();
        assert!(q.sql.starts_with("SELECT f.nameid, json_group_array(f.id ORDER BY f.id)"));
        let tail = " WHERE f.parentid IN rarray(?) GROUP BY f.nameid ORDER BY MIN(f.id)";
        assert!(q.sql.ends_with(tail));
        assert_eq!(q.params, vec![vec![4, 9]]);
        assert!(q.merge_by_name);
    }

    #[test]
    fn nested_filters_and_params_in_order() {
        let plan = QueryNode::filter(
            QueryNode::filter(QueryNode::AllCalls, CallPredicate::IdIn(vec![1, 2, 3])),
            CallPredicate::NameIdIn(vec![7]),
        );
        let q = translate(&plan).unwrap();
        assert!(q.sql.contains(" WHERE f.id IN rarray(?) AND f.nameid IN rarray(?)"));
        assert_eq!(q.params, vec![vec![1, 2, 3], vec![7]]);
    }

    #[test]
    fn one_parameter_per_set_regardless_of_size() {
        let ids: Vec<CallId> = (1..=50_000).collect();
        let plan = QueryNode::filter(QueryNode::AllCalls, CallPredicate::ParentIdIn(ids));
        let q = translate(&plan).unwrap();
        assert_eq!(q.sql.matches('?').count(), 1);
        let bound = q.bound_params();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].len(), 50_000);
        assert_eq!(bound[0][0], Value::Integer(1));
    }

    #[test]
    fn double_merge_collapses() {
        let once = QueryNode::merge_by_name(QueryNode::AllCalls);
        let twice = QueryNode::merge_by_name(once.clone());
        assert_eq!(translate(&once).unwrap(), translate(&twice).unwrap());
    }

    #[test]
    fn filter_over_merge_is_rejected() {
        let plan = QueryNode::filter(
            QueryNode::merge_by_name(QueryNode::AllCalls),
            CallPredicate::IdIn(vec![1]),
        );
        assert!(matches!(translate(&plan), Err(QueryError::UnsupportedPlan(_))));
    }
}
