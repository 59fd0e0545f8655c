//! Integration test: merged nodes whose id sets exceed SQLite's bound
//! parameter limit still navigate in both directions.

use std::rc::Rc;

use calltree_core::{
    CallRecord, CallTreeNode, NameId, ProviderOptions, QueryError, SqliteCallTreeNode,
    SqliteQueryProvider, schema,
};
use rusqlite::Connection;

/// Above the bundled build's `SQLITE_MAX_VARIABLE_NUMBER` of 32766.
const FAN_OUT: i32 = 40_000;

const ROOT: i32 = 1;
const STEP: i32 = 2;
const LEAF: i32 = 3;

/// Root 1 calls `STEP` `FAN_OUT` times; every step call makes one `LEAF` call.
fn fixture() -> Rc<SqliteQueryProvider> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut conn = Connection::open_in_memory().unwrap();
    schema::initialize(&conn).unwrap();
    schema::set_processor_frequency(&conn, 1000).unwrap();

    let tx = conn.transaction().unwrap();
    schema::insert_call(&tx, &CallRecord::new(1, 0, ROOT)).unwrap();
    for i in 0..FAN_OUT {
        let step = 2 + i;
        schema::insert_call(&tx, &CallRecord::new(step, 1, STEP).with_cycles(10)).unwrap();
        let leaf = CallRecord::new(2 + FAN_OUT + i, step, LEAF).with_cycles(3);
        schema::insert_call(&tx, &leaf).unwrap();
    }
    tx.commit().unwrap();

    SqliteQueryProvider::from_connection(conn, ProviderOptions::default()).unwrap()
}

fn single(
    query: impl Iterator<Item = Result<Rc<SqliteCallTreeNode>, QueryError>>,
) -> Rc<SqliteCallTreeNode> {
    let mut nodes = query.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(nodes.len(), 1);
    nodes.remove(0)
}

#[test]
fn children_of_a_wide_merged_node() {
    let provider = fixture();
    let root = single(provider.roots());
    let step = single(root.children());
    assert_eq!(step.name_id(), NameId::Named(STEP));
    assert_eq!(step.ids().len(), FAN_OUT as usize);
    assert!(step.ids().windows(2).all(|w| w[0] < w[1]));

    let leaf = single(step.children());
    assert_eq!(leaf.name_id(), NameId::Named(LEAF));
    assert_eq!(leaf.ids().len(), FAN_OUT as usize);
    assert_eq!(leaf.ids()[0], 2 + FAN_OUT);
    assert_eq!(leaf.raw_call_count(), i64::from(FAN_OUT));
    assert_eq!(leaf.cpu_cycles_spent(), 3 * i64::from(FAN_OUT));
    assert!(!leaf.has_children());
}

#[test]
fn callers_of_a_wide_merged_node() {
    let provider = fixture();
    let leaf = provider
        .functions()
        .map(Result::unwrap)
        .find(|node| node.name_id() == NameId::Named(LEAF))
        .unwrap();
    assert_eq!(leaf.ids().len(), FAN_OUT as usize);

    let before = provider.queries_issued();
    let caller = single(leaf.callers());
    assert_eq!(provider.queries_issued(), before + 2);
    assert_eq!(caller.name_id(), NameId::Named(STEP));
    assert_eq!(caller.ids().len(), FAN_OUT as usize);
    assert_eq!(caller.cpu_cycles_spent(), 10 * i64::from(FAN_OUT));

    let root = single(caller.callers());
    assert_eq!(root.ids(), &[1]);
}
