//! Relational layout of a stored profiling dataset.
//!
//! The query layer only reads these tables. The write helpers exist for
//! tools that produce datasets and for fixtures.

use calltree_protocol::NameMapping;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::QueryError;
use crate::model::{CallId, CallRecord};

/// Parent id carried by top-level calls.
pub const ROOT_PARENT_ID: CallId = 0;

/// `Properties` key holding the processor frequency in cycles per microsecond.
pub const PROCESSOR_FREQUENCY_KEY: &str = "processorfrequency";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS FunctionData (
    id INTEGER PRIMARY KEY,
    parentid INTEGER NOT NULL,
    nameid INTEGER NOT NULL,
    callcount INTEGER NOT NULL,
    cpucyclesspent INTEGER NOT NULL,
    activecallcount INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS FunctionData_parentid ON FunctionData(parentid);
CREATE TABLE IF NOT EXISTS NameMapping (
    id INTEGER PRIMARY KEY,
    returntype TEXT,
    name TEXT NOT NULL,
    parameters TEXT
);
CREATE TABLE IF NOT EXISTS Properties (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub fn initialize(conn: &Connection) -> Result<(), QueryError> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

pub fn insert_call(conn: &Connection, record: &CallRecord) -> Result<(), QueryError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO FunctionData (id, parentid, nameid, callcount, cpucyclesspent, activecallcount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params![
        record.id,
        record.parent_id,
        record.name_id,
        record.call_count,
        record.cpu_cycles_spent,
        record.active_call_count,
    ])?;
    Ok(())
}

/// Parameters are stored as a JSON array of strings.
pub fn insert_mapping(conn: &Connection, mapping: &NameMapping) -> Result<(), QueryError> {
    let parameters = serde_json::to_string(&mapping.parameters).map_err(|source| {
        QueryError::InvalidMapping {
            id: mapping.id,
            source,
        }
    })?;
    conn.execute(
        "INSERT INTO NameMapping (id, returntype, name, parameters) VALUES (?1, ?2, ?3, ?4)",
        params![mapping.id, mapping.return_type, mapping.name, parameters],
    )?;
    Ok(())
}

pub fn set_processor_frequency(conn: &Connection, frequency: i64) -> Result<(), QueryError> {
    conn.execute(
        "INSERT OR REPLACE INTO Properties (name, value) VALUES (?1, ?2)",
        params![PROCESSOR_FREQUENCY_KEY, frequency.to_string()],
    )?;
    Ok(())
}

pub(crate) fn read_processor_frequency(conn: &Connection) -> Result<Option<i64>, QueryError> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM Properties WHERE name = ?1",
            params![PROCESSOR_FREQUENCY_KEY],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|v| {
            v.trim().parse::<i64>().map_err(|_| QueryError::InvalidProperty {
                name: PROCESSOR_FREQUENCY_KEY.to_string(),
                value: v.clone(),
            })
        })
        .transpose()
}

pub(crate) fn read_mapping(conn: &Connection, id: i32) -> Result<NameMapping, QueryError> {
    let row: Option<(Option<String>, String, Option<String>)> = conn
        .query_row(
            "SELECT returntype, name, parameters FROM NameMapping WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let Some((return_type, name, parameters)) = row else {
        return Err(QueryError::MappingNotFound(id));
    };
    let parameters = match parameters.as_deref() {
        None | Some("") => Vec::new(),
        Some(json) => serde_json::from_str(json)
            .map_err(|source| QueryError::InvalidMapping { id, source })?,
    };
    Ok(NameMapping::new(id, return_type, name, parameters))
}
