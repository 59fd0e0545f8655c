use rusqlite::Row;
use rusqlite::types::Type;

use super::{CallId, NameId};

/// Aggregated values of one group of raw calls.
#[derive(Debug, Clone)]
pub struct CallAggregate {
    pub name_id: NameId,
    /// Raw record ids in source order.
    pub ids: Vec<CallId>,
    pub call_count: i64,
    pub cpu_cycles_spent: i64,
    pub active_call_count: i64,
    pub has_children: bool,
}

impl CallAggregate {
    /// Maps a row of `id, nameid, callcount, cpucyclesspent, activecallcount, haschildren`.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            ids: vec![row.get(0)?],
            name_id: NameId::Named(row.get(1)?),
            call_count: row.get(2)?,
            cpu_cycles_spent: row.get(3)?,
            active_call_count: row.get(4)?,
            has_children: row.get(5)?,
        })
    }

    /// Maps a `GROUP BY nameid` row of `nameid, json_group_array(id), SUM(callcount),
    /// SUM(cpucyclesspent), SUM(activecallcount), MAX(haschildren)`.
    pub(crate) fn from_group_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let ids: String = row.get(1)?;
        let ids = serde_json::from_str(&ids).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err))
        })?;
        Ok(Self {
            name_id: NameId::Named(row.get(0)?),
            ids,
            call_count: row.get(2)?,
            cpu_cycles_spent: row.get(3)?,
            active_call_count: row.get(4)?,
            has_children: row.get(5)?,
        })
    }
}

/// Running state of a fold over merge members.
///
/// The first member seeds the name. Any later disagreement turns it into
/// `NameId::Merged` for good.
#[derive(Debug, Default)]
pub struct MergeAccumulator {
    name_id: Option<NameId>,
    ids: Vec<CallId>,
    call_count: i64,
    cpu_cycles_spent: i64,
    active_call_count: i64,
    has_children: bool,
}

impl MergeAccumulator {
    pub fn push(&mut self, member: &CallAggregate) {
        self.name_id = Some(match self.name_id {
            None => member.name_id,
            Some(current) if current == member.name_id => current,
            Some(_) => NameId::Merged,
        });
        self.ids.extend_from_slice(&member.ids);
        self.call_count += member.call_count;
        self.cpu_cycles_spent += member.cpu_cycles_spent;
        self.active_call_count += member.active_call_count;
        self.has_children |= member.has_children;
    }

    pub fn fold(mut self, member: &CallAggregate) -> Self {
        self.push(member);
        self
    }

    /// An accumulator that saw no members finishes as an empty `Merged` group.
    pub fn finish(self) -> CallAggregate {
        CallAggregate {
            name_id: self.name_id.unwrap_or(NameId::Merged),
            ids: self.ids,
            call_count: self.call_count,
            cpu_cycles_spent: self.cpu_cycles_spent,
            active_call_count: self.active_call_count,
            has_children: self.has_children,
        }
    }
}
