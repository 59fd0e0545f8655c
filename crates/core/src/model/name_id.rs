use std::fmt;

/// Identifier of one raw call record.
pub type CallId = i32;

/// Name identity of a call tree node.
///
/// `Merged` marks a node whose members disagree on their name. It is a
/// distinct variant so it can never collide with a stored name id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameId {
    Merged,
    Named(i32),
}

impl NameId {
    pub fn is_merged(self) -> bool {
        matches!(self, NameId::Merged)
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameId::Merged => f.write_str("merged"),
            NameId::Named(id) => write!(f, "{id}"),
        }
    }
}
