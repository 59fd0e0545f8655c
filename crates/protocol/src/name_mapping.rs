use std::fmt;

use serde::{Deserialize, Serialize};

/// Descriptive metadata for one function name id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
    /// Name id as stored in the dataset (0 for the merged placeholder).
    pub id: i32,
    pub return_type: Option<String>,
    /// Fully qualified function name.
    pub name: String,
    pub parameters: Vec<String>,
}

impl NameMapping {
    /// Display name used for nodes whose members disagree on their name.
    pub const MERGED_NAME: &'static str = "Merged node";

    pub fn new(
        id: i32,
        return_type: Option<String>,
        name: impl Into<String>,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            id,
            return_type,
            name: name.into(),
            parameters,
        }
    }

    /// Placeholder mapping for heterogeneous merges. Never backed by storage.
    pub fn merged() -> Self {
        Self::new(0, None, Self::MERGED_NAME, Vec::new())
    }

    pub fn is_merged(&self) -> bool {
        self.id == 0 && self.name == Self::MERGED_NAME
    }

    /// `ReturnType Name(p1, p2)`; the return type is omitted when unknown.
    pub fn signature(&self) -> String {
        let params = self.parameters.join(", ");
        match &self.return_type {
            Some(ret) if !ret.is_empty() => format!("{ret} {}({params})", self.name),
            _ => format!("{}({params})", self.name),
        }
    }
}

impl fmt::Display for NameMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
