use super::CallId;

/// One stored invocation instance, as laid out in `FunctionData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub id: CallId,
    /// `schema::ROOT_PARENT_ID` for top-level calls.
    pub parent_id: CallId,
    pub name_id: i32,
    /// Calls completed inside the selected window.
    pub call_count: i64,
    /// Inclusive cycles.
    pub cpu_cycles_spent: i64,
    /// Calls already running when the window started.
    pub active_call_count: i64,
}

impl CallRecord {
    pub fn new(id: CallId, parent_id: CallId, name_id: i32) -> Self {
        Self {
            id,
            parent_id,
            name_id,
            call_count: 1,
            cpu_cycles_spent: 0,
            active_call_count: 0,
        }
    }

    pub fn with_calls(mut self, call_count: i64, active_call_count: i64) -> Self {
        self.call_count = call_count;
        self.active_call_count = active_call_count;
        self
    }

    pub fn with_cycles(mut self, cpu_cycles_spent: i64) -> Self {
        self.cpu_cycles_spent = cpu_cycles_spent;
        self
    }
}
