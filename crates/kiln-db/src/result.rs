//! Line counts reported by statement execution.

use std::ops::AddAssign;

/// Rows touched by one or more statements, by statement kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub lines_read: u64,
    pub lines_output: u64,
    pub lines_updated: u64,
    pub lines_deleted: u64,
}

impl ExecResult {
    /// Attribute `count` rows to the kind of statement `sql` starts with.
    pub(crate) fn for_statement(sql: &str, count: u64) -> Self {
        let mut result = Self::default();
        if count == 0 {
            return result;
        }
        let head: String = sql
            .trim_start()
            .chars()
            .take(6)
            .collect::<String>()
            .to_uppercase();
        if head.starts_with("INSERT") {
            result.lines_output = count;
        } else if head.starts_with("UPDATE") {
            result.lines_updated = count;
        } else if head.starts_with("DELETE") {
            result.lines_deleted = count;
        }
        result
    }

    pub fn add(&mut self, other: &ExecResult) {
        self.lines_read += other.lines_read;
        self.lines_output += other.lines_output;
        self.lines_updated += other.lines_updated;
        self.lines_deleted += other.lines_deleted;
    }
}

impl AddAssign for ExecResult {
    fn add_assign(&mut self, other: ExecResult) {
        self.add(&other);
    }
}
