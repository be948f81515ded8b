//! Bounded in-memory execution history.

use std::collections::VecDeque;

use parley_types::ExecutionRecord;

/// A ring buffer of execution records with a maximum capacity.
#[derive(Debug)]
pub struct ExecutionHistory {
    buffer: VecDeque<ExecutionRecord>,
    max_size: usize,
}

impl ExecutionHistory {
    /// Create a history keeping at most `max_size` records (at least one).
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            buffer: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn push(&mut self, record: ExecutionRecord) {
        if self.buffer.len() >= self.max_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(record);
    }

    /// The most recent `count` records, oldest first.
    pub fn recent(&self, count: usize) -> Vec<ExecutionRecord> {
        let start = self.buffer.len().saturating_sub(count);
        self.buffer.iter().skip(start).cloned().collect()
    }

    pub fn find(&self, execution_id: &str) -> Option<&ExecutionRecord> {
        self.buffer.iter().rev().find(|record| record.execution_id == execution_id)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_types::{Command, CommandResult};

    fn record(id: usize) -> ExecutionRecord {
        ExecutionRecord {
            execution_id: format!("exec-{id}"),
            command: Command::system("help", vec![]),
            result: CommandResult::success(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut history = ExecutionHistory::new(2);
        for id in 0..5 {
            history.push(record(id));
        }

        assert_eq!(history.len(), 2);
        let recent = history.recent(10);
        assert_eq!(recent[0].execution_id, "exec-3");
        assert_eq!(recent[1].execution_id, "exec-4");
        assert!(history.find("exec-0").is_none());
        assert!(history.find("exec-4").is_some());
    }

    #[test]
    fn recent_limits_from_the_newest_end() {
        let mut history = ExecutionHistory::default();
        for id in 0..3 {
            history.push(record(id));
        }
        let recent = history.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].execution_id, "exec-2");
        assert!(history.recent(0).is_empty());
    }

    #[test]
    fn zero_capacity_keeps_one_record() {
        let mut history = ExecutionHistory::new(0);
        history.push(record(1));
        history.push(record(2));
        assert_eq!(history.max_size(), 1);
        assert_eq!(history.recent(5)[0].execution_id, "exec-2");
    }
}
