use serde::Deserialize;
use std::collections::VecDeque;
use std::io::{self, Write};

/// Default number of lines the store keeps.
pub const DEFAULT_CAPACITY: usize = 100;

/// What happens to a line appended to a full store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Overflow {
    /// The new line is not recorded.
    #[default]
    DropNewest,
    /// The oldest line is evicted to make room.
    DropOldest,
}

/// Bounded, append-only record of raw input lines for one session.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<String>,
    capacity: usize,
    overflow: Overflow,
}

impl HistoryStore {
    pub fn new(capacity: usize, overflow: Overflow) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            overflow,
        }
    }

    /// Records `line`. Returns `false` when the line was not recorded.
    ///
    /// Running out of capacity is never an error.
    pub fn push(&mut self, line: &str) -> bool {
        if self.entries.len() < self.capacity {
            self.entries.push_back(line.to_string());
            return true;
        }
        match self.overflow {
            Overflow::DropNewest => {
                tracing::warn!(capacity = self.capacity, "history full, line not recorded");
                false
            }
            Overflow::DropOldest if self.capacity > 0 => {
                self.entries.pop_front();
                self.entries.push_back(line.to_string());
                true
            }
            Overflow::DropOldest => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Writes every entry as `<n>: <line>`, numbered from 1.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, line) in self.iter().enumerate() {
            writeln!(out, "{}: {}", i + 1, line)?;
        }
        Ok(())
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Overflow::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(overflow: Overflow, count: usize) -> HistoryStore {
        let mut history = HistoryStore::new(DEFAULT_CAPACITY, overflow);
        for i in 1..=count {
            history.push(&format!("echo {i}"));
        }
        history
    }

    #[test]
    fn test_lists_with_one_based_index() {
        let mut history = HistoryStore::default();
        history.push("ls -l");
        history.push("cd /tmp && ls | wc");
        let mut out = Vec::new();
        history.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1: ls -l\n2: cd /tmp && ls | wc\n"
        );
    }

    #[test]
    fn test_drop_newest_keeps_first_lines() {
        let history = filled(Overflow::DropNewest, 105);
        assert_eq!(history.len(), 100);
        assert_eq!(history.iter().next(), Some("echo 1"));
        assert_eq!(history.iter().last(), Some("echo 100"));
    }

    #[test]
    fn test_drop_oldest_keeps_last_lines() {
        let history = filled(Overflow::DropOldest, 105);
        assert_eq!(history.len(), 100);
        assert_eq!(history.iter().next(), Some("echo 6"));
        assert_eq!(history.iter().last(), Some("echo 105"));
    }

    #[test]
    fn test_push_reports_whether_recorded() {
        let mut history = HistoryStore::new(1, Overflow::DropNewest);
        assert!(history.push("first"));
        assert!(!history.push("second"));
        assert_eq!(history.len(), 1);

        let mut empty = HistoryStore::new(0, Overflow::DropOldest);
        assert!(!empty.push("anything"));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut history = HistoryStore::new(usize::MAX, Overflow::DropNewest);
        for i in 1..=105 {
            assert!(history.push(&format!("echo {i}")));
        }
        assert_eq!(history.len(), 105);
    }
}
