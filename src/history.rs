//! Command history for a CLI session
//!
//! Bounded, oldest-first log of completed command lines plus the browse cursor
//! used by up/down (Ctrl-P/Ctrl-N) navigation. History lives only as long as
//! its session.

use std::collections::VecDeque;

/// Default maximum number of history entries
pub const HISTORY_LIMIT: usize = 100;

/// Outcome of a history navigation request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryStep {
    /// Nothing to move to; ring the bell
    Bell,
    /// Replace the edited line with this content
    Recall(Vec<u8>),
}

/// Command history storage
#[derive(Debug)]
pub struct CommandHistory {
    /// All entries (newest last)
    entries: VecDeque<Vec<u8>>,
    /// Maximum entries
    max_entries: usize,
    /// Index being shown while browsing, `None` while editing live
    browse: Option<usize>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl CommandHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            browse: None,
        }
    }

    /// Add a completed line, evicting the oldest entries past the limit
    pub fn add(&mut self, line: Vec<u8>) {
        self.push(line);
        self.browse = None;
    }

    fn push(&mut self, line: Vec<u8>) -> usize {
        self.entries.push_back(line);
        let mut evicted = 0;
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Step towards older entries
    ///
    /// When browsing starts, a non-empty `current` line is kept in history as
    /// a working entry so it can be reached again with [`next`](Self::next).
    pub fn previous(&mut self, current: &[u8]) -> HistoryStep {
        if self.entries.is_empty() {
            return HistoryStep::Bell;
        }
        let index = match self.browse {
            Some(index) => index,
            None => {
                let mut index = self.entries.len();
                if !current.is_empty() {
                    index -= self.push(current.to_vec()).min(index);
                }
                self.browse = Some(index);
                index
            }
        };
        if index == 0 {
            return HistoryStep::Bell;
        }
        self.browse = Some(index - 1);
        HistoryStep::Recall(self.entries[index - 1].clone())
    }

    /// Step towards newer entries; past the newest, browsing ends on an empty line
    pub fn next(&mut self) -> HistoryStep {
        let Some(index) = self.browse else {
            return HistoryStep::Bell;
        };
        let index = index + 1;
        match self.entries.get(index) {
            Some(entry) => {
                self.browse = Some(index);
                HistoryStep::Recall(entry.clone())
            }
            None => {
                self.browse = None;
                HistoryStep::Recall(Vec::new())
            }
        }
    }

    /// Return to live editing without touching the entries
    pub fn stop_browsing(&mut self) {
        self.browse = None;
    }

    pub fn is_browsing(&self) -> bool {
        self.browse.is_some()
    }

    pub fn browse_index(&self) -> Option<usize> {
        self.browse
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.browse = None;
    }

    /// Entries oldest first
    pub fn entries(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn test_eviction() {
        let mut history = CommandHistory::default();
        for i in 0..=HISTORY_LIMIT {
            history.add(line(&format!("cmd {}", i)));
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert!(!history.entries().any(|e| e == b"cmd 0"));
        assert_eq!(history.entries().last(), Some(&b"cmd 100"[..]));
        assert_eq!(history.entries().next(), Some(&b"cmd 1"[..]));
    }

    #[test]
    fn test_previous_on_empty_history() {
        let mut history = CommandHistory::default();
        assert_eq!(history.previous(b""), HistoryStep::Bell);
        assert!(!history.is_browsing());
    }

    #[test]
    fn test_previous_stops_at_oldest() {
        let mut history = CommandHistory::default();
        history.add(line("one"));
        history.add(line("two"));

        assert_eq!(history.previous(b""), HistoryStep::Recall(line("two")));
        assert_eq!(history.previous(b""), HistoryStep::Recall(line("one")));
        assert_eq!(history.browse_index(), Some(0));
        for _ in 0..3 {
            assert_eq!(history.previous(b""), HistoryStep::Bell);
            assert_eq!(history.browse_index(), Some(0));
        }
    }

    #[test]
    fn test_next_returns_to_live_line() {
        let mut history = CommandHistory::default();
        assert_eq!(history.next(), HistoryStep::Bell);

        history.add(line("one"));
        history.add(line("two"));
        history.previous(b"");
        history.previous(b"");
        assert_eq!(history.next(), HistoryStep::Recall(line("two")));
        assert_eq!(history.next(), HistoryStep::Recall(Vec::new()));
        assert!(!history.is_browsing());
        assert_eq!(history.next(), HistoryStep::Bell);
    }

    #[test]
    fn test_working_line_is_kept() {
        let mut history = CommandHistory::default();
        history.add(line("one"));

        assert_eq!(history.previous(b"draft"), HistoryStep::Recall(line("one")));
        assert_eq!(history.len(), 2);
        assert_eq!(history.next(), HistoryStep::Recall(line("draft")));
        assert_eq!(history.next(), HistoryStep::Recall(Vec::new()));
        assert_eq!(history.entries().last(), Some(&b"draft"[..]));
    }

    #[test]
    fn test_working_line_respects_limit() {
        let mut history = CommandHistory::new(3);
        history.add(line("a"));
        history.add(line("b"));
        history.add(line("c"));

        assert_eq!(history.previous(b"draft"), HistoryStep::Recall(line("c")));
        assert_eq!(history.len(), 3);
        assert_eq!(history.previous(b""), HistoryStep::Recall(line("b")));
        assert_eq!(history.previous(b""), HistoryStep::Bell);
    }
}
