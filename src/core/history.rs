//! Bounded command history with terminal-style previous/next browsing

use std::collections::VecDeque;

/// Default number of commands retained
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    capacity: usize,
    /// `None` means "not browsing"
    cursor: Option<usize>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LIMIT)
    }

    /// A capacity of zero is treated as one
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: None,
        }
    }

    /// Record a command. Blank commands and immediate repeats are ignored.
    pub fn add(&mut self, command: &str) {
        if command.trim().is_empty() {
            return;
        }
        if self.entries.back().is_some_and(|last| last == command) {
            return;
        }

        self.entries.push_back(command.to_string());
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = None;
    }

    /// Step back towards the oldest entry, stopping there
    pub fn previous(&mut self) -> &str {
        if self.entries.is_empty() {
            return "";
        }

        let index = match self.cursor {
            None => self.entries.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(index);
        &self.entries[index]
    }

    /// Step forward; moving past the newest entry leaves history
    pub fn next(&mut self) -> &str {
        let Some(index) = self.cursor else {
            return "";
        };

        if index + 1 >= self.entries.len() {
            self.cursor = None;
            return "";
        }

        self.cursor = Some(index + 1);
        &self.entries[index + 1]
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn history_of(commands: &[&str]) -> CommandHistory {
        let mut history = CommandHistory::new();
        for command in commands {
            history.add(command);
        }
        history
    }

    #[test]
    fn test_blank_commands_ignored() {
        let history = history_of(&["", "   ", "\t\r\n"]);
        assert!(history.is_empty());
    }

    #[test]
    fn test_immediate_duplicates_suppressed() {
        let history = history_of(&["a", "a"]);
        assert_eq!(history.len(), 1);

        // Only the most recent entry is compared
        let history = history_of(&["a", "b", "a"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_oldest_evicted_at_capacity() {
        let mut history = CommandHistory::new();
        for i in 0..51 {
            history.add(&format!("cmd{}", i));
        }

        assert_eq!(history.len(), 50);
        assert_eq!(history.entries().next(), Some("cmd1"));
        assert_eq!(history.entries().last(), Some("cmd50"));
    }

    #[test]
    fn test_navigation_sequence() {
        let mut history = history_of(&["x", "y", "z"]);

        assert_eq!(history.previous(), "z");
        assert_eq!(history.previous(), "y");
        assert_eq!(history.previous(), "x");
        assert_eq!(history.previous(), "x");
        assert_eq!(history.next(), "y");
        assert_eq!(history.next(), "z");
        assert_eq!(history.next(), "");
        // Back at "no position"
        assert_eq!(history.next(), "");
        assert_eq!(history.previous(), "z");
    }

    #[test]
    fn test_empty_history_navigation() {
        let mut history = CommandHistory::new();
        assert_eq!(history.previous(), "");
        assert_eq!(history.next(), "");
    }

    #[test]
    fn test_add_resets_cursor() {
        let mut history = history_of(&["x", "y"]);
        assert_eq!(history.previous(), "y");
        assert_eq!(history.previous(), "x");

        history.add("z");
        assert_eq!(history.next(), "");
        assert_eq!(history.previous(), "z");
    }

    #[test]
    fn test_duplicate_add_keeps_cursor() {
        let mut history = history_of(&["x", "y"]);
        assert_eq!(history.previous(), "y");
        assert_eq!(history.previous(), "x");

        history.add("y");
        assert_eq!(history.next(), "y");
    }

    #[test]
    fn test_reset_and_clear() {
        let mut history = history_of(&["x", "y"]);
        history.previous();
        history.reset();
        assert_eq!(history.len(), 2);
        assert_eq!(history.previous(), "y");

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.previous(), "");
    }

    #[test]
    fn test_custom_capacity() {
        let mut history = CommandHistory::with_capacity(2);
        history.add("a");
        history.add("b");
        history.add("c");
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["b", "c"]);

        assert_eq!(CommandHistory::with_capacity(0).capacity(), 1);
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(
            commands in proptest::collection::vec("[a-c ]{0,3}", 0..200),
            capacity in 1usize..20,
        ) {
            let mut history = CommandHistory::with_capacity(capacity);
            for command in &commands {
                history.add(command);
                prop_assert!(history.len() <= capacity);
            }
        }

        #[test]
        fn prop_no_adjacent_duplicates(commands in proptest::collection::vec("[ab]", 0..50)) {
            let mut history = CommandHistory::new();
            for command in &commands {
                history.add(command);
            }
            let entries: Vec<_> = history.entries().collect();
            prop_assert!(entries.windows(2).all(|w| w[0] != w[1]));
        }
    }
}
