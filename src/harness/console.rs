//! Rolling console transcript

use std::collections::VecDeque;

use crate::constants::CONSOLE_CAPACITY;

/// Ordered lines, oldest first, never more than `capacity`
#[derive(Debug, Clone)]
pub struct ConsoleLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::with_capacity(CONSOLE_CAPACITY)
    }
}

impl ConsoleLog {
    /// Holds at least one line
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Add the newest line, evicting from the oldest end on overflow
    pub fn append(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(|l| l.as_str())
    }

    /// Whole transcript as displayed, one line per entry
    pub fn render(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_below_capacity() {
        let mut console = ConsoleLog::default();
        console.append("a");
        console.append("b");
        assert_eq!(console.len(), 2);
        assert_eq!(console.render(), "a\nb");
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut console = ConsoleLog::default();
        for i in 0..100 {
            console.append(format!("line {}", i));
            assert!(console.len() <= CONSOLE_CAPACITY);
        }
        assert_eq!(console.len(), CONSOLE_CAPACITY);
        assert_eq!(console.lines().next(), Some("line 85"));
        assert_eq!(console.last(), Some("line 99"));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut console = ConsoleLog::default();
        for i in 0..CONSOLE_CAPACITY {
            console.append(i.to_string());
        }
        let second_oldest = console.lines().nth(1).map(str::to_string);

        console.append("overflow");
        assert_eq!(console.len(), CONSOLE_CAPACITY);
        assert_eq!(console.lines().next().map(str::to_string), second_oldest);
        assert_eq!(console.last(), Some("overflow"));
    }

    #[test]
    fn test_small_capacity() {
        let mut console = ConsoleLog::with_capacity(2);
        console.append("x");
        console.append("y");
        console.append("z");
        assert_eq!(console.lines().collect::<Vec<_>>(), vec!["y", "z"]);
    }

    #[test]
    fn test_zero_capacity_keeps_newest_line() {
        let mut console = ConsoleLog::with_capacity(0);
        console.append("first");
        console.append("second");
        assert_eq!(console.len(), 1);
        assert_eq!(console.render(), "second");
    }
}
