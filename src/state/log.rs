use chrono::{DateTime, Local};

/// One line of the operator log.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

/// Append-only operator log.
///
/// Entries keep arrival order; there is no filtering, deduplication or size
/// bound. The selected entry backs the detail display.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    selected: Option<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: impl Into<String>) -> usize {
        self.entries.push(LogEntry {
            at: Local::now(),
            message: message.into(),
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn messages(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(|entry| entry.message.as_str())
    }

    /// Whether any entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().any(|message| message.contains(needle))
    }

    /// Select an entry for the detail display. Out-of-range clears the selection.
    pub fn select(&mut self, index: usize) -> Option<&str> {
        self.selected = (index < self.entries.len()).then_some(index);
        self.detail()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Text of the selected entry.
    pub fn detail(&self) -> Option<&str> {
        self.selected
            .and_then(|index| self.entries.get(index))
            .map(|entry| entry.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut log = EventLog::new();
        assert_eq!(log.push("initialize success"), 0);
        assert_eq!(log.push("enable video"), 1);
        assert_eq!(log.push("enable video"), 2);

        let messages: Vec<_> = log.messages().collect();
        assert_eq!(messages, vec!["initialize success", "enable video", "enable video"]);
    }

    #[test]
    fn test_select_sets_detail() {
        let mut log = EventLog::new();
        log.push("first");
        log.push("second");

        assert_eq!(log.select(1), Some("second"));
        assert_eq!(log.selected(), Some(1));
        assert_eq!(log.select(5), None);
        assert_eq!(log.detail(), None);
    }

    #[test]
    fn test_contains() {
        let mut log = EventLog::new();
        log.push("initialize failed: 101");
        assert!(log.contains("initialize failed"));
        assert!(!log.contains("join success"));
    }
}
