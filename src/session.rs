use std::collections::VecDeque;
use std::sync::Mutex;

/// Append-only bounded line list shared between the event loop and the
/// background poller. The mutex is held only for the duration of a single
/// operation, so a redraw never observes a half-applied append.
///
/// The cursor tracks the viewport line. If it sat on the last line before
/// an append it sticks to the new last line afterwards; otherwise it keeps
/// pointing at the same line, shifting down when eviction drops lines in
/// front of it.
pub struct LogBuffer {
    inner: Mutex<LogState>,
}

struct LogState {
    lines: VecDeque<String>,
    capacity: usize,
    cursor: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LogState {
                lines: VecDeque::new(),
                capacity: capacity.max(1),
                cursor: 0,
            }),
        }
    }

    pub fn append(&self, line: impl Into<String>) {
        let mut state = self.inner.lock().unwrap();
        let was_at_end = state.lines.is_empty() || state.cursor + 1 >= state.lines.len();
        // Evict before pushing so the list never exceeds capacity.
        if state.lines.len() == state.capacity {
            state.lines.pop_front();
            state.cursor = state.cursor.saturating_sub(1);
        }
        state.lines.push_back(line.into());
        if was_at_end {
            state.cursor = state.lines.len() - 1;
        }
    }

    /// Move the cursor by `delta` lines, clamped to the buffer.
    pub fn scroll(&self, delta: isize) {
        let mut state = self.inner.lock().unwrap();
        if state.lines.is_empty() {
            return;
        }
        let last = state.lines.len() - 1;
        let target = state.cursor as isize + delta;
        state.cursor = target.clamp(0, last as isize) as usize;
    }

    pub fn scroll_to_end(&self) {
        let mut state = self.inner.lock().unwrap();
        state.cursor = state.lines.len().saturating_sub(1);
    }

    /// Snapshot for rendering: the retained lines and the cursor index.
    pub fn snapshot(&self) -> (Vec<String>, usize) {
        let state = self.inner.lock().unwrap();
        (state.lines.iter().cloned().collect(), state.cursor)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded command recall list. The cursor lives in `[0, len]`; `len`
/// means past-the-end, which recalls as an empty input line. Committing a
/// new line always resets the cursor past the end.
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            cursor: 0,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.into());
        self.cursor = self.entries.len();
    }

    /// Step back one entry. `None` only when the history is empty.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Step forward one entry. `None` past the newest entry, meaning the
    /// input line should go back to empty.
    pub fn next_entry(&mut self) -> Option<&str> {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
        self.entries.get(self.cursor).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn append_keeps_only_the_newest_lines_in_order() {
        let log = LogBuffer::new(3);
        for n in 0..7 {
            log.append(format!("line {n}"));
            assert!(log.len() <= 3);
        }
        let (lines, _) = log.snapshot();
        assert_eq!(lines, vec!["line 4", "line 5", "line 6"]);
    }

    #[test]
    fn cursor_sticks_to_the_end_when_it_was_there() {
        let log = LogBuffer::new(3);
        log.append("a");
        log.append("b");
        log.append("c");
        let (_, cursor) = log.snapshot();
        assert_eq!(cursor, 2);
        // evicting append, still pinned to the last line
        log.append("d");
        let (lines, cursor) = log.snapshot();
        assert_eq!(lines, vec!["b", "c", "d"]);
        assert_eq!(cursor, 2);
    }

    #[test]
    fn scrolled_back_cursor_follows_its_line_through_eviction() {
        let log = LogBuffer::new(3);
        log.append("a");
        log.append("b");
        log.append("c");
        log.scroll(-1); // now on "b"
        log.append("d"); // evicts "a", "b" shifts to index 0
        let (lines, cursor) = log.snapshot();
        assert_eq!(lines, vec!["b", "c", "d"]);
        assert_eq!(lines[cursor], "b");
    }

    #[test]
    fn scroll_clamps_to_the_buffer() {
        let log = LogBuffer::new(10);
        log.append("only");
        log.scroll(-5);
        assert_eq!(log.snapshot().1, 0);
        log.scroll(99);
        assert_eq!(log.snapshot().1, 0);
    }

    #[test]
    fn concurrent_appends_never_lose_or_tear_lines() {
        let log = Arc::new(LogBuffer::new(1000));
        let worker = {
            let log = Arc::clone(&log);
            std::thread::spawn(move || {
                for n in 0..500 {
                    log.append(format!("worker {n}"));
                }
            })
        };
        for n in 0..500 {
            log.append(format!("main {n}"));
        }
        worker.join().unwrap();
        let (lines, _) = log.snapshot();
        assert_eq!(lines.len(), 1000);
        assert_eq!(lines.iter().filter(|l| l.starts_with("worker")).count(), 500);
        assert_eq!(lines.iter().filter(|l| l.starts_with("main")).count(), 500);
    }

    #[test]
    fn recall_walks_back_then_forward_then_empties() {
        let mut history = History::new(100);
        history.push("a");
        history.push("b");
        history.push("c");

        assert_eq!(history.previous(), Some("c"));
        assert_eq!(history.previous(), Some("b"));
        assert_eq!(history.previous(), Some("a"));
        // clamped at the oldest entry
        assert_eq!(history.previous(), Some("a"));
        assert_eq!(history.next_entry(), Some("b"));
        assert_eq!(history.next_entry(), Some("c"));
        // past the newest entry the line goes empty and stays empty
        assert_eq!(history.next_entry(), None);
        assert_eq!(history.next_entry(), None);
    }

    #[test]
    fn commit_resets_recall_past_the_end() {
        let mut history = History::new(100);
        history.push("a");
        history.push("b");
        assert_eq!(history.previous(), Some("b"));
        history.push("c");
        // back past-the-end: the next recall starts from the newest entry
        assert_eq!(history.previous(), Some("c"));
    }

    #[test]
    fn history_is_bounded() {
        let mut history = History::new(2);
        history.push("a");
        history.push("b");
        history.push("c");
        assert_eq!(history.previous(), Some("c"));
        assert_eq!(history.previous(), Some("b"));
        assert_eq!(history.previous(), Some("b"));
    }
}
