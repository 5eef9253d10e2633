//! Command history
//!
//! Session-persistent, append-only log of submitted commands with
//! up/down browsing. While the user browses, whatever was typed on the
//! line is stashed and restored when browsing returns past the newest
//! entry. History lives in memory only and vanishes with the process.

use tracing::debug;

/// History of submitted commands and the browse position.
///
/// `pos == entries.len()` means "not browsing".
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
    pos: usize,
    partial: String,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[cfg(test)]
    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Append a submitted line. Two identical commands in a row are
    /// stored once; non-adjacent repeats are all kept.
    pub fn record(&mut self, line: &str) {
        if self.entries.last().map(String::as_str) != Some(line) {
            self.entries.push(line.to_string());
        }
    }

    /// Step back one entry. `current` is the line as typed so far; it is
    /// stashed when browsing begins so it can be restored later.
    ///
    /// Returns the entry to display, or `None` at the oldest entry or
    /// when there is no history at all.
    pub fn previous(&mut self, current: &str) -> Option<String> {
        if self.entries.is_empty() {
            debug!("No history to print.");
            return None;
        }
        if self.pos == 0 {
            debug!("No more history to show.");
            return None;
        }
        debug!("current history position: {}.", self.pos);
        if self.pos == self.entries.len() {
            debug!("saving partial command: '{}'", current);
            self.partial = current.to_string();
        }
        self.pos -= 1;
        debug!("new history position: {}", self.pos);
        Some(self.entries[self.pos].clone())
    }

    /// Step forward one entry. Stepping past the newest entry restores
    /// the stashed partial command (clearing the stash); stepping
    /// further is a no-op.
    pub fn next(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            debug!("History buffer is empty.");
            return None;
        }
        debug!("current history position: {}", self.pos);
        self.pos += 1;
        if self.pos == self.entries.len() {
            debug!("Restoring partial command of '{}'", self.partial);
            return Some(std::mem::take(&mut self.partial));
        }
        if self.pos > self.entries.len() {
            debug!("No more history to show.");
            self.pos -= 1;
            return None;
        }
        debug!("new history position: {}", self.pos);
        Some(self.entries[self.pos].clone())
    }

    /// Leave browse mode: position past the newest entry, stash cleared.
    /// Called after every submitted line.
    pub fn reset_browse(&mut self) {
        self.pos = self.entries.len();
        self.partial.clear();
    }

    /// Render the numbered listing for the local `history` command.
    /// Numbers are right-justified to a width derived from the count.
    pub fn listing(&self) -> String {
        let wide = self.entries.len() / 10 + 1;
        let mut text = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            text.push_str(&format!(" {:>wide$} {}\r\n", i, entry));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_duplicates_suppressed() {
        let mut history = History::new();
        history.record("help");
        history.record("help");
        assert_eq!(history.entries(), &["help".to_string()]);
    }

    #[test]
    fn test_non_adjacent_duplicates_kept() {
        let mut history = History::new();
        history.record("help");
        history.record("status");
        history.record("help");
        assert_eq!(
            history.entries(),
            &["help".to_string(), "status".to_string(), "help".to_string()]
        );
    }

    #[test]
    fn test_browse_empty_history() {
        let mut history = History::new();
        assert_eq!(history.previous("foo"), None);
        assert_eq!(history.next(), None);
    }

    #[test]
    fn test_previous_stops_at_oldest() {
        let mut history = History::new();
        history.record("one");
        history.record("two");
        history.reset_browse();

        assert_eq!(history.previous("").as_deref(), Some("two"));
        assert_eq!(history.previous("").as_deref(), Some("one"));
        assert_eq!(history.previous(""), None);
        assert_eq!(history.previous(""), None);
    }

    #[test]
    fn test_partial_stash_round_trip() {
        let mut history = History::new();
        history.record("help");
        history.reset_browse();

        // Browsing away from "foo" stashes it; coming back restores it
        // and clears the stash.
        assert_eq!(history.previous("foo").as_deref(), Some("help"));
        assert_eq!(history.partial(), "foo");
        assert_eq!(history.next().as_deref(), Some("foo"));
        assert_eq!(history.partial(), "");
    }

    #[test]
    fn test_next_past_end_is_noop() {
        let mut history = History::new();
        history.record("one");
        history.reset_browse();

        // Already at the bottom: one step restores the (empty) partial,
        // further steps do nothing.
        assert_eq!(history.previous("").as_deref(), Some("one"));
        assert_eq!(history.next().as_deref(), Some(""));
        assert_eq!(history.next(), None);
        assert_eq!(history.next(), None);
        assert_eq!(history.previous("").as_deref(), Some("one"));
    }

    #[test]
    fn test_listing_format() {
        let mut history = History::new();
        history.record("version");
        history.record("gpioget");
        assert_eq!(history.listing(), " 0 version\r\n 1 gpioget\r\n");
    }

    #[test]
    fn test_listing_width_grows_with_count() {
        let mut history = History::new();
        for i in 0..12 {
            history.record(&format!("cmd{}", i));
        }
        let listing = history.listing();
        let lines: Vec<&str> = listing.split("\r\n").collect();
        assert_eq!(lines[0], "  0 cmd0");
        assert_eq!(lines[11], " 11 cmd11");
    }
}
