//! Line editor
//!
//! Owns the in-progress input buffer and cursor, and generates the
//! minimal-redraw echo for every edit. Echo bytes are appended to a
//! caller-supplied sink; only the suffix after the edit point is
//! rewritten, never the whole line.

use tracing::{debug, warn};

/// Cursor movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Echo for erasing one character: move left, blank it, move left again.
pub const BACKSPACE_ECHO: &[u8] = b"\x1b[1D \x1b[1D";

/// In-place line editor over a byte buffer.
///
/// Invariant: `cursor <= buffer.len() <= limit` after every operation.
#[derive(Debug)]
pub struct LineEditor {
    buffer: Vec<u8>,
    cursor: usize,
    limit: usize,
}

impl LineEditor {
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            limit,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// True once the buffer has reached the line limit.
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Current buffer content as a string. The buffer only ever holds
    /// printable ASCII, so this never allocates replacement characters.
    pub fn line(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    /// Splice a printable character in at the cursor and echo the
    /// rewritten suffix. Dropped silently when the buffer is full.
    pub fn insert_char(&mut self, byte: u8, out: &mut Vec<u8>) {
        if self.is_full() {
            debug!("Dropped char: {}({})", byte as char, byte);
            return;
        }
        self.buffer.insert(self.cursor, byte);
        // Echo the new character plus everything after it, then park
        // the terminal cursor right after the insertion point.
        out.push(byte);
        out.extend_from_slice(&self.buffer[self.cursor + 1..]);
        self.cursor += 1;
        let suffix = self.buffer.len() - self.cursor;
        if suffix > 0 {
            emit_move(out, Direction::Left, suffix);
        }
        debug!("cursor: {}", self.cursor);
    }

    /// Remove the character under the cursor and shift the tail left one
    /// column. No-op when the cursor sits at the end of the buffer.
    pub fn delete_at_cursor(&mut self, out: &mut Vec<u8>) {
        if self.cursor == self.buffer.len() {
            return;
        }
        self.buffer.remove(self.cursor);
        // Rewrite the tail and blank the column the line shrank off of.
        out.extend_from_slice(&self.buffer[self.cursor..]);
        out.push(b' ');
        emit_move(out, Direction::Left, self.buffer.len() - self.cursor + 1);
    }

    /// Delete the character left of the cursor.
    pub fn backspace(&mut self, out: &mut Vec<u8>) {
        if self.cursor == 0 {
            return;
        }
        self.move_cursor(Direction::Left, 1, out);
        self.delete_at_cursor(out);
        debug!("cursor: {}", self.cursor);
    }

    /// Move the cursor `count` columns, clamped so it stays within the
    /// buffer. Emits a movement sequence only when the clamped count is
    /// non-zero.
    pub fn move_cursor(&mut self, direction: Direction, count: usize, out: &mut Vec<u8>) {
        let count = match direction {
            Direction::Left => count.min(self.cursor),
            Direction::Right => {
                if self.cursor + count > self.buffer.len() {
                    0
                } else {
                    count
                }
            }
        };
        if count == 0 {
            return;
        }
        match direction {
            Direction::Left => self.cursor -= count,
            Direction::Right => self.cursor += count,
        }
        debug!("move cursor {:?} {}", direction, count);
        emit_move(out, direction, count);
    }

    /// Kill all text from the cursor to the end of the line.
    pub fn kill_to_end(&mut self, out: &mut Vec<u8>) {
        if self.cursor > self.buffer.len() {
            // Internal inconsistency: recover by pulling the cursor back
            // to the end of the buffer instead of propagating an error.
            warn!(
                "Resetting input buffer position to {}...",
                self.buffer.len()
            );
            let excess = self.cursor - self.buffer.len();
            self.cursor = self.buffer.len();
            emit_move(out, Direction::Left, excess);
            return;
        }
        let diff = self.buffer.len() - self.cursor;
        debug!("diff: {}", diff);
        if diff == 0 {
            return;
        }
        self.move_cursor(Direction::Right, diff, out);
        for _ in 0..diff {
            out.extend_from_slice(BACKSPACE_ECHO);
        }
        self.cursor -= diff;
        self.buffer.truncate(self.cursor);
    }

    /// Replace the visible line with `line`: erase what was typed with
    /// repeated backspace echo, then write and adopt the new content.
    /// Used when browsing history.
    pub fn load_line(&mut self, line: &str, out: &mut Vec<u8>) {
        for _ in 0..self.cursor {
            out.extend_from_slice(BACKSPACE_ECHO);
        }
        out.extend_from_slice(line.as_bytes());
        self.buffer.clear();
        self.buffer.extend_from_slice(line.as_bytes());
        self.cursor = self.buffer.len();
    }

    /// Clear the buffer and reset the cursor. Emits no echo.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }
}

/// Append a cursor movement control sequence without touching editor
/// state. Used for the repositioning part of a redraw.
fn emit_move(out: &mut Vec<u8>, direction: Direction, count: usize) {
    let final_byte = match direction {
        Direction::Left => 'D',
        Direction::Right => 'C',
    };
    out.extend_from_slice(format!("\x1b[{}{}", count, final_byte).as_bytes());
}

/// Printable ASCII check for input bytes.
pub fn is_printable(byte: u8) -> bool {
    (b' '..=b'~').contains(&byte)
}
