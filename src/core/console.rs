//! Console core
//!
//! Routes every byte read from the user terminal through the escape
//! parser, the line editor, and the command dispatcher, and runs the
//! event loop that multiplexes the terminal with the interpreter's
//! command and debug channels.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsFd;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use thiserror::Error;
use tracing::{debug, info};

use super::editor::{is_printable, Direction, LineEditor};
use super::escape::{EscapeAction, EscapeParser};
use super::history::History;
use super::peer::{Interpreter, PeerError};
use super::pty::Pty;

/// Max bytes to read at a time from the user terminal.
const TERMINAL_READ_CHUNK: usize = 100;
/// Max bytes to read at a time from a channel.
const CHANNEL_READ_CHUNK: usize = 4096;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Failed to poll I/O sources: {0}")]
    Poll(#[source] nix::Error),

    #[error("Terminal I/O failed: {0}")]
    Terminal(#[source] io::Error),

    #[error("{0} channel read failed: {1}")]
    Channel(&'static str, #[source] io::Error),

    #[error("{0} channel closed by peer")]
    ChannelClosed(&'static str),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Recognized single-byte control inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    /// Ctrl+A: start of line.
    Home,
    /// Ctrl+B: cursor left one column.
    CursorLeft,
    /// Ctrl+D: delete the character under the cursor.
    DeleteAtCursor,
    /// Ctrl+E: end of line.
    End,
    /// Ctrl+F: cursor right one column.
    CursorRight,
    /// Backspace.
    Backspace,
    /// Ctrl+K: kill to end of line.
    KillToEnd,
    /// Carriage return: submit the line.
    Submit,
    /// Ctrl+N: next history entry.
    HistoryNext,
    /// Ctrl+P: previous history entry.
    HistoryPrevious,
    /// ESC: begin an escape sequence.
    Escape,
}

impl ControlKey {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Home),
            0x02 => Some(Self::CursorLeft),
            0x04 => Some(Self::DeleteAtCursor),
            0x05 => Some(Self::End),
            0x06 => Some(Self::CursorRight),
            0x08 => Some(Self::Backspace),
            0x0b => Some(Self::KillToEnd),
            0x0d => Some(Self::Submit),
            0x0e => Some(Self::HistoryNext),
            0x10 => Some(Self::HistoryPrevious),
            0x1b => Some(Self::Escape),
            _ => None,
        }
    }

    /// Keys still accepted once the cursor has reached the line limit.
    fn accepted_when_full(self) -> bool {
        matches!(
            self,
            Self::CursorLeft
                | Self::CursorRight
                | Self::Escape
                | Self::Backspace
                | Self::Home
                | Self::Submit
                | Self::HistoryPrevious
                | Self::HistoryNext
        )
    }
}

/// Console editing state and command dispatch.
///
/// `handle_byte` consumes one input byte, appends whatever echo it
/// produces to `out`, and returns a completed line when it must be
/// forwarded to the interpreter.
pub struct Console {
    editor: LineEditor,
    history: History,
    escape: EscapeParser,
    prompt: String,
}

impl Console {
    pub fn new(prompt: impl Into<String>, line_limit: usize) -> Self {
        Self {
            editor: LineEditor::new(line_limit),
            history: History::new(),
            escape: EscapeParser::new(),
            prompt: prompt.into(),
        }
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Process one byte from the user terminal.
    pub fn handle_byte(&mut self, byte: u8, out: &mut Vec<u8>) -> Option<String> {
        // Keep handling the ESC sequence if we're in the middle of it.
        if self.escape.active() {
            if let Some(action) = self.escape.feed(byte) {
                self.apply(action, out);
            }
            return None;
        }

        let key = ControlKey::from_byte(byte);

        // At the end of the line only navigation, backspace, submit and
        // history keys get through; everything else is dropped.
        if self.editor.cursor() >= self.editor.limit()
            && !key.is_some_and(ControlKey::accepted_when_full)
        {
            return None;
        }

        match key {
            Some(ControlKey::Submit) => {
                debug!("Enter key pressed.");
                // Prompt goes out before any processing; response output
                // arriving later lands after it.
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(self.prompt.as_bytes());
                return self.finish_line(out);
            }
            Some(ControlKey::Backspace) => {
                debug!("Backspace pressed.");
                self.editor.backspace(out);
            }
            Some(ControlKey::Home) => {
                debug!("Control+A pressed.");
                let count = self.editor.cursor();
                self.editor.move_cursor(Direction::Left, count, out);
            }
            Some(ControlKey::CursorLeft) => {
                debug!("Control+B pressed.");
                self.editor.move_cursor(Direction::Left, 1, out);
            }
            Some(ControlKey::DeleteAtCursor) => {
                debug!("Control+D pressed.");
                self.editor.delete_at_cursor(out);
            }
            Some(ControlKey::End) => {
                debug!("Control+E pressed.");
                let count = self.editor.len() - self.editor.cursor();
                self.editor.move_cursor(Direction::Right, count, out);
            }
            Some(ControlKey::CursorRight) => {
                debug!("Control+F pressed.");
                self.editor.move_cursor(Direction::Right, 1, out);
            }
            Some(ControlKey::KillToEnd) => {
                debug!("Control+K pressed.");
                self.editor.kill_to_end(out);
            }
            Some(ControlKey::HistoryNext) => {
                debug!("Control+N pressed.");
                self.show_next(out);
            }
            Some(ControlKey::HistoryPrevious) => {
                debug!("Control+P pressed.");
                self.show_previous(out);
            }
            Some(ControlKey::Escape) => {
                self.escape.begin();
            }
            None => {
                // Only printable chars make it into the buffer.
                if is_printable(byte) {
                    self.editor.insert_char(byte, out);
                }
            }
        }
        None
    }

    fn apply(&mut self, action: EscapeAction, out: &mut Vec<u8>) {
        match action {
            EscapeAction::CursorLeft => {
                debug!("Left arrow key pressed.");
                self.editor.move_cursor(Direction::Left, 1, out);
            }
            EscapeAction::CursorRight => {
                debug!("Right arrow key pressed.");
                self.editor.move_cursor(Direction::Right, 1, out);
            }
            EscapeAction::HistoryPrevious => {
                debug!("Up arrow key pressed.");
                self.show_previous(out);
            }
            EscapeAction::HistoryNext => {
                debug!("Down arrow key pressed.");
                self.show_next(out);
            }
            EscapeAction::Home => {
                debug!("Home key pressed.");
                let count = self.editor.cursor();
                self.editor.move_cursor(Direction::Left, count, out);
            }
            EscapeAction::End => {
                debug!("End key pressed.");
                let count = self.editor.len() - self.editor.cursor();
                self.editor.move_cursor(Direction::Right, count, out);
            }
            EscapeAction::DeleteAtCursor => {
                debug!("Delete key pressed.");
                self.editor.delete_at_cursor(out);
            }
        }
    }

    fn show_previous(&mut self, out: &mut Vec<u8>) {
        if let Some(entry) = self.history.previous(&self.editor.line()) {
            self.editor.load_line(&entry, out);
        }
    }

    fn show_next(&mut self, out: &mut Vec<u8>) {
        if let Some(entry) = self.history.next() {
            self.editor.load_line(&entry, out);
        }
    }

    /// Dispatch a submitted line, then reset buffer, browse position and
    /// partial stash. Returns the line when it goes to the interpreter.
    fn finish_line(&mut self, out: &mut Vec<u8>) -> Option<String> {
        let forwarded = if self.editor.is_empty() {
            None
        } else {
            let line = self.editor.line();
            debug!("cmd: {}", line);
            self.history.record(&line);
            let cmd = line.split_whitespace().next().unwrap_or("");
            if cmd.eq_ignore_ascii_case("history") {
                out.extend_from_slice(self.history.listing().as_bytes());
                None
            } else {
                Some(line)
            }
        };
        self.editor.reset();
        self.history.reset_browse();
        forwarded
    }
}

/// Run the console until a channel fails.
///
/// Single-threaded; the only suspension point is the readiness poll over
/// the terminal master and the interpreter's two channels. Channel bytes
/// are relayed to the terminal verbatim, with no attempt to redraw an
/// in-progress line they may interleave with.
pub fn serve(console: &mut Console, pty: &mut Pty, peer: &mut Interpreter) -> Result<()> {
    info!("Console is being served on {}.", pty.slave_path().display());

    let mut input = [0u8; TERMINAL_READ_CHUNK];
    let mut chunk = [0u8; CHANNEL_READ_CHUNK];

    loop {
        let (user_ready, cmd_ready, dbg_ready) = {
            let mut fds = [
                PollFd::new(pty.master.as_fd(), PollFlags::POLLIN),
                PollFd::new(peer.cmd_rx.as_fd(), PollFlags::POLLIN),
                PollFd::new(peer.dbg_rx.as_fd(), PollFlags::POLLIN),
            ];
            poll(&mut fds, PollTimeout::NONE).map_err(ConsoleError::Poll)?;
            (readable(&fds[0]), readable(&fds[1]), readable(&fds[2]))
        };

        if user_ready {
            debug!("Input from user");
            let n = pty.master.read(&mut input).map_err(ConsoleError::Terminal)?;
            if n == 0 {
                return Err(ConsoleError::ChannelClosed("terminal"));
            }
            let mut echo = Vec::new();
            for &byte in &input[..n] {
                // Handle each byte as it arrives.
                if let Some(line) = console.handle_byte(byte, &mut echo) {
                    peer.send_command(&line)?;
                }
            }
            pty.master.write_all(&echo).map_err(ConsoleError::Terminal)?;
        }

        if cmd_ready {
            relay(&mut peer.cmd_rx, &pty.master, &mut chunk, "command")?;
        }

        if dbg_ready {
            relay(&mut peer.dbg_rx, &pty.master, &mut chunk, "debug")?;
        }
    }
}

fn readable(fd: &PollFd) -> bool {
    // HUP and ERR are folded in so a closed pipe reaches the read path
    // and surfaces as a clean ChannelClosed instead of hanging.
    fd.revents().is_some_and(|r| {
        r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
    })
}

/// Copy one message from a channel straight to the user terminal.
fn relay<R: Read>(
    src: &mut R,
    mut terminal: &File,
    buf: &mut [u8],
    name: &'static str,
) -> Result<()> {
    let n = src.read(buf).map_err(|e| ConsoleError::Channel(name, e))?;
    if n == 0 {
        return Err(ConsoleError::ChannelClosed(name));
    }
    debug!("|{}|-> {} bytes", name, n);
    terminal
        .write_all(&buf[..n])
        .map_err(ConsoleError::Terminal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL_P: u8 = 0x10;
    const CTRL_N: u8 = 0x0e;
    const CR: u8 = 0x0d;

    fn feed(console: &mut Console, bytes: &[u8]) -> (Vec<u8>, Vec<String>) {
        let mut out = Vec::new();
        let mut sent = Vec::new();
        for &b in bytes {
            if let Some(line) = console.handle_byte(b, &mut out) {
                sent.push(line);
            }
        }
        (out, sent)
    }

    fn console() -> Console {
        Console::new("> ", 80)
    }

    #[test]
    fn test_typed_chars_echo_and_accumulate() {
        let mut console = console();
        let (out, sent) = feed(&mut console, b"help");
        assert_eq!(out, b"help");
        assert!(sent.is_empty());
        assert_eq!(console.editor().line(), "help");
    }

    #[test]
    fn test_submit_forwards_line() {
        let mut console = console();
        let (out, sent) = feed(&mut console, b"version\r");
        assert_eq!(sent, vec!["version".to_string()]);
        assert!(out.ends_with(b"\r\n> "));
        assert!(console.editor().is_empty());
        assert_eq!(console.history().entries(), &["version".to_string()]);
    }

    #[test]
    fn test_empty_submit_records_and_sends_nothing() {
        let mut console = console();
        let (out, sent) = feed(&mut console, &[CR]);
        assert!(sent.is_empty());
        assert!(console.history().is_empty());
        // The prompt still comes back.
        assert_eq!(out, b"\r\n> ");
    }

    #[test]
    fn test_history_command_is_local() {
        let mut console = console();
        let (_, sent) = feed(&mut console, b"help\r");
        assert_eq!(sent, vec!["help".to_string()]);

        let (out, sent) = feed(&mut console, b"history\r");
        assert!(sent.is_empty());
        // The listing includes the history command itself.
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(" 0 help\r\n"));
        assert!(text.contains(" 1 history\r\n"));
    }

    #[test]
    fn test_history_command_case_insensitive() {
        let mut console = console();
        let (_, sent) = feed(&mut console, b"HiStOrY\r");
        assert!(sent.is_empty());
    }

    #[test]
    fn test_history_token_with_arguments_stays_local() {
        let mut console = console();
        let (_, sent) = feed(&mut console, b"history full\r");
        assert!(sent.is_empty());
    }

    #[test]
    fn test_partial_command_restored_after_browsing() {
        let mut console = console();
        feed(&mut console, b"help\r");

        feed(&mut console, b"foo");
        let (_, sent) = feed(&mut console, &[CTRL_P]);
        assert!(sent.is_empty());
        assert_eq!(console.editor().line(), "help");

        feed(&mut console, &[CTRL_N]);
        assert_eq!(console.editor().line(), "foo");
        assert_eq!(console.editor().cursor(), 3);
        assert_eq!(console.history().partial(), "");
    }

    #[test]
    fn test_arrow_keys_edit_line() {
        let mut console = console();
        // Type "abc", two left arrows, insert "X".
        feed(&mut console, b"abc\x1b[D\x1b[D");
        feed(&mut console, b"X");
        assert_eq!(console.editor().line(), "aXbc");
        assert_eq!(console.editor().cursor(), 2);
    }

    #[test]
    fn test_delete_key() {
        let mut console = console();
        feed(&mut console, b"abc\x1b[D\x1b[D");
        feed(&mut console, b"\x1b[3~");
        assert_eq!(console.editor().line(), "ac");
        assert_eq!(console.editor().cursor(), 1);

        // At end of line the delete key does nothing.
        feed(&mut console, b"\x1b[8~\x1b[3~");
        assert_eq!(console.editor().line(), "ac");
    }

    #[test]
    fn test_home_and_end_keys() {
        let mut console = console();
        feed(&mut console, b"abcd\x1b[1~");
        assert_eq!(console.editor().cursor(), 0);
        feed(&mut console, b"\x1b[8~");
        assert_eq!(console.editor().cursor(), 4);
        // minicom-style Home.
        feed(&mut console, b"\x1b[7~");
        assert_eq!(console.editor().cursor(), 0);
    }

    #[test]
    fn test_full_line_still_accepts_controls() {
        let mut console = Console::new("> ", 4);
        let (_, sent) = feed(&mut console, b"abcdxyz");
        assert!(sent.is_empty());
        assert_eq!(console.editor().line(), "abcd");

        // Submit still works at the limit.
        let (_, sent) = feed(&mut console, &[CR]);
        assert_eq!(sent, vec!["abcd".to_string()]);

        // So does backspace.
        feed(&mut console, b"abcd");
        feed(&mut console, &[0x08]);
        assert_eq!(console.editor().line(), "abc");
    }

    #[test]
    fn test_unrecognized_control_bytes_ignored() {
        let mut console = console();
        feed(&mut console, b"ab");
        let (out, sent) = feed(&mut console, &[0x03, 0x07, 0x7f]);
        assert!(out.is_empty());
        assert!(sent.is_empty());
        assert_eq!(console.editor().line(), "ab");
    }

    #[test]
    fn test_bad_escape_sequence_leaves_editor_intact() {
        let mut console = console();
        feed(&mut console, b"ab\x1b[Z");
        feed(&mut console, b"c");
        assert_eq!(console.editor().line(), "abc");
    }

    #[test]
    fn test_submit_while_browsing_clears_stash() {
        let mut console = console();
        feed(&mut console, b"help\r");
        feed(&mut console, b"partial");
        feed(&mut console, &[CTRL_P]);
        assert_eq!(console.editor().line(), "help");

        // Submitting the recalled entry resets browse state and stash.
        let (_, sent) = feed(&mut console, &[CR]);
        assert_eq!(sent, vec!["help".to_string()]);
        assert_eq!(console.history().partial(), "");
        // Adjacent duplicate: still a single entry.
        assert_eq!(console.history().entries(), &["help".to_string()]);
    }

    #[test]
    fn test_cursor_invariant_over_mixed_input() {
        let mut console = console();
        let script: &[&[u8]] = &[
            b"hello",
            b"\x1b[D\x1b[D",
            b"XY",
            &[0x08],
            b"\x1b[1~",
            b"\x1b[3~",
            &[0x0b],
            b"\x1b[8~",
            b"tail",
        ];
        for bytes in script {
            feed(&mut console, bytes);
            assert!(console.editor().cursor() <= console.editor().len());
            assert!(console.editor().len() <= console.editor().limit());
        }
    }
}
