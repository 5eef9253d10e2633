//! Escape sequence parser
//!
//! Classifies incoming console bytes that follow an ESC as parts of a
//! control sequence and turns completed sequences into editor actions.

use tracing::{debug, error};

/// Action produced by a completed escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeAction {
    /// Left arrow: move the cursor left one column.
    CursorLeft,
    /// Right arrow: move the cursor right one column.
    CursorRight,
    /// Up arrow: show the previous history entry.
    HistoryPrevious,
    /// Down arrow: show the next history entry.
    HistoryNext,
    /// Home key: move the cursor to the start of the line.
    Home,
    /// End key: move the cursor to the end of the line.
    End,
    /// Delete key: remove the character under the cursor.
    DeleteAtCursor,
}

/// Parser state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum EscState {
    /// Not inside an escape sequence.
    #[default]
    Idle,
    /// ESC seen, waiting for `[`.
    Start,
    /// CSI (`ESC [`) seen, waiting for the final byte.
    Bracket,
    /// `ESC [ 1` or `ESC [ 7` seen, waiting for `~` (Home).
    BracketHome,
    /// `ESC [ 3` seen, waiting for `~` (Delete).
    BracketDelete,
    /// `ESC [ 8` seen, waiting for `~` (End).
    BracketEnd,
}

/// Byte-at-a-time escape sequence parser.
///
/// The parser never blocks and always returns to the idle state after a
/// complete or invalid sequence. Bad sequences are logged and dropped.
#[derive(Debug, Default)]
pub struct EscapeParser {
    state: EscState,
}

impl EscapeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the parser is in the middle of a sequence.
    pub fn active(&self) -> bool {
        self.state != EscState::Idle
    }

    /// Begin a new sequence. Called when the console sees an ESC byte.
    pub fn begin(&mut self) {
        self.state = EscState::Start;
    }

    /// Feed the next byte of a sequence.
    ///
    /// Returns the action for a completed sequence, or `None` while the
    /// sequence is still in progress or was invalid.
    pub fn feed(&mut self, byte: u8) -> Option<EscapeAction> {
        match self.state {
            EscState::Idle => None,

            EscState::Start => {
                debug!("ESC_START");
                if byte == b'[' {
                    self.state = EscState::Bracket;
                    None
                } else {
                    self.bad_sequence(byte)
                }
            }

            EscState::Bracket => {
                debug!("ESC_BRACKET");
                match byte {
                    b'D' => self.done(EscapeAction::CursorLeft),
                    b'C' => self.done(EscapeAction::CursorRight),
                    b'A' => self.done(EscapeAction::HistoryPrevious),
                    b'B' => self.done(EscapeAction::HistoryNext),
                    // minicom sends 1 for Home where others send 7
                    b'1' | b'7' => {
                        self.state = EscState::BracketHome;
                        None
                    }
                    b'3' => {
                        self.state = EscState::BracketDelete;
                        None
                    }
                    b'8' => {
                        self.state = EscState::BracketEnd;
                        None
                    }
                    _ => self.bad_sequence(byte),
                }
            }

            EscState::BracketHome => {
                debug!("ESC_BRACKET_HOME");
                if byte == b'~' {
                    self.done(EscapeAction::Home)
                } else {
                    self.bad_sequence(byte)
                }
            }

            EscState::BracketDelete => {
                debug!("ESC_BRACKET_DELETE");
                if byte == b'~' {
                    self.done(EscapeAction::DeleteAtCursor)
                } else {
                    self.bad_sequence(byte)
                }
            }

            EscState::BracketEnd => {
                debug!("ESC_BRACKET_END");
                if byte == b'~' {
                    self.done(EscapeAction::End)
                } else {
                    self.bad_sequence(byte)
                }
            }
        }
    }

    fn done(&mut self, action: EscapeAction) -> Option<EscapeAction> {
        self.state = EscState::Idle;
        Some(action)
    }

    fn bad_sequence(&mut self, byte: u8) -> Option<EscapeAction> {
        error!(
            "Bad or unhandled escape sequence. got ^[{}({})",
            byte as char, byte
        );
        self.state = EscState::Idle;
        None
    }
}
