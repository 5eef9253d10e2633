//! Core console functionality
//!
//! This module contains the console pipeline and its collaborators:
//! - `pty`: pseudo-terminal pair the console is served on
//! - `peer`: interpreter child process and its channels
//! - `escape`: escape sequence state machine
//! - `editor`: in-place line editor
//! - `history`: command history and partial-command stash
//! - `console`: control-key dispatch and the event loop

pub mod console;
pub mod editor;
pub mod escape;
pub mod history;
pub mod peer;
pub mod pty;

pub use console::{serve, Console};
pub use peer::Interpreter;
pub use pty::Pty;
