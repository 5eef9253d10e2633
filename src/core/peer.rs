//! Interpreter peer process
//!
//! Spawns the command interpreter as a child process and exposes its
//! three channel endpoints: stdin and stdout form the bidirectional
//! command channel, stderr is the receive-only debug channel. The
//! console treats everything on the wire as opaque line-oriented text;
//! the interpreter owns its own format.

use std::io::{self, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Failed to spawn interpreter '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to send command to interpreter: {0}")]
    Send(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, PeerError>;

/// A running interpreter child and its channels.
#[derive(Debug)]
pub struct Interpreter {
    child: Child,
    cmd_tx: ChildStdin,
    /// Command channel, receive side.
    pub cmd_rx: ChildStdout,
    /// Debug channel, receive side.
    pub dbg_rx: ChildStderr,
}

impl Interpreter {
    /// Spawn the interpreter with all three channels piped.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PeerError::Spawn {
                command: program.to_string(),
                source,
            })?;

        info!("interpreter '{}' started (pid {})", program, child.id());

        // The pipes are always present with Stdio::piped.
        let cmd_tx = child.stdin.take().ok_or_else(|| PeerError::Spawn {
            command: program.to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "no stdin pipe"),
        })?;
        let cmd_rx = child.stdout.take().ok_or_else(|| PeerError::Spawn {
            command: program.to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "no stdout pipe"),
        })?;
        let dbg_rx = child.stderr.take().ok_or_else(|| PeerError::Spawn {
            command: program.to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "no stderr pipe"),
        })?;

        Ok(Self {
            child,
            cmd_tx,
            cmd_rx,
            dbg_rx,
        })
    }

    /// Forward one submitted line on the command channel, newline
    /// framed.
    pub fn send_command(&mut self, line: &str) -> Result<()> {
        debug!("Sending command to interpreter.");
        self.cmd_tx
            .write_all(line.as_bytes())
            .and_then(|_| self.cmd_tx.write_all(b"\n"))
            .and_then(|_| self.cmd_tx.flush())
            .map_err(PeerError::Send)
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // The interpreter has no life of its own without the console.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_spawn_failure() {
        let err = Interpreter::spawn("/nonexistent/interpreter", &[]).unwrap_err();
        assert!(matches!(err, PeerError::Spawn { .. }));
    }

    #[test]
    fn test_command_channel_round_trip() {
        // cat echoes the command channel back verbatim.
        let mut peer = Interpreter::spawn("cat", &[]).expect("spawn cat");
        peer.send_command("version").expect("send");

        let mut buf = [0u8; 64];
        let n = peer.cmd_rx.read(&mut buf).expect("read response");
        assert_eq!(&buf[..n], b"version\n");
    }
}
