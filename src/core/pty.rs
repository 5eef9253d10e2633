//! PTY allocation
//!
//! Opens the pseudo-terminal pair the console is served on. The master
//! side is owned and driven exclusively by the event loop; the slave
//! side is kept open for the process lifetime and its device path is
//! what the user points a terminal program at.

use std::fs::File;
use std::os::fd::OwnedFd;
use std::path::PathBuf;

use nix::pty::openpty;
use nix::unistd::ttyname;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to open PTY pair: {0}")]
    Open(#[source] nix::Error),

    #[error("Failed to resolve slave PTY name: {0}")]
    Name(#[source] nix::Error),
}

pub type Result<T> = std::result::Result<T, PtyError>;

/// An open PTY pair.
pub struct Pty {
    /// Master side, read and written by the event loop.
    pub master: File,
    /// Path of the slave device, served to the user.
    slave_path: PathBuf,
    // Held open so the master does not see EOF before a user connects.
    _slave: OwnedFd,
}

impl Pty {
    /// Open a new PTY pair.
    pub fn open() -> Result<Self> {
        let pair = openpty(None, None).map_err(PtyError::Open)?;
        let slave_path = ttyname(&pair.slave).map_err(PtyError::Name)?;
        Ok(Self {
            master: File::from(pair.master),
            slave_path,
            _slave: pair.slave,
        })
    }

    /// Device path of the slave side.
    pub fn slave_path(&self) -> &PathBuf {
        &self.slave_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_pty() {
        let pty = Pty::open().expect("openpty failed");
        assert!(pty.slave_path().exists());
    }

    #[test]
    fn test_master_is_writable() {
        let mut pty = Pty::open().expect("openpty failed");
        pty.master.write_all(b"hello").expect("write to master");
    }
}
