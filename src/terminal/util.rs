//! Terminal utilities

use crate::Result;
use log::debug;
use nix::libc;
use std::io;
use std::os::unix::io::RawFd;

/// Whether `fd` refers to a terminal
pub fn is_tty(fd: RawFd) -> bool {
    unsafe { libc::isatty(fd) == 1 }
}

/// Set raw mode on a terminal file descriptor
///
/// Keys are read one at a time without echo, and Ctrl-C arrives as a byte
/// instead of a signal. Returns the previous attributes.
pub fn set_raw_mode(fd: RawFd) -> Result<libc::termios> {
    let original_termios = unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(io::Error::last_os_error().into());
        }
        termios
    };

    let mut raw_termios = original_termios;

    unsafe {
        libc::cfmakeraw(&mut raw_termios);
        // Keep output post-processing so "\n" still returns the carriage
        raw_termios.c_oflag |= libc::OPOST;
        if libc::tcsetattr(fd, libc::TCSANOW, &raw_termios) != 0 {
            return Err(io::Error::last_os_error().into());
        }
    }

    Ok(original_termios)
}

/// Restore terminal attributes
pub fn restore_termios(fd: RawFd, termios: &libc::termios) {
    unsafe {
        libc::tcsetattr(fd, libc::TCSANOW, termios);
    }
}

/// RAII guard that puts a terminal in raw mode and restores it on drop
///
/// Restores the terminal even when the player exits through an error.
pub struct TermiosGuard {
    fd: RawFd,
    termios: libc::termios,
}

impl TermiosGuard {
    pub fn new(fd: RawFd) -> Result<Self> {
        let termios = set_raw_mode(fd)?;
        Ok(Self { fd, termios })
    }
}

impl Drop for TermiosGuard {
    fn drop(&mut self) {
        restore_termios(self.fd, &self.termios);
        debug!("Terminal attributes restored");
    }
}
