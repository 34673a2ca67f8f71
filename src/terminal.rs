//! Foreground terminal control
//!
//! When reading from an interactive terminal fails, the usual cause is that
//! the shell lost the foreground process group to a job. The scanner asks a
//! [`Foreground`] collaborator to take the terminal back and retries once.

/// Something able to hand the controlling terminal back to this process group
pub trait Foreground {
    /// Make this process group the terminal's foreground group.
    ///
    /// Returns true only when control actually changed hands, so a retry of
    /// the failed read is worthwhile.
    fn reclaim(&mut self) -> bool;
}

#[cfg(unix)]
pub use self::unix::ControllingTerminal;

#[cfg(unix)]
mod unix {
    use std::io;
    use std::os::unix::io::{AsRawFd, RawFd};

    use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};

    use super::Foreground;

    /// The terminal attached to a file descriptor, normally stdin
    #[derive(Debug)]
    pub struct ControllingTerminal {
        fd: RawFd,
    }

    impl ControllingTerminal {
        /// The terminal on stdin, or `None` when stdin is not a terminal
        pub fn stdin() -> Option<Self> {
            Self::from_fd(io::stdin().as_raw_fd())
        }

        pub fn from_fd(fd: RawFd) -> Option<Self> {
            if unsafe { libc::isatty(fd) } == 1 {
                Some(ControllingTerminal { fd })
            } else {
                None
            }
        }
    }

    impl Foreground for ControllingTerminal {
        fn reclaim(&mut self) -> bool {
            let ours = unsafe { libc::getpgrp() };
            let current = unsafe { libc::tcgetpgrp(self.fd) };
            if current < 0 || current == ours {
                return false;
            }

            // tcsetpgrp from a background group raises SIGTTOU.
            let mut block = SigSet::empty();
            block.add(Signal::SIGTTOU);
            let mut previous = SigSet::empty();
            if let Err(e) = sigprocmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut previous)) {
                log::warn!("cannot block SIGTTOU: {}", e);
                return false;
            }

            let changed = unsafe { libc::tcsetpgrp(self.fd, ours) } == 0;
            let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&previous), None);

            log::debug!(
                "foreground group {} -> {}: {}",
                current,
                ours,
                if changed { "reclaimed" } else { "refused" }
            );
            changed
        }
    }
}
