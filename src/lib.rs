// Copyright (c) 2016 Fedor Gogolev <knsd@knsd.net>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//!
//! sampled is a small system daemon: it detaches from the terminal and writes the current
//! system time to syslog once per second until it receives `SIGTERM`.
//!
//! The pieces are usable on their own. [`Daemonize`] performs the detachment,
//! [`TimeLogger`] is the periodic loop, [`Journal`] is the log sink it writes to.
//!
//! Usage example:
//!
//! ```no_run
//! use sampled::journal::Syslog;
//! use sampled::{run, Daemonize, Ident};
//!
//! fn main() {
//!     let ident = Ident::from_args(std::env::args_os());
//!     let mut journal = Syslog::open(&ident);
//!
//!     let daemonize = Daemonize::new()
//!         .working_directory("/") // Every method except `new` and `start`
//!         .umask(0o133)           // is optional, see `Daemonize` documentation
//!         .foreground(false);     // for default behaviour.
//!
//!     std::process::exit(run(&ident, daemonize, &mut journal));
//! }
//! ```

mod error;
pub mod exit;
pub mod ffi;

pub mod clock;
pub mod ident;
pub mod journal;
pub mod signal;
pub mod ticker;

mod service;

use std::env::set_current_dir;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub use libc::mode_t;
use libc::{close, dup2, fork, open, setsid, umask};

pub use self::error::{report, Errno, Error, ErrorKind, ERROR_PREFIX};
pub use self::ident::Ident;
pub use self::journal::Journal;
pub use self::service::run;
pub use self::ticker::{TimeLogger, LOG_INTERVAL};

macro_rules! tryret {
    ($expr:expr, $ret:expr, $err:expr) => {
        if $expr == -1 {
            return Err($err(errno()));
        } else {
            #[allow(clippy::unused_unit)]
            {
                $ret
            }
        }
    };
}

/// Default file-creation mask: new files are `rw-r--r--`, never executable.
pub const DEFAULT_UMASK: mode_t = 0o133;

/// Which side of the fork returned from [`Daemonize::start`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
    /// The original process. Its job is done, it should exit with [`exit::OK`].
    Parent(libc::pid_t),
    /// The detached process (or the original one in foreground mode), ready to work.
    Daemon,
}

/// Daemonization options.
///
/// Fork the process in the background and let the parent return, start a new session
/// in the child, replace the inherited standard streams with `/dev/null`, change umask
/// value to `0o133` and change working directory to `/` or provided value.
///
/// In foreground mode, for use under a service manager that already detaches the
/// process, only umask and working directory are changed.
pub struct Daemonize {
    directory: PathBuf,
    umask: mode_t,
    foreground: bool,
}

impl fmt::Debug for Daemonize {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Daemonize")
            .field("directory", &self.directory)
            .field("umask", &format_args!("{:#o}", self.umask))
            .field("foreground", &self.foreground)
            .finish()
    }
}

impl Default for Daemonize {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemonize {
    pub fn new() -> Self {
        Daemonize {
            directory: Path::new("/").to_owned(),
            umask: DEFAULT_UMASK,
            foreground: false,
        }
    }

    /// Change working directory to `path` or `/` by default.
    pub fn working_directory<F: AsRef<Path>>(mut self, path: F) -> Self {
        self.directory = path.as_ref().to_owned();
        self
    }

    /// Change umask to `mask` or `0o133` by default.
    pub fn umask(mut self, mask: mode_t) -> Self {
        self.umask = mask;
        self
    }

    /// Stay attached: no fork, no new session, standard streams untouched.
    pub fn foreground(mut self, foreground: bool) -> Self {
        self.foreground = foreground;
        self
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    /// Start daemonization process.
    ///
    /// Returns `Outcome::Parent` in the original process and `Outcome::Daemon` in the
    /// child. Errors after the fork are only ever seen by the child.
    pub fn start(self) -> Result<Outcome, Error> {
        unsafe {
            if !self.foreground {
                if let Fork::Parent(child) = perform_fork()? {
                    return Ok(Outcome::Parent(child));
                }
                set_sid()?;
                detach_standard_streams();
            }

            umask(self.umask);
        }

        set_current_dir(&self.directory).map_err(|e| ErrorKind::ChangeDirectory(os_errno(&e)))?;

        Ok(Outcome::Daemon)
    }
}

enum Fork {
    Parent(libc::pid_t),
    Child,
}

unsafe fn perform_fork() -> Result<Fork, ErrorKind> {
    let pid = fork();
    if pid < 0 {
        Err(ErrorKind::Fork(errno()))
    } else if pid == 0 {
        Ok(Fork::Child)
    } else {
        Ok(Fork::Parent(pid))
    }
}

unsafe fn set_sid() -> Result<(), ErrorKind> {
    tryret!(setsid(), Ok(()), ErrorKind::DetachSession)
}

/// Descriptors 0-2 end up on `/dev/null` so nothing opened later can take their
/// numbers. Without `/dev/null` they are just closed.
unsafe fn detach_standard_streams() {
    let streams = [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO];

    let devnull_fd = open(b"/dev/null\0" as *const [u8; 10] as _, libc::O_RDWR);
    if devnull_fd == -1 {
        for &fd in &streams {
            close(fd);
        }
        return;
    }

    for &fd in &streams {
        if dup2(devnull_fd, fd) == -1 {
            close(fd);
        }
    }

    if !streams.contains(&devnull_fd) {
        close(devnull_fd);
    }
}

fn os_errno(err: &io::Error) -> Errno {
    err.raw_os_error().unwrap_or(libc::EINVAL)
}

fn errno() -> Errno {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}
