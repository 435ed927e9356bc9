//! Signal handling.
//!
//! OS handlers do nothing but write a byte into the socket pair of their signal. The
//! time loop polls those pairs between ticks and hands the signal to
//! [`Lifecycle::on_signal`], so all logging and the exit decision happen on the main flow.

use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::{Duration, Instant};

use libc::c_int;
use signal_hook::consts::{SIGHUP, SIGTERM};
use signal_hook::low_level;
use signal_hook::SigId;

use crate::journal::Journal;

pub const SIGTERM_MESSAGE: &str = "received SIGTERM - exiting.";
pub const UNHANDLED_MESSAGE: &str = "received unhandled signal.";

/// Signals the daemon installs handlers for.
pub const HANDLED: [c_int; 2] = [SIGHUP, SIGTERM];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    Running,
    Stopping,
}

/// Two-state lifecycle driven by delivered signals.
#[derive(Debug)]
pub struct Lifecycle {
    state: State,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            state: State::Running,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// SIGHUP is accepted and ignored, SIGTERM requests shutdown, anything else is
    /// logged and otherwise ignored.
    pub fn on_signal<J: Journal>(&mut self, signal: c_int, journal: &mut J) -> State {
        match signal {
            SIGHUP => {}
            SIGTERM => {
                journal.info(SIGTERM_MESSAGE);
                self.state = State::Stopping;
            }
            _ => journal.info(UNHANDLED_MESSAGE),
        }
        self.state
    }
}

/// Why a [`Wait::wait`] call returned.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Wake {
    /// The timeout ran out.
    Elapsed,
    /// A signal was delivered.
    Signal(c_int),
    /// The wake-up source is gone; no further signals can be observed.
    Closed,
}

/// Blocks until a timeout elapses or a signal arrives, whichever is first.
pub trait Wait {
    fn wait(&mut self, timeout: Duration) -> Wake;
}

/// Timer-only waiter, used when handlers could not be installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sleeper;

impl Wait for Sleeper {
    fn wait(&mut self, timeout: Duration) -> Wake {
        thread::sleep(timeout);
        Wake::Elapsed
    }
}

/// Self-pipes fed by real signal handlers, one socket pair per signal.
///
/// Handlers are unregistered when the pipe is dropped; the process keeps a no-op
/// disposition for those signals afterwards.
pub struct SignalPipe {
    ids: Vec<SigId>,
    readers: Vec<(c_int, UnixStream)>,
}

impl SignalPipe {
    /// Installs handlers for SIGHUP and SIGTERM.
    pub fn install() -> io::Result<SignalPipe> {
        Self::with_signals(&HANDLED)
    }

    pub fn with_signals(signals: &[c_int]) -> io::Result<SignalPipe> {
        let mut pipe = SignalPipe {
            ids: Vec::with_capacity(signals.len()),
            readers: Vec::with_capacity(signals.len()),
        };
        for &signal in signals {
            let (read, write) = UnixStream::pair()?;
            read.set_nonblocking(true)?;
            write.set_nonblocking(true)?;
            pipe.ids.push(low_level::pipe::register(signal, write)?);
            pipe.readers.push((signal, read));
        }
        Ok(pipe)
    }

    /// First signal with a pending byte, without blocking.
    fn pending(&mut self) -> Option<Wake> {
        let mut buf = [0u8; 1];
        for (signal, read) in self.readers.iter_mut() {
            match read.read(&mut buf) {
                Ok(0) => return Some(Wake::Closed),
                Ok(_) => return Some(Wake::Signal(*signal)),
                Err(e) => match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {}
                    _ => return Some(Wake::Closed),
                },
            }
        }
        None
    }
}

/// Rounds up, so a sub-millisecond remainder still sleeps instead of spinning.
fn poll_timeout(remaining: Duration) -> c_int {
    let ms = (remaining.as_micros() + 999) / 1000;
    ms.min(c_int::MAX as u128) as c_int
}

impl Wait for SignalPipe {
    fn wait(&mut self, timeout: Duration) -> Wake {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(wake) = self.pending() {
                return wake;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining == Duration::from_secs(0) {
                return Wake::Elapsed;
            }

            let mut fds: Vec<libc::pollfd> = self
                .readers
                .iter()
                .map(|(_, read)| libc::pollfd {
                    fd: read.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                })
                .collect();
            let ret = unsafe {
                libc::poll(
                    fds.as_mut_ptr(),
                    fds.len() as libc::nfds_t,
                    poll_timeout(remaining),
                )
            };
            if ret == -1 && io::Error::last_os_error().kind() != io::ErrorKind::Interrupted {
                return Wake::Closed;
            }
        }
    }
}

impl Drop for SignalPipe {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            low_level::unregister(id);
        }
    }
}
