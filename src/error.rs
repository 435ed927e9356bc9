use crate::exit;
use crate::ffi::strerror;

pub type Errno = libc::c_int;

/// Fixed prefix of every error record written to the journal.
pub const ERROR_PREFIX: &str = "An error occurred. The error is: ";

/// This error type for `Daemonize` `start` method.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct Error {
    kind: ErrorKind,
}

/// This error type for `Daemonize` `start` method.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum ErrorKind {
    /// Unable to fork
    Fork(Errno),
    /// Unable to create new session
    DetachSession(Errno),
    /// Unable to change directory
    ChangeDirectory(Errno),
}

impl ErrorKind {
    fn description(&self) -> &str {
        match self {
            ErrorKind::Fork(_) => "unable to fork",
            ErrorKind::DetachSession(_) => "unable to create new session",
            ErrorKind::ChangeDirectory(_) => "unable to change directory",
        }
    }

    fn errno(&self) -> Errno {
        match self {
            ErrorKind::Fork(errno) => *errno,
            ErrorKind::DetachSession(errno) => *errno,
            ErrorKind::ChangeDirectory(errno) => *errno,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Fork(_) => exit::ERR_FORK,
            ErrorKind::DetachSession(_) => exit::ERR_SETSID,
            ErrorKind::ChangeDirectory(_) => exit::ERR_CHDIR,
        }
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// OS error number reported by the failed call.
    pub fn errno(&self) -> Errno {
        self.kind.errno()
    }

    /// Process exit code a supervisor sees when startup fails this way.
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Journal record for this failure, in the fixed error format.
    pub fn report(&self) -> String {
        report(self.errno())
    }
}

/// Renders `errno` in the fixed error format, using the C library's message text.
pub fn report(errno: Errno) -> String {
    format!("{}{}", ERROR_PREFIX, strerror(errno))
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, errno {}", self.description(), self.errno())
    }
}

impl std::error::Error for ErrorKind {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}
