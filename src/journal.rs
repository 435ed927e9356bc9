//! Log sinks.
//!
//! Every record the daemon produces goes through a [`Journal`]. The binary writes to
//! the host syslog; tests inject a [`Recorder`] instead.

use std::io::Write;
use std::path::Path;

use syslog::{Facility, Formatter3164, Logger, LoggerBackend};

use crate::ident::Ident;

/// Severity of a journal record.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum Severity {
    Error,
    Info,
}

/// Destination for the daemon's records.
pub trait Journal {
    fn info(&mut self, message: &str);

    fn error(&mut self, message: &str);

    /// Release the underlying connection. Records written afterwards may be dropped.
    fn close(&mut self) {}
}

impl<J: Journal + ?Sized> Journal for &mut J {
    fn info(&mut self, message: &str) {
        (**self).info(message)
    }

    fn error(&mut self, message: &str) {
        (**self).error(message)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Host syslog, facility `daemon`, tagged with the identifier and the current pid.
///
/// The socket is connected on `open`. When no syslog socket is available, or a write
/// fails, records are discarded, the same way `syslog(3)` behaves. Every record is
/// flushed as it is written: on a stream socket nothing may sit in a buffer that the
/// forked child inherits or that `process::exit` throws away.
pub struct Syslog {
    logger: Option<Logger<LoggerBackend, Formatter3164>>,
}

impl Syslog {
    /// Connects to the host's default syslog socket.
    pub fn open(ident: &Ident) -> Syslog {
        Syslog {
            logger: syslog::unix(formatter(ident)).ok(),
        }
    }

    /// Connects to the syslog socket at `path`, datagram or stream.
    pub fn connect<P: AsRef<Path>>(ident: &Ident, path: P) -> Syslog {
        Syslog {
            logger: syslog::unix_custom(formatter(ident), path.as_ref()).ok(),
        }
    }

    fn logger(&mut self) -> Option<&mut Logger<LoggerBackend, Formatter3164>> {
        let logger = self.logger.as_mut()?;
        // The connection is inherited across fork, the pid is not.
        logger.formatter.pid = std::process::id();
        Some(logger)
    }
}

fn formatter(ident: &Ident) -> Formatter3164 {
    Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: ident.as_str().to_owned(),
        pid: std::process::id(),
    }
}

impl Journal for Syslog {
    fn info(&mut self, message: &str) {
        if let Some(logger) = self.logger() {
            logger.info(message).ok();
            logger.backend.flush().ok();
        }
    }

    fn error(&mut self, message: &str) {
        if let Some(logger) = self.logger() {
            logger.err(message).ok();
            logger.backend.flush().ok();
        }
    }

    fn close(&mut self) {
        if let Some(mut logger) = self.logger.take() {
            logger.backend.flush().ok();
        }
    }
}

/// In-memory journal.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    entries: Vec<(Severity, String)>,
    closed: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(Severity, String)] {
        &self.entries
    }

    /// Messages only, in the order they were written.
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, m)| m.as_str()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Journal for Recorder {
    fn info(&mut self, message: &str) {
        self.entries.push((Severity::Info, message.to_owned()));
    }

    fn error(&mut self, message: &str) {
        self.entries.push((Severity::Error, message.to_owned()));
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::{UnixDatagram, UnixListener, UnixStream};
    use std::time::Duration;
    use tempfile::TempDir;

    const READ_TIMEOUT: Duration = Duration::from_millis(200);

    fn ident() -> Ident {
        Ident::from_invocation("/usr/local/bin/sampled")
    }

    fn recv_all(socket: &UnixDatagram) -> String {
        socket.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        while let Ok(n) = socket.recv(&mut buf) {
            data.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn read_all(stream: &mut UnixStream) -> String {
        stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        while let Ok(n) = stream.read(&mut buf) {
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    #[test]
    fn syslog_over_datagram_socket() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("log");
        let server = UnixDatagram::bind(&path).unwrap();

        let mut journal = Syslog::connect(&ident(), &path);
        journal.info("Starting sampled");
        let record = recv_all(&server);
        assert!(record.starts_with("<30>"), "{:?}", record);
        assert!(
            record.contains(&format!("sampled[{}]: Starting sampled", std::process::id())),
            "{:?}",
            record
        );

        journal.error("An error occurred. The error is: Permission denied");
        let record = recv_all(&server);
        assert!(record.starts_with("<27>"), "{:?}", record);
        assert!(record.contains("An error occurred. The error is: Permission denied"));
    }

    #[test]
    fn syslog_over_stream_socket_is_flushed_per_record() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("log");
        let listener = UnixListener::bind(&path).unwrap();

        let mut journal = Syslog::connect(&ident(), &path);
        let (mut peer, _) = listener.accept().unwrap();

        journal.info("Starting sampled");
        let record = read_all(&mut peer);
        assert!(record.starts_with("<30>"), "{:?}", record);
        assert!(record.contains(&format!("sampled[{}]: Starting sampled", std::process::id())));

        journal.error("An error occurred. The error is: No such file or directory");
        // Leaked like `process::exit` would: the record must already be out.
        std::mem::forget(journal);
        let record = read_all(&mut peer);
        assert!(record.starts_with("<27>"), "{:?}", record);
        assert!(record.contains("No such file or directory"));
    }

    #[test]
    fn syslog_reports_current_pid() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("log");
        let server = UnixDatagram::bind(&path).unwrap();

        let mut journal = Syslog::connect(&ident(), &path);
        // As if the connection had been opened by a parent before fork.
        journal.logger.as_mut().unwrap().formatter.pid = 1;
        journal.info("Current system time is: Tue Jul  4 12:00:00 2023\n");

        let record = recv_all(&server);
        assert!(record.contains(&format!("sampled[{}]: ", std::process::id())), "{:?}", record);
        assert!(!record.contains("sampled[1]"));
    }

    #[test]
    fn syslog_without_socket_discards() {
        let tmpdir = TempDir::new().unwrap();
        let mut journal = Syslog::connect(&ident(), tmpdir.path().join("missing"));
        assert!(journal.logger.is_none());
        journal.info("Starting sampled");
        journal.close();
    }

    #[test]
    fn syslog_close_drops_connection() {
        let tmpdir = TempDir::new().unwrap();
        let path = tmpdir.path().join("log");
        let server = UnixDatagram::bind(&path).unwrap();

        let mut journal = Syslog::connect(&ident(), &path);
        journal.info("received SIGTERM - exiting.");
        journal.close();
        assert!(journal.logger.is_none());
        journal.info("after close");

        let record = recv_all(&server);
        assert!(record.contains("received SIGTERM - exiting."));
        assert!(!record.contains("after close"));
    }

    #[test]
    fn recorder_keeps_order_and_severity() {
        let mut journal = Recorder::new();
        journal.info("Starting sampled");
        journal.error("An error occurred. The error is: Permission denied");
        assert_eq!(
            journal.entries(),
            &[
                (Severity::Info, "Starting sampled".to_owned()),
                (
                    Severity::Error,
                    "An error occurred. The error is: Permission denied".to_owned()
                ),
            ]
        );
        assert!(!journal.is_closed());
        journal.close();
        assert!(journal.is_closed());
    }

    #[test]
    fn forwards_through_mutable_reference() {
        fn write<J: Journal>(mut journal: J) {
            journal.info("via reference");
            journal.close();
        }

        let mut journal = Recorder::new();
        write(&mut journal);
        assert_eq!(journal.messages(), vec!["via reference"]);
        assert!(journal.is_closed());
    }
}
