use crate::clock::SystemClock;
use crate::error::report;
use crate::exit;
use crate::ident::Ident;
use crate::journal::Journal;
use crate::signal::{SignalPipe, Sleeper};
use crate::ticker::{Halt, TimeLogger};
use crate::{Daemonize, Outcome};

/// Runs the daemon and returns the code the process should exit with.
///
/// Logs the startup record, detaches according to `daemonize`, installs the SIGHUP and
/// SIGTERM handlers and hands over to the time loop. In the original process this
/// returns [`exit::OK`] right after the fork; in the daemon it returns only once
/// SIGTERM has been handled.
pub fn run<J: Journal>(ident: &Ident, daemonize: Daemonize, journal: &mut J) -> i32 {
    journal.info(&format!("Starting {}", ident));

    match daemonize.start() {
        Ok(Outcome::Parent(_)) => return exit::OK,
        Ok(Outcome::Daemon) => {}
        Err(err) => {
            journal.error(&err.report());
            return err.exit_code();
        }
    }

    let mut logger = TimeLogger::new(SystemClock);
    let halt = match SignalPipe::install() {
        Ok(mut pipe) => logger.run(journal, &mut pipe),
        Err(err) => {
            // Default dispositions stay in place: SIGTERM still ends the process.
            journal.error(&report(err.raw_os_error().unwrap_or(0)));
            logger.run(journal, &mut Sleeper)
        }
    };

    shutdown(halt, journal)
}

/// Closes the journal after a clean stop; a lost loop exits with [`exit::ERR_WTF`].
fn shutdown<J: Journal>(halt: Halt, journal: &mut J) -> i32 {
    match halt {
        Halt::Terminated => {
            journal.close();
            exit::OK
        }
        Halt::Lost => exit::ERR_WTF,
    }
}
