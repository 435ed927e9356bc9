extern crate libc;
extern crate sampled;

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use sampled::{run, Daemonize, Ident, Journal};

const ARG_JOURNAL: &str = "--journal";
const ARG_FOREGROUND: &str = "--foreground";
const ARG_WORKING_DIRECTORY: &str = "--working-directory";

pub const MAX_WAIT_DURATION: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One line of the tester's journal file: `<pid> <severity> <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub pid: u32,
    pub severity: String,
    pub message: String,
}

impl Entry {
    fn parse(line: &str) -> Option<Entry> {
        let mut parts = line.splitn(3, ' ');
        let pid = parts.next()?.parse().ok()?;
        let severity = parts.next()?.to_owned();
        let message = parts.next()?.to_owned();
        Some(Entry {
            pid,
            severity,
            message,
        })
    }

    pub fn is_time_record(&self) -> bool {
        self.message.starts_with("Current system time is: ")
    }
}

/// Journal writing one line per record to a file, tagged with the writer's pid.
pub struct FileJournal {
    file: Option<File>,
}

impl FileJournal {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<FileJournal> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(FileJournal { file: Some(file) })
    }

    fn write(&mut self, severity: &str, message: &str) {
        if let Some(file) = self.file.as_mut() {
            let line = format!(
                "{} {} {}\n",
                std::process::id(),
                severity,
                message.trim_end_matches('\n')
            );
            file.write_all(line.as_bytes()).ok();
        }
    }
}

impl Journal for FileJournal {
    fn info(&mut self, message: &str) {
        self.write("info", message)
    }

    fn error(&mut self, message: &str) {
        self.write("error", message)
    }

    fn close(&mut self) {
        self.file = None;
    }
}

pub struct Tester {
    command: Command,
    journal: Option<PathBuf>,
}

impl Tester {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let mut command = Command::new(program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Self {
            command,
            journal: None,
        }
    }

    pub fn journal<F: AsRef<Path>>(&mut self, path: F) -> &mut Self {
        self.journal = Some(path.as_ref().to_owned());
        self.command.arg(ARG_JOURNAL).arg(path.as_ref());
        self
    }

    /// Argument 0 the tester sees, the source of its log identifier.
    pub fn invoked_as<S: AsRef<OsStr>>(&mut self, arg0: S) -> &mut Self {
        self.command.arg0(arg0);
        self
    }

    pub fn foreground(&mut self) -> &mut Self {
        self.command.arg(ARG_FOREGROUND);
        self
    }

    pub fn working_directory<F: AsRef<Path>>(&mut self, path: F) -> &mut Self {
        self.command.arg(ARG_WORKING_DIRECTORY).arg(path.as_ref());
        self
    }

    pub fn spawn(&mut self) -> Running {
        let journal = self.journal.clone().expect("journal path is required");
        let child = self.command.spawn().expect("unable to spawn tester");
        Running { child, journal }
    }
}

pub struct Running {
    child: Child,
    journal: PathBuf,
}

impl Running {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn is_running(&mut self) -> bool {
        self.child
            .try_wait()
            .expect("unable to wait for tester")
            .is_none()
    }

    pub fn signal(&self, signal: libc::c_int) {
        send_signal(self.pid(), signal)
    }

    pub fn wait(&mut self) -> ExitStatus {
        let st = Instant::now();
        loop {
            if st.elapsed() > MAX_WAIT_DURATION {
                self.child.kill().ok();
                panic!("wait for exit timeout")
            }
            match self.child.try_wait().expect("unable to wait for tester") {
                Some(status) => return status,
                None => std::thread::sleep(POLL_INTERVAL),
            }
        }
    }

    pub fn entries(&self) -> Vec<Entry> {
        read_entries(&self.journal)
    }

    /// Polls the journal until `predicate` holds for its entries.
    pub fn wait_for<F: Fn(&[Entry]) -> bool>(&self, predicate: F) -> Vec<Entry> {
        let st = Instant::now();
        loop {
            let entries = self.entries();
            if predicate(&entries) {
                return entries;
            }
            if st.elapsed() > MAX_WAIT_DURATION {
                panic!("journal never matched, got: {:#?}", entries)
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if self.is_running() {
            self.child.kill().ok();
            self.child.wait().ok();
        }
    }
}

pub fn send_signal(pid: u32, signal: libc::c_int) {
    let ret = unsafe { libc::kill(pid as libc::pid_t, signal) };
    assert_eq!(ret, 0, "unable to signal {}", pid);
}

pub fn read_entries<P: AsRef<Path>>(path: P) -> Vec<Entry> {
    match std::fs::read_to_string(path) {
        Ok(data) => data.lines().filter_map(Entry::parse).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn execute_tester() {
    let ident = Ident::from_args(std::env::args_os());
    let mut daemonize = Daemonize::new();
    let mut journal_path = None;
    let mut args = std::env::args().skip(1);

    fn read_value(args: &mut dyn Iterator<Item = String>, key: &str) -> String {
        args.next()
            .unwrap_or_else(|| panic!("missing value for key {}", key))
    }

    while let Some(key) = args.next() {
        daemonize = match key.as_str() {
            ARG_JOURNAL => {
                journal_path = Some(PathBuf::from(read_value(&mut args, &key)));
                daemonize
            }
            ARG_FOREGROUND => daemonize.foreground(true),
            ARG_WORKING_DIRECTORY => daemonize.working_directory(read_value(&mut args, &key)),
            key => {
                panic!("unknown key: {}", key)
            }
        }
    }

    let path = journal_path.expect("missing --journal");
    let mut journal = FileJournal::open(&path).expect("unable to open journal file");

    std::process::exit(run(&ident, daemonize, &mut journal));
}
