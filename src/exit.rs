//! Process exit codes. Supervisors rely on these values, do not renumber them.

/// Parent after a successful fork, or clean shutdown on SIGTERM.
pub const OK: i32 = 0;
/// `fork(2)` failed.
pub const ERR_FORK: i32 = 3;
/// `setsid(2)` failed.
pub const ERR_SETSID: i32 = 4;
/// `chdir(2)` to the working directory failed.
pub const ERR_CHDIR: i32 = 5;
/// The time loop returned, which it never should.
pub const ERR_WTF: i32 = 187;
