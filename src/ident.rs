use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;

/// Identifier used when the process was started without an argument 0.
pub const DEFAULT_IDENT: &str = "sampled";

/// Log source identifier: the basename of the invocation path.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct Ident(String);

impl Ident {
    /// Takes everything after the last `/` in `arg0`, or all of it when there is none.
    pub fn from_invocation<S: AsRef<OsStr>>(arg0: S) -> Ident {
        let bytes = arg0.as_ref().as_bytes();
        let name = match bytes.iter().rposition(|&b| b == b'/') {
            Some(pos) => &bytes[pos + 1..],
            None => bytes,
        };
        Ident(String::from_utf8_lossy(name).into_owned())
    }

    /// Derives the identifier from the first element of `args`, as in `std::env::args_os()`.
    pub fn from_args<I: IntoIterator<Item = OsString>>(args: I) -> Ident {
        match args.into_iter().next() {
            Some(arg0) => Ident::from_invocation(arg0),
            None => Ident(DEFAULT_IDENT.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
