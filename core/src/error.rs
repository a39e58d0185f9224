//! Error kinds surfaced by the engine's fallible operations.
//!
//! The reply path itself never errors: an empty or untrained model yields
//! one of the two user-visible fallback strings instead (see
//! `reply::generate_reply`).

use std::fmt;
use std::io;

/// Errors surfaced by `learn`, model construction, and brain-file I/O.
#[derive(Debug)]
pub enum Error {
    /// File open/read/write failure during `load` or `save`.
    Io(io::Error),
    /// Bad magic cookie, truncated record, oversized word, or an `order`
    /// outside `1..=15`.
    Format(String),
    /// The caller-supplied allocator reported failure.
    ///
    /// No safe-Rust code path constructs this in production: there is no
    /// injectable raw allocator in this crate. Kept for API parity with the
    /// other error kinds; only `#[cfg(test)]` code exercises it.
    Alloc,
    /// Adding a word would push the dictionary past 65,535 entries.
    Capacity,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {e}"),
            Error::Format(msg) => write!(f, "format error: {msg}"),
            Error::Alloc => write!(f, "allocator failure"),
            Error::Capacity => write!(f, "dictionary capacity exceeded (65535 entries)"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_error_displays_a_message() {
        let e = Error::Alloc;
        assert_eq!(e.to_string(), "allocator failure");
    }

    #[test]
    fn format_error_carries_its_message() {
        let e = Error::Format("bad magic cookie".to_string());
        assert_eq!(e.to_string(), "format error: bad magic cookie");
    }

    #[test]
    fn io_error_exposes_its_source() {
        use std::error::Error as _;
        let e: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(e.source().is_some());
    }
}
