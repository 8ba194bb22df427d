//! Error type for ROM loading

use std::{error, fmt, io, result};

/// Fatal errors raised while loading a ROM image.
///
/// Analysis uncertainty is never an error (see `analysis::UnknownReason`);
/// this type only covers inputs the analyzer cannot start from at all.
#[derive(Debug)]
pub enum Error {
    /// Underlying cause of error is I/O related.
    Io(io::Error),

    /// No cartridge header could be located: the title window contains
    /// non-printable bytes under every candidate mapping.
    BadHeader,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::BadHeader => write!(f, "no plausible cartridge header in image"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
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

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
