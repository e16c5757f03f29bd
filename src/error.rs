use libc::c_int;
use thiserror::Error;

/// Errors produced by the overlay core and the archive codec.
///
/// Dispatch code converts these to a negative errno at the FUSE boundary
/// via [`Error::errno`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("entry data ended before its declared size")]
    Truncated,
    #[error("entry data exceeds its declared size")]
    Overrun,
    #[error("failed to read archive entry: {0}")]
    EntryRead(String),
    #[error("failed to close archive entry: {0}")]
    EntryClose(String),
    /// The codec refused to take a source for add/replace.
    #[error("archive codec could not allocate a source")]
    SourceRejected,
    #[error("archive error: {0}")]
    Archive(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn errno(&self) -> c_int {
        match self {
            Error::Truncated | Error::Overrun => libc::EIO,
            Error::EntryRead(_) | Error::EntryClose(_) => libc::EIO,
            Error::SourceRejected => libc::ENOMEM,
            Error::Archive(_) => libc::EIO,
            Error::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}
