use crate::error::Error;

/// Metadata of one archive entry, as stored in the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStat {
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Modification time, seconds since the unix epoch.
    pub mtime: i64,
    /// Unix mode bits (including the file type bits), when the archive
    /// recorded them.
    pub mode: Option<u32>,
    /// Entry carries a directory marker (trailing slash or attribute).
    pub is_dir: bool,
}

/// What a pull source reports about itself before the codec starts reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceStat {
    pub size: u64,
    pub mtime: i64,
    /// Unix mode including file type bits; the codec uses these to decide
    /// whether to emit a regular, directory or symlink entry.
    pub mode: u32,
}

/// A decompression stream over one archive entry.
///
/// `close` is explicit so close failures can be reported; dropping the
/// stream without closing is allowed during error unwinding.
pub trait EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;
    fn close(self: Box<Self>) -> Result<(), Error>;
}

/// A pull-based byte source handed to the codec for `add`/`replace`.
///
/// The codec calls `stat` once, then `open`, then `read` until it returns
/// zero, then `close`. Releasing the source is Drop.
pub trait StreamSource: Send {
    fn stat(&self) -> SourceStat;
    fn open(&mut self);
    fn read(&mut self, buf: &mut [u8]) -> usize;
    fn close(&mut self);
}

/// Capability object over the archive. Injected into the session so the
/// core never names a concrete library; tests supply a stub.
///
/// Mutating calls (`add`, `replace`, `rename`, `delete`, `set_times`,
/// `set_mode`) only record intent; `close` commits everything by rewriting
/// the archive atomically, `discard` drops the pending ops.
pub trait ArchiveCodec: Send {
    fn num_entries(&self) -> u64;
    fn entry_name(&self, index: u64) -> Result<String, Error>;
    fn entry_stat(&self, index: u64) -> Result<EntryStat, Error>;
    fn entry_open(&mut self, index: u64) -> Result<Box<dyn EntryStream + '_>, Error>;

    fn add(&mut self, name: &str, source: Box<dyn StreamSource>) -> Result<u64, Error>;
    fn replace(&mut self, index: u64, source: Box<dyn StreamSource>) -> Result<(), Error>;
    fn rename(&mut self, index: u64, new_name: &str) -> Result<(), Error>;
    fn delete(&mut self, index: u64) -> Result<(), Error>;
    fn set_times(&mut self, index: u64, mtime: i64) -> Result<(), Error>;
    fn set_mode(&mut self, index: u64, mode: u32) -> Result<(), Error>;

    fn close(&mut self) -> Result<(), Error>;
    fn discard(&mut self);
}
