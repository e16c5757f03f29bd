use std::{
    cmp::min,
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use crate::{
    codec::{ArchiveCodec, SourceStat, StreamSource},
    error::Error,
};

/// Unit of lazy allocation inside a [`BigBuffer`].
pub const CHUNK_SIZE: usize = 4096;

type Chunk = Box<[u8; CHUNK_SIZE]>;

fn new_chunk() -> Chunk {
    Box::new([0u8; CHUNK_SIZE])
}

/// Sparse, chunked byte store holding the contents of one file once it is
/// materialized from the archive or written through the mount.
///
/// Chunks are allocated on first write; unmapped chunks inside `[0, len)`
/// read as zeroes. Growing `len` never allocates.
#[derive(Debug, Default)]
pub struct BigBuffer {
    chunks: BTreeMap<u64, Chunk>,
    len: u64,
}

impl BigBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_number(offset: u64) -> u64 {
        offset / CHUNK_SIZE as u64
    }

    pub fn chunk_offset(offset: u64) -> usize {
        (offset % CHUNK_SIZE as u64) as usize
    }

    pub fn chunks_count(len: u64) -> u64 {
        len.div_ceil(CHUNK_SIZE as u64)
    }

    /// Sets the logical length without allocating.
    ///
    /// On shrink, chunks entirely past the new length are dropped; the
    /// boundary chunk is kept as-is and readers honor `len`. On growth the
    /// tail of the boundary chunk at the old length is zeroed first, so a
    /// shrink-then-grow cannot resurface stale bytes.
    pub fn truncate(&mut self, new_len: u64) {
        if new_len > self.len {
            let co = Self::chunk_offset(self.len);
            if co != 0 {
                if let Some(chunk) = self.chunks.get_mut(&Self::chunk_number(self.len)) {
                    chunk[co..].fill(0);
                }
            }
        } else {
            let keep = Self::chunks_count(new_len);
            self.chunks.retain(|&i, _| i < keep);
        }
        self.len = new_len;
    }

    /// Reads up to `buf.len()` bytes at `offset`, splicing across chunks.
    /// Returns the number of bytes produced; 0 at or past EOF.
    pub fn read(&self, buf: &mut [u8], offset: u64) -> usize {
        if offset >= self.len {
            return 0;
        }
        let n = min(buf.len() as u64, self.len - offset) as usize;
        let mut done = 0;
        while done < n {
            let pos = offset + done as u64;
            let co = Self::chunk_offset(pos);
            let take = min(n - done, CHUNK_SIZE - co);
            match self.chunks.get(&Self::chunk_number(pos)) {
                Some(chunk) => buf[done..done + take].copy_from_slice(&chunk[co..co + take]),
                None => buf[done..done + take].fill(0),
            }
            done += take;
        }
        n
    }

    /// Writes all of `data` at `offset`, allocating the touched chunks and
    /// extending `len` when the write reaches past it.
    pub fn write(&mut self, data: &[u8], offset: u64) -> usize {
        if data.is_empty() {
            return 0;
        }
        let mut done = 0;
        while done < data.len() {
            let pos = offset + done as u64;
            let co = Self::chunk_offset(pos);
            let take = min(data.len() - done, CHUNK_SIZE - co);
            let chunk = self
                .chunks
                .entry(Self::chunk_number(pos))
                .or_insert_with(new_chunk);
            chunk[co..co + take].copy_from_slice(&data[done..done + take]);
            done += take;
        }
        self.len = self.len.max(offset + data.len() as u64);
        data.len()
    }

    /// Materializes an archive entry: opens it through the codec and pulls
    /// exactly `declared_size` bytes into freshly allocated chunks.
    ///
    /// The entry is always closed; a close failure while another error is
    /// already being reported is suppressed.
    pub fn read_from_codec(
        codec: &mut dyn ArchiveCodec,
        index: u64,
        declared_size: u64,
    ) -> Result<BigBuffer, Error> {
        let mut bb = BigBuffer::new();
        bb.len = declared_size;

        let mut stream = codec.entry_open(index)?;
        let mut consumed: u64 = 0;
        let mut res: Result<(), Error> = Ok(());
        while consumed < declared_size {
            let co = Self::chunk_offset(consumed);
            let take = min((declared_size - consumed) as usize, CHUNK_SIZE - co);
            let chunk = bb
                .chunks
                .entry(Self::chunk_number(consumed))
                .or_insert_with(new_chunk);
            match stream.read(&mut chunk[co..co + take]) {
                Err(e) => {
                    res = Err(e);
                    break;
                }
                Ok(0) => {
                    res = Err(Error::Truncated);
                    break;
                }
                Ok(n) if n > take => {
                    res = Err(Error::Overrun);
                    break;
                }
                Ok(n) => consumed += n as u64,
            }
        }
        match (res, stream.close()) {
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(bb),
        }
    }

    /// Streams the buffer into the archive through a pull cursor.
    ///
    /// With `is_new` the entry is added under `stored_name` and `id`
    /// receives the fresh index; otherwise entry `id` is replaced in place.
    /// Either way the codec only pulls the bytes at close time, so the
    /// buffer must stay alive until then; the cursor's shared reference
    /// guarantees that. A codec refusal maps to `ENOMEM` at the dispatch
    /// boundary.
    pub fn save_to_codec(
        buffer: &Arc<Mutex<BigBuffer>>,
        codec: &mut dyn ArchiveCodec,
        stored_name: &str,
        is_new: bool,
        mtime: i64,
        mode: u32,
        id: &mut u64,
    ) -> Result<(), Error> {
        let cursor = Box::new(SaveCursor::new(Arc::clone(buffer), mtime, mode));
        if is_new {
            match codec.add(stored_name, cursor) {
                Ok(idx) => {
                    *id = idx;
                    Ok(())
                }
                Err(_) => Err(Error::SourceRejected),
            }
        } else {
            codec
                .replace(*id, cursor)
                .map_err(|_| Error::SourceRejected)
        }
    }
}

/// Per-save pull cursor: binds a buffer, the entry's times and mode, and a
/// read position the codec advances.
pub struct SaveCursor {
    buffer: Arc<Mutex<BigBuffer>>,
    mtime: i64,
    mode: u32,
    pos: u64,
}

impl SaveCursor {
    pub fn new(buffer: Arc<Mutex<BigBuffer>>, mtime: i64, mode: u32) -> Self {
        Self {
            buffer,
            mtime,
            mode,
            pos: 0,
        }
    }
}

impl StreamSource for SaveCursor {
    fn stat(&self) -> SourceStat {
        SourceStat {
            size: self.buffer.lock().unwrap().len(),
            mtime: self.mtime,
            mode: self.mode,
        }
    }

    fn open(&mut self) {
        self.pos = 0;
    }

    fn read(&mut self, out: &mut [u8]) -> usize {
        let n = self.buffer.lock().unwrap().read(out, self.pos);
        self.pos += n as u64;
        n
    }

    fn close(&mut self) {}
}
