//! In-memory codec used by the unit tests: canned entries, switchable
//! failure injection for every codec verb, and a log of the mutating ops in
//! the order they were issued.

use std::sync::{Arc, Mutex};

use crate::{
    codec::{ArchiveCodec, EntryStat, EntryStream, StreamSource},
    error::Error,
};

#[derive(Debug, Clone, PartialEq)]
pub enum StubOp {
    Add(String),
    Replace(u64),
    Rename(u64, String),
    Delete(u64),
    SetTimes(u64, i64),
    SetMode(u64, u32),
    Close,
    Discard,
}

pub struct StubEntry {
    pub name: String,
    pub stat: EntryStat,
    /// Explicit contents; `None` means a synthetic stream of `'X'` bytes.
    pub data: Option<Vec<u8>>,
    pub source: Option<Box<dyn StreamSource>>,
    pub deleted: bool,
}

/// Shared record of the mutating calls, in issue order. Cloneable so a
/// test can keep a handle after the codec moves into a session.
#[derive(Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<StubOp>>>);

impl OpLog {
    fn push(&self, op: StubOp) {
        self.0.lock().unwrap().push(op);
    }

    pub fn snapshot(&self) -> Vec<StubOp> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct StubCodec {
    pub entries: Vec<StubEntry>,
    pub ops: OpLog,

    pub fail_entry_open: bool,
    pub fail_read: bool,
    pub fail_close: bool,
    /// Every stream read reports this many bytes regardless of the request.
    pub read_override: Option<usize>,
    pub fail_source: bool,
    pub fail_add: bool,
    pub fail_replace: bool,
    pub fail_rename: bool,
    pub fail_delete: bool,
    pub fail_commit: bool,
}

impl StubCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sized_entry(name: &str, size: u64) -> Self {
        let mut codec = Self::new();
        codec.push_sized_entry(name, size);
        codec
    }

    pub fn push_sized_entry(&mut self, name: &str, size: u64) {
        self.entries.push(StubEntry {
            name: name.to_string(),
            stat: EntryStat {
                size,
                mtime: 0,
                mode: Some(0o100644),
                is_dir: false,
            },
            data: None,
            source: None,
            deleted: false,
        });
    }

    pub fn push_file(&mut self, name: &str, data: &[u8]) {
        self.push_file_with(name, data, 0o100644, 0);
    }

    pub fn push_file_with(&mut self, name: &str, data: &[u8], mode: u32, mtime: i64) {
        self.entries.push(StubEntry {
            name: name.to_string(),
            stat: EntryStat {
                size: data.len() as u64,
                mtime,
                mode: Some(mode),
                is_dir: false,
            },
            data: Some(data.to_vec()),
            source: None,
            deleted: false,
        });
    }

    pub fn push_dir(&mut self, name: &str) {
        let stored = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{}/", name)
        };
        self.entries.push(StubEntry {
            name: stored,
            stat: EntryStat {
                size: 0,
                mtime: 0,
                mode: Some(0o040755),
                is_dir: true,
            },
            data: None,
            source: None,
            deleted: false,
        });
    }

    pub fn push_symlink(&mut self, name: &str, target: &str) {
        self.entries.push(StubEntry {
            name: name.to_string(),
            stat: EntryStat {
                size: target.len() as u64,
                mtime: 0,
                mode: Some(0o120777),
                is_dir: false,
            },
            data: Some(target.as_bytes().to_vec()),
            source: None,
            deleted: false,
        });
    }

    fn entry(&self, index: u64) -> Result<&StubEntry, Error> {
        self.entries
            .get(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))
    }
}

struct StubStream {
    data: Option<Vec<u8>>,
    pos: usize,
    fail_read: bool,
    fail_close: bool,
    read_override: Option<usize>,
}

impl EntryStream for StubStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.fail_read {
            return Err(Error::EntryRead("human-readable error".into()));
        }
        match &self.data {
            Some(data) => {
                let n = buf.len().min(data.len() - self.pos.min(data.len()));
                buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
            None => {
                buf.fill(b'X');
                Ok(self.read_override.unwrap_or(buf.len()))
            }
        }
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        if self.fail_close {
            Err(Error::EntryClose("human-readable error".into()))
        } else {
            Ok(())
        }
    }
}

impl ArchiveCodec for StubCodec {
    fn num_entries(&self) -> u64 {
        self.entries.len() as u64
    }

    fn entry_name(&self, index: u64) -> Result<String, Error> {
        Ok(self.entry(index)?.name.clone())
    }

    fn entry_stat(&self, index: u64) -> Result<EntryStat, Error> {
        Ok(self.entry(index)?.stat.clone())
    }

    fn entry_open(&mut self, index: u64) -> Result<Box<dyn EntryStream + '_>, Error> {
        if self.fail_entry_open {
            return Err(Error::Archive("entry open refused".into()));
        }
        let data = self.entry(index)?.data.clone();
        Ok(Box::new(StubStream {
            data,
            pos: 0,
            fail_read: self.fail_read,
            fail_close: self.fail_close,
            read_override: self.read_override,
        }))
    }

    fn add(&mut self, name: &str, source: Box<dyn StreamSource>) -> Result<u64, Error> {
        if self.fail_source || self.fail_add {
            return Err(Error::SourceRejected);
        }
        let st = source.stat();
        self.ops.push(StubOp::Add(name.to_string()));
        self.entries.push(StubEntry {
            name: name.to_string(),
            stat: EntryStat {
                size: st.size,
                mtime: st.mtime,
                mode: Some(st.mode),
                is_dir: st.mode & libc::S_IFMT == libc::S_IFDIR,
            },
            data: None,
            source: Some(source),
            deleted: false,
        });
        Ok(self.entries.len() as u64 - 1)
    }

    fn replace(&mut self, index: u64, source: Box<dyn StreamSource>) -> Result<(), Error> {
        if self.fail_source || self.fail_replace {
            return Err(Error::SourceRejected);
        }
        let st = source.stat();
        self.ops.push(StubOp::Replace(index));
        let entry = self
            .entries
            .get_mut(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))?;
        entry.stat.size = st.size;
        entry.stat.mtime = st.mtime;
        entry.data = None;
        entry.source = Some(source);
        Ok(())
    }

    fn rename(&mut self, index: u64, new_name: &str) -> Result<(), Error> {
        if self.fail_rename {
            return Err(Error::Archive("rename refused".into()));
        }
        self.ops.push(StubOp::Rename(index, new_name.to_string()));
        self.entries
            .get_mut(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))?
            .name = new_name.to_string();
        Ok(())
    }

    fn delete(&mut self, index: u64) -> Result<(), Error> {
        if self.fail_delete {
            return Err(Error::Archive("delete refused".into()));
        }
        self.ops.push(StubOp::Delete(index));
        self.entries
            .get_mut(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))?
            .deleted = true;
        Ok(())
    }

    fn set_times(&mut self, index: u64, mtime: i64) -> Result<(), Error> {
        self.ops.push(StubOp::SetTimes(index, mtime));
        self.entries
            .get_mut(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))?
            .stat
            .mtime = mtime;
        Ok(())
    }

    fn set_mode(&mut self, index: u64, mode: u32) -> Result<(), Error> {
        self.ops.push(StubOp::SetMode(index, mode));
        self.entries
            .get_mut(index as usize)
            .ok_or_else(|| Error::Archive(format!("no entry {}", index)))?
            .stat
            .mode = Some(mode);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if self.fail_commit {
            return Err(Error::Archive("commit refused".into()));
        }
        self.ops.push(StubOp::Close);
        // pull every pending source, the way the real rewrite does
        for entry in &mut self.entries {
            if let Some(mut source) = entry.source.take() {
                let mut data = Vec::new();
                let mut buf = [0u8; 1024];
                source.open();
                loop {
                    let n = source.read(&mut buf);
                    if n == 0 {
                        break;
                    }
                    data.extend_from_slice(&buf[..n]);
                }
                source.close();
                entry.stat.size = data.len() as u64;
                entry.data = Some(data);
            }
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.ops.push(StubOp::Discard);
        for entry in &mut self.entries {
            entry.source = None;
        }
    }
}
