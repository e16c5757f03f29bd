//! Thin, inspectable stand-ins for the fuser reply objects. Each `do_*`
//! operation writes its outcome into one of these; the `Filesystem` impl
//! forwards it to the kernel, tests read it back with `get`.

use std::{fmt::Debug, sync::Mutex, time::Duration};

use fuser::{FileAttr, FileType};
use once_cell::sync::OnceCell;

/// The caller identity of one kernel request, detached from the fuser
/// borrow so ops and tests share one shape.
pub struct Request {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl<'a> From<&fuser::Request<'a>> for Request {
    fn from(value: &fuser::Request<'a>) -> Self {
        Self {
            uid: value.uid(),
            gid: value.gid(),
            pid: value.pid(),
        }
    }
}

pub struct KernelConfig<'a>(Option<Mutex<&'a mut fuser::KernelConfig>>);

impl<'a> KernelConfig<'a> {
    pub fn new(config: &'a mut fuser::KernelConfig) -> Self {
        Self(Some(Mutex::new(config)))
    }
    pub fn empty() -> Self {
        Self(None)
    }
}

impl<'a> Debug for KernelConfig<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(v) = &self.0 {
            f.debug_tuple("KernelConfig")
                .field(&v.lock().unwrap())
                .finish()
        } else {
            f.debug_tuple("KernelConfig").field(&None::<()>).finish()
        }
    }
}

type ReplyEntryOK = (Duration, FileAttr, u64);

pub struct ReplyEntry(OnceCell<Result<ReplyEntryOK, i32>>);

impl ReplyEntry {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn entry(&self, ttl: &Duration, attr: &FileAttr, generation: u64) {
        self.0.set(Ok((*ttl, *attr, generation))).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<ReplyEntryOK, i32> {
        *self.0.get().unwrap()
    }
    pub fn reply(&self, rep: fuser::ReplyEntry) {
        match self.0.get().unwrap() {
            Ok((ttl, attr, generation)) => rep.entry(ttl, attr, *generation),
            Err(e) => rep.error(*e),
        }
    }
}

type ReplyCreateOK = (Duration, FileAttr, u64, u64, u32);

pub struct ReplyCreate(OnceCell<Result<ReplyCreateOK, i32>>);

impl ReplyCreate {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn created(&self, ttl: &Duration, attr: &FileAttr, generation: u64, fh: u64, flags: u32) {
        self.0
            .set(Ok((*ttl, *attr, generation, fh, flags)))
            .unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<ReplyCreateOK, i32> {
        *self.0.get().unwrap()
    }
    pub fn reply(&self, rep: fuser::ReplyCreate) {
        match self.0.get().unwrap() {
            Ok((ttl, attr, generation, fh, flags)) => {
                rep.created(ttl, attr, *generation, *fh, *flags)
            }
            Err(e) => rep.error(*e),
        }
    }
}

type ReplyAttrOK = (Duration, FileAttr);

pub struct ReplyAttr(OnceCell<Result<ReplyAttrOK, i32>>);

impl ReplyAttr {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn attr(&self, ttl: &Duration, attr: &FileAttr) {
        self.0.set(Ok((*ttl, *attr))).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<ReplyAttrOK, i32> {
        *self.0.get().unwrap()
    }
    pub fn reply(&self, rep: fuser::ReplyAttr) {
        match self.0.get().unwrap() {
            Ok((ttl, attr)) => rep.attr(ttl, attr),
            Err(e) => rep.error(*e),
        }
    }
}

pub struct ReplyData(OnceCell<Result<Vec<u8>, i32>>);

impl ReplyData {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn data(&self, data: Vec<u8>) {
        self.0.set(Ok(data)).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<Vec<u8>, i32> {
        self.0.get().unwrap().clone()
    }
    pub fn reply(&self, rep: fuser::ReplyData) {
        match self.0.get().unwrap() {
            Ok(data) => rep.data(data),
            Err(e) => rep.error(*e),
        }
    }
}

pub struct ReplyWrite(OnceCell<Result<u32, i32>>);

impl ReplyWrite {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn written(&self, n: u32) {
        self.0.set(Ok(n)).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<u32, i32> {
        *self.0.get().unwrap()
    }
    pub fn reply(&self, rep: fuser::ReplyWrite) {
        match self.0.get().unwrap() {
            Ok(n) => rep.written(*n),
            Err(e) => rep.error(*e),
        }
    }
}

pub struct ReplyOpen(OnceCell<Result<(u64, u32), i32>>);

impl ReplyOpen {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn opened(&self, fh: u64, flags: u32) {
        self.0.set(Ok((fh, flags))).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<(u64, u32), i32> {
        *self.0.get().unwrap()
    }
    pub fn reply(&self, rep: fuser::ReplyOpen) {
        match self.0.get().unwrap() {
            Ok((fh, flags)) => rep.opened(*fh, *flags),
            Err(e) => rep.error(*e),
        }
    }
}

pub struct ReplyEmpty(OnceCell<Result<(), i32>>);

impl ReplyEmpty {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn ok(&self) {
        self.0.set(Ok(())).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<(), i32> {
        *self.0.get().unwrap()
    }
    pub fn reply(&self, rep: fuser::ReplyEmpty) {
        match self.0.get().unwrap() {
            Ok(()) => rep.ok(),
            Err(e) => rep.error(*e),
        }
    }
}

type ReplyStatfsOK = (u64, u64, u64, u64, u64, u32, u32, u32);

pub struct ReplyStatfs(OnceCell<Result<ReplyStatfsOK, i32>>);

impl ReplyStatfs {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn statfs(
        &self,
        blocks: u64,
        bfree: u64,
        bavail: u64,
        files: u64,
        ffree: u64,
        bsize: u32,
        namelen: u32,
        frsize: u32,
    ) {
        self.0
            .set(Ok((
                blocks, bfree, bavail, files, ffree, bsize, namelen, frsize,
            )))
            .unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<ReplyStatfsOK, i32> {
        *self.0.get().unwrap()
    }
    pub fn reply(&self, rep: fuser::ReplyStatfs) {
        match self.0.get().unwrap() {
            Ok((blocks, bfree, bavail, files, ffree, bsize, namelen, frsize)) => rep.statfs(
                *blocks, *bfree, *bavail, *files, *ffree, *bsize, *namelen, *frsize,
            ),
            Err(e) => rep.error(*e),
        }
    }
}

/// A getxattr/listxattr answer is either the probed size or the bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum XattrOut {
    Size(u32),
    Data(Vec<u8>),
}

pub struct ReplyXattr(OnceCell<Result<XattrOut, i32>>);

impl ReplyXattr {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }
    pub fn size(&self, size: u32) {
        self.0.set(Ok(XattrOut::Size(size))).unwrap();
    }
    pub fn data(&self, data: Vec<u8>) {
        self.0.set(Ok(XattrOut::Data(data))).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.0.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<XattrOut, i32> {
        self.0.get().unwrap().clone()
    }
    pub fn reply(&self, rep: fuser::ReplyXattr) {
        match self.0.get().unwrap() {
            Ok(XattrOut::Size(size)) => rep.size(*size),
            Ok(XattrOut::Data(data)) => rep.data(data),
            Err(e) => rep.error(*e),
        }
    }
}

/// Directory listing wrapper: buffers entries, then replays them into the
/// kernel reply until it reports full. The kernel resumes from the last
/// offset it accepted, so a dropped tail is simply re-requested.
pub struct ReplyDirectory {
    entries: Mutex<Vec<(u64, i64, FileType, String)>>,
    status: OnceCell<Result<(), i32>>,
}

impl ReplyDirectory {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            status: OnceCell::new(),
        }
    }
    /// Mirrors the fuser signature (true means "buffer full"); this
    /// wrapper never refuses an entry.
    pub fn add(&self, ino: u64, offset: i64, kind: FileType, name: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .push((ino, offset, kind, name.to_string()));
        false
    }
    pub fn ok(&self) {
        self.status.set(Ok(())).unwrap();
    }
    pub fn error(&self, e: i32) {
        self.status.set(Err(e)).unwrap()
    }
    pub fn get(&self) -> Result<Vec<(u64, i64, FileType, String)>, i32> {
        self.status
            .get()
            .unwrap()
            .map(|()| self.entries.lock().unwrap().clone())
    }
    pub fn reply(&self, mut rep: fuser::ReplyDirectory) {
        match self.status.get().unwrap() {
            Ok(()) => {
                for (ino, offset, kind, name) in self.entries.lock().unwrap().iter() {
                    if rep.add(*ino, *offset, *kind, name) {
                        break;
                    }
                }
                rep.ok()
            }
            Err(e) => rep.error(*e),
        }
    }
}
