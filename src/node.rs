use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::{
    bigbuffer::{BigBuffer, CHUNK_SIZE},
    codec::ArchiveCodec,
    error::Error,
};

/// Stable node identifier; doubles as the FUSE inode number. Resolved
/// through the tree map, never followed as a pointer.
pub type NodeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Regular,
    Directory,
    Symlink,
    CharDevice { rdev: u32 },
    BlockDevice { rdev: u32 },
    Fifo,
    Socket,
}

impl NodeKind {
    /// Classifies from unix mode bits; `rdev` only matters for devices.
    pub fn from_mode(mode: u32, rdev: u32) -> NodeKind {
        match mode & libc::S_IFMT {
            libc::S_IFDIR => NodeKind::Directory,
            libc::S_IFLNK => NodeKind::Symlink,
            libc::S_IFCHR => NodeKind::CharDevice { rdev },
            libc::S_IFBLK => NodeKind::BlockDevice { rdev },
            libc::S_IFIFO => NodeKind::Fifo,
            libc::S_IFSOCK => NodeKind::Socket,
            _ => NodeKind::Regular,
        }
    }

    pub fn type_bits(&self) -> u32 {
        match self {
            NodeKind::Regular => libc::S_IFREG,
            NodeKind::Directory => libc::S_IFDIR,
            NodeKind::Symlink => libc::S_IFLNK,
            NodeKind::CharDevice { .. } => libc::S_IFCHR,
            NodeKind::BlockDevice { .. } => libc::S_IFBLK,
            NodeKind::Fifo => libc::S_IFIFO,
            NodeKind::Socket => libc::S_IFSOCK,
        }
    }

    pub fn as_fuse(&self) -> fuser::FileType {
        match self {
            NodeKind::Regular => fuser::FileType::RegularFile,
            NodeKind::Directory => fuser::FileType::Directory,
            NodeKind::Symlink => fuser::FileType::Symlink,
            NodeKind::CharDevice { .. } => fuser::FileType::CharDevice,
            NodeKind::BlockDevice { .. } => fuser::FileType::BlockDevice,
            NodeKind::Fifo => fuser::FileType::NamedPipe,
            NodeKind::Socket => fuser::FileType::Socket,
        }
    }
}

/// Where a node stands relative to the archive it came from.
///
/// `MetaDirty` covers renames and metadata-only changes: the entry keeps
/// its stored bytes and only needs a rename/metadata pass at commit.
/// `Dirty` means the contents were rewritten. `DeletedHeld` is the
/// unlinked-while-open limbo; such a node is out of the tree's name space
/// but stays materialized until the last release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Clean,
    MetaDirty,
    Dirty,
    New,
    DeletedHeld,
}

pub struct FileNode {
    pub name: String,
    /// Slash-joined path from the root, no leading slash; `""` for the
    /// root itself. Pseudo entries keep their stored name verbatim.
    pub full_path: String,
    pub parent: Option<NodeId>,
    pub children: BTreeMap<String, NodeId>,
    pub kind: NodeKind,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    /// Declared size for archive-backed nodes that are not materialized;
    /// once a buffer exists, the buffer's length wins.
    pub size: u64,
    pub xattrs: BTreeMap<String, Vec<u8>>,
    pub archive_index: Option<u64>,
    pub buffer: Option<Arc<Mutex<BigBuffer>>>,
    pub open_count: u64,
    pub state: NodeState,
}

impl FileNode {
    pub fn new(name: &str, kind: NodeKind, mode: u32, uid: u32, gid: u32) -> Self {
        let now = SystemTime::now();
        FileNode {
            name: name.to_string(),
            full_path: String::new(),
            parent: None,
            children: BTreeMap::new(),
            kind,
            mode: mode & 0o7777,
            uid,
            gid,
            atime: now,
            mtime: now,
            ctime: now,
            size: 0,
            xattrs: BTreeMap::new(),
            archive_index: None,
            buffer: None,
            open_count: 0,
            state: NodeState::New,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn rdev(&self) -> u32 {
        match self.kind {
            NodeKind::CharDevice { rdev } | NodeKind::BlockDevice { rdev } => rdev,
            _ => 0,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.buffer {
            Some(buf) => buf.lock().unwrap().len(),
            None => self.size,
        }
    }

    pub fn attr(&self, ino: NodeId, nlink: u32) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: self.size(),
            blocks: self.size().div_ceil(512),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            crtime: self.ctime,
            kind: self.kind.as_fuse(),
            perm: (self.mode & 0o7777) as u16,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: self.rdev(),
            blksize: CHUNK_SIZE as u32,
            flags: 0,
        }
    }

    /// Unix mode with the file type bits merged in, the form the archive
    /// stores.
    pub fn full_mode(&self) -> u32 {
        self.kind.type_bits() | (self.mode & 0o7777)
    }

    pub fn mark_content_dirty(&mut self) {
        match self.state {
            NodeState::Clean | NodeState::MetaDirty => self.state = NodeState::Dirty,
            _ => {}
        }
    }

    pub fn mark_meta_dirty(&mut self) {
        if self.state == NodeState::Clean {
            self.state = NodeState::MetaDirty;
        }
    }

    /// Brings the contents into memory: archive-backed nodes pull their
    /// entry through the codec, everything else starts from an empty
    /// buffer. A no-op once a buffer exists. Read-only materialization
    /// leaves the state untouched.
    pub fn materialize(&mut self, codec: &mut dyn ArchiveCodec) -> Result<(), Error> {
        if self.buffer.is_some() {
            return Ok(());
        }
        let bb = match self.archive_index {
            Some(idx) if self.size > 0 => BigBuffer::read_from_codec(codec, idx, self.size)?,
            _ => BigBuffer::new(),
        };
        self.buffer = Some(Arc::new(Mutex::new(bb)));
        Ok(())
    }

    pub fn read(&self, buf: &mut [u8], offset: u64) -> usize {
        match &self.buffer {
            Some(bb) => bb.lock().unwrap().read(buf, offset),
            None => 0,
        }
    }

    pub fn write(&mut self, data: &[u8], offset: u64) -> usize {
        let n = match &self.buffer {
            Some(bb) => bb.lock().unwrap().write(data, offset),
            None => 0,
        };
        self.mark_content_dirty();
        n
    }

    pub fn truncate(&mut self, new_len: u64) {
        if let Some(bb) = &self.buffer {
            bb.lock().unwrap().truncate(new_len);
        }
        self.mark_content_dirty();
    }
}

pub fn system_time_from_unix(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

pub fn unix_secs(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Drops sub-second precision; archive timestamps are whole seconds unless
/// the mount asked to keep them precise.
pub fn truncate_to_seconds(t: SystemTime) -> SystemTime {
    system_time_from_unix(unix_secs(t))
}
