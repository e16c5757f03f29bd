use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use fuser::Filesystem;
use libc::c_int;

use crate::{
    req_rep::{
        KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
        ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr,
    },
    session::Session,
};

pub const TTL: Duration = Duration::new(0, 0);

/// The mounted filesystem: one session behind one mutex. Every operation
/// locks it for its whole duration; the codec is never reentered and the
/// tree sees a strict per-op ordering, which is why multithreaded dispatch
/// buys nothing here.
pub struct ZipFs {
    pub(crate) session: Mutex<Session>,
    commit_failed: Arc<AtomicBool>,
}

impl ZipFs {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            commit_failed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle the binary polls after the mount loop returns to decide the
    /// exit status.
    pub fn commit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.commit_failed)
    }

    pub(crate) fn record_commit_failure(&self) {
        self.commit_failed.store(true, Ordering::SeqCst);
    }
}

pub mod access;
pub mod create;
pub mod destroy;
pub mod flush;
pub mod forget;
pub mod fsync;
pub mod fsyncdir;
pub mod getattr;
pub mod getxattr;
pub mod init;
pub mod link;
pub mod listxattr;
pub mod lookup;
pub mod mkdir;
pub mod mknod;
pub mod open;
pub mod opendir;
pub mod read;
pub mod readdir;
pub mod readlink;
pub mod release;
pub mod releasedir;
pub mod removexattr;
pub mod rename;
pub mod rmdir;
pub mod setattr;
pub mod setxattr;
pub mod statfs;
pub mod symlink;
pub mod unlink;
pub mod write;

impl Filesystem for ZipFs {
    fn init(
        &mut self,
        req: &fuser::Request<'_>,
        config: &mut fuser::KernelConfig,
    ) -> Result<(), c_int> {
        let config = KernelConfig::new(config);
        self.do_init(req.into(), &config)
    }

    fn destroy(&mut self) {
        self.do_destroy()
    }

    fn lookup(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEntry,
    ) {
        let rep = ReplyEntry::new();
        self.do_lookup(req.into(), parent, name, &rep);
        rep.reply(reply)
    }

    fn forget(&mut self, req: &fuser::Request<'_>, ino: u64, nlookup: u64) {
        self.do_forget(req.into(), ino, nlookup)
    }

    fn getattr(&mut self, req: &fuser::Request<'_>, ino: u64, reply: fuser::ReplyAttr) {
        let rep = ReplyAttr::new();
        self.do_getattr(req.into(), ino, &rep);
        rep.reply(reply)
    }

    fn setattr(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<fuser::TimeOrNow>,
        mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: fuser::ReplyAttr,
    ) {
        let rep = ReplyAttr::new();
        self.do_setattr(req.into(), ino, mode, uid, gid, size, atime, mtime, fh, &rep);
        rep.reply(reply)
    }

    fn readlink(&mut self, req: &fuser::Request<'_>, ino: u64, reply: fuser::ReplyData) {
        let rep = ReplyData::new();
        self.do_readlink(req.into(), ino, &rep);
        rep.reply(reply)
    }

    fn mknod(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: fuser::ReplyEntry,
    ) {
        let rep = ReplyEntry::new();
        self.do_mknod(req.into(), parent, name, mode, umask, rdev, &rep);
        rep.reply(reply)
    }

    fn mkdir(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        reply: fuser::ReplyEntry,
    ) {
        let rep = ReplyEntry::new();
        self.do_mkdir(req.into(), parent, name, mode, umask, &rep);
        rep.reply(reply)
    }

    fn unlink(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_unlink(req.into(), parent, name, &rep);
        rep.reply(reply);
    }

    fn rmdir(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_rmdir(req.into(), parent, name, &rep);
        rep.reply(reply);
    }

    fn symlink(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        link: &std::path::Path,
        reply: fuser::ReplyEntry,
    ) {
        let rep = ReplyEntry::new();
        self.do_symlink(req.into(), parent, name, link, &rep);
        rep.reply(reply)
    }

    fn rename(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        newparent: u64,
        newname: &std::ffi::OsStr,
        flags: u32,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_rename(req.into(), parent, name, newparent, newname, flags, &rep);
        rep.reply(reply)
    }

    fn link(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &std::ffi::OsStr,
        reply: fuser::ReplyEntry,
    ) {
        let rep = ReplyEntry::new();
        self.do_link(req.into(), ino, newparent, newname, &rep);
        rep.reply(reply)
    }

    fn open(&mut self, req: &fuser::Request<'_>, ino: u64, flags: i32, reply: fuser::ReplyOpen) {
        let rep = ReplyOpen::new();
        self.do_open(req.into(), ino, flags, &rep);
        rep.reply(reply);
    }

    fn read(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let rep = ReplyData::new();
        self.do_read(req.into(), ino, fh, offset, size, flags, lock_owner, &rep);
        rep.reply(reply);
    }

    fn write(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        write_flags: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        let rep = ReplyWrite::new();
        self.do_write(
            req.into(),
            ino,
            fh,
            offset,
            data,
            write_flags,
            flags,
            lock_owner,
            &rep,
        );
        rep.reply(reply);
    }

    fn flush(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        lock_owner: u64,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_flush(req.into(), ino, fh, lock_owner, &rep);
        rep.reply(reply)
    }

    fn release(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        flags: i32,
        lock_owner: Option<u64>,
        flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_release(req.into(), ino, fh, flags, lock_owner, flush, &rep);
        rep.reply(reply)
    }

    fn fsync(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        datasync: bool,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_fsync(req.into(), ino, fh, datasync, &rep);
        rep.reply(reply)
    }

    fn opendir(&mut self, req: &fuser::Request<'_>, ino: u64, flags: i32, reply: fuser::ReplyOpen) {
        let rep = ReplyOpen::new();
        self.do_opendir(req.into(), ino, flags, &rep);
        rep.reply(reply)
    }

    fn readdir(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        reply: fuser::ReplyDirectory,
    ) {
        let rep = ReplyDirectory::new();
        self.do_readdir(req.into(), ino, fh, offset, &rep);
        rep.reply(reply)
    }

    fn releasedir(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        flags: i32,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_releasedir(req.into(), ino, fh, flags, &rep);
        rep.reply(reply)
    }

    fn fsyncdir(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        datasync: bool,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_fsyncdir(req.into(), ino, fh, datasync, &rep);
        rep.reply(reply)
    }

    fn statfs(&mut self, req: &fuser::Request<'_>, ino: u64, reply: fuser::ReplyStatfs) {
        let rep = ReplyStatfs::new();
        self.do_statfs(req.into(), ino, &rep);
        rep.reply(reply)
    }

    fn setxattr(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        name: &std::ffi::OsStr,
        value: &[u8],
        flags: i32,
        position: u32,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_setxattr(req.into(), ino, name, value, flags, position, &rep);
        rep.reply(reply)
    }

    fn getxattr(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        name: &std::ffi::OsStr,
        size: u32,
        reply: fuser::ReplyXattr,
    ) {
        let rep = ReplyXattr::new();
        self.do_getxattr(req.into(), ino, name, size, &rep);
        rep.reply(reply)
    }

    fn listxattr(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        size: u32,
        reply: fuser::ReplyXattr,
    ) {
        let rep = ReplyXattr::new();
        self.do_listxattr(req.into(), ino, size, &rep);
        rep.reply(reply)
    }

    fn removexattr(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEmpty,
    ) {
        let rep = ReplyEmpty::new();
        self.do_removexattr(req.into(), ino, name, &rep);
        rep.reply(reply)
    }

    fn access(&mut self, req: &fuser::Request<'_>, ino: u64, mask: i32, reply: fuser::ReplyEmpty) {
        let rep = ReplyEmpty::new();
        self.do_access(req.into(), ino, mask, &rep);
        rep.reply(reply)
    }

    fn create(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: fuser::ReplyCreate,
    ) {
        let rep = ReplyCreate::new();
        self.do_create(req.into(), parent, name, mode, umask, flags, &rep);
        rep.reply(reply);
    }
}

/// ZIP member names are strings; a leaf name the kernel hands us that is
/// not valid UTF-8 cannot exist in the tree.
pub(crate) fn name_str(name: &std::ffi::OsStr) -> Result<&str, c_int> {
    name.to_str().ok_or(libc::EINVAL)
}
