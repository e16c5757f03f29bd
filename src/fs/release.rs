use crate::{
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    /// Last close of a file deleted while open evicts it for real.
    pub fn do_release(
        &mut self,
        _req: Request,
        ino: u64,
        fh: u64,
        flags: i32,
        lock_owner: Option<u64>,
        flush: bool,
        reply: &ReplyEmpty,
    ) {
        let callid = log_call!(
            "RELEASE",
            "ino={},fh={:x},flags={:x},lock_owner={:?},flush={}",
            ino,
            fh,
            flags,
            lock_owner,
            flush
        );
        let mut session = self.session.lock().unwrap();
        session.tree.release(ino);
        log_res!(callid, "ok");
        reply.ok();
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use crate::{
        req_rep::{ReplyData, ReplyEmpty, ReplyOpen},
        test::req,
    };

    #[test]
    fn deleted_file_stays_readable_until_release() {
        let mut fs = crate::test::create_fs();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();

        let o = ReplyOpen::new();
        fs.do_open(req(), ino, libc::O_RDONLY, &o);
        let fh = o.get().unwrap().0;

        let u = ReplyEmpty::new();
        fs.do_unlink(req(), 1, &OsString::from("notes.txt"), &u);
        assert_eq!(u.get(), Ok(()));

        // the name is gone but the open handle still reads
        assert!(fs.session.lock().unwrap().tree.resolve("notes.txt").is_none());
        let r = ReplyData::new();
        fs.do_read(req(), ino, fh, 0, 3, 0, None, &r);
        assert_eq!(r.get(), Ok(b"top".to_vec()));

        let rel = ReplyEmpty::new();
        fs.do_release(req(), ino, fh, 0, None, false, &rel);
        assert_eq!(rel.get(), Ok(()));
        assert!(fs.session.lock().unwrap().tree.node(ino).is_none());
    }
}
