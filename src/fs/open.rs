use crate::{
    log_call, log_res,
    req_rep::{ReplyOpen, Request},
};

use super::ZipFs;

fn wants_write(flags: i32) -> bool {
    flags & libc::O_ACCMODE != libc::O_RDONLY || flags & libc::O_TRUNC != 0
}

impl ZipFs {
    /// The file handle is the inode; per-handle state lives in the node's
    /// open count.
    pub fn do_open(&mut self, _req: Request, ino: u64, flags: i32, reply: &ReplyOpen) {
        let callid = log_call!("OPEN", "ino={},flags={:x}", ino, flags);
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            let node = session.tree.node(ino).ok_or(libc::ENOENT)?;
            if node.is_dir() {
                return Err(libc::EISDIR);
            }
            if wants_write(flags) {
                session.check_writable()?;
            }
            if flags & libc::O_TRUNC != 0 {
                session.materialize(ino).map_err(|e| e.errno())?;
                session.tree.node_mut(ino).unwrap().truncate(0);
            }
            session.tree.node_mut(ino).unwrap().open_count += 1;
            Ok(ino)
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{req_rep::ReplyOpen, test::req};

    #[test]
    fn open_bumps_the_open_count() {
        let mut fs = crate::test::create_fs();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();
        let rep = ReplyOpen::new();
        fs.do_open(req(), ino, libc::O_RDONLY, &rep);
        assert_eq!(rep.get(), Ok((ino, 0)));
        assert_eq!(fs.session.lock().unwrap().tree.node(ino).unwrap().open_count, 1);
    }

    #[test]
    fn open_directory_as_file_is_eisdir() {
        let mut fs = crate::test::create_fs();
        let ino = fs.session.lock().unwrap().tree.resolve("docs").unwrap();
        let rep = ReplyOpen::new();
        fs.do_open(req(), ino, libc::O_RDONLY, &rep);
        assert_eq!(rep.get(), Err(libc::EISDIR));
    }

    #[test]
    fn open_for_write_on_readonly_mount_is_erofs() {
        let mut fs = crate::test::create_fs_readonly();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();
        let rep = ReplyOpen::new();
        fs.do_open(req(), ino, libc::O_RDWR, &rep);
        assert_eq!(rep.get(), Err(libc::EROFS));
    }

    #[test]
    fn open_with_trunc_clears_contents() {
        let mut fs = crate::test::create_fs();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();
        let rep = ReplyOpen::new();
        fs.do_open(req(), ino, libc::O_RDWR | libc::O_TRUNC, &rep);
        assert!(rep.get().is_ok());
        assert_eq!(fs.session.lock().unwrap().tree.node(ino).unwrap().size(), 0);
    }
}
