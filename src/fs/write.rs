use std::time::SystemTime;

use crate::{
    log_call, log_res,
    req_rep::{ReplyWrite, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_write(
        &mut self,
        _req: Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        write_flags: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: &ReplyWrite,
    ) {
        let callid = log_call!(
            "WRITE",
            "ino={},fh={:x},offset={:x},len={:x},write_flags={:x},flags={:x},lock_owner={:?}",
            ino,
            fh,
            offset,
            data.len(),
            write_flags,
            flags,
            lock_owner
        );
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            session.check_writable()?;
            if session.tree.node(ino).is_none() {
                return Err(libc::ENOENT);
            }
            if offset < 0 {
                return Err(libc::EINVAL);
            }
            session.materialize(ino).map_err(|e| e.errno())?;
            let now = session.timestamp(SystemTime::now());
            let node = session.tree.node_mut(ino).unwrap();
            let n = node.write(data, offset as u64);
            node.mtime = now;
            Ok(n as u32)
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(n) => reply.written(n),
            Err(e) => reply.error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        node::NodeState,
        req_rep::{ReplyData, ReplyWrite},
        test::req,
    };

    #[test]
    fn write_overlays_archive_contents() {
        let mut fs = crate::test::create_fs();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();
        let rep = ReplyWrite::new();
        fs.do_write(req(), ino, ino, 0, b"TOP", 0, 0, None, &rep);
        assert_eq!(rep.get(), Ok(3));

        let r = ReplyData::new();
        fs.do_read(req(), ino, ino, 0, 1024, 0, None, &r);
        assert_eq!(r.get(), Ok(b"TOP-level notes".to_vec()));

        let session = fs.session.lock().unwrap();
        assert_eq!(session.tree.node(ino).unwrap().state, NodeState::Dirty);
    }

    #[test]
    fn write_past_eof_extends_the_file() {
        let mut fs = crate::test::create_fs();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();
        let rep = ReplyWrite::new();
        fs.do_write(req(), ino, ino, 100, b"tail", 0, 0, None, &rep);
        assert_eq!(rep.get(), Ok(4));
        assert_eq!(fs.session.lock().unwrap().tree.node(ino).unwrap().size(), 104);
    }

    #[test]
    fn write_on_readonly_mount_is_erofs() {
        let mut fs = crate::test::create_fs_readonly();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();
        let rep = ReplyWrite::new();
        fs.do_write(req(), ino, ino, 0, b"x", 0, 0, None, &rep);
        assert_eq!(rep.get(), Err(libc::EROFS));
    }
}
