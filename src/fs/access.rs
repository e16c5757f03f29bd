use crate::{
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    /// Permission bits are enforced by the kernel via default_permissions;
    /// the one thing only we know is that a read-only mount can never be
    /// written.
    pub fn do_access(&mut self, _req: Request, ino: u64, mask: i32, reply: &ReplyEmpty) {
        let callid = log_call!("ACCESS", "ino={},mask={:o}", ino, mask);
        let session = self.session.lock().unwrap();
        let res = (|| {
            session.tree.node(ino).ok_or(libc::ENOENT)?;
            if mask & libc::W_OK != 0 {
                session.check_writable()?;
            }
            Ok(())
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{req_rep::ReplyEmpty, test::req};

    #[test]
    fn write_access_on_readonly_mount_is_erofs() {
        let mut fs = crate::test::create_fs_readonly();
        let rep = ReplyEmpty::new();
        fs.do_access(req(), 1, libc::W_OK, &rep);
        assert_eq!(rep.get(), Err(libc::EROFS));

        let rep = ReplyEmpty::new();
        fs.do_access(req(), 1, libc::R_OK, &rep);
        assert_eq!(rep.get(), Ok(()));
    }
}
