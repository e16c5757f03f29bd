use crate::{
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    /// Contents are only persisted at unmount, so a sync is trivially done.
    pub fn do_fsync(&mut self, _req: Request, ino: u64, fh: u64, datasync: bool, reply: &ReplyEmpty) {
        let callid = log_call!("FSYNC", "ino={},fh={:x},datasync={}", ino, fh, datasync);
        let session = self.session.lock().unwrap();
        let res = session.tree.node(ino).map(|_| ()).ok_or(libc::ENOENT);
        log_res!(callid, "{:?}", res);
        match res {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}
