use crate::{
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    /// Everything lives in memory until unmount; there is nothing to push.
    pub fn do_flush(&mut self, _req: Request, ino: u64, fh: u64, lock_owner: u64, reply: &ReplyEmpty) {
        let callid = log_call!("FLUSH", "ino={},fh={:x},lock_owner={:x}", ino, fh, lock_owner);
        let session = self.session.lock().unwrap();
        let res = session.tree.node(ino).map(|_| ()).ok_or(libc::ENOENT);
        log_res!(callid, "{:?}", res);
        match res {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}
