use crate::{
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_fsyncdir(
        &mut self,
        _req: Request,
        ino: u64,
        fh: u64,
        datasync: bool,
        reply: &ReplyEmpty,
    ) {
        let callid = log_call!("FSYNCDIR", "ino={},fh={:x},datasync={}", ino, fh, datasync);
        let session = self.session.lock().unwrap();
        let res = match session.tree.node(ino) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(libc::ENOTDIR),
            None => Err(libc::ENOENT),
        };
        log_res!(callid, "{:?}", res);
        match res {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}
