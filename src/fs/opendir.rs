use crate::{
    log_call, log_res,
    req_rep::{ReplyOpen, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_opendir(&mut self, _req: Request, ino: u64, flags: i32, reply: &ReplyOpen) {
        let callid = log_call!("OPENDIR", "ino={},flags={:x}", ino, flags);
        let session = self.session.lock().unwrap();
        let res = match session.tree.node(ino) {
            Some(node) if node.is_dir() => Ok(ino),
            Some(_) => Err(libc::ENOTDIR),
            None => Err(libc::ENOENT),
        };
        log_res!(callid, "{:?}", res);
        match res {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e),
        }
    }
}
