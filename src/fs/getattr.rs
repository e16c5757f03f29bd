use crate::{
    fs::TTL,
    log_call, log_res,
    req_rep::{ReplyAttr, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_getattr(&mut self, _req: Request, ino: u64, reply: &ReplyAttr) {
        let callid = log_call!("GETATTR", "ino={}", ino);
        let session = self.session.lock().unwrap();
        let res = session.tree.attr(ino).ok_or(libc::ENOENT);
        log_res!(callid, "{:?}", res);
        match res {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        }
    }
}
