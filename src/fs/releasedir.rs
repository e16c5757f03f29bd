use crate::{
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_releasedir(&mut self, _req: Request, ino: u64, fh: u64, flags: i32, reply: &ReplyEmpty) {
        let callid = log_call!("RELEASEDIR", "ino={},fh={:x},flags={:x}", ino, fh, flags);
        log_res!(callid, "ok");
        reply.ok();
    }
}
