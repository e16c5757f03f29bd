use crate::{
    log_call, log_res,
    req_rep::{ReplyEntry, Request},
};

use super::ZipFs;

impl ZipFs {
    /// ZIP has no hard links.
    pub fn do_link(
        &mut self,
        _req: Request,
        ino: u64,
        newparent: u64,
        newname: &std::ffi::OsStr,
        reply: &ReplyEntry,
    ) {
        let callid = log_call!(
            "LINK",
            "ino={},newparent={},newname={:?}",
            ino,
            newparent,
            newname
        );
        log_res!(callid, "EPERM");
        reply.error(libc::EPERM);
    }
}
