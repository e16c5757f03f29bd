use crate::{
    fs::{name_str, TTL},
    log_call, log_res,
    req_rep::{ReplyEntry, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_lookup(
        &mut self,
        _req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: &ReplyEntry,
    ) {
        let callid = log_call!("LOOKUP", "parent={},name={:?}", parent, name);
        let session = self.session.lock().unwrap();
        let res = name_str(name).and_then(|name| {
            session
                .tree
                .lookup(parent, name)
                .and_then(|id| session.tree.attr(id))
                .ok_or(libc::ENOENT)
        });
        log_res!(callid, "{:?}", res);
        match res {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }
}
