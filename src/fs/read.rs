use crate::{
    log_call, log_res,
    req_rep::{ReplyData, Request},
};

use super::ZipFs;

impl ZipFs {
    /// First read of a clean archive-backed file pulls the whole entry
    /// into its buffer; after that reads are pure memory.
    pub fn do_read(
        &mut self,
        _req: Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: &ReplyData,
    ) {
        let callid = log_call!(
            "READ",
            "ino={},fh={:x},offset={:x},size={:x},flags={:x},lock_owner={:?}",
            ino,
            fh,
            offset,
            size,
            flags,
            lock_owner
        );
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            if session.tree.node(ino).is_none() {
                return Err(libc::ENOENT);
            }
            if offset < 0 {
                return Err(libc::EINVAL);
            }
            session.materialize(ino).map_err(|e| e.errno())?;
            let node = session.tree.node(ino).unwrap();
            let mut buf = vec![0u8; size as usize];
            let n = node.read(&mut buf, offset as u64);
            buf.truncate(n);
            Ok(buf)
        })();
        log_res!(callid, "{:?}", res.as_ref().map(|v| v.len()));
        match res {
            Ok(data) => reply.data(data),
            Err(e) => reply.error(e),
        }
    }
}
