use crate::{
    fs::name_str,
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_removexattr(
        &mut self,
        _req: Request,
        ino: u64,
        name: &std::ffi::OsStr,
        reply: &ReplyEmpty,
    ) {
        let callid = log_call!("REMOVEXATTR", "ino={},name={:?}", ino, name);
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            session.check_writable()?;
            let name = name_str(name)?;
            let node = session.tree.node_mut(ino).ok_or(libc::ENOENT)?;
            if node.xattrs.remove(name).is_none() {
                return Err(libc::ENODATA);
            }
            node.mark_meta_dirty();
            Ok(())
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}
