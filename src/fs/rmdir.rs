use crate::{
    fs::name_str,
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_rmdir(
        &mut self,
        _req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: &ReplyEmpty,
    ) {
        let callid = log_call!("RMDIR", "parent={},name={:?}", parent, name);
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            session.check_writable()?;
            let name = name_str(name)?;
            let id = session.tree.lookup(parent, name).ok_or(libc::ENOENT)?;
            let node = session.tree.node(id).unwrap();
            if !node.is_dir() {
                return Err(libc::ENOTDIR);
            }
            if !node.children.is_empty() {
                return Err(libc::ENOTEMPTY);
            }
            session.tree.remove_or_hold(id);
            Ok(())
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}
