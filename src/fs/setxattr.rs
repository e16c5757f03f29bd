use crate::{
    fs::name_str,
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_setxattr(
        &mut self,
        _req: Request,
        ino: u64,
        name: &std::ffi::OsStr,
        value: &[u8],
        flags: i32,
        position: u32,
        reply: &ReplyEmpty,
    ) {
        let callid = log_call!(
            "SETXATTR",
            "ino={},name={:?},len={},flags={:x},position={}",
            ino,
            name,
            value.len(),
            flags,
            position
        );
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            session.check_writable()?;
            let name = name_str(name)?;
            let node = session.tree.node_mut(ino).ok_or(libc::ENOENT)?;
            let exists = node.xattrs.contains_key(name);
            if flags & libc::XATTR_CREATE != 0 && exists {
                return Err(libc::EEXIST);
            }
            if flags & libc::XATTR_REPLACE != 0 && !exists {
                return Err(libc::ENODATA);
            }
            node.xattrs.insert(name.to_string(), value.to_vec());
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
