use crate::{
    fs::name_str,
    log_call, log_res,
    req_rep::{ReplyXattr, Request, XattrOut},
};

use super::ZipFs;

impl ZipFs {
    /// Size-probe protocol: size 0 asks how big the value is, a too-small
    /// buffer is ERANGE.
    pub fn do_getxattr(
        &mut self,
        _req: Request,
        ino: u64,
        name: &std::ffi::OsStr,
        size: u32,
        reply: &ReplyXattr,
    ) {
        let callid = log_call!("GETXATTR", "ino={},name={:?},size={}", ino, name, size);
        let session = self.session.lock().unwrap();
        let res = (|| {
            let name = name_str(name)?;
            let node = session.tree.node(ino).ok_or(libc::ENOENT)?;
            let value = node.xattrs.get(name).ok_or(libc::ENODATA)?;
            if size == 0 {
                Ok(XattrOut::Size(value.len() as u32))
            } else if (size as usize) < value.len() {
                Err(libc::ERANGE)
            } else {
                Ok(XattrOut::Data(value.clone()))
            }
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(XattrOut::Size(n)) => reply.size(n),
            Ok(XattrOut::Data(data)) => reply.data(data),
            Err(e) => reply.error(e),
        }
    }
}
