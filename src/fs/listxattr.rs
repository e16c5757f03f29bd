use crate::{
    log_call, log_res,
    req_rep::{ReplyXattr, Request, XattrOut},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_listxattr(&mut self, _req: Request, ino: u64, size: u32, reply: &ReplyXattr) {
        let callid = log_call!("LISTXATTR", "ino={},size={}", ino, size);
        let session = self.session.lock().unwrap();
        let res = (|| {
            let node = session.tree.node(ino).ok_or(libc::ENOENT)?;
            let mut list = Vec::new();
            for name in node.xattrs.keys() {
                list.extend_from_slice(name.as_bytes());
                list.push(0);
            }
            if size == 0 {
                Ok(XattrOut::Size(list.len() as u32))
            } else if (size as usize) < list.len() {
                Err(libc::ERANGE)
            } else {
                Ok(XattrOut::Data(list))
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
