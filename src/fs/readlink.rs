use crate::{
    log_call, log_res,
    node::NodeKind,
    req_rep::{ReplyData, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_readlink(&mut self, _req: Request, ino: u64, reply: &ReplyData) {
        let callid = log_call!("READLINK", "ino={}", ino);
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            let node = session.tree.node(ino).ok_or(libc::ENOENT)?;
            if node.kind != NodeKind::Symlink {
                return Err(libc::EINVAL);
            }
            session.materialize(ino).map_err(|e| e.errno())?;
            let node = session.tree.node(ino).unwrap();
            let mut target = vec![0u8; node.size() as usize];
            let n = node.read(&mut target, 0);
            target.truncate(n);
            Ok(target)
        })();
        log_res!(callid, "{:?}", res.as_ref().map(|v| String::from_utf8_lossy(v).into_owned()));
        match res {
            Ok(target) => reply.data(target),
            Err(e) => reply.error(e),
        }
    }
}
