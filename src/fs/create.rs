use crate::{
    fs::{name_str, TTL},
    log_call, log_res,
    node::{FileNode, NodeKind},
    req_rep::{ReplyCreate, Request},
};

use super::ZipFs;

impl ZipFs {
    /// Atomic make-and-open: the node is attached and already holds an
    /// open reference when the reply goes out.
    pub fn do_create(
        &mut self,
        req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: &ReplyCreate,
    ) {
        let callid = log_call!(
            "CREATE",
            "parent={},name={:?},mode={:o},umask={:o},flags={:o}",
            parent,
            name,
            mode,
            umask,
            flags
        );
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            session.check_writable()?;
            let name = name_str(name)?;
            let parent_node = session.tree.node(parent).ok_or(libc::ENOENT)?;
            if !parent_node.is_dir() {
                return Err(libc::ENOTDIR);
            }
            if session.tree.lookup(parent, name).is_some() {
                return Err(libc::EEXIST);
            }
            let node = FileNode::new(name, NodeKind::Regular, mode & !umask, req.uid, req.gid);
            let id = session.tree.attach(parent, node);
            session.materialize(id).map_err(|e| e.errno())?;
            session.tree.node_mut(id).unwrap().open_count = 1;
            session.tree.attr(id).map(|attr| (attr, id)).ok_or(libc::ENOENT)
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok((attr, fh)) => reply.created(&TTL, &attr, 0, fh, 0),
            Err(e) => reply.error(e),
        }
    }
}
