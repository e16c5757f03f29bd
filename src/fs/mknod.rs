use crate::{
    fs::{name_str, TTL},
    log_call, log_more, log_res,
    node::{FileNode, NodeKind},
    req_rep::{ReplyEntry, Request},
};

use super::ZipFs;

impl ZipFs {
    /// Creates regular files and the special kinds (fifo, socket, device).
    /// Specials persist through their mode bits; device numbers only live
    /// for the duration of the mount.
    pub fn do_mknod(
        &mut self,
        req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: &ReplyEntry,
    ) {
        let callid = log_call!(
            "MKNOD",
            "parent={},name={:?},mode={:o},umask={:o},rdev={}",
            parent,
            name,
            mode,
            umask,
            rdev
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
            let kind = NodeKind::from_mode(mode, rdev);
            log_more!(callid, "kind={:?}", kind);
            let node = FileNode::new(name, kind, mode & !umask, req.uid, req.gid);
            let id = session.tree.attach(parent, node);
            session.tree.attr(id).ok_or(libc::ENOENT)
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }
}
