use crate::{
    fs::{name_str, TTL},
    log_call, log_res,
    node::{FileNode, NodeKind},
    req_rep::{ReplyEntry, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_mkdir(
        &mut self,
        req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        reply: &ReplyEntry,
    ) {
        let callid = log_call!(
            "MKDIR",
            "parent={},name={:?},mode={:o},umask={:o}",
            parent,
            name,
            mode,
            umask
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
            let node = FileNode::new(name, NodeKind::Directory, mode & !umask, req.uid, req.gid);
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

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use crate::{node::NodeState, req_rep::ReplyEntry, test::req};

    #[test]
    fn mkdir_attaches_a_new_directory() {
        let mut fs = crate::test::create_fs();
        let rep = ReplyEntry::new();
        fs.do_mkdir(req(), 1, &OsString::from("fresh"), 0o777, 0o022, &rep);
        let (_, attr, _) = rep.get().unwrap();
        assert_eq!(attr.kind, fuser::FileType::Directory);
        assert_eq!(attr.perm, 0o755);
        let session = fs.session.lock().unwrap();
        let id = session.tree.resolve("fresh").unwrap();
        assert_eq!(session.tree.node(id).unwrap().state, NodeState::New);
    }

    #[test]
    fn mkdir_in_readonly_mount_is_erofs() {
        let mut fs = crate::test::create_fs_readonly();
        let rep = ReplyEntry::new();
        fs.do_mkdir(req(), 1, &OsString::from("fresh"), 0o755, 0, &rep);
        assert_eq!(rep.get(), Err(libc::EROFS));
    }
}
