use std::os::unix::prelude::OsStrExt;

use crate::{
    fs::{name_str, TTL},
    log_call, log_res,
    node::{FileNode, NodeKind},
    req_rep::{ReplyEntry, Request},
};

use super::ZipFs;

impl ZipFs {
    /// The target string becomes the node's contents verbatim, so symlinks
    /// persist through the same buffer path as regular files.
    pub fn do_symlink(
        &mut self,
        req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        link: &std::path::Path,
        reply: &ReplyEntry,
    ) {
        let callid = log_call!("SYMLINK", "parent={},name={:?},link={:?}", parent, name, link);
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
            let node = FileNode::new(name, NodeKind::Symlink, 0o777, req.uid, req.gid);
            let id = session.tree.attach(parent, node);
            session.materialize(id).map_err(|e| e.errno())?;
            session
                .tree
                .node_mut(id)
                .unwrap()
                .write(link.as_os_str().as_bytes(), 0);
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
    use std::path::Path;

    use crate::{
        node::NodeState,
        req_rep::{ReplyData, ReplyEntry},
        test::req,
    };

    #[test]
    fn symlink_then_readlink_round_trips() {
        let mut fs = crate::test::create_fs();
        let rep = ReplyEntry::new();
        fs.do_symlink(
            req(),
            1,
            &OsString::from("ln"),
            Path::new("docs/readme.txt"),
            &rep,
        );
        let (_, attr, _) = rep.get().unwrap();
        assert_eq!(attr.kind, fuser::FileType::Symlink);
        assert_eq!(attr.size, 15);

        let r = ReplyData::new();
        fs.do_readlink(req(), attr.ino, &r);
        assert_eq!(r.get(), Ok(b"docs/readme.txt".to_vec()));

        let session = fs.session.lock().unwrap();
        assert_eq!(session.tree.node(attr.ino).unwrap().state, NodeState::New);
    }
}
