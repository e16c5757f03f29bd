use fuser::FileType;

use crate::{
    log_call, log_res,
    req_rep::{ReplyDirectory, Request},
    tree::ROOT_ID,
};

use super::ZipFs;

impl ZipFs {
    /// Lists `.`, `..` and the directory's children. Pseudo entries are
    /// not children of anything listable, so they never appear here.
    pub fn do_readdir(
        &mut self,
        _req: Request,
        ino: u64,
        fh: u64,
        offset: i64,
        reply: &ReplyDirectory,
    ) {
        let callid = log_call!("READDIR", "ino={},fh={:x},offset={:x}", ino, fh, offset);
        let session = self.session.lock().unwrap();
        let res = (|| {
            let node = session.tree.node(ino).ok_or(libc::ENOENT)?;
            if !node.is_dir() {
                return Err(libc::ENOTDIR);
            }
            let mut entries: Vec<(u64, FileType, String)> = vec![
                (ino, FileType::Directory, ".".to_string()),
                (
                    node.parent.unwrap_or(ROOT_ID),
                    FileType::Directory,
                    "..".to_string(),
                ),
            ];
            for (name, &child) in &node.children {
                let kind = session
                    .tree
                    .node(child)
                    .map(|n| n.kind.as_fuse())
                    .unwrap_or(FileType::RegularFile);
                entries.push((child, kind, name.clone()));
            }
            Ok(entries)
        })();
        log_res!(callid, "{:?}", res.as_ref().map(|v| v.len()));
        match res {
            Ok(entries) => {
                for (i, (child, kind, name)) in
                    entries.iter().enumerate().skip(offset as usize)
                {
                    if reply.add(*child, (i + 1) as i64, *kind, name) {
                        break;
                    }
                }
                reply.ok()
            }
            Err(e) => reply.error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use maplit::btreeset;
    use std::collections::BTreeSet;

    use crate::{req_rep::ReplyDirectory, test::req};

    #[test]
    fn root_listing_shows_children_but_not_pseudo_entries() {
        let mut codec = crate::test::sample_codec();
        codec.push_file("/etc/passwd", b"boo");
        let mut fs = crate::test::create_fs_with(codec, false);
        let rep = ReplyDirectory::new();
        fs.do_readdir(req(), 1, 1, 0, &rep);
        let names: BTreeSet<String> = rep
            .get()
            .unwrap()
            .into_iter()
            .map(|(_, _, _, name)| name)
            .collect();
        assert_eq!(
            names,
            btreeset! {
                ".".to_string(),
                "..".to_string(),
                "docs".to_string(),
                "notes.txt".to_string(),
                "link".to_string(),
            }
        );
    }

    #[test]
    fn listing_resumes_from_offset() {
        let mut fs = crate::test::create_fs();
        let full = ReplyDirectory::new();
        fs.do_readdir(req(), 1, 1, 0, &full);
        let all = full.get().unwrap();

        let tail = ReplyDirectory::new();
        fs.do_readdir(req(), 1, 1, 2, &tail);
        assert_eq!(tail.get().unwrap(), all[2..].to_vec());
    }

    #[test]
    fn readdir_on_file_is_enotdir() {
        let mut fs = crate::test::create_fs();
        let ino = fs.session.lock().unwrap().tree.resolve("notes.txt").unwrap();
        let rep = ReplyDirectory::new();
        fs.do_readdir(req(), ino, ino, 0, &rep);
        assert_eq!(rep.get(), Err(libc::ENOTDIR));
    }
}
