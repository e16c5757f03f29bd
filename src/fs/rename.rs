use crate::{
    fs::name_str,
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_rename(
        &mut self,
        _req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        newparent: u64,
        newname: &std::ffi::OsStr,
        flags: u32,
        reply: &ReplyEmpty,
    ) {
        let callid = log_call!(
            "RENAME",
            "parent={},name={:?},newparent={},newname={:?},flags={:x}",
            parent,
            name,
            newparent,
            newname,
            flags
        );
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            session.check_writable()?;
            // RENAME_EXCHANGE / RENAME_NOREPLACE are not supported
            if flags != 0 {
                return Err(libc::EINVAL);
            }
            let name = name_str(name)?;
            let newname = name_str(newname)?;
            session.tree.rename(parent, name, newparent, newname)
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use crate::{req_rep::ReplyEmpty, test::req};

    #[test]
    fn rename_moves_subtree_between_directories() {
        let mut fs = crate::test::create_fs();
        let docs = fs.session.lock().unwrap().tree.resolve("docs").unwrap();
        let rep = ReplyEmpty::new();
        fs.do_rename(
            req(),
            1,
            &OsString::from("notes.txt"),
            docs,
            &OsString::from("moved.txt"),
            0,
            &rep,
        );
        assert_eq!(rep.get(), Ok(()));
        let session = fs.session.lock().unwrap();
        assert!(session.tree.resolve("notes.txt").is_none());
        assert!(session.tree.resolve("docs/moved.txt").is_some());
    }

    #[test]
    fn rename_in_readonly_mount_is_erofs() {
        let mut fs = crate::test::create_fs_readonly();
        let rep = ReplyEmpty::new();
        fs.do_rename(
            req(),
            1,
            &OsString::from("notes.txt"),
            1,
            &OsString::from("x"),
            0,
            &rep,
        );
        assert_eq!(rep.get(), Err(libc::EROFS));
    }
}
