use crate::{
    fs::name_str,
    log_call, log_res,
    req_rep::{ReplyEmpty, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_unlink(
        &mut self,
        _req: Request,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: &ReplyEmpty,
    ) {
        let callid = log_call!("UNLINK", "parent={},name={:?}", parent, name);
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            session.check_writable()?;
            let name = name_str(name)?;
            let id = session.tree.lookup(parent, name).ok_or(libc::ENOENT)?;
            if session.tree.node(id).unwrap().is_dir() {
                return Err(libc::EISDIR);
            }
            session.tree.remove_or_hold(id);
            Ok(())
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
    fn unlink_removes_the_name() {
        let mut fs = crate::test::create_fs();
        let rep = ReplyEmpty::new();
        fs.do_unlink(req(), 1, &OsString::from("notes.txt"), &rep);
        assert_eq!(rep.get(), Ok(()));
        assert!(fs.session.lock().unwrap().tree.resolve("notes.txt").is_none());
    }

    #[test]
    fn unlink_directory_is_eisdir() {
        let mut fs = crate::test::create_fs();
        let rep = ReplyEmpty::new();
        fs.do_unlink(req(), 1, &OsString::from("docs"), &rep);
        assert_eq!(rep.get(), Err(libc::EISDIR));
    }
}
