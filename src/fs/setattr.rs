use std::time::SystemTime;

use fuser::TimeOrNow;

use crate::{
    fs::TTL,
    log_call, log_more, log_res,
    req_rep::{ReplyAttr, Request},
};

use super::ZipFs;

fn time_of(t: TimeOrNow) -> SystemTime {
    match t {
        TimeOrNow::SpecificTime(t) => t,
        TimeOrNow::Now => SystemTime::now(),
    }
}

impl ZipFs {
    /// chmod, chown, truncate/ftruncate and utimens all arrive here; each
    /// present field is applied in turn.
    pub fn do_setattr(
        &mut self,
        _req: Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        fh: Option<u64>,
        reply: &ReplyAttr,
    ) {
        let callid = log_call!("SETATTR", "ino={},fh={:?}", ino, fh);
        let mut session = self.session.lock().unwrap();
        let res = (|| {
            if session.tree.node(ino).is_none() {
                return Err(libc::ENOENT);
            }
            let mutating =
                mode.is_some() || uid.is_some() || gid.is_some() || size.is_some()
                    || atime.is_some() || mtime.is_some();
            if mutating {
                session.check_writable()?;
            }
            if let Some(new_size) = size {
                log_more!(callid, "size={}", new_size);
                let node = session.tree.node(ino).unwrap();
                if node.is_dir() {
                    return Err(libc::EISDIR);
                }
                session.materialize(ino).map_err(|e| e.errno())?;
                session.tree.node_mut(ino).unwrap().truncate(new_size);
            }
            let now = session.timestamp(SystemTime::now());
            let a = atime.map(|t| session.timestamp(time_of(t)));
            let m = mtime.map(|t| session.timestamp(time_of(t)));
            {
                let node = session.tree.node_mut(ino).unwrap();
                if let Some(v) = mode {
                    log_more!(callid, "mode={:o}", v);
                    node.mode = v & 0o7777;
                    node.mark_meta_dirty();
                }
                if let Some(v) = uid {
                    log_more!(callid, "uid={}", v);
                    node.uid = v;
                    node.mark_meta_dirty();
                }
                if let Some(v) = gid {
                    log_more!(callid, "gid={}", v);
                    node.gid = v;
                    node.mark_meta_dirty();
                }
                if let Some(v) = a {
                    log_more!(callid, "atime={:?}", v);
                    node.atime = v;
                    node.mark_meta_dirty();
                }
                if let Some(v) = m {
                    log_more!(callid, "mtime={:?}", v);
                    node.mtime = v;
                    node.mark_meta_dirty();
                }
                if mutating {
                    node.ctime = now;
                }
            }
            session.tree.attr(ino).ok_or(libc::ENOENT)
        })();
        log_res!(callid, "{:?}", res);
        match res {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        }
    }
}
