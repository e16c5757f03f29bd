use crate::{
    bigbuffer::CHUNK_SIZE,
    log_call, log_res,
    req_rep::{ReplyStatfs, Request},
};

use super::ZipFs;

/// Synthetic headroom: the mount is RAM-backed, so free space is a
/// promise, not a measurement.
const FREE_BLOCKS: u64 = 1 << 20;
const FREE_INODES: u64 = 1 << 20;

impl ZipFs {
    pub fn do_statfs(&mut self, _req: Request, ino: u64, reply: &ReplyStatfs) {
        let callid = log_call!("STATFS", "ino={}", ino);
        let session = self.session.lock().unwrap();
        let bsize = CHUNK_SIZE as u64;
        let used_blocks = session.resident_bytes().div_ceil(bsize);
        let files = session.tree.ids().len() as u64;
        log_res!(callid, "used_blocks={},files={}", used_blocks, files);
        reply.statfs(
            used_blocks + FREE_BLOCKS,
            FREE_BLOCKS,
            FREE_BLOCKS,
            files + FREE_INODES,
            FREE_INODES,
            bsize as u32,
            255,
            bsize as u32,
        );
    }
}
