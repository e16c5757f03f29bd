use crate::{log_call, req_rep::Request};

use super::ZipFs;

impl ZipFs {
    /// Nothing to drop: nodes live for the whole mount and deletion is
    /// driven by unlink/release, not by the kernel's lookup cache.
    pub fn do_forget(&mut self, _req: Request, ino: u64, nlookup: u64) {
        log_call!("FORGET", "ino={},nlookup={}", ino, nlookup);
    }
}
