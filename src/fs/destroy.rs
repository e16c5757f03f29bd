use crate::{log_call, log_res};

use super::ZipFs;

impl ZipFs {
    /// Unmount: the kernel has drained every in-flight request by the time
    /// this runs, so the commit sees a quiescent tree.
    pub fn do_destroy(&mut self) {
        let callid = log_call!("DESTROY", "");
        let mut session = self.session.lock().unwrap();
        match session.commit() {
            Ok(()) => log_res!(callid, "committed"),
            Err(e) => {
                log_res!(callid, "commit failed: {}", e);
                self.record_commit_failure();
            }
        }
    }
}
