use libc::c_int;

use crate::{
    log_call, log_more,
    req_rep::{KernelConfig, Request},
};

use super::ZipFs;

impl ZipFs {
    pub fn do_init(&mut self, req: Request, config: &KernelConfig) -> Result<(), c_int> {
        let callid = log_call!("INIT", "uid={},gid={}", req.uid, req.gid);
        log_more!(callid, "config={:?}", config);
        Ok(())
    }
}
