#![allow(clippy::too_many_arguments)] // We have no control over the signatures of fuse calls
#![allow(clippy::new_without_default)]

pub mod bigbuffer;
pub mod codec;
pub mod commit;
pub mod error;
pub mod fs;
pub mod logging;
pub mod node;
pub mod req_rep;
pub mod session;
pub mod tree;
pub mod zip_codec;

#[cfg(test)]
pub mod stub_codec;
#[cfg(test)]
pub mod test;
