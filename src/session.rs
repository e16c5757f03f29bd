use std::time::SystemTime;

use libc::c_int;

use crate::{
    codec::ArchiveCodec,
    error::Error,
    node::{truncate_to_seconds, NodeId},
    tree::NodeTree,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MountOptions {
    pub readonly: bool,
    /// Keep sub-second timestamp precision instead of truncating to the
    /// one-second resolution archives natively store.
    pub force_precise_time: bool,
}

/// Mount-wide state: the injected codec, the node tree built from it, and
/// the mount options. The FUSE adapter serializes every operation on a
/// session behind one mutex; nothing here locks on its own.
pub struct Session {
    pub codec: Box<dyn ArchiveCodec>,
    pub tree: NodeTree,
    pub options: MountOptions,
    pub uid: u32,
    pub gid: u32,
    /// Entry count at open time; the committer's shadow set for deletions.
    pub orig_count: u64,
}

impl Session {
    /// Enumerates the archive and builds the tree. Any codec failure here
    /// is fatal to the mount.
    pub fn open(
        codec: Box<dyn ArchiveCodec>,
        options: MountOptions,
        uid: u32,
        gid: u32,
    ) -> Result<Self, Error> {
        let orig_count = codec.num_entries();
        let tree = NodeTree::build(codec.as_ref(), uid, gid)?;
        Ok(Session {
            codec,
            tree,
            options,
            uid,
            gid,
            orig_count,
        })
    }

    pub fn check_writable(&self) -> Result<(), c_int> {
        if self.options.readonly {
            Err(libc::EROFS)
        } else {
            Ok(())
        }
    }

    /// Pulls a node's contents into memory through the session's codec.
    pub fn materialize(&mut self, id: NodeId) -> Result<(), Error> {
        let Session { codec, tree, .. } = self;
        match tree.node_mut(id) {
            Some(node) => node.materialize(codec.as_mut()),
            None => Ok(()),
        }
    }

    /// Rounds a timestamp to what the archive will keep: whole seconds,
    /// unless the mount asked for precise time.
    pub fn timestamp(&self, t: SystemTime) -> SystemTime {
        if self.options.force_precise_time {
            t
        } else {
            truncate_to_seconds(t)
        }
    }

    /// Aggregate bytes held in materialized buffers; feeds the synthetic
    /// statfs reply.
    pub fn resident_bytes(&self) -> u64 {
        self.tree
            .ids()
            .into_iter()
            .filter_map(|id| self.tree.node(id))
            .filter(|n| n.buffer.is_some())
            .map(|n| n.size())
            .sum()
    }
}
