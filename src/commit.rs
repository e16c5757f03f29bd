//! End-of-mount save: pushes every dirty, new, renamed and deleted node
//! back into the archive through the codec.

use std::collections::BTreeSet;

use crate::{
    bigbuffer::BigBuffer,
    error::Error,
    node::{unix_secs, FileNode, NodeState},
    session::Session,
    tree::ROOT_ID,
};

/// Directory entries carry a trailing slash in the archive.
fn stored_name(node: &FileNode) -> String {
    if node.is_dir() {
        format!("{}/", node.full_path)
    } else {
        node.full_path.clone()
    }
}

impl Session {
    /// Persists the mount's mutations. Ordering matters: content writes go
    /// first so the codec holds fresh sources while every buffer is still
    /// alive, renames follow so names cannot collide with pending writes,
    /// metadata next, deletions last so a failed add leaves no hole. Any
    /// failure makes the codec discard everything pending; the original
    /// archive is left untouched.
    pub fn commit(&mut self) -> Result<(), Error> {
        if self.options.readonly {
            return Ok(());
        }
        match self.apply_changes() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.codec.discard();
                Err(e)
            }
        }
    }

    fn apply_changes(&mut self) -> Result<(), Error> {
        let Session {
            codec,
            tree,
            orig_count,
            ..
        } = self;
        let ids = tree.ids();

        // content writes: replace keeps the entry's index, add assigns one
        for &id in &ids {
            let node = match tree.node_mut(id) {
                Some(n) => n,
                None => continue,
            };
            match node.state {
                NodeState::Dirty => {
                    node.materialize(codec.as_mut())?;
                    let name = stored_name(node);
                    let mtime = unix_secs(node.mtime);
                    let mode = node.full_mode();
                    let buffer = node.buffer.as_ref().unwrap();
                    let mut index = node.archive_index.unwrap();
                    BigBuffer::save_to_codec(
                        buffer,
                        codec.as_mut(),
                        &name,
                        false,
                        mtime,
                        mode,
                        &mut index,
                    )?;
                }
                NodeState::New => {
                    node.materialize(codec.as_mut())?;
                    let name = stored_name(node);
                    let mtime = unix_secs(node.mtime);
                    let mode = node.full_mode();
                    let buffer = node.buffer.as_ref().unwrap().clone();
                    let mut index = 0;
                    BigBuffer::save_to_codec(
                        &buffer,
                        codec.as_mut(),
                        &name,
                        true,
                        mtime,
                        mode,
                        &mut index,
                    )?;
                    node.archive_index = Some(index);
                }
                _ => {}
            }
        }

        // renames of surviving entries to their current tree position
        for &id in &ids {
            if id == ROOT_ID {
                continue;
            }
            let node = match tree.node(id) {
                Some(n) if n.state != NodeState::DeletedHeld => n,
                _ => continue,
            };
            if let Some(index) = node.archive_index {
                let name = stored_name(node);
                if codec.entry_name(index)? != name {
                    codec.rename(index, &name)?;
                }
            }
        }

        // timestamps and permissions for everything that changed
        for &id in &ids {
            let node = match tree.node(id) {
                Some(n) => n,
                None => continue,
            };
            if !matches!(node.state, NodeState::MetaDirty | NodeState::Dirty) {
                continue;
            }
            if let Some(index) = node.archive_index {
                codec.set_times(index, unix_secs(node.mtime))?;
                codec.set_mode(index, node.full_mode())?;
            }
        }

        // original entries no longer referenced by any live node
        let live: BTreeSet<u64> = ids
            .iter()
            .filter_map(|&id| tree.node(id))
            .filter(|n| n.state != NodeState::DeletedHeld)
            .filter_map(|n| n.archive_index)
            .collect();
        for index in 0..*orig_count {
            if !live.contains(&index) {
                codec.delete(index)?;
            }
        }

        codec.close()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        node::{FileNode, NodeKind},
        session::{MountOptions, Session},
        stub_codec::{OpLog, StubCodec, StubOp},
        tree::ROOT_ID,
    };

    fn session_over(codec: StubCodec, readonly: bool) -> (Session, OpLog) {
        let log = codec.ops.clone();
        let session = Session::open(
            Box::new(codec),
            MountOptions {
                readonly,
                force_precise_time: false,
            },
            0,
            0,
        )
        .unwrap();
        (session, log)
    }

    fn overwrite(session: &mut Session, path: &str, data: &[u8]) {
        let id = session.tree.resolve(path).unwrap();
        session.materialize(id).unwrap();
        let node = session.tree.node_mut(id).unwrap();
        node.truncate(0);
        node.write(data, 0);
    }

    #[test]
    fn ops_run_in_write_rename_meta_delete_order() {
        let mut codec = StubCodec::new();
        codec.push_file("a.txt", b"old a");
        codec.push_file("b.txt", b"b");
        codec.push_file("c.txt", b"c");
        codec.push_dir("d");
        let (mut session, log) = session_over(codec, false);

        overwrite(&mut session, "a.txt", b"new a");
        session
            .tree
            .rename(ROOT_ID, "b.txt", ROOT_ID, "bb.txt")
            .unwrap();
        let c = session.tree.resolve("c.txt").unwrap();
        session.tree.remove_or_hold(c);
        let mut new_node = FileNode::new("n.txt", NodeKind::Regular, 0o644, 0, 0);
        new_node.mtime = crate::node::system_time_from_unix(42);
        session.tree.attach(ROOT_ID, new_node);

        session.commit().unwrap();

        let ops: Vec<StubOp> = log.snapshot();
        assert_eq!(
            ops,
            vec![
                StubOp::Replace(0),
                StubOp::Add("n.txt".into()),
                StubOp::Rename(1, "bb.txt".into()),
                StubOp::SetTimes(0, unix_mtime(&session, "a.txt")),
                StubOp::SetMode(0, 0o100644),
                StubOp::SetTimes(1, unix_mtime(&session, "bb.txt")),
                StubOp::SetMode(1, 0o100644),
                StubOp::Delete(2),
                StubOp::Close,
            ]
        );
    }

    fn unix_mtime(session: &Session, path: &str) -> i64 {
        let id = session.tree.resolve(path).unwrap();
        crate::node::unix_secs(session.tree.node(id).unwrap().mtime)
    }

    #[test]
    fn new_directory_is_added_with_trailing_slash() {
        let codec = StubCodec::new();
        let (mut session, log) = session_over(codec, false);
        session
            .tree
            .attach(ROOT_ID, FileNode::new("newdir", NodeKind::Directory, 0o755, 0, 0));
        session.commit().unwrap();
        assert!(log
            .snapshot()
            .contains(&StubOp::Add("newdir/".into())));
    }

    #[test]
    fn failure_discards_pending_changes() {
        let mut codec = StubCodec::new();
        codec.push_file("a.txt", b"a");
        codec.fail_rename = true;
        let (mut session, log) = session_over(codec, false);
        session
            .tree
            .rename(ROOT_ID, "a.txt", ROOT_ID, "z.txt")
            .unwrap();

        assert!(session.commit().is_err());
        let ops = log.snapshot();
        assert_eq!(ops.last(), Some(&StubOp::Discard));
        assert!(!ops.contains(&StubOp::Close));
    }

    #[test]
    fn readonly_mount_commits_nothing() {
        let mut codec = StubCodec::new();
        codec.push_file("a.txt", b"a");
        let (mut session, log) = session_over(codec, true);
        session.commit().unwrap();
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn untouched_mount_only_closes() {
        let mut codec = StubCodec::new();
        codec.push_file("a.txt", b"a");
        codec.push_dir("d");
        let (mut session, log) = session_over(codec, false);
        session.commit().unwrap();
        assert_eq!(log.snapshot(), vec![StubOp::Close]);
    }

    #[test]
    fn pseudo_entries_survive_commit_untouched() {
        let mut codec = StubCodec::new();
        codec.push_file("/etc/passwd", b"x");
        codec.push_file("ok.txt", b"y");
        let (mut session, log) = session_over(codec, false);
        let ok = session.tree.resolve("ok.txt").unwrap();
        session.tree.remove_or_hold(ok);
        session.commit().unwrap();
        // only the in-root file is deleted; the escaped entry stays
        assert_eq!(
            log.snapshot(),
            vec![StubOp::Delete(1), StubOp::Close]
        );
    }
}
