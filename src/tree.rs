use std::{collections::BTreeMap, time::UNIX_EPOCH};

use libc::c_int;

use crate::{
    codec::{ArchiveCodec, EntryStat},
    error::Error,
    node::{system_time_from_unix, FileNode, NodeId, NodeKind, NodeState},
};

/// The mount root; equals `fuser::FUSE_ROOT_ID`.
pub const ROOT_ID: NodeId = 1;
/// Invisible sibling of the root holding entries whose stored names escape
/// the archive root. Never listed, never mutated, preserved verbatim.
pub const PSEUDO_ROOT_ID: NodeId = 2;

/// Where a stored entry name lands after normalization.
#[derive(Debug, PartialEq)]
enum StoredPath {
    Rooted(Vec<String>),
    Escaped,
}

fn classify(stored: &str) -> StoredPath {
    if stored.is_empty() || stored.starts_with('/') {
        return StoredPath::Escaped;
    }
    let comps: Vec<String> = stored
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .map(str::to_string)
        .collect();
    if comps.is_empty() || comps.iter().any(|c| c == "..") {
        return StoredPath::Escaped;
    }
    StoredPath::Rooted(comps)
}

/// Single source of truth for path resolution: owns every node and the
/// canonical `full_path -> node` index.
pub struct NodeTree {
    nodes: BTreeMap<NodeId, FileNode>,
    paths: BTreeMap<String, NodeId>,
    next_id: NodeId,
}

impl NodeTree {
    pub fn new(uid: u32, gid: u32) -> Self {
        let mut nodes = BTreeMap::new();
        let mut root = FileNode::new("", NodeKind::Directory, 0o755, uid, gid);
        root.state = NodeState::Clean;
        nodes.insert(ROOT_ID, root);
        let mut pseudo = FileNode::new("", NodeKind::Directory, 0o755, uid, gid);
        pseudo.state = NodeState::Clean;
        nodes.insert(PSEUDO_ROOT_ID, pseudo);
        NodeTree {
            nodes,
            paths: BTreeMap::new(),
            next_id: PSEUDO_ROOT_ID + 1,
        }
    }

    /// Reconstructs the hierarchy from the archive's flat entry list,
    /// synthesizing missing intermediate directories and routing escaping
    /// names to the pseudo-root. Codec errors abort the mount.
    pub fn build(codec: &dyn ArchiveCodec, uid: u32, gid: u32) -> Result<Self, Error> {
        let mut tree = NodeTree::new(uid, gid);
        for index in 0..codec.num_entries() {
            let name = codec.entry_name(index)?;
            let stat = codec.entry_stat(index)?;
            tree.insert_archive_entry(index, &name, &stat, uid, gid);
        }
        Ok(tree)
    }

    pub fn node(&self, id: NodeId) -> Option<&FileNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut FileNode> {
        self.nodes.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn lookup(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(&parent)?.children.get(name).copied()
    }

    /// Canonicalizes and resolves an in-root path; `/` and `""` name the
    /// root itself.
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        match classify(path.trim_start_matches('/')) {
            StoredPath::Rooted(comps) => self.paths.get(&comps.join("/")).copied(),
            StoredPath::Escaped if path == "/" || path.is_empty() => Some(ROOT_ID),
            StoredPath::Escaped => None,
        }
    }

    /// Resolves a stored entry name the way the build pass routed it,
    /// reaching pseudo entries that directory listing never shows.
    pub fn resolve_stored(&self, stored: &str) -> Option<NodeId> {
        match classify(stored) {
            StoredPath::Rooted(_) => self.resolve(stored),
            StoredPath::Escaped => self
                .nodes
                .get(&PSEUDO_ROOT_ID)
                .and_then(|p| p.children.get(stored))
                .copied(),
        }
    }

    /// Link count per POSIX: directories count `.`, their parent entry and
    /// one per child directory.
    pub fn nlink(&self, id: NodeId) -> u32 {
        match self.nodes.get(&id) {
            Some(node) if node.is_dir() => {
                2 + node
                    .children
                    .values()
                    .filter(|c| self.nodes.get(c).map(|n| n.is_dir()).unwrap_or(false))
                    .count() as u32
            }
            _ => 1,
        }
    }

    pub fn attr(&self, id: NodeId) -> Option<fuser::FileAttr> {
        Some(self.nodes.get(&id)?.attr(id, self.nlink(id)))
    }

    /// Inserts `node` under `parent`, wiring the child link, the parent
    /// token and the path index.
    pub fn attach(&mut self, parent: NodeId, mut node: FileNode) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        let parent_path = self.nodes[&parent].full_path.clone();
        node.full_path = join_path(&parent_path, &node.name);
        node.parent = Some(parent);
        if parent != PSEUDO_ROOT_ID {
            self.paths.insert(node.full_path.clone(), id);
        }
        let name = node.name.clone();
        self.nodes.get_mut(&parent).unwrap().children.insert(name, id);
        self.nodes.insert(id, node);
        id
    }

    fn insert_archive_entry(
        &mut self,
        index: u64,
        stored: &str,
        stat: &EntryStat,
        uid: u32,
        gid: u32,
    ) {
        let is_dir = stat.is_dir || stored.ends_with('/');
        let kind = if is_dir {
            NodeKind::Directory
        } else {
            match stat.mode {
                Some(mode) => NodeKind::from_mode(mode, 0),
                None => NodeKind::Regular,
            }
        };
        let mode = stat
            .mode
            .map(|m| m & 0o7777)
            .unwrap_or(if is_dir { 0o755 } else { 0o644 });

        match classify(stored) {
            StoredPath::Escaped => {
                // keep the stored name verbatim; never listed, never written
                if let Some(&existing) = self.nodes[&PSEUDO_ROOT_ID].children.get(stored) {
                    let node = self.nodes.get_mut(&existing).unwrap();
                    node.archive_index = Some(index);
                    node.size = stat.size;
                    return;
                }
                let mut node = FileNode::new(stored, kind, mode, uid, gid);
                node.mtime = system_time_from_unix(stat.mtime);
                node.ctime = node.mtime;
                node.atime = node.mtime;
                node.size = stat.size;
                node.archive_index = Some(index);
                node.state = NodeState::Clean;
                self.attach(PSEUDO_ROOT_ID, node);
            }
            StoredPath::Rooted(comps) => {
                let mut cur = ROOT_ID;
                for comp in &comps[..comps.len() - 1] {
                    cur = match self.lookup(cur, comp) {
                        Some(child) => {
                            // an entry nested below a non-directory name
                            // forces that name to act as a directory
                            let node = self.nodes.get_mut(&child).unwrap();
                            if !node.is_dir() {
                                node.kind = NodeKind::Directory;
                            }
                            child
                        }
                        None => {
                            let mut dir = FileNode::new(comp, NodeKind::Directory, 0o755, uid, gid);
                            dir.mtime = UNIX_EPOCH;
                            dir.atime = UNIX_EPOCH;
                            dir.ctime = UNIX_EPOCH;
                            dir.state = NodeState::Clean;
                            self.attach(cur, dir)
                        }
                    };
                }
                let leaf = comps.last().unwrap();
                match self.lookup(cur, leaf) {
                    Some(existing) => {
                        // duplicate normalized path: last entry wins
                        let has_children = !self.nodes[&existing].children.is_empty();
                        let node = self.nodes.get_mut(&existing).unwrap();
                        node.archive_index = Some(index);
                        node.mtime = system_time_from_unix(stat.mtime);
                        node.mode = mode;
                        node.size = stat.size;
                        node.state = NodeState::Clean;
                        if !has_children || kind == NodeKind::Directory {
                            node.kind = kind;
                        }
                    }
                    None => {
                        let mut node = FileNode::new(leaf, kind, mode, uid, gid);
                        node.mtime = system_time_from_unix(stat.mtime);
                        node.atime = node.mtime;
                        node.ctime = node.mtime;
                        node.size = stat.size;
                        node.archive_index = Some(index);
                        node.state = NodeState::Clean;
                        self.attach(cur, node);
                    }
                }
            }
        }
    }

    /// True when `a` lies on `b`'s parent chain (or is `b` itself).
    fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
        let mut cur = Some(b);
        while let Some(id) = cur {
            if id == a {
                return true;
            }
            cur = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Removes the node from the name space. Open nodes linger as
    /// `DeletedHeld` until their last release; closed ones are dropped
    /// immediately.
    pub fn remove_or_hold(&mut self, id: NodeId) {
        let (name, parent, path) = {
            let node = &self.nodes[&id];
            (node.name.clone(), node.parent, node.full_path.clone())
        };
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.remove(&name);
            }
        }
        self.paths.remove(&path);
        let node = self.nodes.get_mut(&id).unwrap();
        if node.open_count > 0 {
            node.state = NodeState::DeletedHeld;
            node.parent = None;
        } else {
            self.nodes.remove(&id);
        }
    }

    /// Drops an open reference; evicts the node once a deletion held on
    /// open handles loses the last one.
    pub fn release(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.open_count = node.open_count.saturating_sub(1);
            if node.open_count == 0 && node.state == NodeState::DeletedHeld {
                self.nodes.remove(&id);
            }
        }
    }

    pub fn rename(
        &mut self,
        parent: NodeId,
        name: &str,
        newparent: NodeId,
        newname: &str,
    ) -> Result<(), c_int> {
        let from = self.lookup(parent, name).ok_or(libc::ENOENT)?;
        if !self.nodes.contains_key(&newparent) {
            return Err(libc::ENOENT);
        }
        if self.is_ancestor(from, newparent) {
            return Err(libc::EINVAL);
        }
        let from_is_dir = self.nodes[&from].is_dir();
        if let Some(to) = self.lookup(newparent, newname) {
            if to == from {
                return Ok(());
            }
            let target = &self.nodes[&to];
            if target.is_dir() {
                if !from_is_dir {
                    return Err(libc::EISDIR);
                }
                if !target.children.is_empty() {
                    return Err(libc::ENOTEMPTY);
                }
            } else if from_is_dir {
                return Err(libc::ENOTDIR);
            }
            self.remove_or_hold(to);
        }

        // detach, relabel, reattach, then rewrite every descendant path
        self.nodes.get_mut(&parent).unwrap().children.remove(name);
        {
            let node = self.nodes.get_mut(&from).unwrap();
            node.name = newname.to_string();
            node.parent = Some(newparent);
        }
        self.nodes
            .get_mut(&newparent)
            .unwrap()
            .children
            .insert(newname.to_string(), from);
        self.reindex(from);
        Ok(())
    }

    /// Recomputes `full_path` for a subtree after a move and refreshes the
    /// path index. Every touched node that was clean becomes meta-dirty so
    /// the committer renames its archive entry.
    fn reindex(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let (old_path, parent, name, children): (String, NodeId, String, Vec<NodeId>) = {
                let node = &self.nodes[&cur];
                (
                    node.full_path.clone(),
                    node.parent.unwrap(),
                    node.name.clone(),
                    node.children.values().copied().collect(),
                )
            };
            let parent_path = self.nodes[&parent].full_path.clone();
            let new_path = join_path(&parent_path, &name);
            self.paths.remove(&old_path);
            self.paths.insert(new_path.clone(), cur);
            let node = self.nodes.get_mut(&cur).unwrap();
            node.full_path = new_path;
            node.mark_meta_dirty();
            stack.extend(children);
        }
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
