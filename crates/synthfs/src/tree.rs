// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide the in-memory synthetic tree that hosts diagnostic files.
// Author: Lukas Bower

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::{Exposure, FileHandle, FileOps, FsError, Mode, NodeId, OpenFlags, Signal};

enum NodeKind {
    Dir,
    File { mode: Mode, ops: Arc<dyn FileOps> },
}

struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

#[derive(Default)]
struct TreeState {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
}

impl TreeState {
    fn child(&self, parent: Option<NodeId>, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.parent == parent && node.name == name)
            .map(|(id, _)| *id)
    }

    fn has_children(&self, id: NodeId) -> bool {
        self.nodes.values().any(|node| node.parent == Some(id))
    }

    fn check_parent(&self, parent: Option<NodeId>) -> Result<(), FsError> {
        match parent {
            None => Ok(()),
            Some(id) => match self.nodes.get(&id) {
                Some(Node {
                    kind: NodeKind::Dir,
                    ..
                }) => Ok(()),
                Some(_) => Err(FsError::InvalidArgument),
                None => Err(FsError::NotFound),
            },
        }
    }

    fn insert(&mut self, name: &str, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        self.next_id += 1;
        let id = NodeId::from_raw(self.next_id);
        self.nodes.insert(
            id,
            Node {
                name: name.to_owned(),
                parent,
                kind,
            },
        );
        id
    }
}

/// In-memory synthetic filesystem.
///
/// Nodes live in a flat map keyed by [`NodeId`]; the root is implicit and is
/// addressed as `parent = None`.
pub struct SyntheticFs {
    state: Mutex<TreeState>,
    supported: bool,
}

impl fmt::Debug for SyntheticFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticFs")
            .field("nodes", &self.lock().nodes.len())
            .field("supported", &self.supported)
            .finish()
    }
}

impl Default for SyntheticFs {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticFs {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TreeState::default()),
            supported: true,
        }
    }

    /// Create a tree whose registration primitives report
    /// [`FsError::Unsupported`], as on a host built without the mechanism.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            state: Mutex::new(TreeState::default()),
            supported: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TreeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Resolve a slash separated path relative to the root.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let state = self.lock();
        let mut current: Option<NodeId> = None;
        let mut found = false;
        for part in path.split('/').filter(|part| !part.is_empty()) {
            current = Some(state.child(current, part)?);
            found = true;
        }
        if found {
            current
        } else {
            None
        }
    }

    /// Whether a node is still present.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.lock().nodes.contains_key(&node)
    }

    /// Names of the entries directly under `parent`, sorted.
    #[must_use]
    pub fn list(&self, parent: Option<NodeId>) -> Vec<String> {
        let state = self.lock();
        let mut names: Vec<String> = state
            .nodes
            .values()
            .filter(|node| node.parent == parent)
            .map(|node| node.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Permission bits of the file at `path`.
    #[must_use]
    pub fn mode(&self, path: &str) -> Option<Mode> {
        let id = self.lookup(path)?;
        match &self.lock().nodes.get(&id)?.kind {
            NodeKind::File { mode, .. } => Some(*mode),
            NodeKind::Dir => None,
        }
    }

    /// Open the file at `path` with a signal that never fires.
    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle, FsError> {
        self.open_with_signal(path, flags, Signal::none())
    }

    /// Open the file at `path`; blocking waits issued through the handle
    /// observe `signal`.
    pub fn open_with_signal(
        &self,
        path: &str,
        flags: OpenFlags,
        signal: Signal,
    ) -> Result<FileHandle, FsError> {
        if flags.is_empty() {
            return Err(FsError::InvalidArgument);
        }
        let id = self.lookup(path).ok_or(FsError::NotFound)?;
        let ops = {
            let state = self.lock();
            let node = state.nodes.get(&id).ok_or(FsError::NotFound)?;
            match &node.kind {
                NodeKind::Dir => return Err(FsError::InvalidArgument),
                NodeKind::File { mode, ops } => {
                    if flags.contains(OpenFlags::READ) && !mode.readable() {
                        return Err(FsError::PermissionDenied);
                    }
                    if flags.contains(OpenFlags::WRITE) && !mode.writable() {
                        return Err(FsError::PermissionDenied);
                    }
                    Arc::clone(ops)
                }
            }
        };
        // The provider may block; the tree lock is not held across open.
        let file = ops.open(id, flags)?;
        debug!("opened {} ({}) with {:?}", path, id, flags);
        Ok(FileHandle::new(file, flags, signal))
    }
}

fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidArgument);
    }
    Ok(())
}

impl Exposure for SyntheticFs {
    fn create_dir(&self, name: &str, parent: Option<NodeId>) -> Result<NodeId, FsError> {
        if !self.supported {
            return Err(FsError::Unsupported);
        }
        validate_name(name)?;
        let mut state = self.lock();
        state.check_parent(parent)?;
        if state.child(parent, name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let id = state.insert(name, parent, NodeKind::Dir);
        debug!("created directory {} as {}", name, id);
        Ok(id)
    }

    fn create_file(
        &self,
        name: &str,
        mode: Mode,
        parent: Option<NodeId>,
        ops: Arc<dyn FileOps>,
    ) -> Result<NodeId, FsError> {
        if !self.supported {
            return Err(FsError::Unsupported);
        }
        validate_name(name)?;
        let mut state = self.lock();
        state.check_parent(parent)?;
        if state.child(parent, name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let id = state.insert(name, parent, NodeKind::File { mode, ops });
        debug!("created file {} ({:o}) as {}", name, mode.bits(), id);
        Ok(id)
    }

    fn remove(&self, node: NodeId) {
        let mut state = self.lock();
        if !state.nodes.contains_key(&node) {
            debug!("remove of unknown {} ignored", node);
            return;
        }
        if state.has_children(node) {
            warn!("refusing to remove non-empty directory {}", node);
            return;
        }
        state.nodes.remove(&node);
        debug!("removed {}", node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpenFile;

    struct Empty;

    impl OpenFile for Empty {}

    impl FileOps for Empty {
        fn open(&self, _node: NodeId, _flags: OpenFlags) -> Result<Box<dyn OpenFile>, FsError> {
            Ok(Box::new(Empty))
        }
    }

    #[test]
    fn lookup_walks_nested_paths() {
        let fs = SyntheticFs::new();
        let dir = fs.create_dir("sample", None).expect("dir");
        let file = fs
            .create_file("output", Mode::READ_ALL, Some(dir), Arc::new(Empty))
            .expect("file");
        assert_eq!(fs.lookup("sample/output"), Some(file));
        assert_eq!(fs.lookup("/sample/"), Some(dir));
        assert_eq!(fs.lookup("sample/missing"), None);
        assert_eq!(fs.lookup(""), None);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let fs = SyntheticFs::new();
        fs.create_dir("sample", None).expect("dir");
        assert_eq!(fs.create_dir("sample", None), Err(FsError::AlreadyExists));
        assert_eq!(fs.create_dir("a/b", None), Err(FsError::InvalidArgument));
    }

    #[test]
    fn non_empty_directory_survives_remove() {
        let fs = SyntheticFs::new();
        let dir = fs.create_dir("sample", None).expect("dir");
        let file = fs
            .create_file("output", Mode::READ_ALL, Some(dir), Arc::new(Empty))
            .expect("file");
        fs.remove(dir);
        assert!(fs.contains(dir));
        fs.remove(file);
        fs.remove(dir);
        assert!(!fs.contains(dir));
        assert!(fs.list(None).is_empty());
    }

    #[test]
    fn mode_is_enforced_on_open() {
        let fs = SyntheticFs::new();
        fs.create_file("output", Mode::READ_ALL, None, Arc::new(Empty))
            .expect("file");
        assert_eq!(
            fs.open("output", OpenFlags::WRITE).map(|_| ()),
            Err(FsError::PermissionDenied)
        );
        assert!(fs.open("output", OpenFlags::READ).is_ok());
    }

    #[test]
    fn unsupported_tree_rejects_registration() {
        let fs = SyntheticFs::unsupported();
        assert_eq!(fs.create_dir("sample", None), Err(FsError::Unsupported));
    }
}
