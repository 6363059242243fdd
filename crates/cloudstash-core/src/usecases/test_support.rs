//! In-memory port implementations shared by the use case tests

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};

use crate::domain::{Fingerprint, MetadataChanges, NodeKind, RemoteId, RemoteNode};
use crate::ports::{
    ConnectResult, ContentReader, FileSystemState, IContentWriter, IFingerprintStore,
    ILocalFileSystem, IRemoteStore,
};

// ============================================================================
// Remote store
// ============================================================================

#[derive(Default)]
pub struct MockState {
    pub nodes: Vec<RemoteNode>,
    pub contents: HashMap<RemoteId, Vec<u8>>,
}

#[derive(Default)]
pub struct MockRemoteStore {
    pub state: Arc<Mutex<MockState>>,
    pub refuse_connect: AtomicBool,
    pub fail_query: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_open: AtomicBool,
    pub connect_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub folder_creates: AtomicUsize,
    pub file_creates: AtomicUsize,
    pub overwrites: AtomicUsize,
}

pub const ROOT_ID: &str = "root";

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_id() -> RemoteId {
        RemoteId::new(ROOT_ID.to_string()).unwrap()
    }

    /// Inserts a node directly, bypassing the port
    pub fn insert(&self, node: RemoteNode) -> RemoteNode {
        self.state.lock().unwrap().nodes.push(node.clone());
        node
    }

    pub fn node(&self, id: &RemoteId) -> Option<RemoteNode> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .iter()
            .find(|n| n.id() == id)
            .cloned()
    }

    pub fn content(&self, id: &RemoteId) -> Option<Vec<u8>> {
        self.state.lock().unwrap().contents.get(id).cloned()
    }

    pub fn children(&self, parent: &RemoteId) -> Vec<RemoteNode> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .iter()
            .filter(|n| n.parent_id() == Some(parent))
            .cloned()
            .collect()
    }

    pub fn trash(&self, id: &RemoteId) {
        let mut state = self.state.lock().unwrap();
        if let Some(node) = state.nodes.iter_mut().find(|n| n.id() == id) {
            *node = node.clone().with_trashed(true);
        }
    }
}

#[async_trait::async_trait]
impl IRemoteStore for MockRemoteStore {
    async fn connect(&self) -> ConnectResult {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connect.load(Ordering::SeqCst) {
            ConnectResult::failed("network unreachable")
        } else {
            ConnectResult::connected()
        }
    }

    async fn root(&self) -> anyhow::Result<RemoteNode> {
        Ok(RemoteNode::new(Self::root_id(), None, "", NodeKind::Folder, None))
    }

    async fn query_children(
        &self,
        parent: &RemoteId,
        marker: &str,
    ) -> anyhow::Result<Vec<RemoteNode>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            bail!("query rejected");
        }
        Ok(self
            .children(parent)
            .into_iter()
            .filter(|n| n.marker() == Some(marker))
            .collect())
    }

    async fn create_folder(
        &self,
        parent: &RemoteId,
        metadata: &MetadataChanges,
    ) -> anyhow::Result<RemoteNode> {
        if self.fail_create.load(Ordering::SeqCst) {
            bail!("create rejected");
        }
        self.folder_creates.fetch_add(1, Ordering::SeqCst);
        let mut node = RemoteNode::new(
            RemoteId::generate(),
            Some(parent.clone()),
            "",
            NodeKind::Folder,
            None,
        );
        node.apply(metadata);
        Ok(self.insert(node))
    }

    async fn create_file(&self, parent: &RemoteId) -> anyhow::Result<Box<dyn IContentWriter>> {
        if self.fail_create.load(Ordering::SeqCst) {
            bail!("create rejected");
        }
        self.file_creates.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockWriter {
            state: Arc::clone(&self.state),
            target: WriteTarget::New(parent.clone()),
            buffer: Vec::new(),
        }))
    }

    async fn open_for_overwrite(
        &self,
        node: &RemoteId,
    ) -> anyhow::Result<Box<dyn IContentWriter>> {
        if self.fail_open.load(Ordering::SeqCst) {
            bail!("open rejected");
        }
        self.node(node).ok_or_else(|| anyhow!("no such node"))?;
        self.overwrites.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockWriter {
            state: Arc::clone(&self.state),
            target: WriteTarget::Existing(node.clone()),
            buffer: Vec::new(),
        }))
    }

    async fn update_metadata(
        &self,
        node: &RemoteId,
        changes: &MetadataChanges,
    ) -> anyhow::Result<RemoteNode> {
        let mut state = self.state.lock().unwrap();
        let found = state
            .nodes
            .iter_mut()
            .find(|n| n.id() == node)
            .ok_or_else(|| anyhow!("no such node"))?;
        found.apply(changes);
        Ok(found.clone())
    }

    async fn request_sync(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

enum WriteTarget {
    New(RemoteId),
    Existing(RemoteId),
}

struct MockWriter {
    state: Arc<Mutex<MockState>>,
    target: WriteTarget,
    buffer: Vec<u8>,
}

#[async_trait::async_trait]
impl IContentWriter for MockWriter {
    async fn write(&mut self, chunk: &[u8]) -> anyhow::Result<()> {
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    async fn commit(self: Box<Self>, metadata: &MetadataChanges) -> anyhow::Result<RemoteNode> {
        let MockWriter {
            state,
            target,
            buffer,
        } = *self;
        let mut state = state.lock().unwrap();
        let size = buffer.len() as u64;
        let node = match target {
            WriteTarget::New(parent) => {
                let mut node =
                    RemoteNode::new(RemoteId::generate(), Some(parent), "", NodeKind::File, None)
                        .with_size(size);
                node.apply(metadata);
                state.nodes.push(node.clone());
                node
            }
            WriteTarget::Existing(id) => {
                let found = state
                    .nodes
                    .iter_mut()
                    .find(|n| n.id() == &id)
                    .ok_or_else(|| anyhow!("node vanished"))?;
                *found = found.clone().with_size(size);
                found.apply(metadata);
                found.clone()
            }
        };
        state.contents.insert(node.id().clone(), buffer);
        Ok(node)
    }
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Filesystem holding file contents and directory names in memory
#[derive(Default)]
pub struct MockFileSystem {
    pub files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    pub dirs: Mutex<Vec<PathBuf>>,
    pub fail_reads: AtomicBool,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.to_vec());
    }

    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        self.dirs.lock().unwrap().push(path.into());
    }

    /// Deterministic stand-in for a content digest
    pub fn digest(content: &[u8]) -> Fingerprint {
        let mut bytes = [0u8; Fingerprint::LEN];
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        bytes[..8].copy_from_slice(&hasher.finish().to_le_bytes());
        (content.len() as u64).hash(&mut hasher);
        bytes[8..].copy_from_slice(&hasher.finish().to_le_bytes());
        Fingerprint::new(bytes)
    }
}

#[async_trait::async_trait]
impl ILocalFileSystem for MockFileSystem {
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState> {
        if let Some(content) = self.files.lock().unwrap().get(path) {
            return Ok(FileSystemState {
                exists: true,
                is_file: true,
                is_dir: false,
                size: content.len() as u64,
                modified: None,
            });
        }
        if self.dirs.lock().unwrap().iter().any(|d| d == path) {
            return Ok(FileSystemState {
                exists: true,
                is_file: false,
                is_dir: true,
                size: 0,
                modified: None,
            });
        }
        Ok(FileSystemState::not_found())
    }

    async fn list_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut children: Vec<PathBuf> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .chain(self.dirs.lock().unwrap().iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        children.sort();
        Ok(children)
    }

    async fn compute_fingerprint(&self, path: &Path) -> anyhow::Result<Fingerprint> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("permission denied");
        }
        let files = self.files.lock().unwrap();
        let content = files.get(path).ok_or_else(|| anyhow!("no such file"))?;
        Ok(Self::digest(content))
    }

    async fn open_read(&self, path: &Path) -> anyhow::Result<ContentReader> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("permission denied");
        }
        let content = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file"))?;
        Ok(Box::new(std::io::Cursor::new(content)))
    }
}

// ============================================================================
// Fingerprint store
// ============================================================================

#[derive(Default)]
pub struct MockFingerprintStore {
    pub saved: Mutex<HashMap<String, Fingerprint>>,
    pub saves: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl MockFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Fingerprint> {
        self.saved.lock().unwrap().get(name).copied()
    }
}

#[async_trait::async_trait]
impl IFingerprintStore for MockFingerprintStore {
    async fn load(&self, file_name: &str) -> anyhow::Result<Option<Fingerprint>> {
        Ok(self.get(file_name))
    }

    async fn save(&self, file_name: &str, fingerprint: &Fingerprint) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("read-only filesystem");
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.saved
            .lock()
            .unwrap()
            .insert(file_name.to_string(), *fingerprint);
        Ok(())
    }
}
