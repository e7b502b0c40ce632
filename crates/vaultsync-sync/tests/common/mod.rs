//! In-memory fakes of both ports for reconciler and scheduler tests
#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, bail, Result};
use tokio::sync::Notify;
use vaultsync_core::{
    domain::{NamespaceHandle, RemoteFileRef, RemoteId, StorageMode, VaultPath},
    ports::{ILocalFileSystem, IRemoteDrive},
};
use vaultsync_drive::DriveError;
use vaultsync_sync::reconciler::Reconciler;

pub fn vp(s: &str) -> VaultPath {
    VaultPath::new(s).unwrap()
}

pub fn reconciler(local: &Arc<FakeLocal>, remote: &Arc<FakeRemote>, mode: StorageMode) -> Reconciler {
    Reconciler::new(local.clone(), remote.clone(), mode)
}

// ============================================================================
// FakeLocal
// ============================================================================

/// Vault held in a sorted map
#[derive(Default)]
pub struct FakeLocal {
    files: Mutex<BTreeMap<VaultPath, Vec<u8>>>,
}

impl FakeLocal {
    pub fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
        let local = Self::default();
        for (path, content) in files {
            local.put(path, content);
        }
        Arc::new(local)
    }

    pub fn put(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(vp(path), content.as_bytes().to_vec());
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(&vp(path));
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&vp(path))
            .map(|c| String::from_utf8(c.clone()).unwrap())
    }
}

#[async_trait::async_trait]
impl ILocalFileSystem for FakeLocal {
    async fn list_files(&self) -> Result<Vec<VaultPath>> {
        Ok(self.files.lock().unwrap().keys().cloned().collect())
    }

    async fn read(&self, path: &VaultPath) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {path}"))
    }

    async fn create(&self, path: &VaultPath, content: &[u8]) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.clone(), content.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &VaultPath) -> Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }
}

// ============================================================================
// FakeRemote
// ============================================================================

#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub content: Vec<u8>,
}

/// Number of calls per port operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Calls {
    pub resolve: usize,
    pub folder_create: usize,
    pub find: usize,
    pub list: usize,
    pub create: usize,
    pub update: usize,
    pub rename: usize,
    pub delete: usize,
    pub download: usize,
}

#[derive(Default)]
struct State {
    next_id: u64,
    files: Vec<RemoteEntry>,
    folders: Vec<(String, String)>,
    calls: Calls,
    failing: HashSet<String>,
    fail_namespace: bool,
    fail_auth: bool,
    block_listing: Option<Arc<Notify>>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// Drive held in memory; files are matched by name and parent like the
/// real query filters
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
    /// Notified when a blocked listing starts waiting
    pub listing_started: Notify,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a file directly under `parent`, returning its id
    pub fn seed(&self, parent: &str, name: &str, content: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("file");
        state.files.push(RemoteEntry {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.to_string(),
            content: content.as_bytes().to_vec(),
        });
        id
    }

    /// Adds a file to the hidden app space
    pub fn seed_hidden(&self, name: &str, content: &str) -> String {
        self.seed(NamespaceHandle::hidden().parent_id(), name, content)
    }

    /// Makes create, update and download fail for `name`
    pub fn fail_on(&self, name: &str) {
        self.state.lock().unwrap().failing.insert(name.to_string());
    }

    pub fn fail_namespace(&self) {
        self.state.lock().unwrap().fail_namespace = true;
    }

    /// Rejects every file request as if the refresh token were revoked
    pub fn fail_auth(&self) {
        self.state.lock().unwrap().fail_auth = true;
    }

    /// Blocks the next listing until the returned handle is notified
    pub fn block_next_listing(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        self.state.lock().unwrap().block_listing = Some(release.clone());
        release
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn files(&self) -> Vec<RemoteEntry> {
        self.state.lock().unwrap().files.clone()
    }

    pub fn folders(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().folders.clone()
    }

    pub fn entries_named(&self, name: &str) -> Vec<RemoteEntry> {
        self.files().into_iter().filter(|f| f.name == name).collect()
    }

    fn check_auth(state: &State) -> Result<()> {
        if state.fail_auth {
            return Err(anyhow::Error::new(DriveError::Unauthorized(
                "refresh token revoked".into(),
            ))
            .context("Drive request failed"));
        }
        Ok(())
    }

    fn to_ref(entry: &RemoteEntry) -> RemoteFileRef {
        RemoteFileRef {
            id: RemoteId::new(entry.id.clone()).unwrap(),
            name: entry.name.clone(),
            parent: Some(entry.parent.clone()),
        }
    }
}

#[async_trait::async_trait]
impl IRemoteDrive for FakeRemote {
    async fn resolve_namespace(&self, mode: &StorageMode) -> Result<NamespaceHandle> {
        let mut state = self.state.lock().unwrap();
        state.calls.resolve += 1;
        if state.fail_namespace {
            bail!("folder lookup failed");
        }

        match mode {
            StorageMode::Hidden => Ok(NamespaceHandle::hidden()),
            StorageMode::Visible { folder_name } => {
                if let Some((id, _)) = state.folders.iter().find(|(_, n)| n == folder_name) {
                    return Ok(NamespaceHandle::visible(id.clone()));
                }
                let id = state.next_id("folder");
                state.folders.push((id.clone(), folder_name.clone()));
                state.calls.folder_create += 1;
                Ok(NamespaceHandle::visible(id))
            }
        }
    }

    async fn find_by_name(&self, namespace: &NamespaceHandle, name: &str) -> Result<Vec<RemoteFileRef>> {
        let mut state = self.state.lock().unwrap();
        state.calls.find += 1;
        Self::check_auth(&state)?;
        Ok(state
            .files
            .iter()
            .filter(|f| f.name == name && f.parent == namespace.parent_id())
            .map(Self::to_ref)
            .collect())
    }

    async fn list_files(&self, namespace: &NamespaceHandle) -> Result<Vec<RemoteFileRef>> {
        let block = {
            let mut state = self.state.lock().unwrap();
            state.calls.list += 1;
            state.block_listing.take()
        };
        if let Some(release) = block {
            self.listing_started.notify_one();
            release.notified().await;
        }

        let state = self.state.lock().unwrap();
        Self::check_auth(&state)?;
        Ok(state
            .files
            .iter()
            .filter(|f| f.parent == namespace.parent_id())
            .map(Self::to_ref)
            .collect())
    }

    async fn create_file(&self, namespace: &NamespaceHandle, name: &str, content: &[u8]) -> Result<RemoteFileRef> {
        let mut state = self.state.lock().unwrap();
        state.calls.create += 1;
        Self::check_auth(&state)?;
        if state.failing.contains(name) {
            bail!("create rejected for {name}");
        }
        let entry = RemoteEntry {
            id: state.next_id("file"),
            name: name.to_string(),
            parent: namespace.parent_id().to_string(),
            content: content.to_vec(),
        };
        let created = Self::to_ref(&entry);
        state.files.push(entry);
        Ok(created)
    }

    async fn update_content(&self, id: &RemoteId, content: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.update += 1;
        let failing = state.failing.clone();
        let entry = state
            .files
            .iter_mut()
            .find(|f| f.id == id.as_str())
            .ok_or_else(|| anyhow!("file not found: {id}"))?;
        if failing.contains(&entry.name) {
            bail!("update rejected for {}", entry.name);
        }
        entry.content = content.to_vec();
        Ok(())
    }

    async fn rename(&self, id: &RemoteId, new_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.rename += 1;
        let entry = state
            .files
            .iter_mut()
            .find(|f| f.id == id.as_str())
            .ok_or_else(|| anyhow!("file not found: {id}"))?;
        entry.name = new_name.to_string();
        Ok(())
    }

    async fn delete(&self, id: &RemoteId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;
        let before = state.files.len();
        state.files.retain(|f| f.id != id.as_str());
        if state.files.len() == before {
            bail!("file not found: {id}");
        }
        Ok(())
    }

    async fn download(&self, id: &RemoteId) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.calls.download += 1;
        let entry = state
            .files
            .iter()
            .find(|f| f.id == id.as_str())
            .ok_or_else(|| anyhow!("file not found: {id}"))?;
        if state.failing.contains(&entry.name) {
            bail!("download rejected for {}", entry.name);
        }
        Ok(entry.content.clone())
    }
}
