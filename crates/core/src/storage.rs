//! Vault storage: the folder tree notes are created in.
//!
//! All paths are vault-relative, `/`-separated and have no leading slash.
//! The empty string is the vault root. [`DirVault`] maps them onto a local
//! directory; [`MemoryVault`] keeps everything in memory for tests and
//! previews.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One direct child of a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    /// Vault-relative path.
    pub path: String,
    /// Last path component, including any extension.
    pub name: String,
    pub kind: EntryKind,
}

impl VaultEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// File name without its final extension (`a.b.md` -> `a.b`).
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) if i > 0 => &self.name[..i],
            _ => &self.name,
        }
    }
}

/// Normalize a vault-relative path: `\` becomes `/`, empty and `.` segments
/// are dropped and `..` is rejected.
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    let mut parts = Vec::new();
    for segment in path.trim().split(&['/', '\\'][..]) {
        match segment {
            "" | "." => continue,
            ".." => return Err(StorageError::InvalidPath(path.to_string())),
            s => parts.push(s),
        }
    }
    Ok(parts.join("/"))
}

/// Join a folder and a file name into a vault path.
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

fn name_of(path: &str) -> &str {
    path.rfind('/').map(|i| &path[i + 1..]).unwrap_or(path)
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Storage the creation flow reads from and writes to.
pub trait Vault: Send + Sync {
    /// Human-readable name (e.g. the root directory).
    fn name(&self) -> &str;

    /// Kind of the entry at `path`, or `None` if nothing exists there.
    fn kind(&self, path: &str) -> Result<Option<EntryKind>, StorageError>;

    /// Direct (non-recursive) children of `folder`.
    fn list(&self, folder: &str) -> Result<Vec<VaultEntry>, StorageError>;

    fn read(&self, path: &str) -> Result<String, StorageError>;

    /// Create a new file. Fails with [`StorageError::AlreadyExists`] if the
    /// path is taken. Missing parent folders are created.
    fn create(&self, path: &str, content: &str) -> Result<(), StorageError>;

    /// Create a folder and any missing parents. Existing folders are fine.
    fn create_folder(&self, path: &str) -> Result<(), StorageError>;

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.kind(path)?.is_some())
    }
}

// ---------------------------------------------------------------------------
// Directory backend
// ---------------------------------------------------------------------------

/// A vault rooted at a local directory.
pub struct DirVault {
    root: PathBuf,
    label: String,
}

impl DirVault {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let label = root.display().to_string();
        Self { root, label }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let normalized = normalize_path(path)?;
        let mut full = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            full.push(segment);
        }
        Ok(full)
    }
}

impl Vault for DirVault {
    fn name(&self) -> &str {
        &self.label
    }

    fn kind(&self, path: &str) -> Result<Option<EntryKind>, StorageError> {
        let full = self.resolve(path)?;
        match std::fs::metadata(&full) {
            Ok(m) if m.is_dir() => Ok(Some(EntryKind::Folder)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, folder: &str) -> Result<Vec<VaultEntry>, StorageError> {
        let folder = normalize_path(folder)?;
        match self.kind(&folder)? {
            None => return Err(StorageError::NotFound(folder)),
            Some(EntryKind::File) => return Err(StorageError::NotAFolder(folder)),
            Some(EntryKind::Folder) => {}
        }
        let children = std::fs::read_dir(self.resolve(&folder)?)?.map(|entry| -> std::io::Result<(String, bool)> {
            let entry = entry?;
            let is_dir = entry.file_type()?.is_dir();
            Ok((entry.file_name().to_string_lossy().into_owned(), is_dir))
        });
        collect_entries(&folder, children)
    }

    fn read(&self, path: &str) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(std::fs::read_to_string(full)?)
    }

    fn create(&self, path: &str, content: &str) -> Result<(), StorageError> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        self.create_folder(parent_of(&normalized))?;
        let full = self.resolve(&normalized)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&full) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(normalized))
            }
            Err(e) => return Err(e.into()),
        };
        write_or_remove(&mut file, &full, content)
    }

    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        if full.is_file() {
            return Err(StorageError::NotAFolder(path.to_string()));
        }
        std::fs::create_dir_all(full)?;
        Ok(())
    }
}

/// Entries of `folder` from `(name, is_dir)` results, sorted by name. The
/// first listing error aborts the whole listing.
fn collect_entries(
    folder: &str,
    children: impl Iterator<Item = std::io::Result<(String, bool)>>,
) -> Result<Vec<VaultEntry>, StorageError> {
    let mut entries = Vec::new();
    for child in children {
        let (name, is_dir) = child?;
        let kind = if is_dir { EntryKind::Folder } else { EntryKind::File };
        entries.push(VaultEntry {
            path: join_path(folder, &name),
            name,
            kind,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Write `content` to a freshly created file, deleting the file again if the
/// write fails so the name stays free.
fn write_or_remove(out: &mut impl Write, full: &Path, content: &str) -> Result<(), StorageError> {
    if let Err(e) = out.write_all(content.as_bytes()).and_then(|()| out.flush()) {
        if let Err(remove) = std::fs::remove_file(full) {
            tracing::warn!("Could not remove partial file {}: {}", full.display(), remove);
        }
        return Err(e.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    File(String),
    Folder,
}

/// A vault held entirely in memory. The root folder always exists.
#[derive(Debug, Default)]
pub struct MemoryVault {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style file insertion, overwriting anything at `path`.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        if let Ok(path) = normalize_path(path) {
            let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            insert_parents(&mut nodes, &path);
            nodes.insert(path, Node::File(content.to_string()));
        }
        self
    }

    pub fn with_folder(self, path: &str) -> Self {
        if let Ok(path) = normalize_path(path) {
            let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            insert_parents(&mut nodes, &path);
            if !path.is_empty() {
                nodes.insert(path, Node::Folder);
            }
        }
        self
    }
}

fn insert_parents(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let mut parent = parent_of(path);
    while !parent.is_empty() {
        nodes.entry(parent.to_string()).or_insert(Node::Folder);
        parent = parent_of(parent);
    }
}

impl Vault for MemoryVault {
    fn name(&self) -> &str {
        "(memory)"
    }

    fn kind(&self, path: &str) -> Result<Option<EntryKind>, StorageError> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Ok(Some(EntryKind::Folder));
        }
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(nodes.get(&path).map(|n| match n {
            Node::File(_) => EntryKind::File,
            Node::Folder => EntryKind::Folder,
        }))
    }

    fn list(&self, folder: &str) -> Result<Vec<VaultEntry>, StorageError> {
        let folder = normalize_path(folder)?;
        match self.kind(&folder)? {
            None => return Err(StorageError::NotFound(folder)),
            Some(EntryKind::File) => return Err(StorageError::NotAFolder(folder)),
            Some(EntryKind::Folder) => {}
        }
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(nodes
            .iter()
            .filter(|(path, _)| parent_of(path) == folder)
            .map(|(path, node)| VaultEntry {
                path: path.clone(),
                name: name_of(path).to_string(),
                kind: match node {
                    Node::File(_) => EntryKind::File,
                    Node::Folder => EntryKind::Folder,
                },
            })
            .collect())
    }

    fn read(&self, path: &str) -> Result<String, StorageError> {
        let normalized = normalize_path(path)?;
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(&normalized) {
            Some(Node::File(content)) => Ok(content.clone()),
            _ => Err(StorageError::NotFound(path.to_string())),
        }
    }

    fn create(&self, path: &str, content: &str) -> Result<(), StorageError> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.contains_key(&normalized) {
            return Err(StorageError::AlreadyExists(normalized));
        }
        let mut parent = parent_of(&normalized);
        while !parent.is_empty() {
            if let Some(Node::File(_)) = nodes.get(parent) {
                return Err(StorageError::NotAFolder(parent.to_string()));
            }
            parent = parent_of(parent);
        }
        insert_parents(&mut nodes, &normalized);
        nodes.insert(normalized, Node::File(content.to_string()));
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            return Ok(());
        }
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        match nodes.get(&normalized) {
            Some(Node::File(_)) => Err(StorageError::NotAFolder(normalized)),
            Some(Node::Folder) => Ok(()),
            None => {
                insert_parents(&mut nodes, &normalized);
                nodes.insert(normalized, Node::Folder);
                Ok(())
            }
        }
    }
}
