//! The shared indexed result store: every target entry behind its own lock
//! so pipeline tasks write only to their own slot, plus a single-writer
//! checkpoint path serializing the whole collection to one JSON document.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::sync::Mutex;

use crate::domain::TargetEntry;

pub async fn load_entries(path: &Path) -> anyhow::Result<Vec<TargetEntry>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read entry store at {}", path.display()))?;
    let mut entries: Vec<TargetEntry> =
        serde_json::from_str(&raw).context("Failed to parse entry store")?;
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.index = index;
    }
    Ok(entries)
}

/// Missing store file means an empty collection; the intake command starts
/// from nothing on a fresh checkout.
pub async fn load_entries_or_default(path: &Path) -> anyhow::Result<Vec<TargetEntry>> {
    match tokio::fs::try_exists(path).await? {
        true => load_entries(path).await,
        false => Ok(vec![]),
    }
}

pub async fn save_entries(path: &Path, entries: &[TargetEntry]) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(entries).context("Failed to serialize entry store")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write entry store at {}", path.display()))?;
    Ok(())
}

pub struct EntryStore {
    path: PathBuf,
    slots: Vec<Mutex<TargetEntry>>,
    write_guard: Mutex<()>,
}

impl EntryStore {
    pub fn from_entries(path: &Path, mut entries: Vec<TargetEntry>) -> Self {
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.index = index;
        }
        EntryStore {
            path: path.to_path_buf(),
            slots: entries.into_iter().map(Mutex::new).collect(),
            write_guard: Mutex::new(()),
        }
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let entries = load_entries(path).await?;
        Ok(Self::from_entries(path, entries))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run a closure against one entry's slot. Slots are never contended
    /// across tasks since each task owns exactly one index.
    pub async fn with_entry<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut TargetEntry) -> R,
    ) -> Option<R> {
        let slot = self.slots.get(index)?;
        let mut entry = slot.lock().await;
        Some(f(&mut entry))
    }

    pub async fn snapshot(&self) -> Vec<TargetEntry> {
        let mut entries = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            entries.push(slot.lock().await.clone());
        }
        entries
    }

    /// Serialize the whole store. The write guard keeps two checkpoints from
    /// interleaving; in-flight tasks keep running since they only touch
    /// their own slots.
    pub async fn checkpoint(&self) -> anyhow::Result<()> {
        let _writer = self.write_guard.lock().await;
        let entries = self.snapshot().await;
        save_entries(&self.path, &entries).await
    }
}
