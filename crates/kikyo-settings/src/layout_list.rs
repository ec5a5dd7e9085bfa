use crate::error::{Error, Result};
use crate::gateway::BackendGateway;
use crate::status::StatusLine;
use crate::types::{LayoutEntry, LayoutId, LoadResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the list view renders: entries in display order plus the active id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListSnapshot {
    pub entries: Vec<LayoutEntry>,
    pub active_id: Option<LayoutId>,
}

impl ListSnapshot {
    pub fn ids(&self) -> Vec<LayoutId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }
}

type ChangeCallback = Arc<dyn Fn(&ListSnapshot) + Send + Sync>;

/// Ordered layout entries with at most one active entry.
///
/// Every mutation is applied in memory first and then sent to the backend.
/// When the backend call fails the list is refetched so the view never keeps
/// showing a state the backend does not hold.
pub struct LayoutEntryList {
    gateway: BackendGateway,
    status: StatusLine,
    state: Mutex<ListSnapshot>,
    on_change: Mutex<Option<ChangeCallback>>,
}

impl LayoutEntryList {
    pub fn new(gateway: BackendGateway, status: StatusLine) -> Self {
        Self {
            gateway,
            status,
            state: Mutex::new(ListSnapshot::default()),
            on_change: Mutex::new(None),
        }
    }

    /// Registers the re-render hook, called after every in-memory change.
    pub fn set_on_change(&self, cb: impl Fn(&ListSnapshot) + Send + Sync + 'static) {
        *self.on_change.lock() = Some(Arc::new(cb));
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn snapshot(&self) -> ListSnapshot {
        self.state.lock().clone()
    }

    pub fn entries(&self) -> Vec<LayoutEntry> {
        self.state.lock().entries.clone()
    }

    pub fn ids(&self) -> Vec<LayoutId> {
        self.state.lock().ids()
    }

    pub fn active_id(&self) -> Option<LayoutId> {
        self.state.lock().active_id.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    fn notify(&self) {
        let cb = self.on_change.lock().clone();
        if let Some(cb) = cb {
            let snapshot = self.snapshot();
            cb(&snapshot);
        }
    }

    fn replace(&self, snapshot: ListSnapshot) {
        *self.state.lock() = snapshot;
        self.notify();
    }

    fn fail<T>(&self, what: &str, e: Error) -> Result<T> {
        self.status.set(format!("{what}: {e}"));
        Err(e)
    }

    /// Replaces entries and active id wholesale with the backend's.
    pub async fn refresh(&self) -> Result<()> {
        match self.gateway.get_layout_entries().await {
            Ok(reply) => {
                debug!(
                    "refreshed {} layout entries (active: {:?})",
                    reply.entries.len(),
                    reply.active_layout_id
                );
                self.replace(ListSnapshot {
                    entries: reply.entries,
                    active_id: reply.active_layout_id,
                });
                Ok(())
            }
            Err(e) => self.fail("Failed to load layout list", e),
        }
    }

    /// Discards optimistic state after a failed mutation.
    ///
    /// Falls back to `before` when the backend cannot be reached either.
    async fn reconcile(&self, before: ListSnapshot) {
        if let Err(e) = self.refresh().await {
            warn!("reconcile failed ({}); restoring previous list", e);
            self.replace(before);
        }
    }

    /// Registers a layout file. The first entry of an empty list is activated.
    pub async fn create(&self, path: &str) -> Result<LayoutEntry> {
        let path = path.trim();
        if path.is_empty() {
            return self.fail("Failed to add layout", Error::rejected("Path is empty"));
        }

        let before = self.snapshot();
        let was_empty = before.entries.is_empty();
        let entry = match self.gateway.create_layout_entry_from_path(path).await {
            Ok(entry) => entry,
            Err(e) => {
                self.reconcile(before).await;
                return self.fail("Failed to add layout", e);
            }
        };
        info!("Layout entry created: {} ({})", entry.id, entry.path);

        {
            let mut st = self.state.lock();
            st.entries.push(entry.clone());
            renumber(&mut st.entries);
        }
        self.notify();

        if was_empty {
            if let Err(e) = self.activate(&entry.id).await {
                warn!("auto-activation of {} failed: {}", entry.id, e);
            }
        }
        if let Err(e) = self.refresh().await {
            warn!("refresh after create failed: {}", e);
        }
        self.status.set(format!("Added {}", entry.display_name()));
        Ok(entry)
    }

    /// Persists an edited alias and path.
    pub async fn update(&self, id: &LayoutId, alias: &str, path: &str) -> Result<()> {
        let alias = alias.trim();
        let path = path.trim();
        if path.is_empty() {
            return self.fail("Failed to update layout", Error::rejected("Path is empty"));
        }

        let before = self.snapshot();
        {
            let mut st = self.state.lock();
            if let Some(entry) = st.entries.iter_mut().find(|e| &e.id == id) {
                entry.alias = alias.to_string();
                entry.path = path.to_string();
            }
        }
        self.notify();

        match self.gateway.update_layout_entry(id, alias, path).await {
            Ok(()) => {
                // The backend re-derives layout_name and an empty alias.
                if let Err(e) = self.refresh().await {
                    warn!("refresh after update failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                self.reconcile(before).await;
                self.fail("Failed to update layout", e)
            }
        }
    }

    /// Removes an entry. Deleting the active entry re-activates whichever
    /// entry the backend promoted, so the loaded layout follows.
    pub async fn delete(&self, id: &LayoutId) -> Result<()> {
        let before = self.snapshot();
        let was_active = before.active_id.as_ref() == Some(id);

        if let Err(e) = self.gateway.delete_layout_entry(id).await {
            self.reconcile(before).await;
            return self.fail("Failed to delete layout", e);
        }
        info!("Layout entry deleted: {}", id);

        if let Err(e) = self.refresh().await {
            warn!("refresh after delete failed: {}", e);
            let mut fallback = before;
            fallback.entries.retain(|entry| &entry.id != id);
            renumber(&mut fallback.entries);
            if was_active {
                fallback.active_id = fallback.entries.first().map(|entry| entry.id.clone());
            }
            self.replace(fallback);
        }

        if was_active {
            if let Some(successor) = self.active_id() {
                if let Err(e) = self.activate(&successor).await {
                    warn!("re-activation of {} failed: {}", successor, e);
                }
            }
        }
        Ok(())
    }

    /// Makes `id` the active entry and has the backend load its layout.
    pub async fn activate(&self, id: &LayoutId) -> Result<LoadResult> {
        let before = self.snapshot();
        self.state.lock().active_id = Some(id.clone());
        self.notify();

        match self.gateway.activate_layout_entry(id).await {
            Ok(result) => {
                info!("Layout entry activated: {} ({})", id, result);
                self.status.set(result.clone());
                Ok(result)
            }
            Err(e) => {
                self.reconcile(before).await;
                self.fail("Failed to switch layout", e)
            }
        }
    }

    /// Persists a complete new ordering.
    pub async fn reorder(&self, ordered: Vec<LayoutId>) -> Result<()> {
        let before = self.snapshot();
        {
            let mut st = self.state.lock();
            let entries = std::mem::take(&mut st.entries);
            st.entries = apply_order(entries, &ordered);
        }
        self.notify();

        match self.gateway.reorder_layout_entries(&ordered).await {
            Ok(()) => {
                debug!("reorder persisted: {:?}", ordered);
                Ok(())
            }
            Err(e) => {
                self.reconcile(before).await;
                self.fail("Failed to reorder layouts", e)
            }
        }
    }

    /// Moves `source` to the position `target` holds, in memory only.
    ///
    /// Returns `false` without touching the list when either id is missing
    /// or both are the same.
    pub fn move_entry(&self, source: &LayoutId, target: &LayoutId) -> bool {
        if source == target {
            return false;
        }
        {
            let mut st = self.state.lock();
            let from = st.entries.iter().position(|e| &e.id == source);
            let to = st.entries.iter().position(|e| &e.id == target);
            let (Some(from), Some(to)) = (from, to) else {
                return false;
            };
            let entry = st.entries.remove(from);
            st.entries.insert(to, entry);
            renumber(&mut st.entries);
        }
        self.notify();
        true
    }
}

fn renumber(entries: &mut [LayoutEntry]) {
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.order = idx;
    }
}

/// Arranges `entries` by `ordered`. For each id the first remaining entry
/// with that id is taken; entries the ordering does not mention keep their
/// relative order at the end.
fn apply_order(mut entries: Vec<LayoutEntry>, ordered: &[LayoutId]) -> Vec<LayoutEntry> {
    let mut out = Vec::with_capacity(entries.len());
    for id in ordered {
        if let Some(pos) = entries.iter().position(|e| &e.id == id) {
            out.push(entries.remove(pos));
        }
    }
    out.append(&mut entries);
    renumber(&mut out);
    out
}
