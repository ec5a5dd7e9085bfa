use crate::error::{Error, Result};
use crate::gateway::BackendGateway;
use crate::layout_list::LayoutEntryList;
use crate::local_store::{LocalStore, LAST_LAYOUT_PATH_KEY};
use crate::profile_store::ProfileStore;
use crate::status::StatusLine;
use crate::types::{BackendEvent, LoadResult};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything one settings surface works with, wired to a single backend.
pub struct SettingsSession {
    gateway: BackendGateway,
    status: StatusLine,
    profile: ProfileStore,
    layouts: Arc<LayoutEntryList>,
    local: Arc<dyn LocalStore>,
    events: Option<Receiver<BackendEvent>>,
    enabled: AtomicBool,
    version: Mutex<Option<String>>,
    last_layout_path: Mutex<Option<String>>,
}

impl SettingsSession {
    pub fn new(gateway: BackendGateway, local: Arc<dyn LocalStore>) -> Self {
        let status = StatusLine::new();
        Self {
            profile: ProfileStore::new(gateway.clone(), status.clone()),
            layouts: Arc::new(LayoutEntryList::new(gateway.clone(), status.clone())),
            gateway,
            status,
            local,
            events: None,
            enabled: AtomicBool::new(true),
            version: Mutex::new(None),
            last_layout_path: Mutex::new(None),
        }
    }

    /// Subscribes to backend push notifications.
    pub fn with_events(mut self, events: Receiver<BackendEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Initial fetch of everything the surface shows. Failures are reported
    /// to the status line and returned; the remaining steps still run.
    pub async fn start(&self) -> Vec<Error> {
        let mut failures = Vec::new();

        if let Err(e) = self.profile.load().await {
            failures.push(e);
        }
        if let Err(e) = self.layouts.refresh().await {
            failures.push(e);
        }

        match self.gateway.get_enabled().await {
            Ok(enabled) => self.enabled.store(enabled, Ordering::SeqCst),
            Err(e) => {
                self.status.set(format!("Failed to read engine state: {e}"));
                failures.push(e);
            }
        }

        match self.gateway.get_app_version().await {
            Ok(version) => *self.version.lock() = Some(version),
            Err(e) => {
                warn!("version lookup failed: {}", e);
                failures.push(e);
            }
        }

        *self.last_layout_path.lock() = self.local.get(LAST_LAYOUT_PATH_KEY);

        if failures.is_empty() {
            info!(
                "settings session ready: {} layout entries",
                self.layouts.len()
            );
        }
        failures
    }

    pub fn gateway(&self) -> &BackendGateway {
        &self.gateway
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    pub fn layouts(&self) -> &Arc<LayoutEntryList> {
        &self.layouts
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        if let Err(e) = self.gateway.set_enabled(enabled).await {
            self.status.set(format!("Failed to change engine state: {e}"));
            return Err(e);
        }
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    /// Applies queued backend notifications. Returns how many were handled.
    pub fn pump_events(&self) -> usize {
        let Some(events) = &self.events else {
            return 0;
        };

        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                BackendEvent::EnabledStateChanged(enabled) => {
                    self.enabled.store(enabled, Ordering::SeqCst);
                }
            }
            handled += 1;
        }
        handled
    }

    pub fn app_version(&self) -> Option<String> {
        self.version.lock().clone()
    }

    pub fn last_layout_path(&self) -> Option<String> {
        self.last_layout_path.lock().clone()
    }

    /// Loads a layout file directly, outside the entry list.
    pub async fn load_layout_file(&self, path: &str) -> Result<LoadResult> {
        let loaded = match self.gateway.load_yab(path).await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.status.set(format!("Failed to load {path}: {e}"));
                return Err(e);
            }
        };
        if let Err(e) = self.local.set(LAST_LAYOUT_PATH_KEY, path) {
            warn!("could not remember last layout path: {}", e);
        }
        *self.last_layout_path.lock() = Some(path.to_string());

        // The backend may have marked a matching entry active.
        if let Err(e) = self.layouts.refresh().await {
            warn!("refresh after loading {} failed: {}", path, e);
        }
        self.status.set(loaded.clone());
        Ok(loaded)
    }

    pub async fn autostart_enabled(&self) -> Result<bool> {
        self.gateway.autostart_is_enabled().await
    }

    pub async fn set_autostart(&self, enabled: bool) -> Result<()> {
        if let Err(e) = self.gateway.set_autostart(enabled).await {
            self.status.set(format!("Failed to change autostart: {e}"));
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::commands;
    use crate::local_backend::LocalBackend;
    use crate::local_store::MemoryStore;
    use futures::executor::block_on;

    fn session() -> (Arc<LocalBackend>, SettingsSession) {
        let (backend, events) = LocalBackend::in_memory();
        let backend = Arc::new(backend.with_version("9.9.9"));
        let session = SettingsSession::new(
            BackendGateway::new(backend.clone()),
            Arc::new(MemoryStore::new()),
        )
        .with_events(events);
        (backend, session)
    }

    #[test]
    fn start_reports_each_failure_and_keeps_going() {
        let (backend, session) = session();
        backend.create_layout_entry_from_path("a.yab").unwrap();
        backend.fail_next(commands::GET_PROFILE);
        backend.fail_next(commands::GET_ENABLED);

        let failures = block_on(session.start());
        assert_eq!(failures.len(), 2);
        assert_eq!(session.layouts().len(), 1);
        assert_eq!(session.app_version().as_deref(), Some("9.9.9"));
        assert!(session.status().get().is_some());
    }

    #[test]
    fn pushed_enabled_change_is_applied_without_refetch() {
        let (backend, session) = session();
        block_on(session.start());
        assert!(session.enabled());

        backend.toggle_enabled();
        assert_eq!(session.pump_events(), 1);
        assert!(!session.enabled());
        assert_eq!(session.pump_events(), 0);
    }

    #[test]
    fn loading_a_file_remembers_path_and_marks_matching_entry() {
        let (backend, session) = session();
        let a = backend.create_layout_entry_from_path("a.yab").unwrap();
        let b = backend.create_layout_entry_from_path("b.yab").unwrap();
        block_on(session.start());
        assert_eq!(session.layouts().active_id(), Some(a.id));

        let loaded = block_on(session.load_layout_file("b.yab")).unwrap();
        assert_eq!(loaded, "Loaded b");
        assert_eq!(session.last_layout_path().as_deref(), Some("b.yab"));
        assert_eq!(session.layouts().active_id(), Some(b.id));

        block_on(session.load_layout_file("elsewhere.yab")).unwrap();
        assert_eq!(session.layouts().active_id(), None);
    }

    #[test]
    fn start_reads_remembered_layout_path() {
        let (backend, _events) = LocalBackend::in_memory();
        let local = Arc::new(MemoryStore::new());
        local.set(LAST_LAYOUT_PATH_KEY, "layouts/old.yab").unwrap();
        let session = SettingsSession::new(BackendGateway::new(Arc::new(backend)), local);

        assert_eq!(session.last_layout_path(), None);
        assert!(block_on(session.start()).is_empty());
        assert_eq!(session.last_layout_path().as_deref(), Some("layouts/old.yab"));
    }

    #[test]
    fn failed_refresh_after_load_keeps_load_message() {
        let (backend, session) = session();
        backend.fail_next(commands::GET_LAYOUT_ENTRIES);

        let loaded = block_on(session.load_layout_file("c.yab")).unwrap();
        assert_eq!(session.status().get(), Some(loaded));
        assert_eq!(session.last_layout_path().as_deref(), Some("c.yab"));
    }

    #[test]
    fn failed_enable_keeps_indicator() {
        let (backend, session) = session();
        backend.fail_next(commands::SET_ENABLED);
        assert!(block_on(session.set_enabled(false)).is_err());
        assert!(session.enabled());
        assert!(backend.is_enabled());
    }

    #[test]
    fn autostart_round_trips() {
        let (_backend, session) = session();
        assert!(!block_on(session.autostart_enabled()).unwrap());
        block_on(session.set_autostart(true)).unwrap();
        assert!(block_on(session.autostart_enabled()).unwrap());
    }
}
