//! In-process backend speaking the settings command set.
//!
//! Keeps the backend's `settings.json` document (layout entries, active id,
//! profile, enabled flag) and answers the same commands the desktop backend
//! exposes. Layout files are not parsed here; a [`LayoutLoader`] stands in
//! for the engine's loader.

use crate::error::{Error, Result};
use crate::gateway::{commands, CommandTransport, ENABLED_STATE_CHANGED};
use crate::profile::Profile;
use crate::types::{file_stem_or_default, BackendEvent, LayoutEntries, LayoutEntry, LayoutId};
use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

const DUPLICATE_LAYOUT_PATH_MESSAGE: &str = "すでに登録されている定義ファイルです";
const ENTRY_NOT_FOUND_MESSAGE: &str = "Layout entry not found";

/// Result of loading a layout file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLayout {
    /// Name declared inside the file, if any.
    pub name: Option<String>,
    pub summary: String,
}

pub trait LayoutLoader: Send + Sync {
    fn load(&self, path: &str) -> std::result::Result<LoadedLayout, String>;
}

/// Accepts any non-empty path and names the layout after its file stem.
#[derive(Debug, Default, Clone, Copy)]
pub struct StemLoader;

impl LayoutLoader for StemLoader {
    fn load(&self, path: &str) -> std::result::Result<LoadedLayout, String> {
        if path.trim().is_empty() {
            return Err("Path is empty".to_string());
        }
        Ok(LoadedLayout {
            name: None,
            summary: format!("Loaded {}", file_stem_or_default(path)),
        })
    }
}

/// Requires the file to exist and be readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl LayoutLoader for FileLoader {
    fn load(&self, path: &str) -> std::result::Result<LoadedLayout, String> {
        let meta = fs::metadata(path).map_err(|e| format!("{path}: {e}"))?;
        if !meta.is_file() {
            return Err(format!("{path}: not a file"));
        }
        Ok(LoadedLayout {
            name: None,
            summary: format!("Loaded {} ({} bytes)", file_stem_or_default(path), meta.len()),
        })
    }
}

fn default_enabled() -> bool {
    true
}

/// The backend's persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, alias = "last_yab_path")]
    pub last_layout_path: Option<String>,
    #[serde(default)]
    pub layout_entries: Vec<LayoutEntry>,
    #[serde(default)]
    pub active_layout_id: Option<LayoutId>,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub autostart: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_layout_path: None,
            layout_entries: Vec::new(),
            active_layout_id: None,
            profile: None,
            enabled: true,
            autostart: false,
        }
    }
}

fn normalize_layout_path_for_compare(path: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        path.trim().replace('/', "\\").to_lowercase()
    }
    #[cfg(not(target_os = "windows"))]
    {
        path.trim().to_string()
    }
}

struct BackendState {
    settings: Settings,
    next_id: u64,
    fail_next: HashSet<String>,
}

impl BackendState {
    fn generate_id(&mut self) -> LayoutId {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        self.next_id += 1;
        LayoutId(format!("layout-{}-{}", now_ms, self.next_id))
    }

    fn entry_index(&self, id: &LayoutId) -> Result<usize> {
        self.settings
            .layout_entries
            .iter()
            .position(|entry| &entry.id == id)
            .ok_or_else(|| Error::not_found(ENTRY_NOT_FOUND_MESSAGE))
    }
}

pub struct LocalBackend {
    state: Mutex<BackendState>,
    file: Option<PathBuf>,
    loader: Box<dyn LayoutLoader>,
    events: Sender<BackendEvent>,
    version: String,
}

impl LocalBackend {
    /// A backend with no file behind it.
    pub fn in_memory() -> (Self, Receiver<BackendEvent>) {
        Self::build(Settings::default(), None)
    }

    /// Loads (and migrates) `path`; later mutations are written back to it.
    pub fn open(path: impl Into<PathBuf>) -> (Self, Receiver<BackendEvent>) {
        let path = path.into();
        let settings = load_settings(&path);
        Self::build(settings, Some(path))
    }

    fn build(settings: Settings, file: Option<PathBuf>) -> (Self, Receiver<BackendEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let backend = Self {
            state: Mutex::new(BackendState {
                settings,
                next_id: 0,
                fail_next: HashSet::new(),
            }),
            file,
            loader: Box::new(StemLoader),
            events: tx,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        {
            let mut st = backend.state.lock();
            if migrate_settings(&mut st, backend.loader.as_ref()) {
                backend.persist(&st.settings);
            }
        }
        (backend, rx)
    }

    pub fn with_loader(mut self, loader: impl LayoutLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Makes the next call of `command` fail as if the backend were unreachable.
    pub fn fail_next(&self, command: &str) {
        self.state.lock().fail_next.insert(command.to_string());
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    fn persist(&self, settings: &Settings) {
        if let Some(path) = &self.file {
            if let Err(e) = save_settings(path, settings) {
                warn!("Failed to write {}: {}", path.display(), e);
            }
        }
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut BackendState) -> Result<T>) -> Result<T> {
        let mut st = self.state.lock();
        let out = f(&mut st)?;
        self.persist(&st.settings);
        Ok(out)
    }

    pub fn get_profile(&self) -> Profile {
        self.state.lock().settings.profile.clone().unwrap_or_default()
    }

    pub fn set_profile(&self, profile: Profile) {
        let _ = self.mutate(|st| {
            st.settings.profile = Some(profile);
            Ok(())
        });
    }

    pub fn get_layout_entries(&self) -> LayoutEntries {
        let st = self.state.lock();
        LayoutEntries {
            entries: st.settings.layout_entries.clone(),
            active_layout_id: st.settings.active_layout_id.clone(),
        }
    }

    pub fn create_layout_entry_from_path(&self, path: &str) -> Result<LayoutEntry> {
        let path = path.trim().to_string();
        if path.is_empty() {
            return Err(Error::rejected("Path is empty"));
        }

        let entry = self.mutate(|st| {
            let normalized = normalize_layout_path_for_compare(&path);
            if st
                .settings
                .layout_entries
                .iter()
                .any(|entry| normalize_layout_path_for_compare(&entry.path) == normalized)
            {
                return Err(Error::rejected(DUPLICATE_LAYOUT_PATH_MESSAGE));
            }
            let loaded = self.loader.load(&path).map_err(Error::ValidationRejected)?;
            let layout_name = declared_or_stem(loaded.name, &path);
            let entry = LayoutEntry {
                id: st.generate_id(),
                alias: layout_name.clone(),
                layout_name,
                path: path.clone(),
                order: st.settings.layout_entries.len(),
            };
            st.settings.layout_entries.push(entry.clone());
            refresh_layout_entry_order(&mut st.settings);
            if st.settings.active_layout_id.is_none() {
                st.settings.active_layout_id = Some(entry.id.clone());
                sync_last_path_with_active(&mut st.settings);
            }
            Ok(entry)
        })?;
        info!("Created layout entry {} for {}", entry.id, entry.path);
        Ok(entry)
    }

    pub fn update_layout_entry(&self, id: &LayoutId, alias: &str, path: &str) -> Result<()> {
        let path = path.trim().to_string();
        if path.is_empty() {
            return Err(Error::rejected("Path is empty"));
        }

        self.mutate(|st| {
            let idx = st.entry_index(id)?;
            let entry = &mut st.settings.layout_entries[idx];
            if entry.path != path {
                entry.path = path;
                entry.layout_name = match self.loader.load(&entry.path) {
                    Ok(loaded) => declared_or_stem(loaded.name, &entry.path),
                    Err(_) => file_stem_or_default(&entry.path),
                };
            }

            let alias = alias.trim();
            entry.alias = if alias.is_empty() {
                entry.layout_name.clone()
            } else {
                alias.to_string()
            };
            sync_last_path_with_active(&mut st.settings);
            Ok(())
        })
    }

    pub fn delete_layout_entry(&self, id: &LayoutId) -> Result<()> {
        self.mutate(|st| {
            let idx = st.entry_index(id)?;
            st.settings.layout_entries.remove(idx);

            if st.settings.active_layout_id.as_ref() == Some(id) {
                st.settings.active_layout_id = st
                    .settings
                    .layout_entries
                    .first()
                    .map(|entry| entry.id.clone());
            }
            refresh_layout_entry_order(&mut st.settings);
            sync_last_path_with_active(&mut st.settings);
            Ok(())
        })
    }

    pub fn reorder_layout_entries(&self, ordered_ids: &[LayoutId]) -> Result<()> {
        self.mutate(|st| {
            if ordered_ids.len() != st.settings.layout_entries.len() {
                return Err(Error::rejected("Invalid number of layout ids"));
            }

            let mut by_id: HashMap<LayoutId, LayoutEntry> = st
                .settings
                .layout_entries
                .iter()
                .map(|entry| (entry.id.clone(), entry.clone()))
                .collect();

            let mut reordered = Vec::with_capacity(ordered_ids.len());
            for id in ordered_ids {
                let entry = by_id
                    .remove(id)
                    .ok_or_else(|| Error::rejected("Unknown layout id"))?;
                reordered.push(entry);
            }
            if !by_id.is_empty() {
                return Err(Error::rejected("Some layout ids are missing in order payload"));
            }

            st.settings.layout_entries = reordered;
            refresh_layout_entry_order(&mut st.settings);
            Ok(())
        })
    }

    pub fn activate_layout_entry(&self, id: &LayoutId) -> Result<String> {
        self.mutate(|st| {
            let idx = st.entry_index(id)?;
            let entry = st.settings.layout_entries[idx].clone();
            let loaded = self.loader.load(&entry.path).map_err(Error::ValidationRejected)?;
            st.settings.active_layout_id = Some(entry.id.clone());
            st.settings.last_layout_path = Some(entry.path.clone());
            info!("Activated layout {} ({})", entry.display_name(), entry.id);
            Ok(loaded.summary)
        })
    }

    pub fn load_yab(&self, path: &str) -> Result<String> {
        self.mutate(|st| {
            let loaded = self.loader.load(path).map_err(Error::ValidationRejected)?;
            st.settings.last_layout_path = Some(path.to_string());
            st.settings.active_layout_id = st
                .settings
                .layout_entries
                .iter()
                .find(|entry| entry.path == path)
                .map(|entry| entry.id.clone());
            Ok(loaded.summary)
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().settings.enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        let changed = self
            .mutate(|st| {
                let changed = st.settings.enabled != enabled;
                st.settings.enabled = enabled;
                Ok(changed)
            })
            .unwrap_or(false);
        if changed {
            info!("Engine {}", if enabled { "enabled" } else { "paused" });
            debug!("emit {} ({})", ENABLED_STATE_CHANGED, enabled);
            let _ = self.events.send(BackendEvent::EnabledStateChanged(enabled));
        }
    }

    /// What the global pause hotkey does.
    pub fn toggle_enabled(&self) {
        let current = self.is_enabled();
        self.set_enabled(!current);
    }

    pub fn autostart_enabled(&self) -> bool {
        self.state.lock().settings.autostart
    }

    pub fn set_autostart(&self, enabled: bool) {
        let _ = self.mutate(|st| {
            st.settings.autostart = enabled;
            Ok(())
        });
    }

    fn dispatch(&self, command: &str, args: &Value) -> Result<Value> {
        if self.state.lock().fail_next.remove(command) {
            return Err(Error::unavailable(format!("{command}: injected failure")));
        }
        debug!("backend command {}", command);

        match command {
            commands::GET_PROFILE => reply(self.get_profile()),
            commands::SET_PROFILE => {
                self.set_profile(arg(args, "profile")?);
                Ok(Value::Null)
            }
            commands::GET_LAYOUT_ENTRIES => reply(self.get_layout_entries()),
            commands::CREATE_LAYOUT_ENTRY_FROM_PATH => {
                let path: String = arg(args, "path")?;
                reply(self.create_layout_entry_from_path(&path)?)
            }
            commands::UPDATE_LAYOUT_ENTRY => {
                let id: LayoutId = arg(args, "id")?;
                let alias: String = arg(args, "alias")?;
                let path: String = arg(args, "path")?;
                self.update_layout_entry(&id, &alias, &path)?;
                Ok(Value::Null)
            }
            commands::DELETE_LAYOUT_ENTRY => {
                self.delete_layout_entry(&arg(args, "id")?)?;
                Ok(Value::Null)
            }
            commands::REORDER_LAYOUT_ENTRIES => {
                let ids: Vec<LayoutId> = arg(args, "orderedIds")?;
                self.reorder_layout_entries(&ids)?;
                Ok(Value::Null)
            }
            commands::ACTIVATE_LAYOUT_ENTRY => reply(self.activate_layout_entry(&arg(args, "id")?)?),
            commands::LOAD_YAB => {
                let path: String = arg(args, "path")?;
                reply(self.load_yab(&path)?)
            }
            commands::GET_ENABLED => reply(self.is_enabled()),
            commands::SET_ENABLED => {
                self.set_enabled(arg(args, "enabled")?);
                Ok(Value::Null)
            }
            commands::GET_APP_VERSION => reply(&self.version),
            commands::AUTOSTART_IS_ENABLED => reply(self.autostart_enabled()),
            commands::AUTOSTART_ENABLE => {
                self.set_autostart(true);
                Ok(Value::Null)
            }
            commands::AUTOSTART_DISABLE => {
                self.set_autostart(false);
                Ok(Value::Null)
            }
            other => Err(Error::rejected(format!("unknown command: {other}"))),
        }
    }
}

#[async_trait]
impl CommandTransport for LocalBackend {
    async fn call(&self, command: &str, args: Value) -> Result<Value> {
        self.dispatch(command, &args)
    }
}

fn arg<T: DeserializeOwned>(args: &Value, name: &str) -> Result<T> {
    let raw = args
        .get(name)
        .ok_or_else(|| Error::rejected(format!("missing argument: {name}")))?;
    serde_json::from_value(raw.clone())
        .map_err(|e| Error::rejected(format!("invalid argument {name}: {e}")))
}

fn reply<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
}

fn declared_or_stem(name: Option<String>, path: &str) -> String {
    name.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| file_stem_or_default(path))
}

fn load_settings(path: &Path) -> Settings {
    if path.exists() {
        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(serde_json::from_str(&content)?))
        {
            Ok(settings) => return settings,
            Err(e) => warn!("Ignoring unreadable settings {}: {}", path.display(), e),
        }
    }
    Settings::default()
}

fn save_settings(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(settings)?)?;
    Ok(())
}

fn normalize_layout_entry(entry: &mut LayoutEntry, next_id: &mut impl FnMut() -> LayoutId) -> bool {
    let mut changed = false;

    for field in [&mut entry.path, &mut entry.alias, &mut entry.layout_name] {
        let trimmed = field.trim().to_string();
        if trimmed != *field {
            *field = trimmed;
            changed = true;
        }
    }

    if entry.id.as_str().trim().is_empty() {
        entry.id = next_id();
        changed = true;
    }

    if entry.layout_name.is_empty() {
        entry.layout_name = if !entry.alias.is_empty() {
            entry.alias.clone()
        } else {
            file_stem_or_default(&entry.path)
        };
        changed = true;
    }

    if entry.alias.is_empty() {
        entry.alias = entry.layout_name.clone();
        changed = true;
    }

    changed
}

fn refresh_layout_entry_order(settings: &mut Settings) -> bool {
    let mut changed = false;
    for (idx, entry) in settings.layout_entries.iter_mut().enumerate() {
        if entry.order != idx {
            entry.order = idx;
            changed = true;
        }
    }
    changed
}

fn sync_last_path_with_active(settings: &mut Settings) -> bool {
    let Some(active_id) = settings.active_layout_id.as_ref() else {
        return false;
    };
    let Some(active) = settings
        .layout_entries
        .iter()
        .find(|entry| &entry.id == active_id)
    else {
        return false;
    };
    if settings.last_layout_path.as_deref() != Some(active.path.as_str()) {
        settings.last_layout_path = Some(active.path.clone());
        return true;
    }
    false
}

fn migrate_settings(st: &mut BackendState, loader: &dyn LayoutLoader) -> bool {
    let mut changed = false;

    let mut entries = std::mem::take(&mut st.settings.layout_entries);
    for entry in &mut entries {
        let mut next = || st.generate_id();
        if normalize_layout_entry(entry, &mut next) {
            changed = true;
        }
    }
    let old_len = entries.len();
    entries.retain(|entry| !entry.path.is_empty());
    if entries.len() != old_len {
        changed = true;
    }
    st.settings.layout_entries = entries;

    if st.settings.layout_entries.is_empty() {
        let legacy = st
            .settings
            .last_layout_path
            .as_ref()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Some(path) = legacy {
            let layout_name = match loader.load(&path) {
                Ok(loaded) => declared_or_stem(loaded.name, &path),
                Err(_) => file_stem_or_default(&path),
            };
            let id = st.generate_id();
            st.settings.layout_entries.push(LayoutEntry {
                id,
                alias: layout_name.clone(),
                layout_name,
                path,
                order: 0,
            });
            changed = true;
        }
    }

    let settings = &mut st.settings;
    let active_valid = settings
        .active_layout_id
        .as_ref()
        .is_some_and(|id| settings.layout_entries.iter().any(|entry| &entry.id == id));
    if !active_valid {
        let first = settings.layout_entries.first().map(|entry| entry.id.clone());
        if settings.active_layout_id != first {
            settings.active_layout_id = first;
            changed = true;
        }
    }

    if sync_last_path_with_active(settings) {
        changed = true;
    }
    if refresh_layout_entry_order(settings) {
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_enabled_is_true() {
        assert!(Settings::default().enabled);
        let parsed: Settings = serde_json::from_str("{}").expect("settings json");
        assert!(parsed.enabled);
    }

    #[test]
    fn settings_deserialize_legacy_last_yab_path() {
        let parsed: Settings =
            serde_json::from_str(r#"{"last_yab_path":"C:\\layouts\\legacy.yab"}"#)
                .expect("legacy settings json");
        assert_eq!(
            parsed.last_layout_path.as_deref(),
            Some(r"C:\layouts\legacy.yab")
        );
        let value = serde_json::to_value(parsed).unwrap();
        assert!(value.get("last_yab_path").is_none());
    }

    #[test]
    fn migration_bootstraps_entry_from_legacy_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(&file, r#"{"last_yab_path":"layouts/sin-geta.yab"}"#).unwrap();

        let (backend, _rx) = LocalBackend::open(&file);
        let reply = backend.get_layout_entries();
        assert_eq!(reply.entries.len(), 1);
        assert_eq!(reply.entries[0].alias, "sin-geta");
        assert_eq!(reply.active_layout_id, Some(reply.entries[0].id.clone()));

        // Migration result was written back.
        let (reopened, _rx) = LocalBackend::open(&file);
        assert_eq!(reopened.get_layout_entries(), reply);
    }

    #[test]
    fn migration_repairs_dangling_active_id_and_drops_pathless_entries() {
        let mut st = BackendState {
            settings: Settings {
                layout_entries: vec![
                    LayoutEntry {
                        id: LayoutId::new(""),
                        path: " a.yab ".to_string(),
                        ..LayoutEntry::default()
                    },
                    LayoutEntry {
                        id: LayoutId::new("gone"),
                        ..LayoutEntry::default()
                    },
                ],
                active_layout_id: Some(LayoutId::new("gone")),
                ..Settings::default()
            },
            next_id: 0,
            fail_next: HashSet::new(),
        };
        assert!(migrate_settings(&mut st, &StemLoader));

        let entries = &st.settings.layout_entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "a.yab");
        assert!(entries[0].id.as_str().starts_with("layout-"));
        assert_eq!(entries[0].alias, "a");
        assert_eq!(st.settings.active_layout_id, Some(entries[0].id.clone()));
        assert_eq!(st.settings.last_layout_path.as_deref(), Some("a.yab"));
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let (backend, _rx) = LocalBackend::in_memory();
        backend.create_layout_entry_from_path("a.yab").unwrap();
        let err = backend.create_layout_entry_from_path(" a.yab ").unwrap_err();
        assert_eq!(err, Error::rejected(DUPLICATE_LAYOUT_PATH_MESSAGE));
    }

    #[test]
    fn reorder_payload_must_cover_every_entry_once() {
        let (backend, _rx) = LocalBackend::in_memory();
        let a = backend.create_layout_entry_from_path("a.yab").unwrap().id;
        let b = backend.create_layout_entry_from_path("b.yab").unwrap().id;

        assert!(backend.reorder_layout_entries(&[a.clone()]).is_err());
        assert!(backend
            .reorder_layout_entries(&[a.clone(), a.clone()])
            .is_err());
        backend.reorder_layout_entries(&[b.clone(), a.clone()]).unwrap();

        let entries = backend.get_layout_entries().entries;
        assert_eq!(entries[0].id, b);
        assert_eq!(entries[1].order, 1);
    }

    #[test]
    fn update_with_empty_alias_falls_back_to_layout_name() {
        let (backend, _rx) = LocalBackend::in_memory();
        let id = backend.create_layout_entry_from_path("a.yab").unwrap().id;
        backend.update_layout_entry(&id, "  ", "dir/new.yab").unwrap();

        let entry = &backend.get_layout_entries().entries[0];
        assert_eq!(entry.layout_name, "new");
        assert_eq!(entry.alias, "new");
        assert_eq!(
            backend.settings().last_layout_path.as_deref(),
            Some("dir/new.yab")
        );
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (backend, _rx) = LocalBackend::in_memory();
        let err = backend
            .activate_layout_entry(&LayoutId::new("nope"))
            .unwrap_err();
        assert_eq!(err, Error::not_found(ENTRY_NOT_FOUND_MESSAGE));
    }

    #[test]
    fn enabled_change_is_pushed_once() {
        let (backend, rx) = LocalBackend::in_memory();
        backend.set_enabled(true);
        assert!(rx.try_recv().is_err());
        backend.toggle_enabled();
        assert_eq!(rx.try_recv(), Ok(BackendEvent::EnabledStateChanged(false)));
    }

    #[test]
    fn injected_failure_hits_only_next_call() {
        let (backend, _rx) = LocalBackend::in_memory();
        backend.fail_next(commands::GET_ENABLED);
        assert!(matches!(
            backend.dispatch(commands::GET_ENABLED, &Value::Null),
            Err(Error::BackendUnavailable(_))
        ));
        assert_eq!(
            backend.dispatch(commands::GET_ENABLED, &Value::Null),
            Ok(Value::Bool(true))
        );
    }
}
