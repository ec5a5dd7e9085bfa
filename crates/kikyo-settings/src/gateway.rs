use crate::error::{Error, Result};
use crate::profile::Profile;
use crate::types::{LayoutEntries, LayoutEntry, LayoutId, LoadResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub mod commands {
    pub const GET_PROFILE: &str = "get_profile";
    pub const SET_PROFILE: &str = "set_profile";
    pub const GET_LAYOUT_ENTRIES: &str = "get_layout_entries";
    pub const CREATE_LAYOUT_ENTRY_FROM_PATH: &str = "create_layout_entry_from_path";
    pub const UPDATE_LAYOUT_ENTRY: &str = "update_layout_entry";
    pub const DELETE_LAYOUT_ENTRY: &str = "delete_layout_entry";
    pub const REORDER_LAYOUT_ENTRIES: &str = "reorder_layout_entries";
    pub const ACTIVATE_LAYOUT_ENTRY: &str = "activate_layout_entry";
    pub const LOAD_YAB: &str = "load_yab";
    pub const GET_ENABLED: &str = "get_enabled";
    pub const SET_ENABLED: &str = "set_enabled";
    pub const GET_APP_VERSION: &str = "get_app_version";

    pub const AUTOSTART_ENABLE: &str = "plugin:autostart|enable";
    pub const AUTOSTART_DISABLE: &str = "plugin:autostart|disable";
    pub const AUTOSTART_IS_ENABLED: &str = "plugin:autostart|is_enabled";
}

pub const ENABLED_STATE_CHANGED: &str = "enabled-state-changed";

/// The raw command channel to the backend service.
///
/// Arguments are a JSON object keyed the way the backend's command handlers
/// name their parameters (camelCase). Each call succeeds or fails on its own;
/// nothing about ordering between calls is promised.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn call(&self, command: &str, args: Value) -> Result<Value>;
}

/// Typed front of a [`CommandTransport`]. Clones share the transport.
#[derive(Clone)]
pub struct BackendGateway {
    transport: Arc<dyn CommandTransport>,
}

impl BackendGateway {
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        Self { transport }
    }

    async fn invoke<T: DeserializeOwned>(&self, command: &str, args: Value) -> Result<T> {
        debug!("invoke {}", command);
        let reply = match self.transport.call(command, args).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{} failed: {}", command, e);
                return Err(e);
            }
        };
        serde_json::from_value(reply)
            .map_err(|e| Error::MalformedResponse(format!("{command}: {e}")))
    }

    async fn invoke_unit(&self, command: &str, args: Value) -> Result<()> {
        debug!("invoke {}", command);
        self.transport.call(command, args).await.map(|_| ()).map_err(|e| {
            warn!("{} failed: {}", command, e);
            e
        })
    }

    pub async fn get_profile(&self) -> Result<Profile> {
        self.invoke(commands::GET_PROFILE, json!({})).await
    }

    pub async fn set_profile(&self, profile: &Profile) -> Result<()> {
        self.invoke_unit(commands::SET_PROFILE, json!({ "profile": profile }))
            .await
    }

    pub async fn get_layout_entries(&self) -> Result<LayoutEntries> {
        self.invoke(commands::GET_LAYOUT_ENTRIES, json!({})).await
    }

    pub async fn create_layout_entry_from_path(&self, path: &str) -> Result<LayoutEntry> {
        self.invoke(
            commands::CREATE_LAYOUT_ENTRY_FROM_PATH,
            json!({ "path": path }),
        )
        .await
    }

    pub async fn update_layout_entry(&self, id: &LayoutId, alias: &str, path: &str) -> Result<()> {
        self.invoke_unit(
            commands::UPDATE_LAYOUT_ENTRY,
            json!({ "id": id, "alias": alias, "path": path }),
        )
        .await
    }

    pub async fn delete_layout_entry(&self, id: &LayoutId) -> Result<()> {
        self.invoke_unit(commands::DELETE_LAYOUT_ENTRY, json!({ "id": id }))
            .await
    }

    pub async fn reorder_layout_entries(&self, ordered_ids: &[LayoutId]) -> Result<()> {
        self.invoke_unit(
            commands::REORDER_LAYOUT_ENTRIES,
            json!({ "orderedIds": ordered_ids }),
        )
        .await
    }

    pub async fn activate_layout_entry(&self, id: &LayoutId) -> Result<LoadResult> {
        self.invoke(commands::ACTIVATE_LAYOUT_ENTRY, json!({ "id": id }))
            .await
    }

    pub async fn load_yab(&self, path: &str) -> Result<LoadResult> {
        self.invoke(commands::LOAD_YAB, json!({ "path": path })).await
    }

    pub async fn get_enabled(&self) -> Result<bool> {
        self.invoke(commands::GET_ENABLED, json!({})).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.invoke_unit(commands::SET_ENABLED, json!({ "enabled": enabled }))
            .await
    }

    pub async fn get_app_version(&self) -> Result<String> {
        self.invoke(commands::GET_APP_VERSION, json!({})).await
    }

    pub async fn autostart_is_enabled(&self) -> Result<bool> {
        self.invoke(commands::AUTOSTART_IS_ENABLED, json!({})).await
    }

    pub async fn set_autostart(&self, enabled: bool) -> Result<()> {
        let command = if enabled {
            commands::AUTOSTART_ENABLE
        } else {
            commands::AUTOSTART_DISABLE
        };
        self.invoke_unit(command, json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use parking_lot::Mutex;

    struct Canned {
        reply: Result<Value>,
        seen: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl CommandTransport for Canned {
        async fn call(&self, command: &str, args: Value) -> Result<Value> {
            self.seen.lock().push((command.to_string(), args));
            self.reply.clone()
        }
    }

    fn gateway(reply: Result<Value>) -> (BackendGateway, Arc<Canned>) {
        let canned = Arc::new(Canned {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (BackendGateway::new(canned.clone()), canned)
    }

    #[test]
    fn reorder_sends_ordered_ids_argument() {
        let (gw, canned) = gateway(Ok(Value::Null));
        let ids = vec![LayoutId::new("b"), LayoutId::new("a")];
        block_on(gw.reorder_layout_entries(&ids)).unwrap();

        let seen = canned.seen.lock();
        assert_eq!(seen[0].0, commands::REORDER_LAYOUT_ENTRIES);
        assert_eq!(seen[0].1, json!({ "orderedIds": ["b", "a"] }));
    }

    #[test]
    fn undecodable_reply_is_malformed_response() {
        let (gw, _) = gateway(Ok(json!("not a bool")));
        let err = block_on(gw.get_enabled()).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn transport_failure_passes_through() {
        let (gw, _) = gateway(Err(Error::unavailable("offline")));
        let err = block_on(gw.get_profile()).unwrap_err();
        assert_eq!(err, Error::unavailable("offline"));
    }

    #[test]
    fn autostart_toggle_uses_plugin_namespace() {
        let (gw, canned) = gateway(Ok(Value::Null));
        block_on(gw.set_autostart(true)).unwrap();
        block_on(gw.set_autostart(false)).unwrap();

        let seen = canned.seen.lock();
        assert_eq!(seen[0].0, "plugin:autostart|enable");
        assert_eq!(seen[1].0, "plugin:autostart|disable");
    }
}
