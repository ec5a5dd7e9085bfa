pub mod drag;
pub mod error;
pub mod gateway;
pub mod layout_list;
pub mod local_backend;
pub mod local_store;
pub mod memory;
pub mod profile;
pub mod profile_store;
pub mod session;
pub mod status;
pub mod types;

pub use error::{Error, Result};
pub use gateway::{BackendGateway, CommandTransport};
pub use layout_list::{LayoutEntryList, ListSnapshot};
pub use profile::{Profile, ThumbSide};
pub use profile_store::{FieldEdit, ProfileStore, SaveOutcome};
pub use session::SettingsSession;
pub use types::{BackendEvent, LayoutEntries, LayoutEntry, LayoutId};
