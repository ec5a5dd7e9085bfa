use parking_lot::Mutex;
use std::sync::Arc;

/// The status text region. Holds the latest message only.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    message: Arc<Mutex<Option<String>>>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, message: impl Into<String>) {
        *self.message.lock() = Some(message.into());
    }

    pub fn clear(&self) {
        *self.message.lock() = None;
    }

    pub fn get(&self) -> Option<String> {
        self.message.lock().clone()
    }
}
