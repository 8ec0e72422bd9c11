//! System clipboard access behind a trait so tests never touch the OS.

use crate::core::CoreError;

pub trait ClipboardService: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), CoreError>;
}

/// Writes through `arboard`, opening a fresh handle per write.
pub struct SystemClipboard;

impl ClipboardService for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), CoreError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| CoreError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| CoreError::Clipboard(e.to_string()))
    }
}
