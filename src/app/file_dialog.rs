//! An abstraction layer for the native folder picker to enable testing.

use std::path::PathBuf;

/// Picks the project root. Mocked in tests so no OS dialog opens.
pub trait DialogService: Send + Sync {
    fn pick_project_root(&self) -> Option<PathBuf>;
}

/// The production implementation that uses `rfd` to show the native dialog.
pub struct NativeDialogService;

impl DialogService for NativeDialogService {
    fn pick_project_root(&self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title("Open project folder")
            .pick_folder()
    }
}
