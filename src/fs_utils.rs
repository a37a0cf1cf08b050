//! Filesystem helpers for the persistent stores.

use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` atomically: the bytes land in a sibling
/// temporary file first and are renamed into place, so readers never see a
/// partially written store.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}
