//! Model export module
//!
//! Ports fitted trees and forests to source code for embedded targets:
//! - Eloquent-style C++ class headers (Arduino friendly)
//! - Plain C99 headers

mod c_header;

pub use c_header::{CodeExporter, ExportConfig, ExportFormat, PortableModel};

use crate::error::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Write `source` to `path`, replacing any existing file.
///
/// The text goes to a sibling temporary file first and is renamed into
/// place, so a failed write never leaves a truncated artifact behind.
pub fn write_artifact(path: impl AsRef<Path>, source: &str) -> Result<()> {
    let path = path.as_ref();
    replace_file(path, |tmp| fs::write(tmp, source))?;

    debug!(path = %path.display(), bytes = source.len(), "Wrote artifact");
    Ok(())
}

/// Run `write` against `<name>.tmp`, then rename it over `path`. The
/// temporary file is removed if either step fails.
fn replace_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = write(&tmp_path).and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
