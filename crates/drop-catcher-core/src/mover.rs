use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, ErrorCode};

/// Move `source` into `output_dir` under `file_name`, replacing any existing
/// file of that name. Returns the target path.
///
/// A plain rename is tried first. When that fails (typically across devices)
/// the file is copied, the copy's length is checked against the source and
/// only then is the source removed, so a failed move never loses the source.
pub fn move_file(source: &Path, output_dir: &Path, file_name: &str) -> Result<PathBuf, Error> {
    let target = output_dir.join(file_name);
    let moved = match fs::rename(source, &target) {
        Ok(()) => verify_present(&target),
        Err(rename_err) => {
            debug!(
                "Rename {} -> {} failed ({}), falling back to copy",
                source.display(),
                target.display(),
                rename_err
            );
            copy_then_remove(source, &target)
        }
    };

    moved.map(|()| target).map_err(|e| {
        Error::with_source(
            ErrorCode::FileMoveFailed,
            format!("Failed to move file to the output directory: {}", source.display()),
            e,
        )
    })
}

fn verify_present(target: &Path) -> io::Result<()> {
    fs::metadata(target).map(|_| ())
}

fn copy_then_remove(source: &Path, target: &Path) -> io::Result<()> {
    let expected = fs::metadata(source)?.len();
    let copied = match fs::copy(source, target) {
        Ok(copied) => copied,
        Err(e) => {
            discard_partial(target);
            return Err(e);
        }
    };
    if copied != expected || fs::metadata(target)?.len() != expected {
        discard_partial(target);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("copied {} of {} bytes to {}", copied, expected, target.display()),
        ));
    }
    fs::remove_file(source)
}

fn discard_partial(target: &Path) {
    if let Err(e) = fs::remove_file(target) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove partial copy {}: {}", target.display(), e);
        }
    }
}
