use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{Error, ErrorCode};

/// Hex-encoded BLAKE3 digest of the full file content.
pub fn hash_file(path: &Path) -> Result<String, Error> {
    hash_file_inner(path).map_err(|e| {
        Error::with_source(
            ErrorCode::FileHandlingFailed,
            format!("Could not hash file: {}", path.display()),
            e,
        )
    })
}

fn hash_file_inner(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
