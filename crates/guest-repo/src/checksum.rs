//! SHA-256 checksum helpers
//!
//! A checksum file holds the lowercase hex digest of its binary, optionally
//! followed by a newline, and lives next to the binary as `<binary>.sha256`.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{RepoError, RepoResult};

const CHECKSUM_SUFFIX: &str = ".sha256";
const READ_BUFFER_SIZE: usize = 8192;

/// Path of the checksum file that belongs to `binary`.
pub fn checksum_path(binary: &Path) -> PathBuf {
    let mut name = binary.as_os_str().to_owned();
    name.push(CHECKSUM_SUFFIX);
    PathBuf::from(name)
}

/// Stream a file through SHA-256 and return the lowercase hex digest.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Read a checksum file, trimming surrounding whitespace.
pub fn read_checksum(path: &Path) -> io::Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Hash `binary` and write its checksum file. Returns the checksum path.
pub fn write_checksum(binary: &Path) -> io::Result<PathBuf> {
    let digest = sha256_file(binary)?;
    let path = checksum_path(binary);
    fs::write(&path, format!("{digest}\n"))?;
    Ok(path)
}

/// Verify that `binary` and `checksum` are regular files and that the
/// recorded digest matches the binary content.
pub fn verify_artifact(binary: &Path, checksum: &Path) -> RepoResult<()> {
    ensure_regular_file(binary)?;
    ensure_regular_file(checksum)?;

    let expected = read_checksum(checksum)?;
    let actual = sha256_file(binary)?;
    if expected != actual {
        return Err(RepoError::ChecksumMismatch {
            path: binary.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn ensure_regular_file(path: &Path) -> RepoResult<()> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RepoError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
        return Err(RepoError::NotFile(path.to_path_buf()));
    }
    Ok(())
}
