//! Version repository tests
//!
//! Integrity, retention and self-healing behavior of the on-disk cache.

use std::fs;
use std::path::{Path, PathBuf};

use guest_repo::{checksum_path, LocalRepository, RepoError, RetentionPolicy};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

const FILENAME: &str = "guest-agent";

/// Compute SHA-256 of bytes and return hex string
fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Write a version directory straight to disk, bypassing `add`
fn seed_version(root: &Path, version: &str, content: &[u8]) -> PathBuf {
    let dir = root.join(version);
    fs::create_dir_all(&dir).unwrap();
    let binary = dir.join(FILENAME);
    fs::write(&binary, content).unwrap();
    fs::write(checksum_path(&binary), format!("{}\n", compute_sha256(content))).unwrap();
    binary
}

/// Write a source binary with its checksum next to it
fn source_artifact(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let binary = dir.join(name);
    fs::write(&binary, content).unwrap();
    fs::write(checksum_path(&binary), compute_sha256(content)).unwrap();
    binary
}

fn open(root: &Path) -> LocalRepository {
    let mut repo = LocalRepository::new(root, FILENAME).unwrap();
    repo.init().unwrap();
    repo
}

// =============================================================================
// Integrity
// =============================================================================

/// Test 1: Added artifacts come back with content matching their checksum
#[test]
fn test_round_trip_integrity() {
    let temp = TempDir::new().unwrap();
    let mut repo = open(&temp.path().join("repo"));

    for (i, version) in ["1.0.0", "1.1.0-rc.1", "1.1.0"].iter().enumerate() {
        let content = format!("agent build {i}").into_bytes();
        let src = source_artifact(temp.path(), &format!("src-{i}"), &content);
        repo.add(&src, version).unwrap();
    }

    for version in repo.list() {
        let path = repo.get(version).unwrap();
        let stored = fs::read_to_string(checksum_path(&path)).unwrap();
        assert_eq!(compute_sha256(&fs::read(&path).unwrap()), stored.trim());
    }
}

/// Test 2: A tampered binary is evicted from disk on the next init
#[test]
fn test_tampered_artifact_evicted_on_init() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    seed_version(&root, "0.0.1", b"good");
    let tampered = seed_version(&root, "0.0.2", b"original");
    fs::write(&tampered, b"modified after checksum").unwrap();

    let repo = open(&root);

    assert_eq!(repo.list(), &["0.0.1".to_string()]);
    assert!(!root.join("0.0.2").exists());
    assert!(repo.get("0.0.2").is_none());
}

/// Test 3: Missing checksum file or a checksum that is a directory is corruption
#[test]
fn test_incomplete_artifacts_evicted() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");

    let binary = seed_version(&root, "1.0.0", b"no checksum");
    fs::remove_file(checksum_path(&binary)).unwrap();

    let binary = seed_version(&root, "2.0.0", b"checksum is dir");
    fs::remove_file(checksum_path(&binary)).unwrap();
    fs::create_dir(checksum_path(&binary)).unwrap();

    fs::create_dir_all(root.join("3.0.0")).unwrap();

    let repo = open(&root);

    assert!(repo.list().is_empty());
    assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
}

/// Test 4: State is rebuilt from disk by a fresh handle
#[test]
fn test_reload_from_disk() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    {
        let mut repo = open(&root);
        let src = source_artifact(temp.path(), "src", b"persisted");
        repo.add(&src, "0.3.0").unwrap();
    }

    let repo = open(&root);
    assert_eq!(repo.list(), &["0.3.0".to_string()]);
    assert_eq!(fs::read(repo.get("0.3.0").unwrap()).unwrap(), b"persisted");
}

// =============================================================================
// Retention
// =============================================================================

/// Test 5: Init keeps exactly the five semantically greatest versions
#[test]
fn test_retention_keeps_greatest_versions() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let versions = [
        "0.0.9", "0.0.10", "0.1.0-beta", "0.1.0", "0.0.2", "1.0.0", "0.0.1",
    ];
    for version in versions {
        seed_version(&root, version, version.as_bytes());
    }

    let repo = open(&root);

    assert_eq!(
        repo.list(),
        &["1.0.0", "0.1.0", "0.1.0-beta", "0.0.10", "0.0.9"]
    );
    assert!(!root.join("0.0.2").exists());
    assert!(!root.join("0.0.1").exists());
}

/// Test 6: Retention counts only valid versions
#[test]
fn test_retention_ignores_invalid_entries() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    for version in ["1.0.0", "1.0.1", "1.0.2"] {
        seed_version(&root, version, version.as_bytes());
    }
    fs::create_dir_all(root.join("nightly")).unwrap();

    let mut repo = LocalRepository::new(&root, FILENAME)
        .unwrap()
        .with_retention(RetentionPolicy::keep_last_n(3));
    repo.init().unwrap();

    assert_eq!(repo.list().len(), 3);
    assert!(!root.join("nightly").exists());
}

/// Test 7: Add does not apply retention; the next init does
#[test]
fn test_add_beyond_bound_rotates_on_next_init() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let mut repo = LocalRepository::new(&root, FILENAME)
        .unwrap()
        .with_retention(RetentionPolicy::keep_last_n(2));
    repo.init().unwrap();

    for (i, version) in ["0.1.0", "0.2.0", "0.3.0"].iter().enumerate() {
        let src = source_artifact(temp.path(), &format!("src-{i}"), version.as_bytes());
        repo.add(&src, version).unwrap();
    }
    assert_eq!(repo.list().len(), 3);

    repo.init().unwrap();
    assert_eq!(repo.list(), &["0.3.0", "0.2.0"]);
}

// =============================================================================
// Add semantics
// =============================================================================

/// Test 8: Failed validation never registers or leaves a version directory
#[test]
fn test_failed_add_leaves_no_trace() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let mut repo = open(&root);

    let src = source_artifact(temp.path(), "src", b"content");
    fs::write(checksum_path(&src), compute_sha256(b"other content")).unwrap();

    let err = repo.add(&src, "0.0.1").unwrap_err();
    assert!(matches!(err, RepoError::ChecksumMismatch { .. }));
    assert!(repo.list().is_empty());
    assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
}

/// Test 9: Source directory passed as artifact is rejected
#[test]
fn test_add_rejects_directory_source() {
    let temp = TempDir::new().unwrap();
    let mut repo = open(&temp.path().join("repo"));
    let dir = temp.path().join("src-dir");
    fs::create_dir(&dir).unwrap();

    assert!(matches!(repo.add(&dir, "0.0.1"), Err(RepoError::NotFile(_))));
}

/// Test 10: Removing a version reloads and keeps the rest ordered
#[test]
fn test_remove_reloads_order() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    for version in ["0.0.1", "0.0.2", "0.0.3"] {
        seed_version(&root, version, version.as_bytes());
    }
    let mut repo = open(&root);

    repo.remove("0.0.2").unwrap();

    assert_eq!(repo.list(), &["0.0.3", "0.0.1"]);
    assert_eq!(repo.previous("0.0.3"), Some("0.0.1"));
}
