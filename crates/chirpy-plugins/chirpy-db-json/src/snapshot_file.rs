/*
    snapshot_file.rs - the single JSON file holding every post and account

    Writes go to a sibling temp file which is synced and then renamed over
    the original, so readers never observe a half-written snapshot.
*/

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chirpy_core::error::Result;
use chirpy_core::models::Snapshot;

/// Creates an empty snapshot at `path` unless one already exists.
pub(crate) fn ensure(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write(path, &Snapshot::default())?;
    Ok(true)
}

pub(crate) fn load(path: &Path) -> Result<Snapshot> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

pub(crate) fn write(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let data = serde_json::to_vec(snapshot)?;

    let temp_path = temp_path_for(path);
    let mut file = File::create(&temp_path)?;
    file.write_all(&data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Deletes the snapshot file. A missing file is not an error.
pub(crate) fn remove(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirpy_core::error::AppError;
    use chirpy_core::models::{Post, Record};
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_nested_empty_snapshot_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("database.json");

        assert!(ensure(&path).unwrap());
        assert!(!ensure(&path).unwrap());
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.json");

        let mut snapshot = Snapshot::default();
        snapshot.insert(Record::Post(Post { id: 1, body: "hello".into(), author_id: 1 }));
        write(&path, &snapshot).unwrap();

        assert_eq!(load(&path).unwrap(), snapshot);
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_corrupt_file_surfaces_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, b"{\"chirps\": [").unwrap();

        assert!(matches!(load(&path), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_missing_file_surfaces_storage_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("absent.json")),
            Err(AppError::Storage(_))
        ));
        assert!(!remove(&dir.path().join("absent.json")).unwrap());
    }
}
