//! File capability: the handful of filesystem operations the runtime and
//! extensions are allowed to assume.

use std::path::Path;

/// Two-valued result used at the capability boundary; richer errors are
/// logged, not returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileResult {
    Fail,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: DirectoryEntryKind,
}

pub fn exists(path: &Path) -> bool {
    path.is_file()
}

pub fn directory_exists(path: &Path) -> bool {
    path.is_dir()
}

pub fn remove(path: &Path) -> FileResult {
    match std::fs::remove_file(path) {
        Ok(()) => FileResult::Success,
        Err(e) => {
            log::error!("[platform::file::remove] {:?}: {}", path, e);
            FileResult::Fail
        }
    }
}

pub fn copy(source: &Path, destination: &Path) -> FileResult {
    match std::fs::copy(source, destination) {
        Ok(_) => FileResult::Success,
        Err(e) => {
            log::error!(
                "[platform::file::copy] {:?} -> {:?}: {}",
                source,
                destination,
                e
            );
            FileResult::Fail
        }
    }
}

pub fn binary_read(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            log::error!("[platform::file::binary_read] {:?}: {}", path, e);
            None
        }
    }
}

pub fn binary_write(path: &Path, data: &[u8]) -> FileResult {
    match std::fs::write(path, data) {
        Ok(()) => FileResult::Success,
        Err(e) => {
            log::error!("[platform::file::binary_write] {:?}: {}", path, e);
            FileResult::Fail
        }
    }
}

pub fn create_directory(path: &Path) -> FileResult {
    match std::fs::create_dir_all(path) {
        Ok(()) => FileResult::Success,
        Err(e) => {
            log::error!("[platform::file::create_directory] {:?}: {}", path, e);
            FileResult::Fail
        }
    }
}

pub fn remove_directory(path: &Path) -> FileResult {
    match std::fs::remove_dir_all(path) {
        Ok(()) => FileResult::Success,
        Err(e) => {
            log::error!("[platform::file::remove_directory] {:?}: {}", path, e);
            FileResult::Fail
        }
    }
}

pub fn get_directory_info(path: &Path) -> Option<Vec<DirectoryEntry>> {
    let reader = match std::fs::read_dir(path) {
        Ok(reader) => reader,
        Err(e) => {
            log::error!("[platform::file::get_directory_info] {:?}: {}", path, e);
            return None;
        }
    };

    let mut entries = Vec::new();
    for entry in reader.flatten() {
        let kind = match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => DirectoryEntryKind::Directory,
            Ok(_) => DirectoryEntryKind::File,
            Err(_) => continue,
        };
        entries.push(DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob.bin");

        assert_eq!(binary_write(&path, b"payload"), FileResult::Success);
        assert!(exists(&path));
        assert_eq!(binary_read(&path).expect("readable"), b"payload");
    }

    #[test]
    fn test_copy_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a.bin");
        let destination = dir.path().join("b.bin");
        binary_write(&source, b"x");

        assert_eq!(copy(&source, &destination), FileResult::Success);
        assert!(exists(&destination));
        assert_eq!(remove(&source), FileResult::Success);
        assert!(!exists(&source));
    }

    #[test]
    fn test_directory_info_lists_kinds() {
        let dir = tempfile::tempdir().expect("tempdir");
        binary_write(&dir.path().join("file.txt"), b"");
        create_directory(&dir.path().join("nested"));

        let entries = get_directory_info(dir.path()).expect("listable");
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .any(|e| e.name == "file.txt" && e.kind == DirectoryEntryKind::File));
        assert!(entries
            .iter()
            .any(|e| e.name == "nested" && e.kind == DirectoryEntryKind::Directory));
    }

    #[test]
    fn test_missing_file_fails_quietly() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(binary_read(&dir.path().join("ghost")).is_none());
        assert_eq!(remove(&dir.path().join("ghost")), FileResult::Fail);
    }
}
