//! Shared library loading with change detection.
//!
//! Reloadable modules are shadow-copied to a scratch path before opening so
//! the build toolchain can keep rewriting the original file; `has_changed`
//! watches the original, which is what makes hot reload possible.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("library not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to open library {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("failed to shadow-copy library {path}: {message}")]
    ShadowCopy { path: PathBuf, message: String },

    #[error("failed to stat library {path}: {message}")]
    Metadata { path: PathBuf, message: String },
}

/// Description of a library to open.
#[derive(Debug, Clone)]
pub struct LibraryDesc {
    /// Path to the module, file extension optional.
    pub name: PathBuf,
    /// Shadow-copy before opening so the source file stays writable.
    pub reloadable: bool,
}

/// An open shared library plus the bookkeeping needed for hot reload.
///
/// The handle is `None` only transiently inside [`reload`](Self::reload),
/// where the old mapping must be closed before the rewritten file is
/// reopened.
pub struct SharedLibrary {
    library: Option<libloading::Library>,
    source_path: PathBuf,
    loaded_path: PathBuf,
    reloadable: bool,
    last_modified: Option<SystemTime>,
}

static SHADOW_COUNTER: AtomicU64 = AtomicU64::new(0);

impl SharedLibrary {
    pub fn load(desc: &LibraryDesc) -> Result<Self, LibraryError> {
        let source_path = resolve_module_path(&desc.name)?;

        let loaded_path = if desc.reloadable {
            shadow_copy(&source_path)?
        } else {
            source_path.clone()
        };

        let library = unsafe { libloading::Library::new(&loaded_path) }.map_err(|e| {
            LibraryError::Open {
                path: loaded_path.clone(),
                message: e.to_string(),
            }
        })?;

        let last_modified = modification_time(&source_path).ok();
        log::debug!(
            "[SharedLibrary::load] opened {:?} (reloadable: {})",
            source_path,
            desc.reloadable
        );

        Ok(Self {
            library: Some(library),
            source_path,
            loaded_path,
            reloadable: desc.reloadable,
            last_modified,
        })
    }

    /// True when the on-disk module changed since it was last opened.
    pub fn has_changed(&self) -> bool {
        match (modification_time(&self.source_path), self.last_modified) {
            (Ok(current), Some(recorded)) => current != recorded,
            // an unreadable file is mid-rewrite, not yet a change
            _ => false,
        }
    }

    /// Resolves an exported symbol to a raw function pointer; `None` on a
    /// missing symbol (not fatal).
    ///
    /// # Safety
    ///
    /// `T` must be the correct function pointer type for the symbol, and
    /// the pointer must not outlive this library.
    pub unsafe fn load_function<T: Copy>(&self, name: &str) -> Option<T> {
        match self.library.as_ref()?.get::<T>(name.as_bytes()) {
            Ok(symbol) => Some(*symbol),
            Err(_) => None,
        }
    }

    /// Closes the current handle and reopens from the (possibly rewritten)
    /// source file. All previously resolved symbols are invalidated. On
    /// failure the library stays closed and the error is returned.
    pub fn reload(&mut self) -> Result<(), LibraryError> {
        // close before reopening so a mid-write toolchain is not blocked
        self.library = None;
        if self.reloadable && self.loaded_path != self.source_path {
            let _ = std::fs::remove_file(&self.loaded_path);
        }

        let desc = LibraryDesc {
            name: self.source_path.clone(),
            reloadable: self.reloadable,
        };
        let fresh = SharedLibrary::load(&desc)?;
        *self = fresh;
        Ok(())
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn loaded_path(&self) -> &Path {
        &self.loaded_path
    }
}

/// Resolves a module name to an existing file, trying the platform shared
/// library extension and `lib` prefix when the bare name is missing.
pub fn resolve_module_path(name: &Path) -> Result<PathBuf, LibraryError> {
    if name.exists() {
        return Ok(name.to_path_buf());
    }

    let mut candidates = Vec::new();
    if name.extension().is_none() {
        candidates.push(name.with_extension(std::env::consts::DLL_EXTENSION));
    }
    if let (Some(parent), Some(stem)) = (name.parent(), name.file_stem()) {
        let prefixed = format!(
            "{}{}{}",
            std::env::consts::DLL_PREFIX,
            stem.to_string_lossy(),
            std::env::consts::DLL_SUFFIX
        );
        candidates.push(parent.join(prefixed));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.exists())
        .ok_or_else(|| LibraryError::NotFound(name.to_path_buf()))
}

/// Modification time of a module file.
pub fn modification_time(path: &Path) -> Result<SystemTime, LibraryError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| LibraryError::Metadata {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Copies the module beside the temp directory under a unique name so the
/// original stays writable while the copy is mapped.
fn shadow_copy(source: &Path) -> Result<PathBuf, LibraryError> {
    let counter = SHADOW_COUNTER.fetch_add(1, Ordering::Relaxed);
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let extension = source
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| std::env::consts::DLL_EXTENSION.to_string());

    let target = std::env::temp_dir().join(format!(
        "{}_{}_{}.{}",
        stem,
        std::process::id(),
        counter,
        extension
    ));

    std::fs::copy(source, &target).map_err(|e| LibraryError::ShadowCopy {
        path: source.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_exact_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("module.bin");
        std::fs::File::create(&path).expect("create");
        assert_eq!(resolve_module_path(&path).expect("resolves"), path);
    }

    #[test]
    fn test_resolve_adds_platform_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let on_disk = dir
            .path()
            .join("module")
            .with_extension(std::env::consts::DLL_EXTENSION);
        std::fs::File::create(&on_disk).expect("create");

        let resolved = resolve_module_path(&dir.path().join("module")).expect("resolves");
        assert_eq!(resolved, on_disk);
    }

    #[test]
    fn test_resolve_adds_lib_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let on_disk = dir.path().join(format!(
            "{}module{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        ));
        std::fs::File::create(&on_disk).expect("create");

        let resolved = resolve_module_path(&dir.path().join("module")).expect("resolves");
        assert_eq!(resolved, on_disk);
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = resolve_module_path(&dir.path().join("nope"));
        assert!(matches!(result, Err(LibraryError::NotFound(_))));
    }

    #[test]
    fn test_modification_time_tracks_rewrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("module.bin");
        std::fs::write(&path, b"v1").expect("write");

        let before = modification_time(&path).expect("mtime");
        // push the mtime forward explicitly so the test is not timer bound
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("open");
        file.write_all(b"v2").expect("write");
        file.set_modified(before + std::time::Duration::from_secs(2))
            .expect("set mtime");
        drop(file);

        let after = modification_time(&path).expect("mtime");
        assert_ne!(before, after);
    }

    #[test]
    fn test_load_missing_library_fails() {
        let desc = LibraryDesc {
            name: PathBuf::from("/definitely/not/here"),
            reloadable: false,
        };
        assert!(SharedLibrary::load(&desc).is_err());
    }
}
